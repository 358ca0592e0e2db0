//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ session / handshake / stepper (domain)
//! ```
//!
//! The BLE host stack sits behind [`GattBackend`](crate::gatt::GattBackend);
//! everything else the domain needs from outside is declared here.
//!
//! ## Security notes
//!
//! - **CredentialStore** implementations hold digests only, never the
//!   plaintext reference credentials.
//! - **EventSink** implementations must not log tokens in full.

use crate::auth::Digest;

// ───────────────────────────────────────────────────────────────
// Credential store (driven adapter: domain → reference digests)
// ───────────────────────────────────────────────────────────────

/// Which reference credential to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Username,
    Password,
}

/// Source of the expected credential digests (lower-case hex SHA-256).
pub trait CredentialStore {
    fn get(&self, field: CredentialField) -> Digest;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`SessionEvent`](super::events::SessionEvent)s
/// through this port. Adapters decide where they go.
///
/// Takes `&self`: the sink is shared by the session task and the stepper
/// tasks on one executor.
pub trait EventSink {
    fn emit(&self, event: &super::events::SessionEvent);
}

// ───────────────────────────────────────────────────────────────
// System port (driven adapter: domain → platform lifecycle)
// ───────────────────────────────────────────────────────────────

/// Platform lifecycle control.
pub trait SystemPort {
    /// Restart the device. Returns `false` where the platform has no
    /// reset primitive, in which case the caller carries on.
    fn soft_reset(&self) -> bool;
}
