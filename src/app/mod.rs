//! Application core: connection lifecycle and the port boundary.
//!
//! The session orchestrator sequences handshake → command channel →
//! disconnect handling for one connection at a time. All interaction with
//! the platform happens through **port traits** defined in [`ports`],
//! keeping this layer testable without a radio.

pub mod events;
pub mod ports;
pub mod session;

pub use session::{Aftermath, DeviceSession, SessionOrchestrator};
