//! Session orchestrator: one connection lifetime at a time.
//!
//! [`SessionOrchestrator`] sequences the handshake, the command channel
//! and disconnect handling. All I/O flows through the GATT server and the
//! port traits, so the whole lifecycle runs against a simulated backend
//! in tests.
//!
//! ```text
//!  advertise ─▶ connected ─┬─▶ handshake ─▶ DeviceSession ─▶ command channel ─┐
//!                          └─▶ wait_disconnected ─────────────────────────────┤
//!                                                         first to finish ◀───┘
//!  restore characteristics ─▶ stepper to boot state ─▶ re-advertise | soft reset
//! ```

use futures_lite::future;
use log::{info, warn};

use super::events::{SessionEvent, short};
use super::ports::{CredentialStore, EventSink, SystemPort};
use crate::auth::{Authenticated, Digest, Token, handle_auth};
use crate::command::{CommandChannel, ProgramStore};
use crate::config::{DeviceConfig, DisconnectPolicy};
use crate::error::GattError;
use crate::gatt::codec::format_mac;
use crate::gatt::{Advertisement, Connection, GattBackend, GattServer};
use crate::stepper::StepperController;

// ───────────────────────────────────────────────────────────────
// DeviceSession
// ───────────────────────────────────────────────────────────────

/// The authenticated identity bound to one physical connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    pub username_hash: Digest,
    pub password_hash: Digest,
    pub peer_address: heapless::String<17>,
    pub token: Token,
}

impl DeviceSession {
    /// Created exactly once per connection, when the handshake completes.
    pub fn bind(auth: Authenticated, conn: Connection) -> Self {
        Self {
            username_hash: auth.username_hash,
            password_hash: auth.password_hash,
            peer_address: format_mac(&conn.peer),
            token: auth.token,
        }
    }

    /// Whether `claimed` is this session's token.
    pub fn authorizes(&self, claimed: &str) -> bool {
        self.token.matches(claimed)
    }
}

// ───────────────────────────────────────────────────────────────
// SessionOrchestrator
// ───────────────────────────────────────────────────────────────

/// What the orchestrator did once a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aftermath {
    /// Advertising will be re-armed.
    Readvertise,
    /// The platform reset was requested (on target this never returns).
    Reset,
}

pub struct SessionOrchestrator<'a, 's, B, C, E, S> {
    stepper: &'a StepperController<'s, B, E>,
    programs: &'a ProgramStore,
    store: &'a C,
    events: &'a E,
    system: &'a S,
    config: &'a DeviceConfig,
}

impl<'a, 's, B, C, E, S> SessionOrchestrator<'a, 's, B, C, E, S>
where
    B: GattBackend,
    C: CredentialStore,
    E: EventSink,
    S: SystemPort,
{
    pub fn new(
        stepper: &'a StepperController<'s, B, E>,
        programs: &'a ProgramStore,
        store: &'a C,
        events: &'a E,
        system: &'a S,
        config: &'a DeviceConfig,
    ) -> Self {
        Self {
            stepper,
            programs,
            store,
            events,
            system,
            config,
        }
    }

    fn server(&self) -> &'s GattServer<B> {
        self.stepper.server()
    }

    /// Advertise, serve connections, repeat. Returns only if advertising
    /// cannot be started.
    pub async fn run(&self) -> Result<(), GattError> {
        loop {
            let conn = self.accept().await?;
            if self.serve(conn).await == Aftermath::Reset {
                // Only reached where the platform could not reset.
                info!("CONN | reset unavailable, re-advertising");
            }
        }
    }

    /// Advertise until a central connects.
    pub async fn accept(&self) -> Result<Connection, GattError> {
        let adv = Advertisement::from_config(self.config);
        self.events.emit(&SessionEvent::Advertising);
        let conn = self.server().advertise(&adv).await?;
        self.events.emit(&SessionEvent::Connected {
            peer: format_mac(&conn.peer),
        });
        Ok(conn)
    }

    /// Run one connection to its end and clean up after it.
    pub async fn serve(&self, conn: Connection) -> Aftermath {
        future::or(self.connection_tasks(conn), self.server().wait_disconnected(conn)).await;
        self.on_disconnect(conn)
    }

    /// Handshake, then commands, strictly in that order. Never returns;
    /// cancelled by dropping.
    async fn connection_tasks(&self, conn: Connection) {
        let auth = handle_auth(self.server(), self.store, self.events).await;
        // Command bytes written before the handshake finished are not part
        // of the session.
        self.server().run.command.discard_writes();
        let session = DeviceSession::bind(auth, conn);
        self.events.emit(&SessionEvent::Authenticated {
            peer: session.peer_address.clone(),
            username_prefix: short(&session.username_hash),
        });

        CommandChannel::new(
            self.stepper,
            self.programs,
            self.events,
            self.config,
            &session,
        )
        .run()
        .await;
    }

    fn on_disconnect(&self, conn: Connection) -> Aftermath {
        self.server().restore_connection_state();
        // No peer is left to supervise an ongoing cycle, and the next one
        // starts from the boot configuration.
        self.stepper.restore_boot();
        self.events.emit(&SessionEvent::Disconnected {
            peer: format_mac(&conn.peer),
        });

        match self.config.disconnect_policy {
            DisconnectPolicy::Readvertise => Aftermath::Readvertise,
            DisconnectPolicy::SoftReset => {
                if !self.system.soft_reset() {
                    warn!("CONN | soft reset not supported here");
                }
                Aftermath::Reset
            }
        }
    }
}
