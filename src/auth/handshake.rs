//! Drives an [`AuthSession`] over the four auth characteristics.
//!
//! Every await in here is a characteristic write; there are no timeouts.
//! A silent peer parks the handshake until the link drops and the whole
//! connection future is cancelled.

use futures_lite::future;
use log::{debug, info};

use super::session::{AuthSession, Authenticated, Validation};
use super::token::Token;
use crate::app::events::{SessionEvent, short};
use crate::app::ports::{CredentialStore, EventSink};
use crate::gatt::{GattBackend, GattServer};

pub struct Handshake<'a, B, C, E> {
    server: &'a GattServer<B>,
    store: &'a C,
    events: &'a E,
}

impl<'a, B, C, E> Handshake<'a, B, C, E>
where
    B: GattBackend,
    C: CredentialStore,
    E: EventSink,
{
    pub fn new(server: &'a GattServer<B>, store: &'a C, events: &'a E) -> Self {
        Self {
            server,
            store,
            events,
        }
    }

    /// Wait for both a username and a password write, in either order,
    /// then take the latest value of each. A peer may rewrite a field
    /// before sending the other one; the superseded writes are dropped.
    ///
    /// Returns `None` when either value is not UTF-8; the caller treats
    /// that like a mismatch.
    pub async fn await_credentials(&self) -> Option<(String, String)> {
        let auth = &self.server.auth;
        future::zip(auth.username.written(), auth.password.written()).await;
        let (user, pass) = (auth.username.value(), auth.password.value());
        auth.username.discard_writes();
        auth.password.discard_writes();
        match (String::from_utf8(user), String::from_utf8(pass)) {
            (Ok(u), Ok(p)) => Some((u, p)),
            _ => {
                debug!("auth: credentials are not UTF-8");
                None
            }
        }
    }

    /// Write the token and notify the peer.
    pub fn send_token(&self, token: &Token) {
        self.server.publish(&self.server.auth.token, token.as_bytes());
    }

    /// Wait for one write on the response characteristic.
    pub async fn await_acknowledgement(&self) -> Option<String> {
        String::from_utf8(self.server.auth.response.written().await).ok()
    }

    /// Zero all four characteristics (with notification) and drop any
    /// writes that raced the reset.
    pub fn reset_values(&self) {
        self.server.reset_auth();
    }

    /// Loop until the peer completes the handshake.
    pub async fn run(&self) -> Authenticated {
        let mut session = AuthSession::new();
        loop {
            let validation = match self.await_credentials().await {
                Some((user, pass)) => session.validate(&user, &pass, self.store),
                None => session.reject(),
            };

            let token = match validation {
                Validation::Accepted(token) => token,
                Validation::Rejected => {
                    self.events.emit(&SessionEvent::CredentialsRejected);
                    self.reset_values();
                    session.retry();
                    continue;
                }
            };

            self.send_token(&token);
            self.events.emit(&SessionEvent::TokenIssued {
                prefix: short(token.as_str()),
            });

            let ack = self.await_acknowledgement().await;
            if session.acknowledge(ack.as_deref().unwrap_or_default()) {
                self.server.disable_auth();
            }
            if let Some(auth) = session.completed() {
                info!("auth: handshake complete");
                return auth.clone();
            }

            self.events.emit(&SessionEvent::AcknowledgementRejected);
            self.reset_values();
        }
    }
}

/// Convenience wrapper: run one handshake to completion.
pub async fn handle_auth<B, C, E>(server: &GattServer<B>, store: &C, events: &E) -> Authenticated
where
    B: GattBackend,
    C: CredentialStore,
    E: EventSink,
{
    Handshake::new(server, store, events).run().await
}
