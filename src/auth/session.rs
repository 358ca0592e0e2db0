//! Per-connection authentication state machine.
//!
//! ```text
//! AwaitingCredentials ─▶ Validating ─┬─▶ Failed ─▶ AwaitingCredentials
//!                                    └─▶ TokenIssued ─┬─▶ Completed
//!                                                     └─▶ AwaitingCredentials
//! ```
//!
//! A token exists exactly in `TokenIssued` and `Completed`; the enum makes
//! any other combination unrepresentable.

use log::{info, warn};

use super::{Digest, Token, digest_eq, sha256_hex};
use crate::app::ports::{CredentialField, CredentialStore};

/// Identity proven by a completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub username_hash: Digest,
    pub password_hash: Digest,
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    AwaitingCredentials,
    Validating,
    TokenIssued(Authenticated),
    Completed(Authenticated),
    Failed,
}

/// Outcome of [`AuthSession::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Credentials matched; the token must now be sent to the peer.
    Accepted(Token),
    /// Credentials did not match; the session sits in `Failed`.
    Rejected,
}

#[derive(Debug)]
pub struct AuthSession {
    state: AuthState,
}

impl AuthSession {
    pub fn new() -> Self {
        Self {
            state: AuthState::AwaitingCredentials,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn token(&self) -> Option<&Token> {
        match &self.state {
            AuthState::TokenIssued(a) | AuthState::Completed(a) => Some(&a.token),
            _ => None,
        }
    }

    /// Hash both inputs and compare against the store. Only valid from
    /// `AwaitingCredentials`; any other state is reset first.
    pub fn validate<C: CredentialStore>(
        &mut self,
        username: &str,
        password: &str,
        store: &C,
    ) -> Validation {
        if self.state != AuthState::AwaitingCredentials {
            warn!("auth: validate outside AwaitingCredentials, resetting");
        }
        self.state = AuthState::Validating;

        let username_hash = sha256_hex(username.as_bytes());
        let password_hash = sha256_hex(password.as_bytes());

        // Evaluate both before combining so timing does not reveal which
        // field was wrong.
        let user_ok = digest_eq(&username_hash, &store.get(CredentialField::Username));
        let pass_ok = digest_eq(&password_hash, &store.get(CredentialField::Password));

        if !(user_ok & pass_ok) {
            info!("auth: credentials rejected");
            self.state = AuthState::Failed;
            return Validation::Rejected;
        }

        let token = Token::generate();
        self.state = AuthState::TokenIssued(Authenticated {
            username_hash,
            password_hash,
            token: token.clone(),
        });
        Validation::Accepted(token)
    }

    /// Record a submission that could not even be decoded.
    pub fn reject(&mut self) -> Validation {
        info!("auth: undecodable credentials rejected");
        self.state = AuthState::Failed;
        Validation::Rejected
    }

    /// Apply the peer's answer to an issued token. Exactly `OK` completes
    /// the handshake; anything else drops the token.
    pub fn acknowledge(&mut self, response: &str) -> bool {
        let state = core::mem::replace(&mut self.state, AuthState::AwaitingCredentials);
        match state {
            AuthState::TokenIssued(auth) if response == "OK" => {
                self.state = AuthState::Completed(auth);
                true
            }
            AuthState::TokenIssued(_) => false,
            other => {
                warn!("auth: acknowledgement outside TokenIssued");
                self.state = other;
                false
            }
        }
    }

    /// `Failed → AwaitingCredentials`.
    pub fn retry(&mut self) {
        if self.state == AuthState::Failed {
            self.state = AuthState::AwaitingCredentials;
        }
    }

    pub fn completed(&self) -> Option<&Authenticated> {
        match &self.state {
            AuthState::Completed(a) => Some(a),
            _ => None,
        }
    }

    /// Hand the identity over once `Completed`.
    pub fn into_authenticated(self) -> Option<Authenticated> {
        match self.state {
            AuthState::Completed(a) => Some(a),
            _ => None,
        }
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}
