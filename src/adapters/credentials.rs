//! Static credential store.
//!
//! Holds the reference SHA-256 digests of the device username and
//! password. Firmware builds take them from the build environment
//! (`FEBINA_USERNAME_SHA256` / `FEBINA_PASSWORD_SHA256`) so plaintext
//! credentials never reach the image.

use crate::app::ports::{CredentialField, CredentialStore};
use crate::auth::{Digest, sha256_hex};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    username: Digest,
    password: Digest,
}

fn parse_digest(hex: &str, field: &'static str) -> Result<Digest, ConfigError> {
    let valid = hex.len() == 64
        && hex
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !valid {
        return Err(ConfigError::ValidationFailed(field));
    }
    let mut d = Digest::new();
    let _ = d.push_str(hex);
    Ok(d)
}

impl StaticCredentials {
    /// From lower-case hex SHA-256 digests.
    pub fn new(username_hash: &str, password_hash: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            username: parse_digest(username_hash, "username digest is not 64 hex chars")?,
            password: parse_digest(password_hash, "password digest is not 64 hex chars")?,
        })
    }

    /// Hash plaintext credentials. Intended for tests and bench setups.
    pub fn from_plaintext(username: &str, password: &str) -> Self {
        Self {
            username: sha256_hex(username.as_bytes()),
            password: sha256_hex(password.as_bytes()),
        }
    }

    /// Digests baked in at build time.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        match (
            option_env!("FEBINA_USERNAME_SHA256"),
            option_env!("FEBINA_PASSWORD_SHA256"),
        ) {
            (Some(user), Some(pass)) => Self::new(user, pass),
            _ => Err(ConfigError::ValidationFailed(
                "credential digests not set at build time",
            )),
        }
    }
}

impl CredentialStore for StaticCredentials {
    fn get(&self, field: CredentialField) -> Digest {
        match field {
            CredentialField::Username => self.username.clone(),
            CredentialField::Password => self.password.clone(),
        }
    }
}
