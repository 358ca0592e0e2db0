//! Credential handshake.
//!
//! 1. Peer writes username and password (plain UTF-8 text)
//! 2. Device hashes both with SHA-256 and compares against the
//!    [`CredentialStore`](crate::app::ports::CredentialStore) digests
//! 3. On match a fresh 256-bit token is notified on the token characteristic
//! 4. Peer answers `OK` on the response characteristic; the auth
//!    characteristics are zeroed and made unreadable
//!
//! Any mismatch or non-`OK` answer clears the characteristics and the
//! handshake starts over. There is no attempt limit.

pub mod handshake;
pub mod session;
pub mod token;

pub use handshake::{Handshake, handle_auth};
pub use session::{AuthSession, AuthState, Authenticated, Validation};
pub use token::Token;

/// Lower-case hex SHA-256 digest.
pub type Digest = heapless::String<64>;

/// SHA-256 of `input`, hex-encoded.
pub fn sha256_hex(input: &[u8]) -> Digest {
    let hash = hmac_sha256::Hash::hash(input);
    let mut out = Digest::new();
    // 32 bytes always encode to exactly 64 characters.
    let _ = out.push_str(&data_encoding::HEXLOWER.encode(&hash));
    out
}

/// Equality that does not short-circuit on the first differing byte.
pub fn digest_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
