//! Session tokens: 32 random bytes, hex-encoded.

use core::fmt;

/// Raw token entropy in bytes.
pub const TOKEN_BYTES: usize = 32;

/// Hex length of a token on the wire.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// A 64-character lower-case hex token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(heapless::String<TOKEN_LEN>);

impl Token {
    /// Draw a fresh token from the platform RNG. Never derived from
    /// credentials, never reused.
    pub fn generate() -> Self {
        Self::from_entropy(&fill_random())
    }

    pub fn from_entropy(bytes: &[u8; TOKEN_BYTES]) -> Self {
        let mut s = heapless::String::new();
        let _ = s.push_str(&data_encoding::HEXLOWER.encode(bytes));
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Compare a claimed token without early exit.
    pub fn matches(&self, claimed: &str) -> bool {
        super::digest_eq(self.as_str(), claimed)
    }

    /// First eight characters, for logs.
    pub fn prefix(&self) -> &str {
        &self.0[..8]
    }
}

// Tokens never appear whole in logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}…)", self.prefix())
    }
}

// ── Platform-specific entropy ────────────────────────────────

/// ESP-IDF: hardware RNG via `esp_fill_random`.
#[cfg(target_os = "espidf")]
fn fill_random() -> [u8; TOKEN_BYTES] {
    let mut buf = [0u8; TOKEN_BYTES];
    // SAFETY: esp_fill_random writes exactly `len` bytes into the
    // provided buffer, which is valid and exclusively owned.
    unsafe {
        esp_idf_sys::esp_fill_random(buf.as_mut_ptr().cast(), buf.len());
    }
    buf
}

/// Host: operating system CSPRNG.
#[cfg(not(target_os = "espidf"))]
fn fill_random() -> [u8; TOKEN_BYTES] {
    use rand::RngCore;

    let mut buf = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}
