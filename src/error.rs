//! Unified error types for the Febina firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! orchestrator's error handling uniform. All variants are `Copy` so they
//! can be passed through tasks and logged without allocation.
//!
//! Protocol outcomes (bad credentials, a non-OK acknowledgement, a command
//! carrying the wrong token) are not errors: the state machines model them
//! as ordinary transitions.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The GATT layer rejected an operation.
    Gatt(GattError),
    /// Command frame reassembly failed.
    Frame(FrameError),
    /// A complete frame could not be turned into a command.
    Command(CommandError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gatt(e) => write!(f, "gatt: {e}"),
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// GATT errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattError {
    /// No characteristic is registered under this UUID.
    UnknownAttribute(u16),
    /// The characteristic does not accept writes.
    WriteNotPermitted(u16),
    /// The characteristic is not (or no longer) readable.
    ReadNotPermitted(u16),
    /// Written value exceeds the maximum attribute length.
    InvalidLength(u16),
    /// No peer is connected.
    NotConnected,
    /// Advertising could not be started.
    AdvertisingFailed,
    /// The host stack refused a notification.
    NotifyFailed,
}

impl fmt::Display for GattError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAttribute(uuid) => write!(f, "unknown attribute 0x{uuid:04x}"),
            Self::WriteNotPermitted(uuid) => write!(f, "write not permitted on 0x{uuid:04x}"),
            Self::ReadNotPermitted(uuid) => write!(f, "read not permitted on 0x{uuid:04x}"),
            Self::InvalidLength(uuid) => write!(f, "invalid value length for 0x{uuid:04x}"),
            Self::NotConnected => write!(f, "no peer connected"),
            Self::AdvertisingFailed => write!(f, "advertising failed"),
            Self::NotifyFailed => write!(f, "notification failed"),
        }
    }
}

impl From<GattError> for Error {
    fn from(e: GattError) -> Self {
        Self::Gatt(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The accumulated frame exceeded the configured bound.
    Overflow { limit: usize },
    /// A complete frame was not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow { limit } => write!(f, "frame exceeds {limit} bytes"),
            Self::InvalidUtf8 => write!(f, "frame is not valid UTF-8"),
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The payload is not a JSON object.
    MalformedJson,
    /// The JSON object has no `command` string.
    MissingCommand,
    /// `info` is present but is neither an object nor a string holding one.
    InvalidInfo,
    /// A `SET` program failed validation; the text names the field.
    InvalidProgram(&'static str),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson => write!(f, "malformed JSON"),
            Self::MissingCommand => write!(f, "missing command name"),
            Self::InvalidInfo => write!(f, "info is not an object"),
            Self::InvalidProgram(msg) => write!(f, "invalid program: {msg}"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the text names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

impl std::error::Error for Error {}
impl std::error::Error for GattError {}
impl std::error::Error for ConfigError {}
