//! Outbound session events.
//!
//! The handshake, command channel and stepper emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them.

use crate::error::Error;

/// Structured events emitted by the firmware core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Advertising (re)started.
    Advertising,

    /// A central connected.
    Connected { peer: heapless::String<17> },

    /// The central went away; connection tasks were cancelled.
    Disconnected { peer: heapless::String<17> },

    /// Submitted credentials did not match the store.
    CredentialsRejected,

    /// A token was issued and notified. Carries the first eight hex digits.
    TokenIssued { prefix: heapless::String<8> },

    /// The peer answered something other than `OK`.
    AcknowledgementRejected,

    /// The handshake completed for this peer.
    Authenticated {
        peer: heapless::String<17>,
        username_prefix: heapless::String<8>,
    },

    /// A command frame was parsed and answered. `token_valid` is `None`
    /// for the bare `STOP` fast path, which carries no token.
    Command {
        name: String,
        token_valid: Option<bool>,
    },

    /// A frame was dropped without producing a command.
    FrameDropped(Error),

    /// A `SET` program was accepted.
    ProgramUpdated,

    /// A `SET` program was rejected; names the offending field.
    ProgramRejected(&'static str),

    /// The stepper run flag changed.
    RunChanged { run: bool, current_step: i16 },

    /// A reset request was recognised.
    StepperReset { counter: i16 },
}

/// First eight characters of `s`, for log-safe identifiers.
pub fn short(s: &str) -> heapless::String<8> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
