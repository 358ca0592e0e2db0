//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured session events to the
//! ESP-IDF logger (UART / USB-CDC in production). One line per event,
//! `TAG | key=value`.

use log::{info, warn};

use crate::app::events::SessionEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`SessionEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Advertising => info!("CONN | advertising"),
            SessionEvent::Connected { peer } => info!("CONN | connected peer={peer}"),
            SessionEvent::Disconnected { peer } => info!("CONN | disconnected peer={peer}"),
            SessionEvent::CredentialsRejected => warn!("AUTH | credentials rejected"),
            SessionEvent::TokenIssued { prefix } => info!("AUTH | token issued token={prefix}…"),
            SessionEvent::AcknowledgementRejected => {
                warn!("AUTH | acknowledgement rejected");
            }
            SessionEvent::Authenticated {
                peer,
                username_prefix,
            } => info!("AUTH | authenticated peer={peer} user={username_prefix}…"),
            SessionEvent::Command { name, token_valid } => match token_valid {
                Some(true) => info!("CMD | name={name} token=valid"),
                Some(false) => warn!("CMD | name={name} token=invalid"),
                None => info!("CMD | name={name} token=none"),
            },
            SessionEvent::FrameDropped(e) => warn!("FRAME | dropped reason=\"{e}\""),
            SessionEvent::ProgramUpdated => info!("CMD | program updated"),
            SessionEvent::ProgramRejected(field) => {
                warn!("CMD | program rejected field={field}");
            }
            SessionEvent::RunChanged { run, current_step } => {
                info!("STEP | run={} current_step={current_step}", u8::from(*run));
            }
            SessionEvent::StepperReset { counter } => info!("STEP | reset counter={counter}"),
        }
    }
}
