//! Token-gated command channel for one authenticated connection.
//!
//! Runs until the connection future is dropped. A bad frame never ends
//! the channel: it is logged and the next frame is awaited.

use log::{debug, info, warn};

use super::frame::LineFramer;
use super::parse::{Command, Request, STOP_LITERAL, parse_frame};
use super::program::ProgramStore;
use crate::app::events::SessionEvent;
use crate::app::ports::EventSink;
use crate::app::session::DeviceSession;
use crate::config::{DeviceConfig, ResponseNotify, TokenPolicy};
use crate::error::{CommandError, Error};
use crate::gatt::{GattBackend, GattServer};
use crate::stepper::StepperController;

/// Answer sent under [`TokenPolicy::Strict`] for a mismatching token.
pub const INVALID_TOKEN: &str = "INVALID_TOKEN";

pub struct CommandChannel<'a, 's, B, E> {
    server: &'a GattServer<B>,
    stepper: &'a StepperController<'s, B, E>,
    programs: &'a ProgramStore,
    events: &'a E,
    config: &'a DeviceConfig,
    session: &'a DeviceSession,
    framer: LineFramer,
}

impl<'a, 's, B, E> CommandChannel<'a, 's, B, E>
where
    B: GattBackend,
    E: EventSink,
{
    pub fn new(
        stepper: &'a StepperController<'s, B, E>,
        programs: &'a ProgramStore,
        events: &'a E,
        config: &'a DeviceConfig,
        session: &'a DeviceSession,
    ) -> Self {
        Self {
            server: stepper.server(),
            stepper,
            programs,
            events,
            config,
            session,
            framer: LineFramer::new(config.max_frame_len),
        }
    }

    /// Consume command writes forever.
    pub async fn run(&mut self) {
        loop {
            let chunk = self.server.run.command.written().await;
            self.push_chunk(&chunk);
        }
    }

    /// Feed one characteristic write and handle every frame it completes.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.framer.push(chunk);
        while let Some(frame) = self.framer.next_frame() {
            match frame {
                Ok(text) => self.handle_frame(&text),
                Err(e) => self.drop_frame(e.into()),
            }
        }
    }

    pub fn handle_frame(&self, payload: &str) {
        debug!("CMD | frame {} bytes", payload.len());
        match parse_frame(payload) {
            Ok(Request::Stop) => {
                self.stepper.set_run(0);
                self.send_response(STOP_LITERAL);
                self.events.emit(&SessionEvent::Command {
                    name: STOP_LITERAL.into(),
                    token_valid: None,
                });
            }
            Ok(Request::Command(cmd)) => self.dispatch(&cmd),
            Err(e) => self.drop_frame(e.into()),
        }
    }

    fn dispatch(&self, cmd: &Command) {
        let valid = self.session.authorizes(&cmd.token);

        // Stopping is never gated.
        if cmd.name == STOP_LITERAL {
            self.stepper.set_run(0);
        }

        if valid {
            match cmd.name.as_str() {
                "RUN" => self.stepper.set_run(1),
                "SET" => self.apply_program(cmd),
                STOP_LITERAL => {}
                other => debug!("CMD | no action for {other}"),
            }
        } else {
            warn!(
                "CMD | invalid token for {} (claimed {} chars)",
                cmd.name,
                cmd.token.len()
            );
        }

        self.events.emit(&SessionEvent::Command {
            name: cmd.name.clone(),
            token_valid: Some(valid),
        });

        match (valid, self.config.token_policy) {
            (true, _) | (false, TokenPolicy::Lenient) => self.send_response(&cmd.name),
            (false, TokenPolicy::Strict) => self.send_response(INVALID_TOKEN),
        }
    }

    fn apply_program(&self, cmd: &Command) {
        match self.programs.update(&cmd.info) {
            Ok(p) => {
                info!(
                    "CMD | program {:?} {} Hz {} us on {} off {} x{} min",
                    p.stimulation_type,
                    p.frequency_hz,
                    p.pulse_width_us,
                    p.on_time_ds,
                    p.off_time_ds,
                    p.duration_min
                );
                self.events.emit(&SessionEvent::ProgramUpdated);
            }
            Err(CommandError::InvalidProgram(field)) => {
                self.events.emit(&SessionEvent::ProgramRejected(field));
            }
            Err(e) => self.drop_frame(e.into()),
        }
    }

    /// Write the response text and notify the configured characteristic.
    pub fn send_response(&self, text: &str) {
        let run = &self.server.run;
        match self.config.response_notify {
            ResponseNotify::TokenCharacteristic => {
                run.response.set_value(text.as_bytes());
                self.server.notify(&self.server.auth.token);
            }
            ResponseNotify::ResponseCharacteristic => {
                self.server.publish(&run.response, text.as_bytes());
            }
        }
    }

    fn drop_frame(&self, e: Error) {
        warn!("CMD | frame dropped: {e}");
        self.events.emit(&SessionEvent::FrameDropped(e));
    }
}
