//! Stepper controller.
//!
//! ```text
//!  set-step ─┐
//!  set-count ┤  writer tasks    ┌──────────────┐   get-state/step/count/run
//!  set-run ──┼────────────────▶ │ StepperState │ ─────────────────────────▶ notify
//!  set-reset ┘                  └──────────────┘
//!  control loop (tick) ────────────────▲
//! ```
//!
//! Every read-modify-write of [`StepperState`] happens inside one
//! critical section; publication happens after the lock is released so a
//! slow notification never holds it.
//!
//! The controller is bound to the device, not the peer: its tasks keep
//! running across connections.

pub mod state;
pub mod tasks;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, warn};

pub use state::{StepperState, Tick};

use crate::app::events::SessionEvent;
use crate::app::ports::EventSink;
use crate::config::DeviceConfig;
use crate::error::GattError;
use crate::gatt::codec::{decode_i16, encode_i16};
use crate::gatt::{Characteristic, GattBackend, GattServer, StepperService};

/// The four settable characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Step,
    Count,
    Run,
    Reset,
}

impl Setting {
    pub const ALL: [Self; 4] = [Self::Step, Self::Count, Self::Run, Self::Reset];

    pub fn characteristic(self, svc: &StepperService) -> &Characteristic {
        match self {
            Self::Step => &svc.set_step,
            Self::Count => &svc.set_count,
            Self::Run => &svc.set_run,
            Self::Reset => &svc.set_reset,
        }
    }
}

pub struct StepperController<'a, B, E> {
    server: &'a GattServer<B>,
    events: &'a E,
    boot: StepperState,
    state: BlockingMutex<CriticalSectionRawMutex, RefCell<StepperState>>,
}

impl<'a, B, E> StepperController<'a, B, E>
where
    B: GattBackend,
    E: EventSink,
{
    pub fn new(server: &'a GattServer<B>, events: &'a E, config: &DeviceConfig) -> Self {
        let boot = StepperState::new(
            config.initial_state,
            config.initial_step,
            config.initial_count,
        );
        Self {
            server,
            events,
            boot,
            state: BlockingMutex::new(RefCell::new(boot)),
        }
    }

    pub fn server(&self) -> &'a GattServer<B> {
        self.server
    }

    pub fn snapshot(&self) -> StepperState {
        self.state.lock(|s| *s.borrow())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut StepperState) -> R) -> R {
        self.state.lock(|s| f(&mut s.borrow_mut()))
    }

    fn publish_i16(&self, ch: &Characteristic, v: i16) {
        self.server.publish(ch, &encode_i16(v));
    }

    pub fn set_step(&self, v: i16) {
        self.with_state(|s| s.set_step(v));
        self.publish_i16(&self.server.stepper.get_step, v);
    }

    pub fn set_count(&self, v: i16) {
        self.with_state(|s| s.set_count(v));
        self.publish_i16(&self.server.stepper.get_count, v);
    }

    /// Any non-zero value requests a start.
    pub fn set_run(&self, v: i16) {
        let requested = v != 0;
        let (changed, current_step) = self.with_state(|s| (s.set_run(requested), s.current_step));
        if !changed {
            debug!("STEP | run={} unchanged", u8::from(requested));
            return;
        }
        self.publish_i16(&self.server.stepper.get_run, i16::from(requested));
        self.events.emit(&SessionEvent::RunChanged {
            run: requested,
            current_step,
        });
    }

    pub fn set_reset(&self, v: i16) {
        let recognised = self.with_state(|s| s.set_reset(v).then_some(s.reset_counter));
        match recognised {
            Some(counter) => self.events.emit(&SessionEvent::StepperReset { counter }),
            None => debug!("STEP | stale reset {v} ignored"),
        }
    }

    /// Reinstall the boot state and the stepper characteristics' boot
    /// values, dropping any writes still queued. Stops a running cycle.
    pub fn restore_boot(&self) {
        let was_running = self.with_state(|s| core::mem::replace(s, self.boot).run);
        for ch in self.server.stepper.all() {
            ch.restore();
        }
        if was_running {
            self.events.emit(&SessionEvent::RunChanged {
                run: false,
                current_step: self.boot.current_step,
            });
        }
        debug!("STEP | restored boot state");
    }

    /// Decode a characteristic write and apply it.
    pub fn apply_write(&self, setting: Setting, payload: &[u8]) -> Result<(), GattError> {
        let Some(v) = decode_i16(payload) else {
            let uuid = setting.characteristic(&self.server.stepper).uuid();
            return Err(GattError::InvalidLength(uuid));
        };
        match setting {
            Setting::Step => self.set_step(v),
            Setting::Count => self.set_count(v),
            Setting::Run => self.set_run(v),
            Setting::Reset => self.set_reset(v),
        }
        Ok(())
    }

    /// One control-loop period.
    pub fn tick(&self) -> Tick {
        let (tick, current_step) = self.with_state(|s| (s.tick(), s.current_step));
        match tick {
            Tick::Idle => {}
            Tick::Stepped { emitted, finished } => {
                self.publish_i16(&self.server.stepper.get_state, emitted);
                if finished {
                    self.publish_run_stopped(current_step);
                }
            }
            Tick::Halted => {
                warn!("STEP | run set on exhausted cycle, halting");
                self.publish_run_stopped(current_step);
            }
        }
        tick
    }

    fn publish_run_stopped(&self, current_step: i16) {
        self.publish_i16(&self.server.stepper.get_run, 0);
        self.events.emit(&SessionEvent::RunChanged {
            run: false,
            current_step,
        });
    }
}
