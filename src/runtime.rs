//! Device runtime.
//!
//! One `edge_executor::LocalExecutor` on the calling thread runs every
//! task of the device:
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  LocalExecutor                                           │
//!  │   writer_task × 4 (set-step/count/run/reset)  ─┐         │
//!  │   control_loop                                 ├─ device │
//!  │   SessionOrchestrator::run (main future)       ┘ lifetime│
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The stepper tasks live as long as the device. Per-connection work
//! (handshake, command channel) lives inside the orchestrator and is
//! dropped on disconnect.

use log::info;

use crate::app::SessionOrchestrator;
use crate::app::ports::{CredentialStore, EventSink, SystemPort};
use crate::command::ProgramStore;
use crate::config::DeviceConfig;
use crate::error::GattError;
use crate::gatt::{GattBackend, GattServer};
use crate::stepper::tasks::{control_loop, writer_task};
use crate::stepper::{Setting, StepperController};

/// Run the device until advertising fails for good.
pub fn run<B, C, E, S>(
    server: &GattServer<B>,
    store: &C,
    events: &E,
    system: &S,
    config: &DeviceConfig,
) -> Result<(), GattError>
where
    B: GattBackend,
    C: CredentialStore,
    E: EventSink,
    S: SystemPort,
{
    let stepper = StepperController::new(server, events, config);
    let programs = ProgramStore::default();
    let orchestrator =
        SessionOrchestrator::new(&stepper, &programs, store, events, system, config);

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

    for setting in Setting::ALL {
        executor
            .spawn(writer_task(&stepper, setting, config.writer_yield_ms))
            .detach();
    }
    executor
        .spawn(control_loop(&stepper, config.control_tick_ms))
        .detach();

    info!(
        "RT | started ({} writers, tick={} ms)",
        Setting::ALL.len(),
        config.control_tick_ms
    );

    futures_lite::future::block_on(executor.run(orchestrator.run()))
}
