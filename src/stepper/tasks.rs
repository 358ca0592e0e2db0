//! The five device-lifetime stepper tasks: one writer per settable
//! characteristic plus the control loop.

use core::time::Duration;

use async_io_mini::Timer;
use log::warn;

use super::{Setting, StepperController};
use crate::app::ports::EventSink;
use crate::gatt::GattBackend;

/// Await writes on one set characteristic and apply them, pausing
/// `yield_ms` after each so a burst of writes cannot starve the loop.
pub async fn writer_task<B, E>(ctrl: &StepperController<'_, B, E>, setting: Setting, yield_ms: u32)
where
    B: GattBackend,
    E: EventSink,
{
    let ch = setting.characteristic(&ctrl.server().stepper);
    loop {
        let payload = ch.written().await;
        if let Err(e) = ctrl.apply_write(setting, &payload) {
            warn!("STEP | {setting:?} write ignored: {e}");
        }
        Timer::after(Duration::from_millis(u64::from(yield_ms))).await;
    }
}

/// Tick the controller every `period_ms`.
pub async fn control_loop<B, E>(ctrl: &StepperController<'_, B, E>, period_ms: u32)
where
    B: GattBackend,
    E: EventSink,
{
    loop {
        ctrl.tick();
        Timer::after(Duration::from_millis(u64::from(period_ms))).await;
    }
}
