//! Platform lifecycle adapter.

use log::warn;

use crate::app::ports::SystemPort;

pub struct PlatformSystem;

impl PlatformSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlatformSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPort for PlatformSystem {
    #[cfg(target_os = "espidf")]
    fn soft_reset(&self) -> bool {
        warn!("SYS | restarting");
        esp_idf_hal::reset::restart()
    }

    /// Simulation: no reset primitive.
    #[cfg(not(target_os = "espidf"))]
    fn soft_reset(&self) -> bool {
        warn!("SYS | soft reset requested (sim, ignored)");
        false
    }
}
