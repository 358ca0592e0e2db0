//! Device configuration parameters
//!
//! All tunable parameters for the stimulator firmware. The defaults match
//! the shipped mobile application; the compatibility switches exist so a
//! stricter client can opt out of the legacy protocol quirks.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What the device does with a command whose token does not match the
/// authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenPolicy {
    /// Log the mismatch and still echo the command name.
    Lenient,
    /// Answer `INVALID_TOKEN` and drop the command.
    Strict,
}

/// Which characteristic is notified after a command response is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseNotify {
    /// Notify the auth token characteristic (what deployed clients expect).
    TokenCharacteristic,
    /// Notify the run response characteristic itself.
    ResponseCharacteristic,
}

/// What happens once the connected peer goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectPolicy {
    /// Tear down the connection tasks and advertise again.
    Readvertise,
    /// Restart the whole device.
    SoftReset,
}

/// Core device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Advertising ---
    /// Local name broadcast while advertising.
    pub device_name: heapless::String<29>,
    /// GAP appearance code.
    pub appearance: u16,
    /// Advertising interval in microseconds.
    pub adv_interval_us: u32,

    // --- Stepper boot values ---
    pub initial_state: i16,
    pub initial_step: i16,
    pub initial_count: i16,

    // --- Timing ---
    /// Control loop period (milliseconds).
    pub control_tick_ms: u32,
    /// Pause after each applied stepper write (milliseconds).
    pub writer_yield_ms: u32,

    // --- Command channel ---
    /// Upper bound on one reassembled command frame (bytes, newline excluded).
    pub max_frame_len: usize,
    pub token_policy: TokenPolicy,
    pub response_notify: ResponseNotify,

    // --- Lifecycle ---
    pub disconnect_policy: DisconnectPolicy,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("Febina EMS 10004");

        Self {
            device_name,
            appearance: 960,          // 0x03C0 generic HID
            adv_interval_us: 100_000, // 100 ms

            initial_state: 0,
            initial_step: 1,
            initial_count: 10,

            control_tick_ms: 100,
            writer_yield_ms: 1000,

            max_frame_len: 1024,
            token_policy: TokenPolicy::Lenient,
            response_notify: ResponseNotify::TokenCharacteristic,

            disconnect_policy: DisconnectPolicy::Readvertise,
        }
    }
}

impl DeviceConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_name is empty"));
        }
        // BLE allows 20 ms .. 10.24 s.
        if !(20_000..=10_240_000).contains(&self.adv_interval_us) {
            return Err(ConfigError::ValidationFailed(
                "adv_interval_us outside 20 ms..10.24 s",
            ));
        }
        if self.control_tick_ms == 0 {
            return Err(ConfigError::ValidationFailed("control_tick_ms is zero"));
        }
        if self.initial_count < 0 {
            return Err(ConfigError::ValidationFailed("initial_count is negative"));
        }
        // A JSON command with a 64-char token does not fit in less.
        if self.max_frame_len < 128 {
            return Err(ConfigError::ValidationFailed("max_frame_len below 128"));
        }
        Ok(())
    }
}
