//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the mock BLE backend. All tests run on the host (x86_64) with
//! no radio required.

#![cfg(not(target_os = "espidf"))]

mod auth_tests;
mod command_tests;
mod mock_ble;
mod stepper_tests;
