//! Febina EMS stimulator firmware library.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod auth;
pub mod command;
pub mod config;
pub mod error;
pub mod gatt;
pub mod runtime;
pub mod stepper;

mod esp_link_shims;
