//! GATT layer.
//!
//! Characteristics, the three services, and the server the host stack
//! adapter drives. Nothing in here depends on ESP-IDF; the Bluedroid
//! binding lives in [`crate::adapters::ble`].

pub mod characteristic;
pub mod codec;
pub mod server;
pub mod services;
pub mod uuids;

pub use characteristic::{Characteristic, MAX_VALUE_LEN, Properties};
pub use server::{Advertisement, Connection, GattBackend, GattServer};
pub use services::{AuthService, RunService, StepperService};
