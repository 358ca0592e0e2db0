//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements       | Connects to                  |
//! |---------------|------------------|------------------------------|
//! | `ble`         | GattBackend      | Bluedroid GATT server / sim  |
//! | `credentials` | CredentialStore  | Build-time digests           |
//! | `device_id`   | -                | eFuse Bluetooth MAC          |
//! | `log_sink`    | EventSink        | Serial log output            |
//! | `system`      | SystemPort       | `esp_restart`                |

pub mod ble;
pub mod credentials;
pub mod device_id;
pub mod log_sink;
pub mod system;
