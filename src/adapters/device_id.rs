//! Device identity derived from the ESP32 Bluetooth MAC address.
//!
//! The public BLE address is what a central sees and what the session
//! records as `peer_address` on the other side, so it is logged at boot in
//! the same `aa:bb:cc:dd:ee:ff` form.

use crate::gatt::codec::format_mac;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the Bluetooth MAC derived from the factory eFuse MAC.
#[cfg(target_os = "espidf")]
pub fn read_bt_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_read_mac(
            mac.as_mut_ptr(),
            esp_idf_svc::sys::esp_mac_type_t_ESP_MAC_BT,
        );
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_bt_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// The BLE address as peers print it.
pub fn ble_address(mac: &MacAddress) -> heapless::String<17> {
    format_mac(mac)
}
