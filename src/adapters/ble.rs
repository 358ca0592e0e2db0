//! BLE host-stack adapter.
//!
//! Implements [`GattBackend`]: the boundary between the GATT server and
//! the radio.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via raw
//!   `esp_idf_svc::sys` bindings. Every characteristic is registered with
//!   app-managed responses so reads and writes route through
//!   [`GattServer::on_read`](crate::gatt::GattServer::on_read) /
//!   [`GattServer::on_write`](crate::gatt::GattServer::on_write).
//! - **all other targets**: [`SimBackend`], which records adverts and
//!   notifications for host-side tests.
//!
//! ## Advertising payload
//!
//! ```text
//! ADV:      flags │ appearance │ complete local name
//! SCAN_RSP: complete list of 16-bit service UUIDs
//! ```

use crate::gatt::{Advertisement, Connection, GattBackend};

#[cfg(not(target_os = "espidf"))]
use crate::error::GattError;

/// Legacy advertising PDU payload limit.
pub const ADV_PAYLOAD_MAX: usize = 31;

const AD_FLAGS: u8 = 0x01;
const AD_UUID16_COMPLETE: u8 = 0x03;
const AD_NAME_SHORT: u8 = 0x08;
const AD_NAME_COMPLETE: u8 = 0x09;
const AD_APPEARANCE: u8 = 0x19;

/// LE General Discoverable, BR/EDR not supported.
const FLAGS_GENERAL_DISC_LE_ONLY: u8 = 0x06;

pub type AdvPayload = heapless::Vec<u8, ADV_PAYLOAD_MAX>;

// ───────────────────────────────────────────────────────────────
// Payload encoding (shared by target and simulation)
// ───────────────────────────────────────────────────────────────

/// Advertising data: flags, appearance, then as much of the name as fits
/// (shortened-name AD type when truncated).
pub fn encode_adv_data(adv: &Advertisement<'_>) -> AdvPayload {
    let mut out = AdvPayload::new();
    let _ = out.extend_from_slice(&[2, AD_FLAGS, FLAGS_GENERAL_DISC_LE_ONLY]);
    let [lo, hi] = adv.appearance.to_le_bytes();
    let _ = out.extend_from_slice(&[3, AD_APPEARANCE, lo, hi]);

    let room = ADV_PAYLOAD_MAX - out.len() - 2;
    let name = adv.name.as_bytes();
    let (ad_type, name) = if name.len() > room {
        (AD_NAME_SHORT, &name[..room])
    } else {
        (AD_NAME_COMPLETE, name)
    };
    let _ = out.extend_from_slice(&[name.len() as u8 + 1, ad_type]);
    let _ = out.extend_from_slice(name);
    out
}

/// Scan response: the 16-bit service UUIDs, as many as fit.
pub fn encode_scan_response(adv: &Advertisement<'_>) -> AdvPayload {
    let mut out = AdvPayload::new();
    let fit = adv.services.len().min((ADV_PAYLOAD_MAX - 2) / 2);
    if fit == 0 {
        return out;
    }
    let _ = out.extend_from_slice(&[(fit * 2) as u8 + 1, AD_UUID16_COMPLETE]);
    for uuid in &adv.services[..fit] {
        let _ = out.extend_from_slice(&uuid.to_le_bytes());
    }
    out
}

/// Advertising interval in controller units of 0.625 ms.
pub fn adv_interval_units(interval_us: u32) -> u16 {
    (interval_us / 625).clamp(0x20, 0x4000) as u16
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF Bluedroid backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use espidf::BluedroidBackend;

#[cfg(target_os = "espidf")]
mod espidf {
    use core::sync::atomic::{AtomicU8, AtomicU16, AtomicU32, Ordering};
    use std::sync::{Mutex, OnceLock};

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::signal::Signal;
    use esp_idf_svc::sys::*;
    use log::{error, info, warn};

    use super::{Advertisement, Connection, GattBackend};
    use crate::gatt::GattServer;
    use super::{adv_interval_units, encode_adv_data, encode_scan_response};
    use crate::error::GattError;
    use crate::gatt::uuids::*;

    const CCCD_UUID: u16 = 0x2902;
    const HANDLES_PER_SERVICE: u16 = 24;

    /// Registration order: service, then its characteristics.
    const LAYOUT: [(u16, &[u16]); 4] = [
        (ENV_SERVICE, &[]),
        (
            AUTH_SERVICE,
            &[AUTH_USERNAME, AUTH_PASSWORD, AUTH_TOKEN, AUTH_RESPONSE],
        ),
        (RUN_SERVICE, &[RUN_COMMAND, RUN_RESPONSE]),
        (
            STEPPER_SERVICE,
            &[
                STEPPER_GET_STATE,
                STEPPER_GET_STEP,
                STEPPER_GET_COUNT,
                STEPPER_GET_RUN,
                STEPPER_SET_STEP,
                STEPPER_SET_COUNT,
                STEPPER_SET_RUN,
                STEPPER_SET_RESET,
            ],
        ),
    ];

    // ── Static state bridging Bluedroid callbacks ────────────────
    //
    // Bluedroid callbacks are C function pointers that cannot capture Rust
    // closures. These statics bridge the callback context to the server.

    static SERVER: OnceLock<&'static GattServer<BluedroidBackend>> = OnceLock::new();
    static GATTS_IF: AtomicU32 = AtomicU32::new(0);
    static SVC_INDEX: AtomicU32 = AtomicU32::new(0);
    static CHAR_INDEX: AtomicU32 = AtomicU32::new(0);
    static SVC_HANDLE: AtomicU16 = AtomicU16::new(0);
    static ADV_INTERVAL: AtomicU16 = AtomicU16::new(0xA0);
    /// Bit 0: adv data set, bit 1: scan response set.
    static ADV_PENDING: AtomicU8 = AtomicU8::new(0);
    /// Attribute handle → characteristic UUID.
    static HANDLES: Mutex<heapless::Vec<(u16, u16), 16>> = Mutex::new(heapless::Vec::new());
    static REGISTERED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

    fn uuid16(uuid: u16) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 2;
        t.uuid.uuid16 = uuid;
        t
    }

    fn uuid_for_handle(handle: u16) -> Option<u16> {
        HANDLES
            .lock()
            .ok()?
            .iter()
            .find_map(|&(h, u)| (h == handle).then_some(u))
    }

    fn handle_for_uuid(uuid: u16) -> Option<u16> {
        HANDLES
            .lock()
            .ok()?
            .iter()
            .find_map(|&(h, u)| (u == uuid).then_some(h))
    }

    fn gatt_status(e: GattError) -> esp_gatt_status_t {
        match e {
            GattError::WriteNotPermitted(_) => esp_gatt_status_t_ESP_GATT_WRITE_NOT_PERMIT,
            GattError::ReadNotPermitted(_) => esp_gatt_status_t_ESP_GATT_READ_NOT_PERMIT,
            GattError::InvalidLength(_) => esp_gatt_status_t_ESP_GATT_INVALID_ATTR_LEN,
            GattError::UnknownAttribute(_) => esp_gatt_status_t_ESP_GATT_INVALID_HANDLE,
            _ => esp_gatt_status_t_ESP_GATT_ERROR,
        }
    }

    /// Bluedroid GATT backend. Stateless; the callback statics above hold
    /// the stack's view.
    pub struct BluedroidBackend;

    impl BluedroidBackend {
        pub fn new() -> Self {
            Self
        }

        /// Bring up the controller and Bluedroid, register the attribute
        /// table for `server`, and block until registration completes.
        pub fn start(server: &'static GattServer<Self>) -> Result<(), GattError> {
            if SERVER.set(server).is_err() {
                warn!("BLE: backend already started");
                return Ok(());
            }

            unsafe {
                // BLE-only mode releases the classic BT memory.
                esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

                let mut bt_cfg = esp_bt_controller_config_t::default();

                let ret = esp_bt_controller_init(&mut bt_cfg);
                if ret != ESP_OK as i32 {
                    error!("BLE: bt_controller_init failed ({ret})");
                    return Err(GattError::AdvertisingFailed);
                }
                let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
                if ret != ESP_OK as i32 {
                    error!("BLE: bt_controller_enable failed ({ret})");
                    return Err(GattError::AdvertisingFailed);
                }
                let ret = esp_bluedroid_init();
                if ret != ESP_OK as i32 {
                    error!("BLE: bluedroid_init failed ({ret})");
                    return Err(GattError::AdvertisingFailed);
                }
                let ret = esp_bluedroid_enable();
                if ret != ESP_OK as i32 {
                    error!("BLE: bluedroid_enable failed ({ret})");
                    return Err(GattError::AdvertisingFailed);
                }

                esp_ble_gap_register_callback(Some(gap_event_handler));
                esp_ble_gatts_register_callback(Some(gatts_event_handler));
                esp_ble_gatts_app_register(0);
            }

            futures_lite::future::block_on(REGISTERED.wait());
            info!("BLE: attribute table registered");
            Ok(())
        }
    }

    impl Default for BluedroidBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    impl GattBackend for BluedroidBackend {
        fn start_advertising(&self, adv: &Advertisement<'_>) -> Result<(), GattError> {
            let mut data = encode_adv_data(adv);
            let mut scan = encode_scan_response(adv);
            ADV_INTERVAL.store(adv_interval_units(adv.interval_us), Ordering::Relaxed);
            ADV_PENDING.store(0b11, Ordering::Release);

            unsafe {
                let name = std::ffi::CString::new(adv.name).map_err(|_| GattError::AdvertisingFailed)?;
                esp_ble_gap_set_device_name(name.as_ptr());
                if esp_ble_gap_config_adv_data_raw(data.as_mut_ptr(), data.len() as u32) != ESP_OK as i32
                    || esp_ble_gap_config_scan_rsp_data_raw(scan.as_mut_ptr(), scan.len() as u32)
                        != ESP_OK as i32
                {
                    return Err(GattError::AdvertisingFailed);
                }
            }
            Ok(())
        }

        fn notify(&self, conn: Connection, uuid: u16, data: &[u8]) -> Result<(), GattError> {
            let handle = handle_for_uuid(uuid).ok_or(GattError::UnknownAttribute(uuid))?;
            let mut buf = data.to_vec();
            let ret = unsafe {
                esp_ble_gatts_send_indicate(
                    GATTS_IF.load(Ordering::Relaxed) as esp_gatt_if_t,
                    conn.handle,
                    handle,
                    buf.len() as u16,
                    buf.as_mut_ptr(),
                    false,
                )
            };
            if ret == ESP_OK as i32 {
                Ok(())
            } else {
                Err(GattError::NotifyFailed)
            }
        }
    }

    // ── Registration chain ───────────────────────────────────────
    //
    // REG → create service 0 → CREATE → start it, add first char →
    // ADD_CHAR → add CCCD (notify chars) → ADD_CHAR_DESCR → next char …
    // → last char of a service → create next service → … → REGISTERED.

    unsafe fn create_service(gatts_if: esp_gatt_if_t, index: usize) {
        let (uuid, _) = LAYOUT[index];
        let mut svc_id = esp_gatt_srvc_id_t {
            id: esp_gatt_id_t {
                uuid: uuid16(uuid),
                inst_id: 0,
            },
            is_primary: true,
        };
        unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, HANDLES_PER_SERVICE) };
    }

    /// Add the next characteristic of the current service, or move on to
    /// the next service.
    unsafe fn advance(gatts_if: esp_gatt_if_t) {
        let svc = SVC_INDEX.load(Ordering::Relaxed) as usize;
        let chr = CHAR_INDEX.load(Ordering::Relaxed) as usize;
        let (_, chars) = LAYOUT[svc];

        if let Some(&uuid) = chars.get(chr) {
            let Some(server) = SERVER.get() else { return };
            let Some(ch) = server.find(uuid) else { return };
            let props = ch.properties();

            let mut perm: u32 = 0;
            let mut prop: u32 = 0;
            if props.read {
                perm |= ESP_GATT_PERM_READ;
                prop |= ESP_GATT_CHAR_PROP_BIT_READ;
            }
            if props.write {
                perm |= ESP_GATT_PERM_WRITE;
                prop |= ESP_GATT_CHAR_PROP_BIT_WRITE;
            }
            if props.notify {
                prop |= ESP_GATT_CHAR_PROP_BIT_NOTIFY;
            }

            let mut char_uuid = uuid16(uuid);
            let mut control = esp_attr_control_t {
                auto_rsp: ESP_GATT_RSP_BY_APP as u8,
            };
            unsafe {
                esp_ble_gatts_add_char(
                    SVC_HANDLE.load(Ordering::Relaxed),
                    &mut char_uuid,
                    perm as esp_gatt_perm_t,
                    prop as esp_gatt_char_prop_t,
                    core::ptr::null_mut(),
                    &mut control,
                );
            }
            return;
        }

        if svc + 1 < LAYOUT.len() {
            SVC_INDEX.store((svc + 1) as u32, Ordering::Relaxed);
            CHAR_INDEX.store(0, Ordering::Relaxed);
            unsafe { create_service(gatts_if, svc + 1) };
        } else {
            REGISTERED.signal(());
        }
    }

    unsafe fn add_cccd() {
        let mut descr_uuid = uuid16(CCCD_UUID);
        let mut control = esp_attr_control_t {
            auto_rsp: ESP_GATT_AUTO_RSP as u8,
        };
        unsafe {
            esp_ble_gatts_add_char_descr(
                SVC_HANDLE.load(Ordering::Relaxed),
                &mut descr_uuid,
                (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                core::ptr::null_mut(),
                &mut control,
            );
        }
    }

    unsafe fn respond(
        gatts_if: esp_gatt_if_t,
        conn_id: u16,
        trans_id: u32,
        status: esp_gatt_status_t,
        handle: u16,
        value: &[u8],
    ) {
        let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
        unsafe {
            let attr = &mut rsp.attr_value;
            let len = value.len().min(attr.value.len());
            attr.value[..len].copy_from_slice(&value[..len]);
            attr.len = len as u16;
            attr.handle = handle;
            esp_ble_gatts_send_response(gatts_if, conn_id, trans_id, status, &mut rsp);
        }
    }

    // ── Callbacks ────────────────────────────────────────────────

    unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        _param: *mut esp_ble_gap_cb_param_t,
    ) {
        let bit = match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_RAW_SET_COMPLETE_EVT => 0b01,
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_RAW_SET_COMPLETE_EVT => 0b10,
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                log::info!("BLE GAP: advertising started");
                return;
            }
            _ => return,
        };

        let prev = ADV_PENDING.fetch_and(!bit, Ordering::AcqRel);
        if prev & !bit != 0 || prev == 0 {
            return;
        }

        let interval = ADV_INTERVAL.load(Ordering::Relaxed);
        let mut params = esp_ble_adv_params_t {
            adv_int_min: interval,
            adv_int_max: interval,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        };
        unsafe { esp_ble_gap_start_advertising(&mut params) };
    }

    unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        let Some(server) = SERVER.get() else { return };

        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                GATTS_IF.store(u32::from(gatts_if), Ordering::Relaxed);
                log::info!("BLE GATTS: app registered (if={gatts_if})");
                SVC_INDEX.store(0, Ordering::Relaxed);
                CHAR_INDEX.store(0, Ordering::Relaxed);
                unsafe { create_service(gatts_if, 0) };
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let p = unsafe { &(*param).create };
                SVC_HANDLE.store(p.service_handle, Ordering::Relaxed);
                unsafe {
                    esp_ble_gatts_start_service(p.service_handle);
                    advance(gatts_if);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let p = unsafe { &(*param).add_char };
                let uuid = unsafe { p.char_uuid.uuid.uuid16 };
                if let Ok(mut handles) = HANDLES.lock() {
                    let _ = handles.push((p.attr_handle, uuid));
                }
                log::info!("BLE GATTS: char 0x{uuid:04x} (handle={})", p.attr_handle);

                if server.find(uuid).is_some_and(|c| c.properties().notify) {
                    unsafe { add_cccd() };
                } else {
                    CHAR_INDEX.fetch_add(1, Ordering::Relaxed);
                    unsafe { advance(gatts_if) };
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
                CHAR_INDEX.fetch_add(1, Ordering::Relaxed);
                unsafe { advance(gatts_if) };
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = unsafe { &(*param).connect };
                server.on_connect(Connection {
                    handle: p.conn_id,
                    peer: p.remote_bda,
                });
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                let p = unsafe { &(*param).disconnect };
                log::info!("BLE GATTS: disconnected (reason=0x{:x})", p.reason);
                server.on_disconnect(p.conn_id);
            }
            esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                let p = unsafe { &(*param).read };
                if !p.need_rsp {
                    return;
                }
                let (status, value) = match uuid_for_handle(p.handle) {
                    Some(uuid) => match server.on_read(uuid) {
                        Ok(v) => (esp_gatt_status_t_ESP_GATT_OK, v),
                        Err(e) => (gatt_status(e), Vec::new()),
                    },
                    None => (esp_gatt_status_t_ESP_GATT_INVALID_HANDLE, Vec::new()),
                };
                let offset = usize::from(p.offset).min(value.len());
                unsafe {
                    respond(gatts_if, p.conn_id, p.trans_id, status, p.handle, &value[offset..]);
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = unsafe { &(*param).write };
                // CCCD writes are answered by the stack.
                let Some(uuid) = uuid_for_handle(p.handle) else { return };
                let status = if p.is_prep {
                    esp_gatt_status_t_ESP_GATT_REQ_NOT_SUPPORTED
                } else {
                    let data = unsafe { core::slice::from_raw_parts(p.value, usize::from(p.len)) };
                    match server.on_write(uuid, data) {
                        Ok(()) => esp_gatt_status_t_ESP_GATT_OK,
                        Err(e) => {
                            log::warn!("BLE GATTS: write rejected: {e}");
                            gatt_status(e)
                        }
                    }
                };
                if p.need_rsp {
                    unsafe { respond(gatts_if, p.conn_id, p.trans_id, status, p.handle, &[]) };
                }
            }
            _ => {}
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

/// A notification as the simulated radio saw it.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub conn: Connection,
    pub uuid: u16,
    pub data: Vec<u8>,
}

/// Host-side backend recording everything the server asks of the radio.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimBackend {
    adverts: std::sync::Mutex<Vec<(AdvPayload, AdvPayload)>>,
    notifications: std::sync::Mutex<Vec<SentNotification>>,
}

#[cfg(not(target_os = "espidf"))]
impl SimBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(adv data, scan response)` pair advertised so far.
    pub fn adverts(&self) -> Vec<(AdvPayload, AdvPayload)> {
        self.adverts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn notifications(&self) -> Vec<SentNotification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Payloads notified on one characteristic, oldest first.
    pub fn notifications_for(&self, uuid: u16) -> Vec<Vec<u8>> {
        self.notifications()
            .into_iter()
            .filter(|n| n.uuid == uuid)
            .map(|n| n.data)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut n) = self.notifications.lock() {
            n.clear();
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl GattBackend for SimBackend {
    fn start_advertising(&self, adv: &Advertisement<'_>) -> Result<(), GattError> {
        log::info!("BLE(sim): advertising '{}'", adv.name);
        self.adverts
            .lock()
            .map_err(|_| GattError::AdvertisingFailed)?
            .push((encode_adv_data(adv), encode_scan_response(adv)));
        Ok(())
    }

    fn notify(&self, conn: Connection, uuid: u16, data: &[u8]) -> Result<(), GattError> {
        self.notifications
            .lock()
            .map_err(|_| GattError::NotifyFailed)?
            .push(SentNotification {
                conn,
                uuid,
                data: data.to_vec(),
            });
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
