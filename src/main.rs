//! Febina EMS firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BluedroidBackend   StaticCredentials   LogEventSink   System  │
//! │  (GattBackend)      (CredentialStore)   (EventSink)    (reset) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  GattServer · handshake · command channel · stepper    │    │
//! │  │  SessionOrchestrator (one connection at a time)        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  LocalExecutor: 4 stepper writers · control loop · sessions    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{error, info};

use febina::adapters::ble::BluedroidBackend;
use febina::adapters::credentials::StaticCredentials;
use febina::adapters::device_id;
use febina::adapters::log_sink::LogEventSink;
use febina::adapters::system::PlatformSystem;
use febina::config::DeviceConfig;
use febina::gatt::GattServer;
use febina::runtime;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Febina EMS v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = DeviceConfig::default();
    config.validate().context("device config")?;
    let credentials = StaticCredentials::from_build_env().context("credentials")?;

    // ── 3. GATT server + radio ────────────────────────────────
    // Bluedroid callbacks reach the server through a static, so it lives
    // for the rest of the program.
    let server: &'static GattServer<BluedroidBackend> =
        Box::leak(Box::new(GattServer::new(BluedroidBackend::new(), &config)));
    BluedroidBackend::start(server).context("BLE bring-up")?;

    let mac = device_id::read_bt_mac();
    info!("Device address: {}", device_id::ble_address(&mac));

    // ── 4. Run ────────────────────────────────────────────────
    let events = LogEventSink::new();
    let system = PlatformSystem::new();

    info!("System ready. Entering executor.");
    if let Err(e) = runtime::run(server, &credentials, &events, &system, &config) {
        error!("Runtime stopped: {e}");
        return Err(e.into());
    }
    Ok(())
}
