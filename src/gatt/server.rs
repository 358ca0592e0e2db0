//! GATT server: characteristic routing, link tracking, notifications.
//!
//! ```text
//!   host stack ──on_write/on_read──▶ GattServer ──written()──▶ tasks
//!   tasks ──publish()──▶ GattServer ──GattBackend::notify──▶ host stack
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, warn};

use super::characteristic::Characteristic;
use super::codec::ZERO_SENTINEL;
use super::services::{AuthService, RunService, StepperService};
use super::uuids;
use crate::config::DeviceConfig;
use crate::error::GattError;

/// The single active link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub handle: u16,
    pub peer: [u8; 6],
}

/// Advertising payload.
#[derive(Debug, Clone, Copy)]
pub struct Advertisement<'a> {
    pub name: &'a str,
    pub appearance: u16,
    pub interval_us: u32,
    pub services: &'a [u16],
}

impl<'a> Advertisement<'a> {
    pub fn from_config(config: &'a DeviceConfig) -> Self {
        Self {
            name: config.device_name.as_str(),
            appearance: config.appearance,
            interval_us: config.adv_interval_us,
            services: &[uuids::ENV_SERVICE, uuids::AUTH_SERVICE],
        }
    }
}

/// What the server needs from the BLE host stack.
pub trait GattBackend {
    /// Begin (or resume) connectable advertising.
    fn start_advertising(&self, adv: &Advertisement<'_>) -> Result<(), GattError>;

    /// Push `data` for characteristic `uuid` to the peer.
    fn notify(&self, conn: Connection, uuid: u16, data: &[u8]) -> Result<(), GattError>;
}

pub struct GattServer<B> {
    backend: B,
    pub auth: AuthService,
    pub run: RunService,
    pub stepper: StepperService,
    current: BlockingMutex<CriticalSectionRawMutex, Cell<Option<Connection>>>,
    connected: Signal<CriticalSectionRawMutex, Connection>,
    disconnected: Signal<CriticalSectionRawMutex, u16>,
}

impl<B: GattBackend> GattServer<B> {
    pub fn new(backend: B, config: &DeviceConfig) -> Self {
        Self {
            backend,
            auth: AuthService::new(),
            run: RunService::new(),
            stepper: StepperService::new(config),
            current: BlockingMutex::new(Cell::new(None)),
            connected: Signal::new(),
            disconnected: Signal::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Every registered characteristic, in registration order.
    pub fn characteristics(&self) -> impl Iterator<Item = &Characteristic> {
        self.auth
            .all()
            .into_iter()
            .chain(self.run.all())
            .chain(self.stepper.all())
    }

    pub fn find(&self, uuid: u16) -> Option<&Characteristic> {
        self.characteristics().find(|c| c.uuid() == uuid)
    }

    // ── Host stack entry points ──────────────────────────────────

    pub fn on_connect(&self, conn: Connection) {
        self.current.lock(|c| c.set(Some(conn)));
        self.connected.signal(conn);
    }

    pub fn on_disconnect(&self, handle: u16) {
        self.current.lock(|c| {
            if c.get().is_some_and(|conn| conn.handle == handle) {
                c.set(None);
            }
        });
        self.disconnected.signal(handle);
    }

    pub fn on_write(&self, uuid: u16, data: &[u8]) -> Result<(), GattError> {
        self.find(uuid)
            .ok_or(GattError::UnknownAttribute(uuid))?
            .write(data)
    }

    pub fn on_read(&self, uuid: u16) -> Result<Vec<u8>, GattError> {
        self.find(uuid)
            .ok_or(GattError::UnknownAttribute(uuid))?
            .read()
    }

    // ── Link lifecycle ───────────────────────────────────────────

    pub fn connection(&self) -> Option<Connection> {
        self.current.lock(Cell::get)
    }

    /// Start advertising and suspend until a central connects.
    pub async fn advertise(&self, adv: &Advertisement<'_>) -> Result<Connection, GattError> {
        self.connected.reset();
        self.disconnected.reset();
        self.backend.start_advertising(adv)?;
        Ok(self.connected.wait().await)
    }

    /// Suspend until `conn` drops. Never times out.
    pub async fn wait_disconnected(&self, conn: Connection) {
        loop {
            if self.disconnected.wait().await == conn.handle {
                return;
            }
        }
    }

    // ── Value publication ────────────────────────────────────────

    /// Notify the current peer with the characteristic's value. Without a
    /// peer the value simply waits to be read.
    pub fn notify(&self, ch: &Characteristic) {
        if !ch.properties().notify {
            return;
        }
        let Some(conn) = self.connection() else {
            debug!("no peer, skipping notify on 0x{:04x}", ch.uuid());
            return;
        };
        if let Err(e) = self.backend.notify(conn, ch.uuid(), &ch.value()) {
            warn!("notify 0x{:04x} failed: {e}", ch.uuid());
        }
    }

    /// Set the value and notify.
    pub fn publish(&self, ch: &Characteristic, data: &[u8]) {
        ch.set_value(data);
        self.notify(ch);
    }

    /// Clear the four auth characteristics to the zero sentinel, notifying
    /// each, and drop any stale writes.
    pub fn reset_auth(&self) {
        for ch in self.auth.all() {
            self.publish(ch, &ZERO_SENTINEL);
            ch.discard_writes();
        }
    }

    /// Zero the auth characteristics and revoke peer reads on them.
    pub fn disable_auth(&self) {
        for ch in self.auth.all() {
            self.publish(ch, &ZERO_SENTINEL);
            ch.set_readable(false);
        }
    }

    /// Return connection-scoped characteristics to their boot state.
    pub fn restore_connection_state(&self) {
        for ch in self.auth.all().into_iter().chain(self.run.all()) {
            ch.restore();
        }
    }
}

impl<B> core::fmt::Debug for GattServer<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GattServer")
            .field("connection", &self.current.lock(Cell::get))
            .finish_non_exhaustive()
    }
}
