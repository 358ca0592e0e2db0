//! Mock BLE backend and peer helpers for integration tests.
//!
//! Records every advert and notification so tests can assert on exactly
//! what a central would have seen, and drives the server the way the
//! host stack does (`on_connect` / `on_write` / `on_disconnect`).

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use febina::adapters::credentials::StaticCredentials;
use febina::app::events::SessionEvent;
use febina::app::ports::{EventSink, SystemPort};
use febina::auth::{Authenticated, Token, sha256_hex};
use febina::config::DeviceConfig;
use febina::error::GattError;
use febina::gatt::{Advertisement, Connection, GattBackend, GattServer, uuids};
use futures_lite::future;

pub const USERNAME: &str = "febina";
pub const PASSWORD: &str = "correct horse";

pub const PEER: Connection = Connection {
    handle: 7,
    peer: [0xC0, 0xFF, 0xEE, 0x00, 0x11, 0x22],
};

// ── MockBackend ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notified {
    pub conn: Connection,
    pub uuid: u16,
    pub data: Vec<u8>,
}

#[derive(Default)]
pub struct MockBackend {
    adverts: Mutex<Vec<String>>,
    notifications: Mutex<Vec<Notified>>,
    pub fail_notify: AtomicBool,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advert_count(&self) -> usize {
        self.adverts.lock().unwrap().len()
    }

    pub fn advertised_names(&self) -> Vec<String> {
        self.adverts.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notified> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn notified(&self, uuid: u16) -> Vec<Vec<u8>> {
        self.notifications()
            .into_iter()
            .filter(|n| n.uuid == uuid)
            .map(|n| n.data)
            .collect()
    }

    /// The most recent 64-char value notified on the token characteristic.
    pub fn issued_token(&self) -> Option<String> {
        self.notified(uuids::AUTH_TOKEN)
            .into_iter()
            .rev()
            .find(|v| v.len() == 64)
            .and_then(|v| String::from_utf8(v).ok())
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl GattBackend for MockBackend {
    fn start_advertising(&self, adv: &Advertisement<'_>) -> Result<(), GattError> {
        self.adverts.lock().unwrap().push(adv.name.to_string());
        Ok(())
    }

    fn notify(&self, conn: Connection, uuid: u16, data: &[u8]) -> Result<(), GattError> {
        if self.fail_notify.load(Ordering::Relaxed) {
            return Err(GattError::NotifyFailed);
        }
        self.notifications.lock().unwrap().push(Notified {
            conn,
            uuid,
            data: data.to_vec(),
        });
        Ok(())
    }
}

// ── Ports ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SessionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Counts reset requests; never actually resets.
#[derive(Default)]
pub struct CountingSystem {
    pub resets: AtomicUsize,
}

impl SystemPort for CountingSystem {
    fn soft_reset(&self) -> bool {
        self.resets.fetch_add(1, Ordering::Relaxed);
        false
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub fn credentials() -> StaticCredentials {
    StaticCredentials::from_plaintext(USERNAME, PASSWORD)
}

pub fn server(config: &DeviceConfig) -> GattServer<MockBackend> {
    GattServer::new(MockBackend::new(), config)
}

#[allow(dead_code)]
pub fn authenticated(seed: u8) -> Authenticated {
    Authenticated {
        username_hash: sha256_hex(USERNAME.as_bytes()),
        password_hash: sha256_hex(PASSWORD.as_bytes()),
        token: Token::from_entropy(&[seed; 32]),
    }
}

// ── Cooperative scheduling helpers ───────────────────────────

/// Yield until `cond` holds. Panics if it never does.
pub async fn until(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        future::yield_now().await;
    }
    panic!("condition never became true");
}

/// Wall-clock variant of [`until`] for tests that run timer-driven tasks.
#[allow(dead_code)]
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..2_000 {
        if cond() {
            return;
        }
        async_io_mini::Timer::after(std::time::Duration::from_millis(1)).await;
    }
    panic!("condition not reached within 2 s");
}

/// Give every other future on the executor a few polls.
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..64 {
        future::yield_now().await;
    }
}

/// Play the peer side of a successful handshake; returns the token.
#[allow(dead_code)]
pub async fn log_in(server: &GattServer<MockBackend>) -> String {
    let before = server.backend().issued_token();
    server
        .on_write(uuids::AUTH_USERNAME, USERNAME.as_bytes())
        .unwrap();
    server
        .on_write(uuids::AUTH_PASSWORD, PASSWORD.as_bytes())
        .unwrap();
    until(|| {
        let t = server.backend().issued_token();
        t.is_some() && t != before
    })
    .await;
    let token = server.backend().issued_token().unwrap();
    server.on_write(uuids::AUTH_RESPONSE, b"OK").unwrap();
    until(|| !server.auth.token.is_readable()).await;
    token
}

/// A command frame as the mobile client sends it, split into 20-byte
/// chunks.
#[allow(dead_code)]
pub fn chunks(frame: &str) -> Vec<Vec<u8>> {
    let mut bytes = frame.as_bytes().to_vec();
    bytes.push(b'\n');
    bytes.chunks(20).map(<[u8]>::to_vec).collect()
}
