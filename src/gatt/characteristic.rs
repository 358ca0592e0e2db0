//! One GATT characteristic: properties, current value, captured writes.
//!
//! The host stack calls [`Characteristic::write`] from its own task; the
//! firmware tasks await [`Characteristic::written`]. Value and queue are
//! both guarded by critical-section primitives so either side may run on
//! a different FreeRTOS task.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::debug;

use crate::error::GattError;

/// Maximum attribute value length accepted from a peer.
pub const MAX_VALUE_LEN: usize = 512;

/// Writes captured but not yet consumed by a task. Sized so a command
/// frame with a full token fits in 20-byte chunks with room to spare.
pub const WRITE_QUEUE_DEPTH: usize = 16;

/// Access flags declared when the characteristic is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl Properties {
    pub const WRITE_NOTIFY: Self = Self {
        read: false,
        write: true,
        notify: true,
    };
    pub const READ_NOTIFY: Self = Self {
        read: true,
        write: false,
        notify: true,
    };
    pub const READ_WRITE_NOTIFY: Self = Self {
        read: true,
        write: true,
        notify: true,
    };
}

pub struct Characteristic {
    uuid: u16,
    props: Properties,
    initial: Vec<u8>,
    readable: AtomicBool,
    value: BlockingMutex<CriticalSectionRawMutex, RefCell<Vec<u8>>>,
    writes: Channel<CriticalSectionRawMutex, Vec<u8>, WRITE_QUEUE_DEPTH>,
}

impl Characteristic {
    pub fn new(uuid: u16, props: Properties, initial: &[u8]) -> Self {
        Self {
            uuid,
            props,
            initial: initial.to_vec(),
            readable: AtomicBool::new(props.read),
            value: BlockingMutex::new(RefCell::new(initial.to_vec())),
            writes: Channel::new(),
        }
    }

    pub fn uuid(&self) -> u16 {
        self.uuid
    }

    pub fn properties(&self) -> Properties {
        self.props
    }

    /// Current value, regardless of the readable flag.
    pub fn value(&self) -> Vec<u8> {
        self.value.lock(|v| v.borrow().clone())
    }

    /// Replace the value locally. Does not notify.
    pub fn set_value(&self, data: &[u8]) {
        self.value.lock(|v| {
            let mut v = v.borrow_mut();
            v.clear();
            v.extend_from_slice(data);
        });
    }

    pub fn is_readable(&self) -> bool {
        self.readable.load(Ordering::Acquire)
    }

    /// Revoke or re-grant peer reads. Granting is capped by the declared
    /// properties.
    pub fn set_readable(&self, readable: bool) {
        self.readable
            .store(readable && self.props.read, Ordering::Release);
    }

    /// Peer read, as routed by the host stack.
    pub fn read(&self) -> Result<Vec<u8>, GattError> {
        if !self.is_readable() {
            return Err(GattError::ReadNotPermitted(self.uuid));
        }
        Ok(self.value())
    }

    /// Peer write, as routed by the host stack.
    ///
    /// The value is updated immediately and the payload is queued for the
    /// task awaiting [`written`](Self::written). A full queue drops the
    /// new payload.
    pub fn write(&self, data: &[u8]) -> Result<(), GattError> {
        if !self.props.write {
            return Err(GattError::WriteNotPermitted(self.uuid));
        }
        if data.len() > MAX_VALUE_LEN {
            return Err(GattError::InvalidLength(self.uuid));
        }
        self.set_value(data);
        if self.writes.try_send(data.to_vec()).is_err() {
            debug!("write queue full on 0x{:04x}, dropping payload", self.uuid);
        }
        Ok(())
    }

    /// Suspend until the peer writes, returning the written payload.
    pub async fn written(&self) -> Vec<u8> {
        self.writes.receive().await
    }

    /// Drop every queued write.
    pub fn discard_writes(&self) {
        while self.writes.try_receive().is_ok() {}
    }

    /// Back to the registration state: initial value, declared
    /// readability, empty queue.
    pub fn restore(&self) {
        self.set_value(&self.initial);
        self.set_readable(true);
        self.discard_writes();
    }
}

impl core::fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Characteristic")
            .field("uuid", &format_args!("0x{:04x}", self.uuid))
            .field("props", &self.props)
            .field("readable", &self.is_readable())
            .finish_non_exhaustive()
    }
}
