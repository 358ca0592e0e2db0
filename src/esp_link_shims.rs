//! Runtime symbol providers for ESP-IDF builds.
//!
//! Every embassy-sync primitive here uses `CriticalSectionRawMutex`, and
//! the Bluedroid callbacks touch characteristics from the BT task while
//! the executor runs on the main task. A process-wide re-entrant lock
//! over a std `Mutex` gives both sides the same critical section.
//!
//! `async_io_mini::Timer` sits on `embassy-time-driver`, which resolves
//! its clock and wake hooks at link time. The writer tasks and the
//! control loop tick on that timer, so the hooks are backed here by the
//! ESP-IDF high-resolution timer (1 MHz, matching the default tick rate).
//! Host test builds get the `embassy-time` std driver instead.

#[cfg(target_os = "espidf")]
mod provider {
    use core::cell::{Cell, RefCell};
    use core::task::Waker;
    use core::time::Duration;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static LOCK: Mutex<()> = Mutex::new(());

    thread_local! {
        static NESTING: Cell<u8> = const { Cell::new(0) };
        static GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
        let nesting = NESTING.get();
        if nesting == 0 {
            let guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            GUARD.with(|g| *g.borrow_mut() = Some(guard));
        }
        let nesting = nesting.saturating_add(1);
        NESTING.set(nesting);
        nesting
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _critical_section_1_0_release(_restore: u8) {
        let nesting = NESTING.get();
        if nesting == 0 {
            return;
        }
        NESTING.set(nesting - 1);
        if nesting == 1 {
            GUARD.with(|g| *g.borrow_mut() = None);
        }
    }

    /// Microseconds since boot.
    #[unsafe(no_mangle)]
    pub fn _embassy_time_now() -> u64 {
        // SAFETY: reads a monotonic counter; no preconditions.
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        u64::try_from(us).unwrap_or_default()
    }

    /// Wake `waker` once the clock reaches `at`.
    #[unsafe(no_mangle)]
    pub fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
        let waker = waker.clone();
        let now = _embassy_time_now();
        if at <= now {
            waker.wake();
            return;
        }
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_micros(at - now));
            waker.wake();
        });
    }
}
