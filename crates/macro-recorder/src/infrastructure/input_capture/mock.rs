//! Mock input source for unit testing.
//!
//! Allows tests to inject synthetic [`RawInputEvent`]s without requiring a
//! running Windows message loop or OS hooks.  It also counts installs and
//! uninstalls so hook lifecycle rules can be asserted.

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    mpsc::{self, Sender},
    Mutex, PoisonError,
};

use super::{CaptureError, InputSource, RawInputEvent};

/// A mock implementation of [`InputSource`] that allows tests to inject events.
#[derive(Default)]
pub struct MockInputSource {
    sender: Mutex<Option<Sender<RawInputEvent>>>,
    starts: AtomicU32,
    stops: AtomicU32,
    fail_start: AtomicBool,
}

impl MockInputSource {
    /// Creates a new mock input source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `start()` fail as if the hook could not be
    /// installed.
    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Returns `false` (and drops the event) when the source is not running.
    pub fn inject_event(&self, event: RawInputEvent) -> bool {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Returns `true` while hooks are "installed".
    pub fn is_running(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of successful `start()` calls.
    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop()` calls that actually uninstalled something.
    pub fn stop_count(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

impl InputSource for MockInputSource {
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(CaptureError::KeyboardHookInstallFailed(
                "mock failure".to_string(),
            ));
        }
        let mut guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }
        let (tx, rx) = mpsc::channel();
        *guard = Some(tx);
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    fn stop(&self) {
        // Dropping the sender closes the channel.
        let previous = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}
