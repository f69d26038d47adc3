//! HotkeyDispatcher: global hotkeys backed by a keyboard-only hook.
//!
//! The keyboard hook is installed lazily on the first registration and
//! removed when the last registration goes away.  Key events are handed to
//! a dispatch thread, which:
//!
//! 1. ignores input carrying the injection signature,
//! 2. tracks which keys are currently held so OS auto-repeat does not fire a
//!    callback more than once per physical press,
//! 3. looks the key's hotkey name up in the registry and runs the callback.
//!
//! Callbacks never run on the hook thread.  A panicking callback is logged
//! and the dispatcher keeps going.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};

use macro_core::keymap::{hotkey_name, normalize_hotkey_name};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::lock;
use crate::infrastructure::input_capture::{
    CaptureError, InputSource, RawInputEvent, RawInputKind,
};

/// Action bound to a hotkey.
pub type HotkeyCallback = Arc<dyn Fn() + Send + Sync + 'static>;

type Registry = Arc<RwLock<HashMap<String, HotkeyCallback>>>;

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("hotkey name must not be empty")]
    EmptyKeyName,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Maps key names such as `"F9"` to callbacks.
pub struct HotkeyDispatcher {
    source: Arc<dyn InputSource>,
    registry: Registry,
    /// Dispatch thread while the hook is installed.  Holding this lock is
    /// the only way to install or remove the hook.
    hook: Mutex<Option<JoinHandle<()>>>,
}

impl HotkeyDispatcher {
    /// Creates a dispatcher with no registrations; no hook is installed yet.
    pub fn new(source: Arc<dyn InputSource>) -> Self {
        Self {
            source,
            registry: Arc::new(RwLock::new(HashMap::new())),
            hook: Mutex::new(None),
        }
    }

    /// Binds `callback` to `key_name` (case-insensitive), replacing any
    /// previous binding, and installs the hook if needed.
    ///
    /// # Errors
    ///
    /// - [`HotkeyError::EmptyKeyName`] for a blank name.
    /// - [`HotkeyError::Capture`] if the hook cannot be installed; the
    ///   binding is not kept in that case.
    pub fn register<F>(&self, key_name: &str, callback: F) -> Result<(), HotkeyError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let name = normalize_hotkey_name(key_name).ok_or(HotkeyError::EmptyKeyName)?;
        write(&self.registry).insert(name.clone(), Arc::new(callback));

        if let Err(e) = self.ensure_hook() {
            write(&self.registry).remove(&name);
            return Err(e.into());
        }
        debug!(hotkey = %name, "hotkey registered");
        Ok(())
    }

    /// Removes the binding for `key_name`; removes the hook if it was the
    /// last one.  Unknown names are ignored.
    pub fn unregister(&self, key_name: &str) {
        let Some(name) = normalize_hotkey_name(key_name) else {
            return;
        };
        if write(&self.registry).remove(&name).is_some() {
            debug!(hotkey = %name, "hotkey unregistered");
        }
        self.release_hook_if_unused();
    }

    /// Removes every binding and the hook.
    pub fn clear(&self) {
        write(&self.registry).clear();
        self.release_hook_if_unused();
    }

    /// Returns `true` if `key_name` currently has a binding.
    pub fn is_registered(&self, key_name: &str) -> bool {
        normalize_hotkey_name(key_name)
            .map(|name| read(&self.registry).contains_key(&name))
            .unwrap_or(false)
    }

    /// Returns `true` while the keyboard hook is installed.
    pub fn is_hook_installed(&self) -> bool {
        lock(&self.hook).is_some()
    }

    fn ensure_hook(&self) -> Result<(), CaptureError> {
        let mut hook = lock(&self.hook);
        if hook.is_some() {
            return Ok(());
        }

        let rx = self.source.start()?;
        let registry = Arc::clone(&self.registry);
        let spawned = thread::Builder::new()
            .name("hotkey-dispatch".to_string())
            .spawn(move || dispatch_loop(rx, registry));
        match spawned {
            Ok(handle) => {
                *hook = Some(handle);
                info!("hotkey hook installed");
                Ok(())
            }
            Err(e) => {
                self.source.stop();
                Err(CaptureError::Thread(e.to_string()))
            }
        }
    }

    fn release_hook_if_unused(&self) {
        let mut hook = lock(&self.hook);
        // Re-checked under the hook lock so a concurrent register() either
        // sees the hook still installed or reinstalls it afterwards.
        if !read(&self.registry).is_empty() {
            return;
        }
        let Some(handle) = hook.take() else {
            return;
        };
        self.source.stop();
        if handle.thread().id() == thread::current().id() {
            // Called from a callback: the loop ends once the channel drains.
            debug!("hotkey hook released from its own dispatch thread");
        } else if handle.join().is_err() {
            warn!("hotkey dispatch thread panicked");
        }
        info!("hotkey hook removed");
    }
}

impl Drop for HotkeyDispatcher {
    fn drop(&mut self) {
        self.clear();
    }
}

fn dispatch_loop(rx: Receiver<RawInputEvent>, registry: Registry) {
    let mut held: HashSet<String> = HashSet::new();

    for raw in rx {
        if raw.is_injected() {
            continue;
        }
        match raw.kind {
            RawInputKind::KeyDown { vk_code } => {
                let name = hotkey_name(vk_code);
                if !held.insert(name.clone()) {
                    // Auto-repeat.
                    continue;
                }
                let callback = read(&registry).get(&name).cloned();
                if let Some(callback) = callback {
                    run_callback(&name, &callback);
                }
            }
            RawInputKind::KeyUp { vk_code } => {
                held.remove(&hotkey_name(vk_code));
            }
            _ => {}
        }
    }
    debug!("hotkey dispatch loop exited");
}

fn run_callback(name: &str, callback: &HotkeyCallback) {
    debug!(hotkey = %name, "hotkey fired");
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback())) {
        error!(hotkey = %name, "hotkey callback panicked: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

fn read<T>(rw: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rw.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(rw: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rw.write().unwrap_or_else(PoisonError::into_inner)
}
