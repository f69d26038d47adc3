//! Application layer use cases for the recorder.
//!
//! Use cases in this layer depend only on the [`InputSource`] trait, never on
//! a concrete hook implementation, so both can be driven by
//! `MockInputSource` in tests.
//!
//! - **`record_macro`** – Turns raw hook events into an `EventStream` while a
//!   recording session is active.
//!
//! - **`hotkeys`** – Keyboard-only hook that runs a callback when a
//!   registered key goes from up to down.
//!
//! [`InputSource`]: crate::infrastructure::input_capture::InputSource

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod hotkeys;
pub mod record_macro;

/// Locks `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
