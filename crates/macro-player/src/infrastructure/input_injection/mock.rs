//! Recording transport for tests.
//!
//! `RecordingTransport` replaces all OS calls with in-memory recording.  Each
//! call to [`InputTransport::send`] is stored as a [`SentBatch`] together with
//! the (Tokio) time it arrived, so tests running with a paused clock can
//! assert on exact injection times.
//!
//! # Usage in tests
//!
//! ```ignore
//! let transport = Arc::new(RecordingTransport::new());
//! let engine = PlaybackEngine::new(transport.clone(), transport.clone(), metrics);
//!
//! engine.play_macro(&stream, PlaybackOptions::default(), None).await;
//!
//! assert_eq!(transport.batch_count(), stream.len());
//! ```
//!
//! # `should_fail` flag
//!
//! Set `should_fail` to make every call return `InjectionError::Partial`
//! after recording the batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;

use crate::application::inject_input::{InjectionError, InputTransport, SyntheticInput};

/// One recorded `send` call.
#[derive(Debug, Clone)]
pub struct SentBatch {
    pub at: Instant,
    pub inputs: Vec<SyntheticInput>,
}

/// A transport that records every batch without touching the OS.
#[derive(Default)]
pub struct RecordingTransport {
    pub batches: Mutex<Vec<SentBatch>>,
    pub should_fail: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every call reports a partial send.
    pub fn failing() -> Self {
        let transport = Self::default();
        transport.should_fail.store(true, Ordering::SeqCst);
        transport
    }

    /// Snapshot of all recorded batches.
    pub fn batches(&self) -> Vec<SentBatch> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// All recorded units, flattened in order.
    pub fn inputs(&self) -> Vec<SyntheticInput> {
        self.batches()
            .into_iter()
            .flat_map(|batch| batch.inputs)
            .collect()
    }
}

impl InputTransport for RecordingTransport {
    fn send(&self, inputs: &[SyntheticInput]) -> Result<(), InjectionError> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentBatch {
                at: Instant::now(),
                inputs: inputs.to_vec(),
            });

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(InjectionError::Partial {
                sent: 0,
                expected: inputs.len() as u32,
            });
        }
        Ok(())
    }
}
