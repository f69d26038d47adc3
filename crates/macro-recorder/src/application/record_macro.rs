//! RecordMacroUseCase: turns raw hook events into a timestamped macro.
//!
//! A recording session owns one [`InputSource`] start/stop cycle.  Raw
//! events arrive on a channel and a dedicated consumer thread feeds them
//! through the [`CapturePolicy`]:
//!
//! ```text
//! hook thread ──mpsc──► consumer thread ──► CapturePolicy ──► EventStreamBuilder
//! ```
//!
//! # Capture policy
//!
//! - Events carrying the injection signature are dropped.
//! - A pointer move is kept only if at least [`MOVE_SAMPLE_INTERVAL`] has
//!   elapsed since the last *kept* move.  Button, wheel and key events are
//!   never throttled.
//! - Wheel deltas are stored as notches (`delta / 120`, truncating).
//! - Keys are stored with their display name (`"a"`, `"space"`, `"f9"`).
//!
//! Stopping a session uninstalls the hooks first, then joins the consumer.
//! The source guarantees the channel closes after its last send, so the
//! returned stream contains every accepted event exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use macro_core::keymap::display_name;
use macro_core::{EventKind, EventStream, EventStreamBuilder, WHEEL_DELTA};
use tracing::{debug, error, info};

use super::lock;
use crate::infrastructure::input_capture::{
    CaptureError, InputSource, RawInputEvent, RawInputKind,
};

/// Minimum spacing between two recorded pointer moves.
pub const MOVE_SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

/// Stateful filter that converts raw hook events into recorded events.
#[derive(Debug)]
pub struct CapturePolicy {
    origin: Instant,
    last_move_at: Option<Instant>,
    builder: EventStreamBuilder,
    injected_dropped: usize,
}

impl CapturePolicy {
    /// Creates a policy whose timestamps are measured from `origin`.
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            last_move_at: None,
            builder: EventStreamBuilder::new(),
            injected_dropped: 0,
        }
    }

    /// Applies the policy to one raw event.  Returns `true` if it was
    /// recorded.
    pub fn observe(&mut self, raw: &RawInputEvent) -> bool {
        if raw.is_injected() {
            self.injected_dropped += 1;
            return false;
        }

        let timestamp = raw
            .captured_at
            .saturating_duration_since(self.origin)
            .as_secs_f64();

        let kind = match raw.kind {
            RawInputKind::MouseMove { x, y } => {
                if let Some(last) = self.last_move_at {
                    if raw.captured_at.saturating_duration_since(last) < MOVE_SAMPLE_INTERVAL {
                        return false;
                    }
                }
                self.last_move_at = Some(raw.captured_at);
                EventKind::PointerMove { x, y }
            }
            RawInputKind::MouseButtonDown { button, x, y } => EventKind::PointerButton {
                x,
                y,
                button,
                pressed: true,
            },
            RawInputKind::MouseButtonUp { button, x, y } => EventKind::PointerButton {
                x,
                y,
                button,
                pressed: false,
            },
            RawInputKind::MouseWheel { delta, x, y } => EventKind::PointerScroll {
                x,
                y,
                dx: 0,
                notches: i32::from(delta) / WHEEL_DELTA,
            },
            RawInputKind::KeyDown { vk_code } => EventKind::KeyChange {
                vk_code,
                key: display_name(vk_code),
                pressed: true,
            },
            RawInputKind::KeyUp { vk_code } => EventKind::KeyChange {
                vk_code,
                key: display_name(vk_code),
                pressed: false,
            },
        };

        self.builder.push(timestamp, kind);
        true
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.builder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builder.is_empty()
    }

    /// Number of self-injected events that were filtered out.
    pub fn injected_dropped(&self) -> usize {
        self.injected_dropped
    }

    /// Finalizes the recorded stream.
    pub fn finish(self) -> EventStream {
        self.builder.finish()
    }
}

struct RecordingSession {
    consumer: JoinHandle<EventStream>,
}

/// Records keyboard and pointer activity into an [`EventStream`].
pub struct Recorder {
    source: Arc<dyn InputSource>,
    session: Mutex<Option<RecordingSession>>,
    recording: AtomicBool,
}

impl Recorder {
    /// Creates an idle recorder that will capture from `source`.
    pub fn new(source: Arc<dyn InputSource>) -> Self {
        Self {
            source,
            session: Mutex::new(None),
            recording: AtomicBool::new(false),
        }
    }

    /// Returns `true` while a session is active.
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Begins a fresh recording.  Does nothing if one is already active.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if the hooks cannot be installed; the
    /// recorder stays idle.
    pub fn start_recording(&self) -> Result<(), CaptureError> {
        let mut session = lock(&self.session);
        if session.is_some() {
            debug!("start_recording ignored: already recording");
            return Ok(());
        }

        let origin = Instant::now();
        let rx = self.source.start()?;

        let spawned = thread::Builder::new()
            .name("macro-capture".to_string())
            .spawn(move || {
                let mut policy = CapturePolicy::new(origin);
                for raw in rx {
                    policy.observe(&raw);
                }
                if policy.injected_dropped() > 0 {
                    debug!(dropped = policy.injected_dropped(), "ignored self-injected input");
                }
                policy.finish()
            });
        let consumer = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.source.stop();
                return Err(CaptureError::Thread(e.to_string()));
            }
        };

        *session = Some(RecordingSession { consumer });
        self.recording.store(true, Ordering::SeqCst);
        info!("recording started");
        Ok(())
    }

    /// Ends the active recording and returns what was captured.
    ///
    /// Returns an empty stream if no session was active.
    pub fn stop_recording(&self) -> EventStream {
        let mut session = lock(&self.session);
        let Some(active) = session.take() else {
            return EventStream::empty();
        };

        self.source.stop();
        self.recording.store(false, Ordering::SeqCst);

        match active.consumer.join() {
            Ok(stream) => {
                info!(events = stream.len(), duration = stream.duration(), "recording stopped");
                stream
            }
            Err(_) => {
                error!("capture worker panicked; recording discarded");
                EventStream::empty()
            }
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.is_recording() {
            self.stop_recording();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macro_core::{MouseButton, INJECTION_SIGNATURE};

    fn at(origin: Instant, ms: u64) -> Instant {
        origin + Duration::from_millis(ms)
    }

    fn raw(kind: RawInputKind, captured_at: Instant) -> RawInputEvent {
        RawInputEvent::new(kind, 0, captured_at)
    }

    #[test]
    fn test_first_move_is_always_recorded() {
        let origin = Instant::now();
        let mut policy = CapturePolicy::new(origin);
        assert!(policy.observe(&raw(RawInputKind::MouseMove { x: 1, y: 2 }, at(origin, 5))));
    }

    #[test]
    fn test_move_within_sample_interval_is_dropped() {
        // Arrange
        let origin = Instant::now();
        let mut policy = CapturePolicy::new(origin);

        // Act
        policy.observe(&raw(RawInputKind::MouseMove { x: 0, y: 0 }, at(origin, 0)));
        let second = policy.observe(&raw(RawInputKind::MouseMove { x: 5, y: 5 }, at(origin, 10)));
        let third = policy.observe(&raw(RawInputKind::MouseMove { x: 9, y: 9 }, at(origin, 50)));

        // Assert
        assert!(!second);
        assert!(third, "exactly 50 ms after the last kept move is recorded");
        assert_eq!(policy.len(), 2);
    }

    #[test]
    fn test_interval_is_measured_from_last_recorded_move() {
        let origin = Instant::now();
        let mut policy = CapturePolicy::new(origin);
        policy.observe(&raw(RawInputKind::MouseMove { x: 0, y: 0 }, at(origin, 0)));
        policy.observe(&raw(RawInputKind::MouseMove { x: 1, y: 0 }, at(origin, 30)));
        // 40 ms after the dropped move, but only 40+30 = 70 ms after the kept one.
        assert!(policy.observe(&raw(RawInputKind::MouseMove { x: 2, y: 0 }, at(origin, 70))));
    }

    #[test]
    fn test_buttons_and_keys_are_never_throttled() {
        let origin = Instant::now();
        let mut policy = CapturePolicy::new(origin);
        let t = at(origin, 1);
        assert!(policy.observe(&raw(
            RawInputKind::MouseButtonDown { button: MouseButton::Left, x: 0, y: 0 },
            t
        )));
        assert!(policy.observe(&raw(
            RawInputKind::MouseButtonUp { button: MouseButton::Left, x: 0, y: 0 },
            t
        )));
        assert!(policy.observe(&raw(RawInputKind::KeyDown { vk_code: 0x41 }, t)));
        assert!(policy.observe(&raw(RawInputKind::KeyUp { vk_code: 0x41 }, t)));
        assert_eq!(policy.len(), 4);
    }

    #[test]
    fn test_injected_events_are_dropped() {
        let origin = Instant::now();
        let mut policy = CapturePolicy::new(origin);
        let injected = RawInputEvent::new(
            RawInputKind::KeyDown { vk_code: 0x41 },
            INJECTION_SIGNATURE.value(),
            at(origin, 1),
        );
        assert!(!policy.observe(&injected));
        assert_eq!(policy.injected_dropped(), 1);
        assert!(policy.is_empty());
    }

    #[test]
    fn test_wheel_delta_becomes_notches() {
        let origin = Instant::now();
        let mut policy = CapturePolicy::new(origin);
        policy.observe(&raw(RawInputKind::MouseWheel { delta: 240, x: 3, y: 4 }, at(origin, 1)));
        policy.observe(&raw(RawInputKind::MouseWheel { delta: -120, x: 3, y: 4 }, at(origin, 2)));
        let stream = policy.finish();
        assert_eq!(
            stream.events()[0].kind,
            EventKind::PointerScroll { x: 3, y: 4, dx: 0, notches: 2 }
        );
        assert_eq!(
            stream.events()[1].kind,
            EventKind::PointerScroll { x: 3, y: 4, dx: 0, notches: -1 }
        );
    }

    #[test]
    fn test_keys_use_display_names_and_relative_timestamps() {
        let origin = Instant::now();
        let mut policy = CapturePolicy::new(origin);
        policy.observe(&raw(RawInputKind::KeyDown { vk_code: 0x20 }, at(origin, 250)));
        let stream = policy.finish();
        let event = &stream.events()[0];
        assert!((event.timestamp - 0.25).abs() < 1e-9);
        assert_eq!(
            event.kind,
            EventKind::KeyChange { vk_code: 0x20, key: "space".to_string(), pressed: true }
        );
    }
}
