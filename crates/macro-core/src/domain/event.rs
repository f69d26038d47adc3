//! Event model: what a macro is made of.
//!
//! An [`Event`] is one captured input occurrence together with its offset (in
//! seconds) from the start of the recording.  An [`EventStream`] is the frozen,
//! ordered result of one recording session (or of loading a macro file).
//!
//! # Ordering invariant
//!
//! Timestamps in an [`EventStream`] are finite, non-negative and
//! non-decreasing in stream order.  [`EventStream::new`] rejects anything
//! else; [`EventStreamBuilder`] (used by capture) clamps instead, because a
//! live recording must never drop an event just because two hook threads
//! raced on the monotonic clock.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pointer button identifier.
///
/// Only the three buttons the recorder captures are representable.  Unknown
/// names coming from a file are mapped to [`MouseButton::Left`] by
/// [`MouseButton::from_name`]; the text itself survives in
/// [`SourceFields::button`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Returns the lower-case name used in macro files.
    pub fn as_str(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }

    /// Parses a button name case-insensitively; unrecognized names yield `Left`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "right" => MouseButton::Right,
            "middle" => MouseButton::Middle,
            _ => MouseButton::Left,
        }
    }
}

/// The kind-specific payload of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The pointer moved to an absolute screen position.
    PointerMove { x: i32, y: i32 },
    /// A pointer button changed state at the given position.
    PointerButton {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    /// The vertical wheel turned by `notches` (positive = away from user).
    /// `dx` is the horizontal component; capture always records `0` and
    /// playback does not inject it.
    PointerScroll {
        x: i32,
        y: i32,
        dx: i32,
        notches: i32,
    },
    /// A key went down (`pressed = true`) or up.
    KeyChange {
        /// Windows virtual-key code.
        vk_code: u32,
        /// Display name derived from `vk_code` at capture time.
        key: String,
        pressed: bool,
    },
}

/// Record fields a loaded macro file carried that [`EventKind`] does not
/// model.  Playback ignores them; saving writes them back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFields {
    /// The file's `button` text when it is not the canonical name of the
    /// parsed [`MouseButton`] (`"x1"`, `"Right"`).
    pub button: Option<String>,
    /// `pressed` as written on a key record.
    pub key_pressed: Option<bool>,
}

/// One captured input occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Seconds since the owning stream's recording start (monotonic clock).
    pub timestamp: f64,
    pub kind: EventKind,
    /// Empty for captured events.
    pub source: SourceFields,
}

impl Event {
    /// Creates an event at `timestamp` seconds.
    pub fn new(timestamp: f64, kind: EventKind) -> Self {
        Self {
            timestamp,
            kind,
            source: SourceFields::default(),
        }
    }

    pub fn with_source(mut self, source: SourceFields) -> Self {
        self.source = source;
        self
    }

    /// Returns the timestamp as a [`Duration`], saturating at zero.
    pub fn offset(&self) -> Duration {
        if self.timestamp.is_finite() && self.timestamp > 0.0 {
            Duration::from_secs_f64(self.timestamp)
        } else {
            Duration::ZERO
        }
    }
}

/// Error returned when a sequence of events violates the stream invariant.
#[derive(Debug, Error, PartialEq)]
pub enum StreamError {
    #[error("event {index} has an invalid timestamp {value}")]
    InvalidTimestamp { index: usize, value: f64 },
    #[error("event {index} at {current}s precedes the previous event at {previous}s")]
    OutOfOrder {
        index: usize,
        previous: f64,
        current: f64,
    },
}

/// An immutable, ordered recording.
///
/// Cloning is cheap (the events are reference-counted), so a stream can be
/// handed to the player while the caller keeps its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStream {
    events: Arc<[Event]>,
}

impl EventStream {
    /// Returns a stream with no events.
    pub fn empty() -> Self {
        Self {
            events: Arc::from(Vec::new()),
        }
    }

    /// Validates `events` and freezes them into a stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] if any timestamp is negative, non-finite, or
    /// smaller than its predecessor.
    pub fn new(events: Vec<Event>) -> Result<Self, StreamError> {
        let mut previous = 0.0_f64;
        for (index, event) in events.iter().enumerate() {
            let current = event.timestamp;
            if !current.is_finite() || current < 0.0 {
                return Err(StreamError::InvalidTimestamp {
                    index,
                    value: current,
                });
            }
            if current < previous {
                return Err(StreamError::OutOfOrder {
                    index,
                    previous,
                    current,
                });
            }
            previous = current;
        }
        Ok(Self {
            events: Arc::from(events),
        })
    }

    /// Returns the events in order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Timestamp of the last event, i.e. the length of one pass at speed 1.
    pub fn duration(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.timestamp)
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> IntoIterator for &'a EventStream {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Append-only accumulator used while a recording is active.
#[derive(Debug, Default)]
pub struct EventStreamBuilder {
    events: Vec<Event>,
    last_timestamp: f64,
}

impl EventStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, clamping its timestamp so the stream never goes
    /// backwards.
    pub fn push(&mut self, timestamp: f64, kind: EventKind) {
        let timestamp = if timestamp.is_finite() {
            timestamp.max(self.last_timestamp)
        } else {
            self.last_timestamp
        };
        self.last_timestamp = timestamp;
        self.events.push(Event::new(timestamp, kind));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Freezes the accumulated events.
    pub fn finish(self) -> EventStream {
        EventStream {
            events: Arc::from(self.events),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
