//! JSON codec for macro files.
//!
//! [`MacroFile`] / [`MacroRecord`] mirror the file layout one-to-one so that
//! loading and saving a file preserves every field and the record order.
//! Conversion to and from the typed [`EventStream`] is a separate, validating
//! step: a file that deserializes fine can still be rejected because a record
//! lacks a field its `type` requires, or because timestamps go backwards.
//!
//! Field names are matched case-insensitively on load (`"VkCode"`,
//! `"TIMESTAMP"` are accepted); they are always written in their canonical
//! spelling.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::event::{Event, EventKind, EventStream, MouseButton, SourceFields, StreamError};
use crate::keymap::display_name;

/// Raw wheel units per notch.
pub const WHEEL_DELTA: i32 = 120;

const TYPE_MOUSE_MOVE: &str = "mouse_move";
const TYPE_MOUSE_CLICK: &str = "mouse_click";
const TYPE_MOUSE_SCROLL: &str = "mouse_scroll";
const TYPE_KEY_PRESS: &str = "key_press";
const TYPE_KEY_RELEASE: &str = "key_release";

/// Canonical spelling of every record field, used to fold case on load.
const RECORD_FIELDS: [&str; 10] = [
    "type",
    "timestamp",
    "x",
    "y",
    "button",
    "pressed",
    "dx",
    "dy",
    "key",
    "vkCode",
];

/// Error type for macro file encoding and decoding.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The text is not valid JSON or does not match the file schema.
    #[error("invalid macro JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The file parsed but holds no events.
    #[error("macro file contains no events")]
    Empty,

    /// A record's `type` is not one of the known discriminators.
    #[error("event {index} has unknown type {kind:?}")]
    UnknownType { index: usize, kind: String },

    /// A record lacks a field its `type` requires.
    #[error("event {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    /// The records violate the stream ordering invariant.
    #[error("invalid event order: {0}")]
    Stream(#[from] StreamError),
}

/// Top-level file object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MacroFile {
    #[serde(default)]
    pub events: Vec<MacroRecord>,
}

/// One event record as it appears on disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MacroRecord {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "vkCode", default, skip_serializing_if = "Option::is_none")]
    pub vk_code: Option<u32>,
}

impl MacroFile {
    /// Parses file text, folding field-name case.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Json`] if the text is not a macro file.
    pub fn from_json(text: &str) -> Result<Self, FormatError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(serde_json::from_value(fold_field_case(value))?)
    }

    /// Renders the file as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Json`] if serialization fails (e.g. a
    /// non-finite timestamp).
    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the on-disk form of a stream.
    pub fn from_stream(stream: &EventStream) -> Self {
        Self {
            events: stream.iter().map(MacroRecord::from_event).collect(),
        }
    }

    /// Validates the records and converts them into a stream.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Empty`] for a file without events, and the
    /// per-record errors described on [`FormatError`] otherwise.
    pub fn to_stream(&self) -> Result<EventStream, FormatError> {
        if self.events.is_empty() {
            return Err(FormatError::Empty);
        }
        let events = self
            .events
            .iter()
            .enumerate()
            .map(|(index, record)| record.to_event(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EventStream::new(events)?)
    }
}

impl MacroRecord {
    /// Converts a typed event into its record.
    pub fn from_event(event: &Event) -> Self {
        let mut record = MacroRecord {
            timestamp: Some(event.timestamp),
            ..MacroRecord::default()
        };
        match &event.kind {
            EventKind::PointerMove { x, y } => {
                record.kind = TYPE_MOUSE_MOVE.to_string();
                record.x = Some(*x);
                record.y = Some(*y);
            }
            EventKind::PointerButton {
                x,
                y,
                button,
                pressed,
            } => {
                record.kind = TYPE_MOUSE_CLICK.to_string();
                record.x = Some(*x);
                record.y = Some(*y);
                record.button = Some(
                    event
                        .source
                        .button
                        .clone()
                        .unwrap_or_else(|| button.as_str().to_string()),
                );
                record.pressed = Some(*pressed);
            }
            EventKind::PointerScroll { x, y, dx, notches } => {
                record.kind = TYPE_MOUSE_SCROLL.to_string();
                record.x = Some(*x);
                record.y = Some(*y);
                record.dx = Some(*dx);
                record.dy = Some(*notches);
            }
            EventKind::KeyChange {
                vk_code,
                key,
                pressed,
            } => {
                record.kind = if *pressed { TYPE_KEY_PRESS } else { TYPE_KEY_RELEASE }.to_string();
                record.key = Some(key.clone());
                record.vk_code = Some(*vk_code);
                record.pressed = event.source.key_pressed;
            }
        }
        record
    }

    /// Converts the record at position `index` into a typed event.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnknownType`] or [`FormatError::MissingField`].
    pub fn to_event(&self, index: usize) -> Result<Event, FormatError> {
        let need = |value: Option<i32>, field: &'static str| {
            value.ok_or(FormatError::MissingField { index, field })
        };
        let timestamp = self
            .timestamp
            .ok_or(FormatError::MissingField {
                index,
                field: "timestamp",
            })?;

        let mut source = SourceFields::default();
        let kind = match self.kind.trim().to_ascii_lowercase().as_str() {
            "" => {
                return Err(FormatError::MissingField {
                    index,
                    field: "type",
                })
            }
            TYPE_MOUSE_MOVE => EventKind::PointerMove {
                x: need(self.x, "x")?,
                y: need(self.y, "y")?,
            },
            TYPE_MOUSE_CLICK => {
                let name = self.button.as_deref().ok_or(FormatError::MissingField {
                    index,
                    field: "button",
                })?;
                let button = MouseButton::from_name(name);
                if name != button.as_str() {
                    source.button = Some(name.to_string());
                }
                EventKind::PointerButton {
                    x: need(self.x, "x")?,
                    y: need(self.y, "y")?,
                    button,
                    pressed: self.pressed.ok_or(FormatError::MissingField {
                        index,
                        field: "pressed",
                    })?,
                }
            }
            TYPE_MOUSE_SCROLL => EventKind::PointerScroll {
                x: need(self.x, "x")?,
                y: need(self.y, "y")?,
                dx: self.dx.unwrap_or(0),
                notches: need(self.dy, "dy")?,
            },
            kind @ (TYPE_KEY_PRESS | TYPE_KEY_RELEASE) => {
                let vk_code = self.vk_code.ok_or(FormatError::MissingField {
                    index,
                    field: "vkCode",
                })?;
                source.key_pressed = self.pressed;
                EventKind::KeyChange {
                    vk_code,
                    key: self.key.clone().unwrap_or_else(|| display_name(vk_code)),
                    pressed: kind == TYPE_KEY_PRESS,
                }
            }
            _ => {
                return Err(FormatError::UnknownType {
                    index,
                    kind: self.kind.clone(),
                })
            }
        };
        Ok(Event::new(timestamp, kind).with_source(source))
    }
}

/// Parses macro file text straight into a validated stream.
///
/// # Errors
///
/// See [`MacroFile::from_json`] and [`MacroFile::to_stream`].
pub fn parse_macro(text: &str) -> Result<EventStream, FormatError> {
    MacroFile::from_json(text)?.to_stream()
}

/// Serializes a stream into macro file text.
///
/// # Errors
///
/// See [`MacroFile::to_json`].
pub fn to_json(stream: &EventStream) -> Result<String, FormatError> {
    MacroFile::from_stream(stream).to_json()
}

/// Rewrites object keys to their canonical spelling where they match a known
/// field case-insensitively.  Unknown keys are left alone (and ignored by
/// serde).
fn fold_field_case(value: Value) -> Value {
    let Value::Object(root) = value else {
        return value;
    };
    let root = root
        .into_iter()
        .map(|(k, v)| {
            if k.eq_ignore_ascii_case("events") {
                let v = match v {
                    Value::Array(items) => {
                        Value::Array(items.into_iter().map(fold_record_case).collect())
                    }
                    other => other,
                };
                ("events".to_string(), v)
            } else {
                (k, v)
            }
        })
        .collect::<Map<_, _>>();
    Value::Object(root)
}

fn fold_record_case(value: Value) -> Value {
    let Value::Object(fields) = value else {
        return value;
    };
    let fields = fields
        .into_iter()
        .map(|(k, v)| {
            let canonical = RECORD_FIELDS
                .iter()
                .find(|name| name.eq_ignore_ascii_case(&k))
                .map_or(k, |name| (*name).to_string());
            (canonical, v)
        })
        .collect::<Map<_, _>>();
    Value::Object(fields)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
