//! # macro-core
//!
//! Shared library for the macro recorder containing the event model, the
//! coordinate normalizer used for absolute pointer injection, virtual-key
//! naming tables and the JSON macro file codec.
//!
//! This crate is used by both the recorder and the player.  It has zero
//! dependencies on OS APIs, hooks or async runtimes.
//!
//! # Architecture overview
//!
//! A *macro* is a recording of pointer and keyboard activity.  The recorder
//! installs global input hooks and turns every accepted hook callback into an
//! [`Event`] stamped with the seconds elapsed since recording began.  The
//! player walks the resulting [`EventStream`] and re-synthesizes each event
//! at its (speed-scaled) offset.
//!
//! - **`domain`** – Pure data and rules: the [`Event`] enum, the
//!   [`EventStream`] ordering invariant, the [`InjectionSignature`] stamped on
//!   synthetic input, and the [`VirtualDesktop`] → normalized coordinate
//!   mapping.
//!
//! - **`keymap`** – Windows virtual-key code → display name / hotkey name.
//!
//! - **`format`** – The on-disk `{"events": [...]}` JSON representation.

pub mod domain;
pub mod format;
pub mod keymap;

pub use domain::desktop::{CoordinateNormalizer, DesktopRect, VirtualDesktop, ABSOLUTE_MAX};
pub use domain::event::{
    Event, EventKind, EventStream, EventStreamBuilder, MouseButton, SourceFields,
    StreamError,
};
pub use domain::signature::{InjectionSignature, INJECTION_SIGNATURE};
pub use format::macro_file::{parse_macro, to_json, FormatError, MacroFile, MacroRecord, WHEEL_DELTA};
