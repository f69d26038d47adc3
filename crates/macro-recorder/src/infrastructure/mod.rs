//! Infrastructure layer for the recorder.
//!
//! Contains the OS-facing hook adapters.
//!
//! **Dependency rule**: this layer may depend on `macro_core`, but MUST NOT
//! import the `application` layer.

pub mod input_capture;
