//! Infrastructure layer for the player.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `macro_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`input_injection`** – Implementations of `InputTransport`: the two
//!   Windows transports and a recording mock.
//!
//! - **`desktop_metrics`** – Virtual-desktop geometry used to normalize
//!   pointer coordinates.

pub mod desktop_metrics;
pub mod input_injection;
