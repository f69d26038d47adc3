//! Application layer use cases for the player.
//!
//! - **`inject_input`** – Converts one recorded event into transport-neutral
//!   synthetic input units.  Defines the [`InputTransport`] trait that the
//!   infrastructure layer implements.
//!
//! - **`resolve_desktop`** – Display geometry abstraction used to build the
//!   coordinate normalizer.
//!
//! - **`play_macro`** – The playback scheduler: speed scaling, loops,
//!   inter-pass delays, cancellation and the finished notification.
//!
//! [`InputTransport`]: inject_input::InputTransport

pub mod inject_input;
pub mod play_macro;
pub mod resolve_desktop;
