//! Domain layer: pure data types and invariants with no OS dependencies.
//!
//! - **`event`** – The tagged [`event::Event`] representation and the ordered,
//!   immutable [`event::EventStream`].
//! - **`desktop`** – Virtual-desktop bounds and the pixel → absolute input
//!   coordinate mapping.
//! - **`signature`** – The marker value stamped on every synthetic input.

pub mod desktop;
pub mod event;
pub mod signature;
