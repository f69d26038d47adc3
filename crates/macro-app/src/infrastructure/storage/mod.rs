//! On-disk state: preferences (`config`) and recorded macros (`macro_store`).

pub mod config;
pub mod macro_store;
