//! Application layer for the shell: the session controller.

pub mod session;
