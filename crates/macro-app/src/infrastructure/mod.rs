//! Infrastructure layer for the shell.

pub mod storage;
