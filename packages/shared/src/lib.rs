//! Utilities shared by the canvas server binary and library.

pub mod logger;
pub mod time;
