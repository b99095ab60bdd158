//! FFI module - C ABI boundary for compositors written in C
//!
//! Exposes the framebuffer device as plain `extern "C"` functions returning
//! HAL-style status codes.

pub mod errors;
pub mod c_api;

pub use c_api::{KmsFbDevice, KmsFbInfo};
