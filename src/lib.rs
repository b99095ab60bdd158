// kmsfb
//
// Scan-out controller for a single KMS output pipeline.
// Owns one connector/CRTC pair, performs the first mode-set and then
// presents buffers with serialized asynchronous page flips.

pub mod core;
pub mod ffi;
pub mod config;
pub mod util;
pub mod prelude;

/// The only swap interval the device supports.
pub const SWAP_INTERVAL: i32 = 1;

pub use config::DisplayConfig;
pub use crate::core::errors::{DisplayError, Result};
pub use crate::core::FramebufferDevice;
