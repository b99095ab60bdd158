//! Common imports for users of kmsfb.

pub use crate::config::DisplayConfig;
pub use crate::core::errors::{DisplayError, Result};
pub use crate::core::handle::{BufferHandle, BufferTable, HandleResolver};
pub use crate::core::transport::{FramebufferId, KmsDevice};
pub use crate::core::{DrmCard, FramebufferDevice};
