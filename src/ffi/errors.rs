//! Status codes at the C boundary.
//!
//! Every call returns `0` on success or a negative errno, the convention of
//! the framebuffer HAL the compositor is written against.

use std::os::raw::c_int;

use crate::core::errors::DisplayError;

impl DisplayError {
    /// Negative errno reported across the C boundary.
    pub fn to_errno(&self) -> c_int {
        match self {
            DisplayError::NoDisplayConnected
            | DisplayError::NoCrtcAvailable
            | DisplayError::NoPreferredMode => -libc::ENODEV,
            DisplayError::InvalidHandle | DisplayError::UnsupportedInterval { .. } => -libc::EINVAL,
            DisplayError::DeviceBusy => -libc::EBUSY,
            DisplayError::Enumeration { .. }
            | DisplayError::ModeSetFailed { .. }
            | DisplayError::FlipFailed { .. } => match self.os_error() {
                Some(errno) if errno > 0 => -errno,
                _ => -libc::EIO,
            },
        }
    }

    /// Get error code for debugging
    pub fn code(&self) -> u32 {
        match self {
            DisplayError::NoDisplayConnected => 1,
            DisplayError::NoCrtcAvailable => 2,
            DisplayError::NoPreferredMode => 3,
            DisplayError::Enumeration { .. } => 4,
            DisplayError::InvalidHandle => 10,
            DisplayError::UnsupportedInterval { .. } => 11,
            DisplayError::DeviceBusy => 20,
            DisplayError::ModeSetFailed { .. } => 30,
            DisplayError::FlipFailed { .. } => 31,
        }
    }
}

/// Collapses a result into a HAL status.
pub fn status<T>(result: &crate::core::errors::Result<T>) -> c_int {
    match result {
        Ok(_) => 0,
        Err(e) => e.to_errno(),
    }
}

// ============================================================================
// Tests
// ============================================================================
