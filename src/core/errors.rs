//! Core error types

use thiserror::Error;

/// Display pipeline errors
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("No connected display found")]
    NoDisplayConnected,

    #[error("No CRTC available for the connected display")]
    NoCrtcAvailable,

    #[error("Connected display has no preferred mode")]
    NoPreferredMode,

    #[error("Failed to read {what} from the display device: {source}")]
    Enumeration {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Buffer handle does not name a scan-out framebuffer")]
    InvalidHandle,

    #[error("Display device busy, retry the present")]
    DeviceBusy,

    #[error("Mode-set failed: {source}")]
    ModeSetFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("Page flip failed: {source}")]
    FlipFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported swap interval: {requested}")]
    UnsupportedInterval { requested: i32 },
}

impl DisplayError {
    pub fn enumeration(what: &'static str, source: std::io::Error) -> Self {
        Self::Enumeration { what, source }
    }

    pub fn mode_set_failed(source: std::io::Error) -> Self {
        Self::ModeSetFailed { source }
    }

    pub fn flip_failed(source: std::io::Error) -> Self {
        Self::FlipFailed { source }
    }

    /// Raised while opening the device; no device is constructed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DisplayError::NoDisplayConnected
                | DisplayError::NoCrtcAvailable
                | DisplayError::NoPreferredMode
                | DisplayError::Enumeration { .. }
        )
    }

    /// The caller may retry, presentation state is untouched.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DisplayError::InvalidHandle
                | DisplayError::DeviceBusy
                | DisplayError::UnsupportedInterval { .. }
        )
    }

    /// OS errno carried by a transport failure, if any.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            DisplayError::Enumeration { source, .. }
            | DisplayError::ModeSetFailed { source }
            | DisplayError::FlipFailed { source } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, DisplayError>;

/// Whether a transport error means the CRTC is momentarily busy.
pub fn is_busy(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(libc::EBUSY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DisplayError::UnsupportedInterval { requested: 2 };
        assert_eq!(err.to_string(), "Unsupported swap interval: 2");
    }

    #[test]
    fn test_error_categories() {
        assert!(DisplayError::NoDisplayConnected.is_fatal());
        assert!(DisplayError::NoPreferredMode.is_fatal());
        assert!(!DisplayError::DeviceBusy.is_fatal());

        assert!(DisplayError::DeviceBusy.is_recoverable());
        assert!(DisplayError::InvalidHandle.is_recoverable());
        let flip = DisplayError::flip_failed(std::io::Error::from_raw_os_error(libc::EINVAL));
        assert!(!flip.is_recoverable());
        assert_eq!(flip.os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_busy_detection() {
        assert!(is_busy(&std::io::Error::from_raw_os_error(libc::EBUSY)));
        assert!(!is_busy(&std::io::Error::from_raw_os_error(libc::EIO)));
        assert!(!is_busy(&std::io::Error::new(std::io::ErrorKind::Other, "custom")));
    }
}
