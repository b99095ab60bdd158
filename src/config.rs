//! Display device configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::mode::PixelFormat;

/// Configuration for the framebuffer device
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// DRM device node (e.g., "/dev/dri/card0")
    pub device_path: PathBuf,
    /// Scan-out pixel layout reported to clients
    pub pixel_format: PixelFormat,
    /// Longest a present waits for the previous flip; `None`, the default,
    /// blocks until the kernel delivers the event
    pub flip_timeout: Option<Duration>,
    /// Ask the driver to re-probe connectors during enumeration
    pub force_probe: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/dri/card0"),
            pixel_format: PixelFormat::Rgba8888,
            flip_timeout: None,
            force_probe: false,
        }
    }
}

impl DisplayConfig {
    /// Defaults overridden by `KMSFB_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = var("KMSFB_DEVICE") {
            self.device_path = PathBuf::from(path);
        }

        if let Some(value) = var("KMSFB_FLIP_TIMEOUT_MS") {
            match value.trim().parse::<u64>() {
                Ok(0) => self.flip_timeout = None,
                Ok(ms) => self.flip_timeout = Some(Duration::from_millis(ms)),
                Err(_) => tracing::warn!("Ignoring malformed KMSFB_FLIP_TIMEOUT_MS={:?}", value),
            }
        }

        if let Some(value) = var("KMSFB_PIXEL_FORMAT") {
            match PixelFormat::parse(value.trim()) {
                Some(format) => self.pixel_format = format,
                None => tracing::warn!("Ignoring unknown KMSFB_PIXEL_FORMAT={:?}", value),
            }
        }

        if let Some(value) = var("KMSFB_FORCE_PROBE") {
            match value.trim() {
                "1" | "true" => self.force_probe = true,
                "0" | "false" => self.force_probe = false,
                _ => tracing::warn!("Ignoring malformed KMSFB_FORCE_PROBE={:?}", value),
            }
        }

        self
    }
}
