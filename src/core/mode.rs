//! Mode selection and derived display metrics.

use crate::core::errors::{DisplayError, Result};
use crate::core::topology::Pipeline;
use crate::core::transport::{ConnectorId, CrtcId, DisplayMode};
use crate::SWAP_INTERVAL;

const MM_PER_INCH: f32 = 25.4;

/// Scan-out pixel layout. Fixed by configuration, never negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Rgba8888,
    Bgra8888,
}

impl PixelFormat {
    /// Graphics HAL pixel format code.
    pub fn hal_code(self) -> i32 {
        match self {
            PixelFormat::Rgba8888 => 1,
            PixelFormat::Bgra8888 => 5,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rgba8888" | "rgba_8888" => Some(PixelFormat::Rgba8888),
            "bgra8888" | "bgra_8888" => Some(PixelFormat::Bgra8888),
            _ => None,
        }
    }
}

/// The resolved output pipeline. Fixed for the lifetime of the device.
#[derive(Debug, Clone)]
pub struct DisplayTarget<M> {
    pub connector: ConnectorId,
    pub crtc: CrtcId,
    pub mode: M,
    /// Physical size in millimeters, `(0, 0)` when the connector does not report one.
    pub size_mm: (u32, u32),
}

impl<M: DisplayMode> DisplayTarget<M> {
    pub fn from_pipeline(pipeline: Pipeline<M>) -> Result<Self> {
        let mode = select_preferred(&pipeline.connector.modes)?.clone();

        let (width, height) = mode.size();
        tracing::info!(
            "Mode: {} {}x{}@{} on connector {}",
            mode.name(),
            width,
            height,
            mode.vrefresh(),
            pipeline.connector.id
        );

        Ok(Self {
            connector: pipeline.connector.id,
            crtc: pipeline.crtc,
            mode,
            size_mm: pipeline.connector.size_mm,
        })
    }

    /// Metrics reported to the compositor.
    pub fn info(&self, format: PixelFormat) -> DisplayInfo {
        let (width, height) = self.mode.size();
        let (mm_width, mm_height) = self.size_mm;

        if mm_width == 0 || mm_height == 0 {
            tracing::warn!("Connector {} reports no physical size, DPI unknown", self.connector);
        }

        DisplayInfo {
            connector: self.connector,
            crtc: self.crtc,
            mode_name: self.mode.name(),
            width: u32::from(width),
            height: u32::from(height),
            stride: u32::from(width),
            format,
            xdpi: dpi(width, mm_width),
            ydpi: dpi(height, mm_height),
            fps: self.mode.vrefresh() as f32,
            min_swap_interval: SWAP_INTERVAL,
            max_swap_interval: SWAP_INTERVAL,
            flags: 0,
        }
    }
}

/// Device metrics derived from the chosen mode and connector.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayInfo {
    pub connector: ConnectorId,
    pub crtc: CrtcId,
    pub mode_name: String,
    pub width: u32,
    pub height: u32,
    /// Row length in pixels.
    pub stride: u32,
    pub format: PixelFormat,
    pub xdpi: f32,
    pub ydpi: f32,
    pub fps: f32,
    pub min_swap_interval: i32,
    pub max_swap_interval: i32,
    pub flags: u32,
}

/// The first mode the driver flagged as preferred.
pub fn select_preferred<M: DisplayMode>(modes: &[M]) -> Result<&M> {
    modes.iter().find(|mode| mode.is_preferred()).ok_or_else(|| {
        tracing::error!("No preferred mode found among {} modes", modes.len());
        DisplayError::NoPreferredMode
    })
}

fn dpi(pixels: u16, millimeters: u32) -> f32 {
    if millimeters == 0 {
        return 0.0;
    }
    f32::from(pixels) * MM_PER_INCH / millimeters as f32
}
