pub mod errors;
pub mod transport;
pub mod topology;
pub mod mode;
pub mod presentation;
pub mod handle;
pub mod device;
pub mod drm_backend;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use device::FramebufferDevice;
pub use drm_backend::DrmCard;
pub use mode::{DisplayInfo, DisplayTarget, PixelFormat};
pub use presentation::{Phase, PresentationState, PresentationStats, Presenter};
