//! Framebuffer device: the contract the compositor calls.
//!
//! Pure delegation into the `Presenter`, plus the checks the state machine
//! cannot make itself (null handles, swap intervals).

use crate::config::DisplayConfig;
use crate::core::errors::{DisplayError, Result};
use crate::core::handle::HandleResolver;
use crate::core::mode::DisplayInfo;
use crate::core::presentation::{check_swap_interval, PresentationState, PresentationStats, Presenter};
use crate::core::transport::KmsDevice;

pub struct FramebufferDevice<D: KmsDevice, R: HandleResolver> {
    presenter: Presenter<D>,
    resolver: R,
    info: DisplayInfo,
}

impl<D: KmsDevice, R: HandleResolver> FramebufferDevice<D, R> {
    /// Resolves the output pipeline. On failure nothing is constructed and
    /// `device` is dropped.
    pub fn open(device: D, resolver: R, config: &DisplayConfig) -> Result<Self> {
        let presenter = Presenter::initialize(device, config.flip_timeout)?;
        let info = presenter.target().info(config.pixel_format);

        tracing::info!(
            "Framebuffer device ready: {}x{} @{}Hz, {:.1}x{:.1} dpi, {:?}",
            info.width,
            info.height,
            info.fps,
            info.xdpi,
            info.ydpi,
            info.format
        );

        Ok(Self {
            presenter,
            resolver,
            info,
        })
    }

    /// Shows the buffer. `None` stands for a null handle.
    pub fn present(&mut self, handle: Option<&R::Handle>) -> Result<()> {
        let handle = handle.ok_or(DisplayError::InvalidHandle)?;
        self.presenter.present(&self.resolver, handle)
    }

    pub fn set_swap_interval(&self, interval: i32) -> Result<()> {
        check_swap_interval(interval)
    }

    /// Rendering for the next present is done. Nothing to synchronize.
    pub fn composition_complete(&self) -> Result<()> {
        Ok(())
    }

    pub fn enable_screen(&mut self, enabled: bool) -> Result<()> {
        self.presenter.set_power_state(enabled)
    }

    pub fn info(&self) -> &DisplayInfo {
        &self.info
    }

    pub fn state(&self) -> PresentationState {
        self.presenter.state()
    }

    pub fn stats(&self) -> PresentationStats {
        self.presenter.stats()
    }

    pub fn presenter(&self) -> &Presenter<D> {
        &self.presenter
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Closes the allocator device and releases the display device.
    pub fn close(self) -> anyhow::Result<()> {
        let Self {
            presenter,
            mut resolver,
            ..
        } = self;

        tracing::info!("Closing framebuffer device ({:?})", presenter.stats());
        drop(presenter);
        resolver.close()
    }
}
