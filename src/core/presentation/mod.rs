//! Page-flip state machine.
//!
//! Drives the one CRTC this device owns:
//! - the first present after init (or after the screen was turned off)
//!   performs a synchronous mode-set,
//! - every later present schedules an asynchronous page flip,
//! - at most one flip is ever in flight: a new flip, or turning the screen
//!   off, first drains the completion event of the previous one.
//!
//! Completion events are dispatched synchronously from inside the drain
//! wait, on the calling thread, so no locking is involved.

pub mod state;


use std::time::Duration;

use crate::core::errors::{is_busy, DisplayError, Result};
use crate::core::handle::HandleResolver;
use crate::core::mode::DisplayTarget;
use crate::core::topology::resolve_pipeline;
use crate::core::transport::{CrtcBinding, FlipEvent, FramebufferId, KmsDevice};
use crate::SWAP_INTERVAL;

pub use state::{Phase, PresentationState, PresentationStats};

pub struct Presenter<D: KmsDevice> {
    device: D,
    target: DisplayTarget<D::Mode>,
    state: PresentationState,
    stats: PresentationStats,
    /// Upper bound on a drain wait. `None` waits for the kernel.
    flip_timeout: Option<Duration>,
    /// Completion events still owed by flips given up as lost.
    late_events: u32,
}

impl<D: KmsDevice> Presenter<D> {
    /// Resolves the output pipeline and starts with the CRTC disabled.
    pub fn initialize(device: D, flip_timeout: Option<Duration>) -> Result<Self> {
        let pipeline = resolve_pipeline(&device)?;
        let target = DisplayTarget::from_pipeline(pipeline)?;

        Ok(Self {
            device,
            target,
            state: PresentationState::default(),
            stats: PresentationStats::default(),
            flip_timeout,
            late_events: 0,
        })
    }

    pub fn target(&self) -> &DisplayTarget<D::Mode> {
        &self.target
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    pub fn stats(&self) -> PresentationStats {
        self.stats
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Resolves `handle` and shows its framebuffer.
    pub fn present<R>(&mut self, resolver: &R, handle: &R::Handle) -> Result<()>
    where
        R: HandleResolver + ?Sized,
    {
        let fb_id = match resolver.resolve(handle) {
            Ok(raw) => FramebufferId::new(raw).ok_or(DisplayError::InvalidHandle)?,
            Err(e) => {
                tracing::debug!("Buffer handle resolution failed: {:#}", e);
                return Err(DisplayError::InvalidHandle);
            }
        };

        self.post(fb_id)
    }

    /// Shows `fb_id`, by mode-set when the CRTC is disabled and by page
    /// flip otherwise. Returns before a scheduled flip lands.
    pub fn post(&mut self, fb_id: FramebufferId) -> Result<()> {
        match self.state.current {
            Some(current) if current == fb_id => {
                // Already current
                self.stats.redundant_presents += 1;
                Ok(())
            }
            Some(_) => self.page_flip(fb_id),
            None => self.enable_crtc(fb_id),
        }
    }

    /// Turning the screen off unbinds the CRTC. Turning it on is deferred to
    /// the next present, which re-arms the CRTC with a mode-set.
    pub fn set_power_state(&mut self, enabled: bool) -> Result<()> {
        tracing::info!("Updating screen state: {}", enabled);

        if !enabled && !self.state.is_disabled() {
            self.disable_crtc()
        } else {
            Ok(())
        }
    }

    fn enable_crtc(&mut self, fb_id: FramebufferId) -> Result<()> {
        let binding = CrtcBinding {
            framebuffer: fb_id,
            connector: self.target.connector,
            mode: &self.target.mode,
        };

        match self.device.set_crtc(self.target.crtc, Some(binding)) {
            Ok(()) => {
                tracing::info!("CRTC {} enabled with framebuffer {}", self.target.crtc, fb_id);
                self.state.current = Some(fb_id);
                self.stats.mode_sets += 1;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to enable CRTC: {}", e);
                Err(DisplayError::mode_set_failed(e))
            }
        }
    }

    fn disable_crtc(&mut self) -> Result<()> {
        self.await_page_flip();

        match self.device.set_crtc(self.target.crtc, None) {
            Ok(()) => {
                tracing::info!("CRTC {} disabled", self.target.crtc);
                self.state.disable();
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to disable CRTC: {}", e);
                Err(DisplayError::mode_set_failed(e))
            }
        }
    }

    fn page_flip(&mut self, fb_id: FramebufferId) -> Result<()> {
        // Finish current page flip
        self.await_page_flip();

        if self.state.current == Some(fb_id) {
            // The drained flip was to this very framebuffer
            self.stats.redundant_presents += 1;
            return Ok(());
        }

        match self.device.page_flip(self.target.crtc, fb_id) {
            Ok(()) => {
                tracing::debug!("Flip to framebuffer {} scheduled", fb_id);
                self.state.pending = Some(fb_id);
                self.stats.flips_scheduled += 1;
                Ok(())
            }
            Err(e) if is_busy(&e) => {
                tracing::warn!("Page flip to framebuffer {} rejected, device busy", fb_id);
                self.stats.busy_flips += 1;
                Err(DisplayError::DeviceBusy)
            }
            Err(e) => {
                // The CRTC state is unknown, re-arm with a mode-set next time
                tracing::error!("Failed to perform page flip: {}", e);
                self.state.current = None;
                Err(DisplayError::flip_failed(e))
            }
        }
    }

    /// Blocks until the in-flight flip, if any, has completed.
    ///
    /// A wait that returns without the completion (timeout, transport error,
    /// an event for another CRTC) is taken as a lost event: the pending
    /// framebuffer is assumed to be on screen. Its event may still arrive
    /// later, so the next event for this CRTC is discarded rather than
    /// taken as the completion of a newer flip.
    fn await_page_flip(&mut self) {
        if self.state.pending.is_none() {
            return;
        }

        match self.device.wait_flip_events(self.flip_timeout) {
            Ok(events) => {
                for event in events {
                    self.handle_page_flip(event);
                }
            }
            Err(e) => tracing::warn!("Waiting for page flip failed: {}", e),
        }

        if let Some(fb_id) = self.state.complete_flip() {
            tracing::warn!("Flip event wait returned without flipping, assuming {} is on screen", fb_id);
            self.stats.lost_events += 1;
            self.late_events += 1;
        }
    }

    fn handle_page_flip(&mut self, event: FlipEvent) {
        if event.crtc != self.target.crtc {
            tracing::trace!("Ignoring flip event for CRTC {}", event.crtc);
            return;
        }

        if self.late_events > 0 {
            self.late_events -= 1;
            self.stats.late_events += 1;
            tracing::debug!("Discarding late flip event (seq {})", event.sequence);
            return;
        }

        match self.state.complete_flip() {
            Some(fb_id) => {
                tracing::debug!(
                    "Flip to framebuffer {} completed (seq {}, {:?})",
                    fb_id,
                    event.sequence,
                    event.timestamp
                );
                self.stats.flips_completed += 1;
            }
            None => tracing::trace!("Flip event with nothing pending (seq {})", event.sequence),
        }
    }
}

/// Only one swap interval is supported.
pub fn check_swap_interval(interval: i32) -> Result<()> {
    if interval != SWAP_INTERVAL {
        return Err(DisplayError::UnsupportedInterval { requested: interval });
    }
    Ok(())
}
