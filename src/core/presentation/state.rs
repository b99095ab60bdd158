//! Scan-out state of the single output pipeline.

use crate::core::transport::FramebufferId;

/// Framebuffers known to the CRTC.
///
/// `current` is only updated once the hardware is known to show the
/// framebuffer: after a synchronous mode-set, or when the kernel reports
/// that the pending flip landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentationState {
    /// On screen.
    pub current: Option<FramebufferId>,
    /// Flip requested, completion not yet received.
    pub pending: Option<FramebufferId>,
}

/// Phase of the `(current, pending)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// CRTC not bound to a framebuffer; the next present performs a mode-set.
    Disabled,
    Visible(FramebufferId),
    Flipping { from: FramebufferId, to: FramebufferId },
}

impl PresentationState {
    pub fn phase(&self) -> Phase {
        match (self.current, self.pending) {
            (Some(from), Some(to)) => Phase::Flipping { from, to },
            (Some(fb), None) => Phase::Visible(fb),
            // A pending flip without a visible framebuffer cannot be
            // scheduled; treat it as disabled.
            (None, _) => Phase::Disabled,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.current.is_none()
    }

    /// Promotes the pending framebuffer to current. Returns it, if any.
    pub fn complete_flip(&mut self) -> Option<FramebufferId> {
        let landed = self.pending.take()?;
        self.current = Some(landed);
        Some(landed)
    }

    pub fn disable(&mut self) {
        self.current = None;
        self.pending = None;
    }
}

/// Counters over the lifetime of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentationStats {
    pub mode_sets: u64,
    pub flips_scheduled: u64,
    pub flips_completed: u64,
    /// Drains that returned without the completion event.
    pub lost_events: u64,
    /// Events that arrived after their flip was given up as lost.
    pub late_events: u64,
    pub busy_flips: u64,
    /// Presents of the framebuffer already on screen.
    pub redundant_presents: u64,
}
