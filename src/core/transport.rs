//! Kernel mode-setting transport.
//!
//! The `KmsDevice` trait is the narrow slice of the KMS API the display
//! pipeline needs: resource enumeration, the synchronous mode-set, page-flip
//! submission and a blocking wait for flip completion events. `DrmCard`
//! implements it on a real device node; tests drive a scripted device.

use std::fmt;
use std::io;
use std::num::NonZeroU32;
use std::time::Duration;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

object_id!(
    /// KMS connector object id
    ConnectorId
);
object_id!(
    /// KMS encoder object id
    EncoderId
);
object_id!(
    /// KMS CRTC object id
    CrtcId
);

/// Framebuffer id registered with the display driver.
///
/// Zero is never a valid scan-out id, so "no framebuffer" is expressed as
/// `Option<FramebufferId>` rather than a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(NonZeroU32);

impl FramebufferId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for FramebufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Topology
// ============================================================================

/// Set of CRTC indices an encoder can drive.
///
/// Bit `i` refers to the `i`-th entry of the device's ordered CRTC list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrtcMask(pub u32);

impl CrtcMask {
    pub fn contains(self, index: usize) -> bool {
        index < 32 && self.0 & (1 << index) != 0
    }

    /// First CRTC of `crtcs`, in list order, whose bit is set.
    pub fn first_in(self, crtcs: &[CrtcId]) -> Option<CrtcId> {
        crtcs
            .iter()
            .enumerate()
            .find(|(index, _)| self.contains(*index))
            .map(|(_, crtc)| *crtc)
    }
}

/// Display timing as reported by the driver.
pub trait DisplayMode: Clone + fmt::Debug {
    /// Active area in pixels.
    fn size(&self) -> (u16, u16);
    /// Vertical refresh in Hz.
    fn vrefresh(&self) -> u32;
    /// Whether the driver flagged this mode as preferred.
    fn is_preferred(&self) -> bool;
    fn name(&self) -> String;
}

/// Object ids of the device, in enumeration order.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub connectors: Vec<ConnectorId>,
    pub crtcs: Vec<CrtcId>,
}

#[derive(Debug, Clone)]
pub struct Connector<M> {
    pub id: ConnectorId,
    pub connected: bool,
    pub encoders: Vec<EncoderId>,
    pub modes: Vec<M>,
    /// Physical size in millimeters, `(0, 0)` when unknown.
    pub size_mm: (u32, u32),
    pub name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    pub id: EncoderId,
    pub possible_crtcs: CrtcMask,
}

/// What a mode-set binds to the CRTC. `None` in `set_crtc` unbinds it.
#[derive(Debug)]
pub struct CrtcBinding<'a, M> {
    pub framebuffer: FramebufferId,
    pub connector: ConnectorId,
    pub mode: &'a M,
}

impl<M> Clone for CrtcBinding<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for CrtcBinding<'_, M> {}

/// Page-flip completion delivered by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipEvent {
    /// CRTC the flip was scheduled on; routes the event to its owner.
    pub crtc: CrtcId,
    pub sequence: u32,
    pub timestamp: Duration,
}

// ============================================================================
// Device
// ============================================================================

pub trait KmsDevice {
    type Mode: DisplayMode;

    fn resources(&self) -> io::Result<Resources>;

    fn connector(&self, id: ConnectorId) -> io::Result<Connector<Self::Mode>>;

    fn encoder(&self, id: EncoderId) -> io::Result<Encoder>;

    /// Synchronous mode-set at offset (0, 0).
    fn set_crtc(&self, crtc: CrtcId, binding: Option<CrtcBinding<'_, Self::Mode>>) -> io::Result<()>;

    /// Schedules an asynchronous flip that reports completion as a `FlipEvent`.
    fn page_flip(&self, crtc: CrtcId, framebuffer: FramebufferId) -> io::Result<()>;

    /// Blocks until flip completion events are available, or `timeout`
    /// elapses, in which case an empty list is returned.
    fn wait_flip_events(&self, timeout: Option<Duration>) -> io::Result<Vec<FlipEvent>>;
}
