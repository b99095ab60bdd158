//! `KmsDevice` on a DRM device node, via the `drm` crate.

use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::path::Path;
use std::time::Duration;

use drm::control::{
    self, connector, crtc, framebuffer, Device as ControlDevice, Event, ModeTypeFlags,
    PageFlipFlags, RawResourceHandle,
};

use crate::core::transport::*;

/// An open DRM card.
///
/// Clones share the same open file description, so framebuffers registered
/// through one clone are valid for page flips on another.
#[derive(Debug)]
pub struct DrmCard {
    fd: OwnedFd,
    force_probe: bool,
}

impl AsFd for DrmCard {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl drm::Device for DrmCard {}
impl ControlDevice for DrmCard {}

impl DrmCard {
    pub fn open(path: impl AsRef<Path>, force_probe: bool) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        Ok(Self {
            fd: file.into(),
            force_probe,
        })
    }

    /// Wraps a descriptor owned by someone else. The descriptor is duplicated.
    pub fn from_fd(fd: BorrowedFd<'_>, force_probe: bool) -> io::Result<Self> {
        Ok(Self {
            fd: fd.try_clone_to_owned()?,
            force_probe,
        })
    }

    pub fn try_clone(&self) -> io::Result<Self> {
        Self::from_fd(self.fd.as_fd(), self.force_probe)
    }

    /// Waits for the device to become readable. `false` on timeout.
    fn poll_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = poll_timeout_ms(timeout);

        loop {
            let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if ret >= 0 {
                return Ok(ret > 0);
            }

            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

fn handle<T: From<RawResourceHandle>>(raw: u32) -> io::Result<T> {
    control::from_u32(raw).ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
}

/// Milliseconds for `poll`, rounded up so a short timeout still waits.
fn poll_timeout_ms(timeout: Duration) -> libc::c_int {
    timeout.as_micros().div_ceil(1000).min(libc::c_int::MAX as u128) as libc::c_int
}

/// Re-expresses the driver's CRTC filter as a bitset over `crtcs` order.
fn crtc_mask(crtcs: &[crtc::Handle], possible: &[crtc::Handle]) -> CrtcMask {
    let mask = crtcs
        .iter()
        .take(32)
        .enumerate()
        .filter(|(_, crtc)| possible.contains(*crtc))
        .fold(0u32, |mask, (index, _)| mask | 1 << index);
    CrtcMask(mask)
}

impl DisplayMode for control::Mode {
    fn size(&self) -> (u16, u16) {
        control::Mode::size(self)
    }

    fn vrefresh(&self) -> u32 {
        control::Mode::vrefresh(self)
    }

    fn is_preferred(&self) -> bool {
        self.mode_type().contains(ModeTypeFlags::PREFERRED)
    }

    fn name(&self) -> String {
        control::Mode::name(self).to_string_lossy().into_owned()
    }
}

impl KmsDevice for DrmCard {
    type Mode = control::Mode;

    fn resources(&self) -> io::Result<Resources> {
        let res = self.resource_handles()?;
        Ok(Resources {
            connectors: res.connectors().iter().map(|&h| ConnectorId(h.into())).collect(),
            crtcs: res.crtcs().iter().map(|&h| CrtcId(h.into())).collect(),
        })
    }

    fn connector(&self, id: ConnectorId) -> io::Result<Connector<control::Mode>> {
        let info = self.get_connector(handle(id.0)?, self.force_probe)?;

        Ok(Connector {
            id,
            connected: info.state() == connector::State::Connected,
            encoders: info.encoders().iter().map(|&h| EncoderId(h.into())).collect(),
            modes: info.modes().to_vec(),
            size_mm: info.size().unwrap_or((0, 0)),
            name: format!("{:?}-{}", info.interface(), info.interface_id()),
        })
    }

    fn encoder(&self, id: EncoderId) -> io::Result<Encoder> {
        let info = self.get_encoder(handle(id.0)?)?;
        let res = self.resource_handles()?;

        let possible = res.filter_crtcs(info.possible_crtcs());

        Ok(Encoder {
            id,
            possible_crtcs: crtc_mask(res.crtcs(), &possible),
        })
    }

    fn set_crtc(&self, crtc: CrtcId, binding: Option<CrtcBinding<'_, control::Mode>>) -> io::Result<()> {
        let crtc_handle: crtc::Handle = handle(crtc.0)?;

        match binding {
            Some(binding) => {
                let fb: framebuffer::Handle = handle(binding.framebuffer.raw())?;
                let conn: connector::Handle = handle(binding.connector.0)?;
                ControlDevice::set_crtc(self, crtc_handle, Some(fb), (0, 0), &[conn], Some(*binding.mode))
            }
            None => ControlDevice::set_crtc(self, crtc_handle, None, (0, 0), &[], None),
        }
    }

    fn page_flip(&self, crtc: CrtcId, framebuffer: FramebufferId) -> io::Result<()> {
        let crtc_handle: crtc::Handle = handle(crtc.0)?;
        let fb: framebuffer::Handle = handle(framebuffer.raw())?;
        ControlDevice::page_flip(self, crtc_handle, fb, PageFlipFlags::EVENT, None)
    }

    fn wait_flip_events(&self, timeout: Option<Duration>) -> io::Result<Vec<FlipEvent>> {
        if let Some(timeout) = timeout {
            if !self.poll_readable(timeout)? {
                return Ok(Vec::new());
            }
        }

        let events = self
            .receive_events()?
            .filter_map(|event| match event {
                Event::PageFlip(flip) => Some(FlipEvent {
                    crtc: CrtcId(flip.crtc.into()),
                    sequence: flip.frame,
                    timestamp: flip.duration,
                }),
                _ => None,
            })
            .collect();

        Ok(events)
    }
}
