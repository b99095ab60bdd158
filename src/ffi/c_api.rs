// C FFI Exports (Plain C, no mangling)
// Callable from a compositor written against the framebuffer HAL.
// Every function returns 0 on success or a negative errno.
use std::io;
use std::os::fd::BorrowedFd;
use std::os::raw::{c_int, c_void};

use anyhow::anyhow;

use super::errors::status;
use crate::config::DisplayConfig;
use crate::core::handle::HandleResolver;
use crate::core::{DrmCard, FramebufferDevice};
use crate::util::logging::{C_API, DEVICE};

/// Maps a buffer handle to its framebuffer id, or 0 if it has none.
pub type KmsFbResolveFn = extern "C" fn(user_data: *mut c_void, handle: *const c_void) -> u32;

/// Closes the allocator device. Returns 0 or a negative errno.
pub type KmsFbCloseFn = extern "C" fn(user_data: *mut c_void) -> c_int;

/// Handle resolution through the allocator's callbacks.
pub struct CallbackResolver {
    resolve: KmsFbResolveFn,
    close: Option<KmsFbCloseFn>,
    user_data: *mut c_void,
}

impl HandleResolver for CallbackResolver {
    type Handle = c_void;

    fn resolve(&self, handle: &c_void) -> anyhow::Result<u32> {
        Ok((self.resolve)(self.user_data, handle as *const c_void))
    }

    fn close(&mut self) -> anyhow::Result<()> {
        let Some(close) = self.close.take() else {
            return Ok(());
        };

        match close(self.user_data) {
            0 => Ok(()),
            ret => Err(anyhow!(io::Error::from_raw_os_error(-ret)).context("allocator close failed")),
        }
    }
}

/// Opaque device handed to C.
pub type KmsFbDevice = FramebufferDevice<DrmCard, CallbackResolver>;

/// Display metrics, filled by `KmsFbGetInfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct KmsFbInfo {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: c_int,
    pub xdpi: f32,
    pub ydpi: f32,
    pub fps: f32,
    pub min_swap_interval: c_int,
    pub max_swap_interval: c_int,
    pub flags: u32,
}

/// Open the display pipeline on `fd`. The descriptor is duplicated; the
/// caller keeps ownership of its own copy.
#[no_mangle]
pub extern "C" fn KmsFbOpen(
    fd: c_int,
    resolve: Option<KmsFbResolveFn>,
    close: Option<KmsFbCloseFn>,
    user_data: *mut c_void,
    out: *mut *mut KmsFbDevice,
) -> c_int {
    let Some(resolve) = resolve else {
        return -libc::EINVAL;
    };
    if out.is_null() {
        return -libc::EINVAL;
    }
    if fd < 0 {
        return -libc::EBADF;
    }

    let config = DisplayConfig::from_env();

    let card = match DrmCard::from_fd(unsafe { BorrowedFd::borrow_raw(fd) }, config.force_probe) {
        Ok(card) => card,
        Err(e) => {
            crate::wlog!(C_API, "Failed to duplicate display fd {}: {}", fd, e);
            return -e.raw_os_error().unwrap_or(libc::EIO);
        }
    };

    let resolver = CallbackResolver {
        resolve,
        close,
        user_data,
    };

    match FramebufferDevice::open(card, resolver, &config) {
        Ok(device) => {
            let info = device.info();
            crate::wlog!(
                DEVICE,
                "Opened {}x{}@{} on connector {} / CRTC {}",
                info.width,
                info.height,
                info.fps,
                info.connector,
                info.crtc
            );
            unsafe { *out = Box::into_raw(Box::new(device)) };
            0
        }
        Err(e) => {
            crate::wlog!(C_API, "Failed to open display: {}", e);
            e.to_errno()
        }
    }
}

/// Present a buffer. A null handle is rejected with -EINVAL.
#[no_mangle]
pub extern "C" fn KmsFbPost(device: *mut KmsFbDevice, handle: *const c_void) -> c_int {
    if device.is_null() {
        return -libc::EINVAL;
    }

    let device = unsafe { &mut *device };
    let result = device.present(unsafe { handle.as_ref() });
    if let Err(e) = &result {
        if !e.is_recoverable() {
            crate::wlog!(C_API, "Post failed: {}", e);
        }
    }
    status(&result)
}

#[no_mangle]
pub extern "C" fn KmsFbSetSwapInterval(device: *mut KmsFbDevice, interval: c_int) -> c_int {
    if device.is_null() {
        return -libc::EINVAL;
    }

    let device = unsafe { &*device };
    status(&device.set_swap_interval(interval))
}

#[no_mangle]
pub extern "C" fn KmsFbCompositionComplete(device: *mut KmsFbDevice) -> c_int {
    if device.is_null() {
        return -libc::EINVAL;
    }

    let device = unsafe { &*device };
    status(&device.composition_complete())
}

/// Turn the screen off (`enable == 0`) or allow the next post to turn it on.
#[no_mangle]
pub extern "C" fn KmsFbEnableScreen(device: *mut KmsFbDevice, enable: c_int) -> c_int {
    if device.is_null() {
        return -libc::EINVAL;
    }

    let device = unsafe { &mut *device };
    let result = device.enable_screen(enable != 0);
    if let Err(e) = &result {
        crate::wlog!(C_API, "Screen state {} failed: {}", enable, e);
    }
    status(&result)
}

#[no_mangle]
pub extern "C" fn KmsFbGetInfo(device: *const KmsFbDevice, out: *mut KmsFbInfo) -> c_int {
    if device.is_null() || out.is_null() {
        return -libc::EINVAL;
    }

    let info = unsafe { &*device }.info();
    let info = KmsFbInfo {
        width: info.width,
        height: info.height,
        stride: info.stride,
        format: info.format.hal_code(),
        xdpi: info.xdpi,
        ydpi: info.ydpi,
        fps: info.fps,
        min_swap_interval: info.min_swap_interval,
        max_swap_interval: info.max_swap_interval,
        flags: info.flags,
    };
    unsafe { *out = info };
    0
}

/// Close the device. `device` is invalid afterwards, whatever the result.
#[no_mangle]
pub extern "C" fn KmsFbClose(device: *mut KmsFbDevice) -> c_int {
    if device.is_null() {
        return -libc::EINVAL;
    }

    let device = unsafe { Box::from_raw(device) };
    match device.close() {
        Ok(()) => 0,
        Err(e) => {
            crate::wlog!(C_API, "Close failed: {:#}", e);
            e.downcast_ref::<io::Error>()
                .and_then(io::Error::raw_os_error)
                .map(|errno| -errno)
                .unwrap_or(-libc::EIO)
        }
    }
}
