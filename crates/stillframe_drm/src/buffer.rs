//! Dumb-buffer allocation and framebuffer registration
//!
//! Dumb buffers are plain CPU-writable device memory, enough to scan out a
//! static frame without any GPU rendering.

use std::io;
use std::num::NonZeroU32;

use drm::buffer::{self, DrmFourcc};
use drm::control::{Device as ControlDevice, framebuffer};
use drm_ffi::mode::dumbbuffer;
use log::{debug, warn};

use crate::device::DrmDevice;
use crate::error::SessionError;

/// Color depth passed when registering the framebuffer.
const DEPTH: u32 = 24;
/// Bits per pixel of the dumb buffer.
const BPP: u32 = 32;

/// A CPU-writable scanout buffer.
///
/// Built in two steps: `create` claims the device memory, `register` wraps
/// it in a displayable framebuffer object. Destruction is driven by the
/// owning session so it happens strictly after the mapping is gone.
pub struct DumbFrame {
    handle: buffer::Handle,
    fb: Option<framebuffer::Handle>,
    width: u32,
    height: u32,
    pitch: u32,
    size: u64,
}

impl DumbFrame {
    /// Allocates device memory for `width × height` at 32 bits per pixel.
    pub fn create(device: &DrmDevice, width: u32, height: u32) -> Result<Self, SessionError> {
        let raw = dumbbuffer::create(device.fd(), width, height, BPP, 0)
            .map_err(|err| SessionError::AllocationFailed(err.into()))?;

        let handle = NonZeroU32::new(raw.handle)
            .map(buffer::Handle::from)
            .ok_or_else(|| {
                SessionError::AllocationFailed(io::Error::other(
                    "kernel returned a null buffer handle",
                ))
            })?;

        debug!(
            "Created dumb buffer: {}x{}, pitch={}, {} bytes",
            width, height, raw.pitch, raw.size
        );

        Ok(Self {
            handle,
            fb: None,
            width,
            height,
            pitch: raw.pitch,
            size: raw.size,
        })
    }

    /// Registers the buffer as a displayable framebuffer object.
    pub fn register(&mut self, device: &DrmDevice) -> Result<framebuffer::Handle, SessionError> {
        let fb = device
            .add_framebuffer(self, DEPTH, BPP)
            .map_err(SessionError::FramebufferRegistrationFailed)?;
        self.fb = Some(fb);

        debug!("Registered framebuffer {fb:?}");

        Ok(fb)
    }

    /// Looks up the fake mmap offset of the buffer memory.
    pub fn map_offset(&self, device: &DrmDevice) -> Result<u64, SessionError> {
        let info = dumbbuffer::map(device.fd(), self.raw_handle(), 0, 0)
            .map_err(|err| SessionError::MappingFailed(err.into()))?;

        Ok(info.offset)
    }

    /// Allocation size in bytes as reported by the kernel.
    pub fn byte_len(&self) -> u64 {
        self.size
    }

    /// Bytes per row.
    pub fn row_pitch(&self) -> u32 {
        self.pitch
    }

    /// Releases the framebuffer object and the device memory.
    ///
    /// Failures are logged, not propagated; teardown keeps going so the
    /// remaining resources are still released.
    pub fn destroy(self, device: &DrmDevice) {
        if let Some(fb) = self.fb {
            if let Err(err) = device.destroy_framebuffer(fb) {
                warn!("Failed to remove framebuffer: {err}");
            }
        }
        if let Err(err) = dumbbuffer::destroy(device.fd(), self.raw_handle()) {
            warn!("Failed to destroy dumb buffer: {err}");
        }

        debug!("Dropped dumb buffer");
    }

    fn raw_handle(&self) -> u32 {
        self.handle.into()
    }
}

impl buffer::Buffer for DumbFrame {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn format(&self) -> DrmFourcc {
        DrmFourcc::Xrgb8888
    }

    fn pitch(&self) -> u32 {
        self.pitch
    }

    fn handle(&self) -> buffer::Handle {
        self.handle
    }
}
