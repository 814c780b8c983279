//! DRM device handling

use std::fs::OpenOptions;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::Path;

use drm::Device;
use drm::control::Device as ControlDevice;
use log::debug;

use crate::error::SessionError;

/// An open handle to a DRM device node.
///
/// Owns the file descriptor. Buffers and framebuffers allocated through it
/// that are not freed explicitly are released by the kernel when the
/// descriptor closes.
pub struct DrmDevice {
    fd: OwnedFd,
}

impl Device for DrmDevice {}

impl AsFd for DrmDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

// Mode-setting operations go through the control interface
impl ControlDevice for DrmDevice {}

impl DrmDevice {
    /// Opens the device node read-write.
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| SessionError::DeviceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        let device = Self { fd: file.into() };

        if let Ok(driver) = device.get_driver() {
            debug!(
                "DRM driver: {} - {}",
                driver.name().to_string_lossy(),
                driver.description().to_string_lossy()
            );
        }

        Ok(device)
    }

    /// Returns a reference to the underlying file descriptor.
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
