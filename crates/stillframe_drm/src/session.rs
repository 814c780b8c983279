//! Display session setup, drawing, and teardown
//!
//! A session is a linear acquisition of everything needed to put one frame
//! on screen: device, connector, encoder, mode, dumb buffer, framebuffer,
//! mapping, mode binding. Acquired resources unwind in reverse order on
//! every failure path and on drop.

use std::path::Path;

use drm::control::{Device as ControlDevice, Mode, connector, crtc};
use log::{debug, info};

use crate::buffer::DumbFrame;
use crate::device::DrmDevice;
use crate::error::SessionError;
use crate::mapping::MappedRegion;

/// Bytes written per pixel.
const BYTES_PER_PIXEL: usize = 4;

/// The connector, CRTC and mode a session scans out to.
#[derive(Debug, Clone, Copy)]
struct ScanoutTarget {
    connector: connector::Handle,
    crtc: crtc::Handle,
    mode: Mode,
}

/// An exclusive hold on one display output showing one CPU-written frame.
///
/// `open` acquires every resource, `draw` writes pixels into the mapped
/// buffer, `close` (or drop) releases everything in reverse order.
pub struct DisplaySession {
    device: DrmDevice,
    target: ScanoutTarget,
    frame: Option<DumbFrame>,
    mapping: Option<MappedRegion>,
}

impl DisplaySession {
    /// Opens the device, selects the first connected output, and binds a
    /// zero-filled frame to it.
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let device = DrmDevice::open(path)?;
        let target = select_target(&device)?;

        let mut session = Self {
            device,
            target,
            frame: None,
            mapping: None,
        };
        // On error the half-built session drops here, unwinding exactly
        // the resources acquired so far.
        session.bind()?;

        Ok(session)
    }

    fn bind(&mut self) -> Result<(), SessionError> {
        let (width, height) = self.resolution();

        let frame = self
            .frame
            .insert(DumbFrame::create(&self.device, width, height)?);
        let fb = frame.register(&self.device)?;

        let offset = frame.map_offset(&self.device)?;
        let len = frame.byte_len() as usize;
        let region = MappedRegion::map(self.device.fd(), offset, len)
            .map_err(SessionError::MappingFailed)?;
        let region = self.mapping.insert(region);

        let current = self
            .device
            .get_crtc(self.target.crtc)
            .map_err(SessionError::CrtcQueryFailed)?;
        debug!(
            "Current CRTC mode: {:?}, framebuffer: {:?}",
            current.mode().map(|mode| mode.size()),
            current.framebuffer()
        );

        self.device
            .set_crtc(
                self.target.crtc,
                Some(fb),
                (0, 0),
                &[self.target.connector],
                Some(self.target.mode),
            )
            .map_err(SessionError::ModeSetFailed)?;

        // deterministic first frame: solid black
        region.as_mut_slice().fill(0);

        info!("Display session bound at {width}x{height}");

        Ok(())
    }

    /// Width and height of the active mode in pixels.
    pub fn resolution(&self) -> (u32, u32) {
        let (width, height) = self.target.mode.size();
        (u32::from(width), u32::from(height))
    }

    /// Writes `width × height` packed pixels into the mapped frame.
    ///
    /// Each pixel word's four bytes land in scanout memory
    /// most-significant first at offset `(y*width + x)*4`.
    pub fn draw(&mut self, pixels: &[u32], width: u32, height: u32) -> Result<(), SessionError> {
        let Some(region) = self.mapping.as_mut() else {
            return Err(SessionError::SessionClosed);
        };

        blit(region.as_mut_slice(), pixels, width as usize, height as usize)
    }

    /// Releases the mapping, the framebuffer, the buffer, and the device.
    pub fn close(mut self) {
        self.teardown();
        info!("Display session closed");
    }

    fn teardown(&mut self) {
        // reverse acquisition order: mapping first, then the frame; the
        // device fd closes when the session itself goes away
        if self.mapping.take().is_some() {
            debug!("Unmapped scanout memory");
        }
        if let Some(frame) = self.frame.take() {
            frame.destroy(&self.device);
        }
    }
}

impl Drop for DisplaySession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Picks the connector, CRTC and mode to scan out to.
fn select_target(device: &DrmDevice) -> Result<ScanoutTarget, SessionError> {
    let resources = device
        .resource_handles()
        .map_err(SessionError::ResourceQueryFailed)?;

    let mut probed = Vec::new();
    for &handle in resources.connectors() {
        if let Ok(info) = device.get_connector(handle, false) {
            debug!("Found connector: {:?} ({:?})", info.interface(), info.state());
            probed.push(info);
        }
    }

    let index = first_connected(
        probed
            .iter()
            .map(|info| (info.state(), info.modes().len())),
    )?;
    let chosen = &probed[index];

    // index-0 policy: the first mode is the connector's preferred one
    let mode = *chosen
        .modes()
        .first()
        .ok_or(SessionError::NoModesAvailable)?;

    let wanted = chosen
        .current_encoder()
        .ok_or(SessionError::NoEncoderFound)?;

    let mut encoder = None;
    for &handle in resources.encoders() {
        if let Ok(info) = device.get_encoder(handle) {
            if info.handle() == wanted {
                encoder = Some(info);
                break;
            }
        }
    }
    let encoder = encoder.ok_or(SessionError::NoEncoderFound)?;
    let crtc = encoder.crtc().ok_or(SessionError::NoEncoderFound)?;

    info!(
        "Selected output: {:?} @ {}x{} {}Hz",
        chosen.interface(),
        mode.size().0,
        mode.size().1,
        mode.vrefresh()
    );

    Ok(ScanoutTarget {
        connector: chosen.handle(),
        crtc,
        mode,
    })
}

/// Index of the first connector that is connected and has at least one
/// mode. Enumeration order decides ties.
fn first_connected(
    probes: impl Iterator<Item = (connector::State, usize)>,
) -> Result<usize, SessionError> {
    let mut connected_without_modes = false;

    for (index, (state, mode_count)) in probes.enumerate() {
        if state != connector::State::Connected {
            continue;
        }
        if mode_count == 0 {
            connected_without_modes = true;
            continue;
        }
        return Ok(index);
    }

    if connected_without_modes {
        Err(SessionError::NoModesAvailable)
    } else {
        Err(SessionError::NoDisplayConnected)
    }
}

/// Copies packed pixels into the target, four bytes per pixel in
/// most-significant-first order, after validating both sizes.
fn blit(dst: &mut [u8], pixels: &[u32], width: usize, height: usize) -> Result<(), SessionError> {
    let count = width
        .checked_mul(height)
        .ok_or(SessionError::OutOfBounds {
            needed: usize::MAX,
            available: dst.len(),
        })?;

    if pixels.len() != count {
        return Err(SessionError::ImageSizeMismatch {
            expected: count,
            actual: pixels.len(),
        });
    }

    let needed = count
        .checked_mul(BYTES_PER_PIXEL)
        .ok_or(SessionError::OutOfBounds {
            needed: usize::MAX,
            available: dst.len(),
        })?;
    if needed > dst.len() {
        return Err(SessionError::OutOfBounds {
            needed,
            available: dst.len(),
        });
    }

    for y in 0..height {
        for x in 0..width {
            let index = y * width + x;
            let offset = index * BYTES_PER_PIXEL;
            dst[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&pixels[index].to_be_bytes());
        }
    }

    Ok(())
}
