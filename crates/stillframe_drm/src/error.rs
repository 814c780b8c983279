//! Typed failure kinds for session setup, drawing, and teardown

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while acquiring or using the display.
///
/// Each setup step maps to exactly one kind, so a failure names the
/// operation that rejected it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot open DRM device {}: {source}", path.display())]
    DeviceUnavailable { path: PathBuf, source: io::Error },

    #[error("DRM resource enumeration failed: {0}")]
    ResourceQueryFailed(io::Error),

    #[error("No connected display output found")]
    NoDisplayConnected,

    #[error("Connected output reports no display modes")]
    NoModesAvailable,

    #[error("No encoder drives the selected output")]
    NoEncoderFound,

    #[error("Dumb buffer allocation failed: {0}")]
    AllocationFailed(io::Error),

    #[error("Framebuffer registration failed: {0}")]
    FramebufferRegistrationFailed(io::Error),

    #[error("Mapping the dumb buffer failed: {0}")]
    MappingFailed(io::Error),

    #[error("CRTC state query failed: {0}")]
    CrtcQueryFailed(io::Error),

    #[error("Mode-set commit failed: {0}")]
    ModeSetFailed(io::Error),

    #[error("Image holds {actual} pixels, expected {expected}")]
    ImageSizeMismatch { expected: usize, actual: usize },

    #[error("Image of {needed} bytes does not fit the {available} byte framebuffer")]
    OutOfBounds { needed: usize, available: usize },

    #[error("Display session is closed")]
    SessionClosed,
}
