//! KMS display backend
//!
//! Puts a single CPU-written frame on the first connected output of a DRM
//! device: legacy mode-setting, one dumb buffer, no page flipping. The
//! session owns every kernel resource it acquires and releases them in
//! reverse order when it is closed or dropped.

mod buffer;
mod device;
mod error;
mod mapping;
mod session;

pub use buffer::DumbFrame;
pub use device::DrmDevice;
pub use error::SessionError;
pub use mapping::MappedRegion;
pub use session::DisplaySession;
