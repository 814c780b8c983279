//! Shared resources for the stillframe binary and its display backend

mod args;
mod image;

pub use args::{GlobalArgs, Pattern};
pub use image::RawImage;
