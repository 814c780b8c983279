//! Packed 32-bit source images
//!
//! A `RawImage` holds the pixel words handed to the display backend, which
//! writes each word into scanout memory most-significant byte first. Pixels
//! are therefore packed so that memory receives `[B, G, R, X]`, the byte
//! order of little-endian XRGB8888.

use std::fs;
use std::path::Path;

use anyhow::Context;
use log::debug;

/// Bytes per packed pixel word
const BYTES_PER_PIXEL: usize = 4;

/// A width × height block of packed 32-bit pixels in row-major order.
pub struct RawImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl RawImage {
    /// Loads a raw dump of `width × height × 4` bytes.
    ///
    /// Four file bytes form one pixel word most-significant byte first, so
    /// the file's bytes reach the framebuffer in file order.
    pub fn from_file(path: &Path, width: u32, height: u32) -> anyhow::Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read image file {}", path.display()))?;

        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if bytes.len() != expected {
            anyhow::bail!(
                "Image file {} holds {} bytes, expected {} for {}x{}",
                path.display(),
                bytes.len(),
                expected,
                width,
                height
            );
        }

        let pixels = bytes
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|word| u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
            .collect();

        debug!("Loaded raw image {}: {}x{}", path.display(), width, height);

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Standard eight-bar color pattern.
    pub fn color_bars(width: u32, height: u32) -> Self {
        let colors: [(u8, u8, u8); 8] = [
            (255, 255, 255), // White
            (255, 255, 0),   // Yellow
            (0, 255, 255),   // Cyan
            (0, 255, 0),     // Green
            (255, 0, 255),   // Magenta
            (255, 0, 0),     // Red
            (0, 0, 255),     // Blue
            (0, 0, 0),       // Black
        ];
        let bar_width = width / 8;

        Self::generate(width, height, |x, _| {
            let bar_index = (x / bar_width.max(1)).min(7) as usize;
            colors[bar_index]
        })
    }

    /// Two-axis gradient: red increases left-to-right, blue top-to-bottom.
    pub fn gradient(width: u32, height: u32) -> Self {
        Self::generate(width, height, |x, y| {
            let r = ((x * 255) / width.max(1)) as u8;
            let b = ((y * 255) / height.max(1)) as u8;
            (r, 0, b)
        })
    }

    /// Checkerboard of `tile_size` squares alternating between two colors.
    pub fn checkerboard(
        width: u32,
        height: u32,
        tile_size: u32,
        color1: (u8, u8, u8),
        color2: (u8, u8, u8),
    ) -> Self {
        Self::generate(width, height, |x, y| {
            let tile_x = x / tile_size.max(1);
            let tile_y = y / tile_size.max(1);
            if (tile_x + tile_y) % 2 == 1 { color1 } else { color2 }
        })
    }

    fn generate(width: u32, height: u32, color_at: impl Fn(u32, u32) -> (u8, u8, u8)) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);

        for y in 0..height {
            for x in 0..width {
                let (r, g, b) = color_at(x, y);
                pixels.push(pack(r, g, b));
            }
        }

        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed pixel words in row-major order.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}

/// Packs a color so scanout memory receives `[B, G, R, X]` once the word's
/// four bytes are written most-significant first.
fn pack(r: u8, g: u8, b: u8) -> u32 {
    u32::from_be_bytes([b, g, r, 0xFF])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("stillframe-{}-{name}", std::process::id()))
    }

    #[test]
    fn pack_orders_bytes_for_xrgb_memory() {
        let pixel = pack(0x11, 0x22, 0x33);

        assert_eq!(pixel.to_be_bytes(), [0x33, 0x22, 0x11, 0xFF]);
    }

    #[test]
    fn patterns_cover_the_full_resolution() {
        for image in [
            RawImage::color_bars(48, 32),
            RawImage::gradient(48, 32),
            RawImage::checkerboard(48, 32, 8, (255, 255, 255), (0, 0, 0)),
        ] {
            assert_eq!(image.width(), 48);
            assert_eq!(image.height(), 32);
            assert_eq!(image.pixels().len(), 48 * 32);
        }
    }

    #[test]
    fn color_bars_start_white_and_end_black() {
        let image = RawImage::color_bars(80, 10);

        assert_eq!(image.pixels()[0], pack(255, 255, 255));
        assert_eq!(*image.pixels().last().unwrap(), pack(0, 0, 0));
    }

    #[test]
    fn gradient_corners() {
        let image = RawImage::gradient(100, 100);

        // top-left is black, red grows along x, blue along y
        assert_eq!(image.pixels()[0], pack(0, 0, 0));
        assert_eq!(image.pixels()[99], pack(252, 0, 0));
        assert_eq!(image.pixels()[99 * 100], pack(0, 0, 252));
    }

    #[test]
    fn checkerboard_alternates_at_tile_boundaries() {
        let white = (255, 255, 255);
        let black = (0, 0, 0);
        let image = RawImage::checkerboard(16, 16, 4, white, black);

        assert_eq!(image.pixels()[0], pack(0, 0, 0));
        assert_eq!(image.pixels()[4], pack(255, 255, 255));
        assert_eq!(image.pixels()[4 * 16], pack(255, 255, 255));
        assert_eq!(image.pixels()[4 * 16 + 4], pack(0, 0, 0));
    }

    #[test]
    fn from_file_keeps_byte_order() {
        let path = temp_path("image-order.raw");
        fs::write(&path, [0x12, 0x34, 0x56, 0x78]).unwrap();

        let image = RawImage::from_file(&path, 1, 1).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(image.pixels(), &[0x12345678]);
    }

    #[test]
    fn from_file_rejects_wrong_sizes() {
        let path = temp_path("image-short.raw");
        fs::write(&path, [0u8; 12]).unwrap();

        let result = RawImage::from_file(&path, 2, 2);
        fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn from_file_rejects_missing_files() {
        let path = temp_path("image-missing.raw");

        assert!(RawImage::from_file(&path, 2, 2).is_err());
    }
}
