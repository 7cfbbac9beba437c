//! Frame to texture conversion
//!
//! Cores hand over packed 16- or 32-bit pixels with an arbitrary row pitch.
//! Backends consume tightly packed RGBA8, so every frame is unpacked here
//! row by row, skipping pitch padding.

use rh_core::protocol::{PixelFormat, VideoFrame};
use rh_core::VideoError;

/// Tightly packed RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl Texture {
    /// Convert a core frame
    pub fn from_frame(frame: &VideoFrame) -> Result<Self, VideoError> {
        let needed = frame.required_len();
        if frame.data.len() < needed {
            return Err(VideoError::FrameTooSmall {
                needed,
                actual: frame.data.len(),
            });
        }
        let row_bytes = frame.width as usize * frame.format.bytes_per_pixel();
        if frame.height > 0 && frame.pitch < row_bytes {
            return Err(VideoError::FrameTooSmall {
                needed: row_bytes,
                actual: frame.pitch,
            });
        }

        let mut pixels = Vec::with_capacity(frame.width as usize * frame.height as usize);
        for y in 0..frame.height {
            let row = frame.row(y);
            match frame.format {
                PixelFormat::Rgb565 => pixels.extend(
                    row.chunks_exact(2)
                        .map(|p| rgb565_to_rgba(u16::from_ne_bytes([p[0], p[1]]))),
                ),
                PixelFormat::Xrgb8888 => pixels.extend(
                    row.chunks_exact(4)
                        .map(|p| xrgb8888_to_rgba(u32::from_ne_bytes([p[0], p[1], p[2], p[3]]))),
                ),
            }
        }

        Ok(Self {
            width: frame.width,
            height: frame.height,
            pixels,
        })
    }

    /// Raw RGBA bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

fn rgb565_to_rgba(value: u16) -> [u8; 4] {
    let r = ((value >> 11) & 0x1F) as u8;
    let g = ((value >> 5) & 0x3F) as u8;
    let b = (value & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 0xFF]
}

fn xrgb8888_to_rgba(value: u32) -> [u8; 4] {
    let [b, g, r, _] = value.to_le_bytes();
    [r, g, b, 0xFF]
}
