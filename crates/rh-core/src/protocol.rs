//! Types shared between the host and a loaded emulation core
//!
//! These follow the libretro conventions: cores poll input by
//! `(port, device, index, id)` and emit video frames in one of a small set
//! of packed pixel formats with an explicit row pitch.

/// Input device classes a core can poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Device {
    Joypad = 1,
    Analog = 5,
    Pointer = 6,
}

/// Digital joypad button ids (libretro numbering)
pub mod joypad {
    pub const B: u32 = 0;
    pub const Y: u32 = 1;
    pub const SELECT: u32 = 2;
    pub const START: u32 = 3;
    pub const UP: u32 = 4;
    pub const DOWN: u32 = 5;
    pub const LEFT: u32 = 6;
    pub const RIGHT: u32 = 7;
    pub const A: u32 = 8;
    pub const X: u32 = 9;
    pub const L: u32 = 10;
    pub const R: u32 = 11;
    pub const L2: u32 = 12;
    pub const R2: u32 = 13;
    pub const L3: u32 = 14;
    pub const R3: u32 = 15;

    /// Number of joypad button ids
    pub const COUNT: u32 = 16;
}

/// Analog stick indices and axis ids
pub mod analog {
    pub const INDEX_LEFT: u32 = 0;
    pub const INDEX_RIGHT: u32 = 1;

    pub const AXIS_X: u32 = 0;
    pub const AXIS_Y: u32 = 1;
}

/// Pointer (touch) ids
pub mod pointer {
    pub const X: u32 = 0;
    pub const Y: u32 = 1;
    pub const PRESSED: u32 = 2;
}

/// Read-only view of controller state offered to a core while it runs a frame
pub trait InputSource {
    /// Current value for the given input; 0 for anything unknown.
    ///
    /// Digital ids return 0 or 1, analog axes and pointer coordinates return
    /// the full `i16` range.
    fn input_state(&self, port: usize, device: Device, index: u32, id: u32) -> i16;
}

/// Input source with every control released
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn input_state(&self, _port: usize, _device: Device, _index: u32, _id: u32) -> i16 {
        0
    }
}

/// Packed pixel formats a core can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 16-bit, 5-6-5, native endian
    #[default]
    Rgb565,
    /// 32-bit, X8R8G8B8, native endian
    Xrgb8888,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb565 => 2,
            Self::Xrgb8888 => 4,
        }
    }
}

/// One video frame produced by a core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes between the start of consecutive rows
    pub pitch: usize,
    pub format: PixelFormat,
}

impl VideoFrame {
    /// Minimum buffer length for the declared geometry
    pub fn required_len(&self) -> usize {
        if self.height == 0 {
            return 0;
        }
        self.pitch * (self.height as usize - 1)
            + self.width as usize * self.format.bytes_per_pixel()
    }

    /// Row `y` without trailing pitch padding
    pub fn row(&self, y: u32) -> &[u8] {
        let start = self.pitch * y as usize;
        let len = self.width as usize * self.format.bytes_per_pixel();
        &self.data[start..start + len]
    }
}
