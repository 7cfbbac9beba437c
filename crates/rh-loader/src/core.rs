//! The interface every hosted emulation core implements

use rh_core::protocol::{Device, InputSource, VideoFrame};
use rh_core::CoreError;
use std::path::PathBuf;

/// Static description of a core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreInfo {
    /// Short registry name, e.g. "testpattern"
    pub name: String,
    pub version: String,
    /// Lower-case content extensions without the dot
    pub valid_extensions: Vec<String>,
    /// The core reads content from `GameInfo::path` itself instead of `data`
    pub need_fullpath: bool,
}

impl CoreInfo {
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.valid_extensions.iter().any(|e| *e == extension)
    }
}

/// Frame geometry reported by a core
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    /// Display aspect ratio; 0 means width / height
    pub aspect_ratio: f32,
}

impl Geometry {
    pub fn effective_aspect_ratio(&self) -> f32 {
        if self.aspect_ratio > 0.0 {
            self.aspect_ratio
        } else if self.base_height > 0 {
            self.base_width as f32 / self.base_height as f32
        } else {
            1.0
        }
    }
}

/// Audio/video timing and geometry of a loaded game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvInfo {
    pub geometry: Geometry,
    pub fps: f64,
    pub sample_rate: f64,
}

/// Host-side settings handed to the core before content is loaded
#[derive(Debug, Clone, PartialEq)]
pub struct CoreEnvironment {
    pub system_dir: PathBuf,
    pub save_dir: PathBuf,
    pub language: String,
    pub screen_refresh_rate: f32,
}

/// Content handed to `Core::load_game`
#[derive(Debug, Clone)]
pub struct GameInfo {
    pub path: PathBuf,
    /// Empty when the core asked for `need_fullpath`
    pub data: Vec<u8>,
}

/// A core option exposed to the frontend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub key: String,
    pub value: String,
    pub description: String,
}

/// Multi-disk content support
pub trait DiskControl {
    fn disk_count(&self) -> usize;
    fn current_disk(&self) -> usize;
    fn set_disk(&mut self, index: usize) -> Result<(), CoreError>;
}

/// Per-frame I/O channel between the host and a running core.
///
/// The core reads input through it and hands back at most one video frame
/// and any number of interleaved stereo audio samples.
pub struct FrameIo<'a> {
    input: &'a dyn InputSource,
    video: Option<VideoFrame>,
    duplicated: bool,
    audio: Vec<i16>,
}

impl<'a> FrameIo<'a> {
    pub fn new(input: &'a dyn InputSource) -> Self {
        Self {
            input,
            video: None,
            duplicated: false,
            audio: Vec::new(),
        }
    }

    pub fn input_state(&self, port: usize, device: Device, index: u32, id: u32) -> i16 {
        self.input.input_state(port, device, index, id)
    }

    /// Submit this frame's picture. A later call in the same frame wins.
    pub fn video_refresh(&mut self, frame: VideoFrame) {
        self.video = Some(frame);
        self.duplicated = false;
    }

    /// Ask the host to present the previous picture again
    pub fn video_dupe(&mut self) {
        self.video = None;
        self.duplicated = true;
    }

    /// Append interleaved stereo samples
    pub fn audio_sample_batch(&mut self, samples: &[i16]) -> usize {
        self.audio.extend_from_slice(samples);
        samples.len() / 2
    }

    pub fn audio_sample(&mut self, left: i16, right: i16) {
        self.audio.push(left);
        self.audio.push(right);
    }

    pub fn take_video(&mut self) -> Option<VideoFrame> {
        self.video.take()
    }

    pub fn is_duplicate(&self) -> bool {
        self.duplicated
    }

    pub fn audio(&self) -> &[i16] {
        &self.audio
    }
}

/// A pluggable emulation engine.
///
/// The host calls `configure`, then `load_game`, then any number of
/// `run`/`reset`/`serialize`/`unserialize` calls, all from one thread.
pub trait Core: Send {
    fn info(&self) -> CoreInfo;

    fn configure(&mut self, env: &CoreEnvironment) -> Result<(), CoreError>;

    fn load_game(&mut self, game: &GameInfo) -> Result<(), CoreError>;

    fn av_info(&self) -> AvInfo;

    /// Emulate exactly one frame
    fn run(&mut self, io: &mut FrameIo<'_>) -> Result<(), CoreError>;

    /// Return to the cold-start condition without reloading content
    fn reset(&mut self) -> Result<(), CoreError>;

    /// Exact size of a serialized state for the currently loaded content
    fn serialize_size(&self) -> usize;

    /// Write the full execution state into `out`, which is `serialize_size()` bytes
    fn serialize(&self, out: &mut [u8]) -> Result<(), CoreError>;

    /// Restore a state written by `serialize`.
    ///
    /// On error the core must be left exactly as it was.
    fn unserialize(&mut self, data: &[u8]) -> Result<(), CoreError>;

    fn save_ram(&self) -> Option<&[u8]> {
        None
    }

    fn save_ram_mut(&mut self) -> Option<&mut [u8]> {
        None
    }

    fn variables(&self) -> Vec<Variable> {
        Vec::new()
    }

    /// Returns false when `key` is not one of this core's options
    fn set_variable(&mut self, _key: &str, _value: &str) -> bool {
        false
    }

    fn disk_control(&mut self) -> Option<&mut dyn DiskControl> {
        None
    }

    fn unload_game(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_core::protocol::{NoInput, PixelFormat};

    #[test]
    fn test_frame_io_collects_output() {
        let input = NoInput;
        let mut io = FrameIo::new(&input);
        assert_eq!(io.audio_sample_batch(&[1, 2, 3, 4]), 2);
        io.audio_sample(5, 6);
        assert_eq!(io.audio(), &[1, 2, 3, 4, 5, 6]);

        io.video_refresh(VideoFrame {
            data: vec![0; 8],
            width: 2,
            height: 2,
            pitch: 4,
            format: PixelFormat::Rgb565,
        });
        assert!(!io.is_duplicate());
        assert!(io.take_video().is_some());
        assert!(io.take_video().is_none());
    }

    #[test]
    fn test_video_dupe_clears_pending_frame() {
        let input = NoInput;
        let mut io = FrameIo::new(&input);
        io.video_refresh(VideoFrame {
            data: vec![0; 4],
            width: 1,
            height: 1,
            pitch: 4,
            format: PixelFormat::Xrgb8888,
        });
        io.video_dupe();
        assert!(io.is_duplicate());
        assert!(io.take_video().is_none());
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let info = CoreInfo {
            name: "x".to_string(),
            version: "1".to_string(),
            valid_extensions: vec!["sfc".to_string(), "smc".to_string()],
            need_fullpath: false,
        };
        assert!(info.accepts_extension("SFC"));
        assert!(!info.accepts_extension("nes"));
    }

    #[test]
    fn test_geometry_aspect_fallback() {
        let geometry = Geometry {
            base_width: 320,
            base_height: 240,
            max_width: 320,
            max_height: 240,
            aspect_ratio: 0.0,
        };
        assert!((geometry.effective_aspect_ratio() - 4.0 / 3.0).abs() < f32::EPSILON);
    }
}
