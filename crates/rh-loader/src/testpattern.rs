//! Built-in deterministic reference core
//!
//! Renders a scrolling gradient with one cursor per controller port and
//! emits a square-wave tone. Everything it does is a pure function of the
//! loaded content, the frame count and the polled input, which makes it
//! suitable for exercising the host without a third-party core.

use crate::core::{
    AvInfo, Core, CoreEnvironment, CoreInfo, DiskControl, FrameIo, GameInfo, Geometry, Variable,
};
use rh_core::protocol::{analog, joypad, pointer, Device, PixelFormat, VideoFrame};
use rh_core::CoreError;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;
/// Extra bytes at the end of each row, so hosts must honor the pitch
const ROW_PADDING: usize = 32;
const PORTS: usize = 4;
const SAMPLE_RATE: u32 = 44_100;
const FPS: u32 = 60;
const DISKS: usize = 2;

const STATE_MAGIC: &[u8; 4] = b"RHTP";
const STATE_VERSION: u16 = 1;

const VAR_PIXEL_FORMAT: &str = "testpattern_pixel_format";
const VAR_FAULT_AT_FRAME: &str = "testpattern_fault_at_frame";

/// Execution state captured by savestates
#[derive(Debug, Clone, PartialEq, Eq)]
struct MachineState {
    frame: u64,
    rng: u64,
    disk: u8,
    cursors: [(i16, i16); PORTS],
    sram: Vec<u8>,
}

impl MachineState {
    fn cold(content_hash: u64) -> Self {
        Self {
            frame: 0,
            rng: content_hash | 1,
            disk: 0,
            cursors: [(WIDTH as i16 / 2, HEIGHT as i16 / 2); PORTS],
            sram: vec![0; TestPatternCore::SAVE_RAM_SIZE],
        }
    }
}

/// Reference core used by tests and the headless driver
pub struct TestPatternCore {
    content_hash: Option<u64>,
    state: MachineState,
    pixel_format: PixelFormat,
    fault_at_frame: Option<u64>,
    last_buttons: [u16; PORTS],
}

impl TestPatternCore {
    pub const NAME: &'static str = "testpattern";
    pub const SAVE_RAM_SIZE: usize = 256;

    pub fn new() -> Self {
        Self {
            content_hash: None,
            state: MachineState::cold(0),
            pixel_format: PixelFormat::Rgb565,
            fault_at_frame: None,
            last_buttons: [0; PORTS],
        }
    }

    /// Frames emulated since load or reset
    pub fn frame(&self) -> u64 {
        self.state.frame
    }

    fn next_random(&mut self) -> u64 {
        // xorshift64
        let mut x = self.state.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state.rng = x;
        x
    }

    fn poll_port(&mut self, io: &FrameIo<'_>, port: usize) {
        let mut buttons = 0u16;
        for id in 0..joypad::COUNT {
            if io.input_state(port, Device::Joypad, 0, id) != 0 {
                buttons |= 1 << id;
            }
        }

        let pressed = |id: u32| buttons & (1 << id) != 0;
        let mut dx = pressed(joypad::RIGHT) as i16 - pressed(joypad::LEFT) as i16;
        let mut dy = pressed(joypad::DOWN) as i16 - pressed(joypad::UP) as i16;
        dx += io.input_state(port, Device::Analog, analog::INDEX_LEFT, analog::AXIS_X) / 8192;
        dy += io.input_state(port, Device::Analog, analog::INDEX_LEFT, analog::AXIS_Y) / 8192;

        let (x, y) = &mut self.state.cursors[port];
        if port == 0 && io.input_state(0, Device::Pointer, 0, pointer::PRESSED) != 0 {
            *x = scale_pointer(io.input_state(0, Device::Pointer, 0, pointer::X), WIDTH);
            *y = scale_pointer(io.input_state(0, Device::Pointer, 0, pointer::Y), HEIGHT);
        } else {
            *x = x.saturating_add(dx).clamp(0, WIDTH as i16 - 1);
            *y = y.saturating_add(dy).clamp(0, HEIGHT as i16 - 1);
        }

        // Save RAM counts rising edges of A per port.
        let rising = buttons & !self.last_buttons[port];
        if rising & (1 << joypad::A) != 0 {
            self.state.sram[port] = self.state.sram[port].wrapping_add(1);
        }
        self.last_buttons[port] = buttons;
    }

    fn render(&self) -> VideoFrame {
        let bpp = self.pixel_format.bytes_per_pixel();
        let pitch = WIDTH as usize * bpp + ROW_PADDING;
        let mut data = vec![0u8; pitch * HEIGHT as usize];
        let shift = (self.state.frame % 256) as u32;

        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let mut rgb = (
                    ((x * 255 / WIDTH + shift) % 256) as u8,
                    ((y * 255 / HEIGHT) % 256) as u8,
                    (self.state.disk as u32 * 0x80) as u8,
                );
                for (cx, cy) in self.state.cursors {
                    if (x as i16 - cx).abs() <= 2 && (y as i16 - cy).abs() <= 2 {
                        rgb = (0xFF, 0xFF, 0xFF);
                    }
                }
                let offset = y as usize * pitch + x as usize * bpp;
                write_pixel(&mut data[offset..offset + bpp], self.pixel_format, rgb);
            }
        }

        VideoFrame {
            data,
            width: WIDTH,
            height: HEIGHT,
            pitch,
            format: self.pixel_format,
        }
    }

    fn emit_audio(&self, io: &mut FrameIo<'_>) {
        let per_frame = (SAMPLE_RATE / FPS) as usize;
        let period = 50 + (self.state.frame % 50) as usize;
        let mut samples = Vec::with_capacity(per_frame * 2);
        for i in 0..per_frame {
            let level: i16 = if (i / period) % 2 == 0 { 4000 } else { -4000 };
            samples.push(level);
            samples.push(level);
        }
        io.audio_sample_batch(&samples);
    }

    fn encode_state(&self, out: &mut [u8]) {
        let mut w = Writer { buf: out, pos: 0 };
        w.put(STATE_MAGIC);
        w.put(&STATE_VERSION.to_le_bytes());
        w.put(&self.content_hash.unwrap_or(0).to_le_bytes());
        w.put(&self.state.frame.to_le_bytes());
        w.put(&self.state.rng.to_le_bytes());
        w.put(&[self.state.disk]);
        for (x, y) in self.state.cursors {
            w.put(&x.to_le_bytes());
            w.put(&y.to_le_bytes());
        }
        for buttons in self.last_buttons {
            w.put(&buttons.to_le_bytes());
        }
        w.put(&self.state.sram);
    }

    fn decode_state(&self, data: &[u8]) -> Result<(MachineState, [u16; PORTS]), CoreError> {
        let rejected = |msg: &str| CoreError::StateRejected(msg.to_string());
        let mut r = Reader { data, pos: 0 };

        if r.take(4).ok_or_else(|| rejected("truncated"))? != STATE_MAGIC {
            return Err(rejected("bad magic"));
        }
        if r.u16().ok_or_else(|| rejected("truncated"))? != STATE_VERSION {
            return Err(rejected("unsupported version"));
        }
        let hash = r.u64().ok_or_else(|| rejected("truncated"))?;
        if Some(hash) != self.content_hash {
            return Err(rejected("state belongs to different content"));
        }

        let frame = r.u64().ok_or_else(|| rejected("truncated"))?;
        let rng = r.u64().ok_or_else(|| rejected("truncated"))?;
        let disk = r.take(1).ok_or_else(|| rejected("truncated"))?[0];
        if disk as usize >= DISKS {
            return Err(rejected("disk index out of range"));
        }
        let mut cursors = [(0i16, 0i16); PORTS];
        for cursor in cursors.iter_mut() {
            let x = r.u16().ok_or_else(|| rejected("truncated"))? as i16;
            let y = r.u16().ok_or_else(|| rejected("truncated"))? as i16;
            if !(0..WIDTH as i16).contains(&x) || !(0..HEIGHT as i16).contains(&y) {
                return Err(rejected("cursor out of range"));
            }
            *cursor = (x, y);
        }
        let mut last_buttons = [0u16; PORTS];
        for buttons in last_buttons.iter_mut() {
            *buttons = r.u16().ok_or_else(|| rejected("truncated"))?;
        }
        let sram = r
            .take(Self::SAVE_RAM_SIZE)
            .ok_or_else(|| rejected("truncated"))?
            .to_vec();
        if r.pos != data.len() {
            return Err(rejected("trailing bytes"));
        }

        Ok((
            MachineState {
                frame,
                rng,
                disk,
                cursors,
                sram,
            },
            last_buttons,
        ))
    }
}

impl Default for TestPatternCore {
    fn default() -> Self {
        Self::new()
    }
}

impl Core for TestPatternCore {
    fn info(&self) -> CoreInfo {
        CoreInfo {
            name: Self::NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            valid_extensions: vec!["tp".to_string(), "bin".to_string(), "rom".to_string()],
            need_fullpath: false,
        }
    }

    fn configure(&mut self, env: &CoreEnvironment) -> Result<(), CoreError> {
        tracing::debug!(
            "testpattern: system={} saves={} language={}",
            env.system_dir.display(),
            env.save_dir.display(),
            env.language
        );
        Ok(())
    }

    fn load_game(&mut self, game: &GameInfo) -> Result<(), CoreError> {
        if game.data.is_empty() {
            return Err(CoreError::ContentRejected("empty content".to_string()));
        }
        let hash = fnv1a(&game.data);
        self.content_hash = Some(hash);
        self.state = MachineState::cold(hash);
        self.last_buttons = [0; PORTS];
        Ok(())
    }

    fn av_info(&self) -> AvInfo {
        AvInfo {
            geometry: Geometry {
                base_width: WIDTH,
                base_height: HEIGHT,
                max_width: WIDTH,
                max_height: HEIGHT,
                aspect_ratio: 4.0 / 3.0,
            },
            fps: FPS as f64,
            sample_rate: SAMPLE_RATE as f64,
        }
    }

    fn run(&mut self, io: &mut FrameIo<'_>) -> Result<(), CoreError> {
        if self.content_hash.is_none() {
            return Err(CoreError::Fault("no content loaded".to_string()));
        }
        if self.fault_at_frame == Some(self.state.frame) {
            return Err(CoreError::Fault(format!(
                "injected fault at frame {}",
                self.state.frame
            )));
        }

        for port in 0..PORTS {
            self.poll_port(io, port);
        }
        self.next_random();

        io.video_refresh(self.render());
        self.emit_audio(io);
        self.state.frame += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), CoreError> {
        let hash = self
            .content_hash
            .ok_or_else(|| CoreError::Fault("no content loaded".to_string()))?;
        // Save RAM survives a reset, like battery-backed cartridge memory.
        let sram = std::mem::take(&mut self.state.sram);
        self.state = MachineState::cold(hash);
        self.state.sram = sram;
        self.last_buttons = [0; PORTS];
        Ok(())
    }

    fn serialize_size(&self) -> usize {
        4 + 2 + 8 + 8 + 8 + 1 + PORTS * 4 + PORTS * 2 + Self::SAVE_RAM_SIZE
    }

    fn serialize(&self, out: &mut [u8]) -> Result<(), CoreError> {
        if out.len() != self.serialize_size() {
            return Err(CoreError::StateRejected(format!(
                "output buffer is {} bytes, need {}",
                out.len(),
                self.serialize_size()
            )));
        }
        self.encode_state(out);
        Ok(())
    }

    fn unserialize(&mut self, data: &[u8]) -> Result<(), CoreError> {
        let (state, last_buttons) = self.decode_state(data)?;
        self.state = state;
        self.last_buttons = last_buttons;
        Ok(())
    }

    fn save_ram(&self) -> Option<&[u8]> {
        Some(&self.state.sram)
    }

    fn save_ram_mut(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.state.sram)
    }

    fn variables(&self) -> Vec<Variable> {
        let pixel_format = match self.pixel_format {
            PixelFormat::Rgb565 => "rgb565",
            PixelFormat::Xrgb8888 => "xrgb8888",
        };
        let fault = self
            .fault_at_frame
            .map(|f| f.to_string())
            .unwrap_or_else(|| "off".to_string());
        vec![
            Variable {
                key: VAR_PIXEL_FORMAT.to_string(),
                value: pixel_format.to_string(),
                description: "Pixel format; rgb565|xrgb8888".to_string(),
            },
            Variable {
                key: VAR_FAULT_AT_FRAME.to_string(),
                value: fault,
                description: "Fail while running this frame; off|<frame>".to_string(),
            },
        ]
    }

    fn set_variable(&mut self, key: &str, value: &str) -> bool {
        match (key, value) {
            (VAR_PIXEL_FORMAT, "rgb565") => self.pixel_format = PixelFormat::Rgb565,
            (VAR_PIXEL_FORMAT, "xrgb8888") => self.pixel_format = PixelFormat::Xrgb8888,
            (VAR_FAULT_AT_FRAME, "off") => self.fault_at_frame = None,
            (VAR_FAULT_AT_FRAME, frame) => match frame.parse() {
                Ok(frame) => self.fault_at_frame = Some(frame),
                Err(_) => return false,
            },
            _ => return false,
        }
        true
    }

    fn disk_control(&mut self) -> Option<&mut dyn DiskControl> {
        Some(self)
    }

    fn unload_game(&mut self) {
        self.content_hash = None;
        self.state = MachineState::cold(0);
    }
}

impl DiskControl for TestPatternCore {
    fn disk_count(&self) -> usize {
        DISKS
    }

    fn current_disk(&self) -> usize {
        self.state.disk as usize
    }

    fn set_disk(&mut self, index: usize) -> Result<(), CoreError> {
        if index >= DISKS {
            return Err(CoreError::Unsupported("disk index out of range"));
        }
        self.state.disk = index as u8;
        Ok(())
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn scale_pointer(value: i16, extent: u32) -> i16 {
    let normalized = (value as i32 + 0x7FFF) as f32 / 0xFFFE as f32;
    ((normalized * (extent - 1) as f32) as i16).clamp(0, extent as i16 - 1)
}

fn write_pixel(out: &mut [u8], format: PixelFormat, (r, g, b): (u8, u8, u8)) {
    match format {
        PixelFormat::Rgb565 => {
            let packed = ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3);
            out.copy_from_slice(&packed.to_ne_bytes());
        }
        PixelFormat::Xrgb8888 => {
            let packed = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
            out.copy_from_slice(&packed.to_ne_bytes());
        }
    }
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let slice = self.data.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(slice)
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    fn u64(&mut self) -> Option<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Some(u64::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_core::protocol::{InputSource, NoInput};
    use std::path::PathBuf;

    fn loaded(content: &[u8]) -> TestPatternCore {
        let mut core = TestPatternCore::new();
        core.load_game(&GameInfo {
            path: PathBuf::from("game.tp"),
            data: content.to_vec(),
        })
        .unwrap();
        core
    }

    fn run_frames(core: &mut TestPatternCore, input: &dyn InputSource, frames: usize) {
        for _ in 0..frames {
            let mut io = FrameIo::new(input);
            core.run(&mut io).unwrap();
        }
    }

    fn snapshot(core: &TestPatternCore) -> Vec<u8> {
        let mut buf = vec![0; core.serialize_size()];
        core.serialize(&mut buf).unwrap();
        buf
    }

    struct HoldRight;

    impl InputSource for HoldRight {
        fn input_state(&self, port: usize, device: Device, _index: u32, id: u32) -> i16 {
            (port == 1 && device == Device::Joypad && id == joypad::RIGHT) as i16
        }
    }

    #[test]
    fn test_run_produces_frame_and_audio() {
        let mut core = loaded(b"rom");
        let input = NoInput;
        let mut io = FrameIo::new(&input);
        core.run(&mut io).unwrap();

        let frame = io.take_video().unwrap();
        assert_eq!(frame.width, WIDTH);
        assert_eq!(frame.pitch, WIDTH as usize * 2 + ROW_PADDING);
        assert_eq!(frame.data.len(), frame.pitch * HEIGHT as usize);
        assert_eq!(io.audio().len(), (SAMPLE_RATE / FPS) as usize * 2);
        assert_eq!(core.frame(), 1);
    }

    #[test]
    fn test_serialize_roundtrip_restores_frame() {
        let mut core = loaded(b"rom");
        run_frames(&mut core, &NoInput, 10);
        let saved = snapshot(&core);

        run_frames(&mut core, &HoldRight, 10);
        assert_eq!(core.frame(), 20);
        assert_ne!(snapshot(&core), saved);

        core.unserialize(&saved).unwrap();
        assert_eq!(core.frame(), 10);
        assert_eq!(snapshot(&core), saved);
    }

    #[test]
    fn test_unserialize_rejects_foreign_content() {
        let mut a = loaded(b"rom a");
        let b = loaded(b"rom b");
        let before = snapshot(&a);

        let err = a.unserialize(&snapshot(&b)).unwrap_err();
        assert!(matches!(err, CoreError::StateRejected(_)));
        assert_eq!(snapshot(&a), before);
    }

    #[test]
    fn test_unserialize_rejects_bad_magic_and_truncation() {
        let mut core = loaded(b"rom");
        let mut bad = snapshot(&core);
        bad[0] = b'X';
        assert!(core.unserialize(&bad).is_err());

        let good = snapshot(&core);
        assert!(core.unserialize(&good[..good.len() - 1]).is_err());
    }

    #[test]
    fn test_unserialize_rejects_out_of_range_cursor() {
        let mut core = loaded(b"rom");
        let before = snapshot(&core);

        // Port 1 cursor x sits after magic, version, hash, frame, rng, disk and cursor 0.
        let offset = 4 + 2 + 8 + 8 + 8 + 1 + 4;
        for x in [i16::MAX, -1, WIDTH as i16] {
            let mut bad = before.clone();
            bad[offset..offset + 2].copy_from_slice(&x.to_le_bytes());
            let err = core.unserialize(&bad).unwrap_err();
            assert!(matches!(err, CoreError::StateRejected(ref m) if m.contains("cursor")));
        }
        assert_eq!(snapshot(&core), before);

        run_frames(&mut core, &HoldRight, 200);
        assert_eq!(core.state.cursors[1].0, WIDTH as i16 - 1);
    }

    #[test]
    fn test_input_moves_cursor_deterministically() {
        let mut a = loaded(b"rom");
        let mut b = loaded(b"rom");
        run_frames(&mut a, &HoldRight, 5);
        run_frames(&mut b, &HoldRight, 5);
        assert_eq!(snapshot(&a), snapshot(&b));
        assert_eq!(a.state.cursors[1].0, WIDTH as i16 / 2 + 5);
        assert_eq!(a.state.cursors[0].0, WIDTH as i16 / 2);
    }

    #[test]
    fn test_reset_keeps_save_ram() {
        let mut core = loaded(b"rom");
        core.save_ram_mut().unwrap()[0] = 42;
        run_frames(&mut core, &NoInput, 3);
        core.reset().unwrap();
        assert_eq!(core.frame(), 0);
        assert_eq!(core.save_ram().unwrap()[0], 42);
    }

    #[test]
    fn test_variables() {
        let mut core = loaded(b"rom");
        assert!(core.set_variable(VAR_PIXEL_FORMAT, "xrgb8888"));
        assert!(!core.set_variable(VAR_PIXEL_FORMAT, "yuv"));
        assert!(!core.set_variable("unknown", "1"));
        assert!(core.set_variable(VAR_FAULT_AT_FRAME, "2"));

        let vars = core.variables();
        assert_eq!(vars[0].value, "xrgb8888");
        assert_eq!(vars[1].value, "2");

        let input = NoInput;
        let mut io = FrameIo::new(&input);
        core.run(&mut io).unwrap();
        assert_eq!(io.take_video().unwrap().format, PixelFormat::Xrgb8888);
        run_frames(&mut core, &NoInput, 1);
        let mut io = FrameIo::new(&input);
        assert!(matches!(core.run(&mut io), Err(CoreError::Fault(_))));
    }

    #[test]
    fn test_disk_control() {
        let mut core = loaded(b"rom");
        let disks = core.disk_control().unwrap();
        assert_eq!(disks.disk_count(), 2);
        disks.set_disk(1).unwrap();
        assert_eq!(disks.current_disk(), 1);
        assert!(disks.set_disk(2).is_err());
    }

    #[test]
    fn test_run_without_content_faults() {
        let mut core = TestPatternCore::new();
        let input = NoInput;
        let mut io = FrameIo::new(&input);
        assert!(core.run(&mut io).is_err());
    }
}
