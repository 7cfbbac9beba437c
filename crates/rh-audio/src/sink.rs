//! Audio sinks

use crate::resampler::LinearResampler;
use crate::ring::{SampleReader, SampleRing};
use crate::CHANNELS;
use parking_lot::Mutex;
use std::sync::Arc;

/// Destination for the samples a core produced during one frame
pub trait AudioSink: Send {
    fn name(&self) -> &'static str;

    /// Queue interleaved stereo samples. Returns frames accepted.
    fn push_samples(&mut self, samples: &[i16]) -> usize;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Release the device. Further pushes are discarded.
    fn shutdown(&mut self);

    /// Total frames accepted
    fn frames_received(&self) -> u64;
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NullSink {
    frames_received: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    fn push_samples(&mut self, samples: &[i16]) -> usize {
        let frames = samples.len() / CHANNELS;
        self.frames_received += frames as u64;
        frames
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn shutdown(&mut self) {}

    fn frames_received(&self) -> u64 {
        self.frames_received
    }
}

/// Sink that converts and queues samples for a reader
pub struct BufferedSink {
    ring: Arc<Mutex<SampleRing>>,
    resampler: LinearResampler,
    volume: f32,
    paused: bool,
    closed: bool,
    scratch: Vec<f32>,
    resampled: Vec<f32>,
    frames_received: u64,
}

impl BufferedSink {
    /// `input_rate` is the core's rate, `output_rate` the consumer's
    pub fn new(input_rate: f64, output_rate: u32, buffer_duration_ms: u32, volume: f32) -> Self {
        Self {
            ring: Arc::new(Mutex::new(SampleRing::for_duration(output_rate, buffer_duration_ms))),
            resampler: LinearResampler::new(input_rate, output_rate as f64, CHANNELS),
            volume: volume.clamp(0.0, 1.0),
            paused: false,
            closed: false,
            scratch: Vec::new(),
            resampled: Vec::new(),
            frames_received: 0,
        }
    }

    /// Handle for the consumer
    pub fn reader(&self) -> SampleReader {
        SampleReader::new(Arc::clone(&self.ring))
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn queued(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn dropped(&self) -> u64 {
        self.ring.lock().dropped()
    }
}

impl AudioSink for BufferedSink {
    fn name(&self) -> &'static str {
        "buffered"
    }

    fn push_samples(&mut self, samples: &[i16]) -> usize {
        if self.closed || self.paused {
            return 0;
        }

        let volume = self.volume;
        self.scratch.clear();
        self.scratch
            .extend(samples.iter().map(|&s| s as f32 / 32768.0 * volume));

        self.resampled.clear();
        self.resampler.process(&self.scratch, &mut self.resampled);
        self.ring.lock().push(&self.resampled);

        let frames = samples.len() / CHANNELS;
        self.frames_received += frames as u64;
        frames
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn shutdown(&mut self) {
        self.closed = true;
        self.resampler.reset();
        self.ring.lock().clear();
    }

    fn frames_received(&self) -> u64 {
        self.frames_received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_counts_frames() {
        let mut sink = NullSink::new();
        assert_eq!(sink.push_samples(&[0; 8]), 4);
        assert_eq!(sink.frames_received(), 4);
    }

    #[test]
    fn test_buffered_sink_converts() {
        let mut sink = BufferedSink::new(48000.0, 48000, 100, 0.5);
        let reader = sink.reader();

        assert_eq!(sink.push_samples(&[16384, -32768]), 1);
        let mut out = [0.0f32; 2];
        assert_eq!(reader.fill(&mut out), 2);
        assert_eq!(out, [0.25, -0.5]);
    }

    #[test]
    fn test_buffered_sink_pause_and_shutdown() {
        let mut sink = BufferedSink::new(48000.0, 48000, 100, 1.0);
        sink.pause();
        assert_eq!(sink.push_samples(&[1, 2]), 0);
        assert_eq!(sink.queued(), 0);

        sink.resume();
        assert_eq!(sink.push_samples(&[1, 2]), 1);
        assert_eq!(sink.queued(), 2);

        sink.shutdown();
        assert_eq!(sink.queued(), 0);
        assert_eq!(sink.push_samples(&[1, 2]), 0);
        assert_eq!(sink.frames_received(), 1);
    }

    #[test]
    fn test_buffered_sink_bounded() {
        let mut sink = BufferedSink::new(48000.0, 48000, 10, 1.0);
        for _ in 0..10 {
            sink.push_samples(&[0; 400]);
        }
        assert_eq!(sink.queued(), 960);
        assert!(sink.dropped() > 0);
    }
}
