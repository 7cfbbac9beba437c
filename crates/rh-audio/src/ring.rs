//! Bounded sample queue shared between the stepping thread and the device

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Interleaved `f32` samples with a fixed capacity. On overflow the oldest
/// samples are dropped so latency never grows past the configured buffer.
#[derive(Debug)]
pub struct SampleRing {
    samples: VecDeque<f32>,
    capacity: usize,
    dropped: u64,
    underruns: u64,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(crate::CHANNELS);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
            underruns: 0,
        }
    }

    /// Capacity for `duration_ms` of stereo audio at `sample_rate`
    pub fn for_duration(sample_rate: u32, duration_ms: u32) -> Self {
        let frames = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        Self::new(frames * crate::CHANNELS)
    }

    pub fn push(&mut self, input: &[f32]) {
        let input = if input.len() > self.capacity {
            let skip = input.len() - self.capacity;
            self.dropped += skip as u64;
            &input[skip..]
        } else {
            input
        };

        let overflow = (self.samples.len() + input.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.samples.drain(..overflow);
            self.dropped += overflow as u64;
        }
        self.samples.extend(input.iter().copied());
    }

    /// Fill `output`, padding with silence. Returns samples actually read.
    pub fn pop_into(&mut self, output: &mut [f32]) -> usize {
        let available = self.samples.len().min(output.len());
        for (slot, sample) in output.iter_mut().zip(self.samples.drain(..available)) {
            *slot = sample;
        }
        if available < output.len() {
            output[available..].fill(0.0);
            self.underruns += 1;
        }
        available
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }
}

/// Consumer side handle, cloned into the device callback
#[derive(Debug, Clone)]
pub struct SampleReader {
    ring: Arc<Mutex<SampleRing>>,
}

impl SampleReader {
    pub(crate) fn new(ring: Arc<Mutex<SampleRing>>) -> Self {
        Self { ring }
    }

    pub fn fill(&self, output: &mut [f32]) -> usize {
        self.ring.lock().pop_into(output)
    }

    pub fn queued(&self) -> usize {
        self.ring.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop() {
        let mut ring = SampleRing::new(8);
        ring.push(&[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(ring.len(), 4);

        let mut out = [1.0f32; 6];
        assert_eq!(ring.pop_into(&mut out), 4);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4, 0.0, 0.0]);
        assert_eq!(ring.underruns(), 1);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut ring = SampleRing::new(4);
        ring.push(&[1.0, 2.0, 3.0]);
        ring.push(&[4.0, 5.0, 6.0]);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.dropped(), 2);

        let mut out = [0.0f32; 4];
        ring.pop_into(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);

        ring.push(&[0.0; 10]);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.dropped(), 8);
    }

    #[test]
    fn test_capacity_for_duration() {
        let ring = SampleRing::for_duration(48000, 100);
        assert_eq!(ring.capacity(), 9600);
    }
}
