//! Sample rate conversion
//!
//! Linear interpolation over interleaved frames. Good enough for bridging
//! a core's nominal rate to the device rate; both are usually close.

/// Streaming linear resampler
#[derive(Debug, Clone)]
pub struct LinearResampler {
    input_rate: f64,
    output_rate: f64,
    channels: usize,
    /// Unconsumed input, always whole frames
    pending: Vec<f32>,
    /// Fractional read position in frames, relative to `pending`
    position: f64,
}

impl LinearResampler {
    pub fn new(input_rate: f64, output_rate: f64, channels: usize) -> Self {
        Self {
            input_rate,
            output_rate,
            channels: channels.max(1),
            pending: Vec::new(),
            position: 0.0,
        }
    }

    /// Input frames consumed per output frame
    pub fn ratio(&self) -> f64 {
        self.input_rate / self.output_rate
    }

    pub fn is_passthrough(&self) -> bool {
        (self.input_rate - self.output_rate).abs() < f64::EPSILON
    }

    /// Resample `input`, appending to `output`. A trailing partial frame is ignored.
    pub fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        let whole = input.len() - input.len() % self.channels;
        if self.is_passthrough() {
            output.extend_from_slice(&input[..whole]);
            return;
        }

        self.pending.extend_from_slice(&input[..whole]);
        let frames = self.pending.len() / self.channels;
        let ratio = self.ratio();

        while self.position + 1.0 < frames as f64 {
            let index = self.position as usize;
            let frac = (self.position - index as f64) as f32;
            let a = index * self.channels;
            let b = a + self.channels;
            for ch in 0..self.channels {
                let s0 = self.pending[a + ch];
                let s1 = self.pending[b + ch];
                output.push(s0 + (s1 - s0) * frac);
            }
            self.position += ratio;
        }

        let consumed = (self.position as usize).min(frames);
        self.pending.drain(..consumed * self.channels);
        self.position -= consumed as f64;
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.position = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        let mut resampler = LinearResampler::new(48000.0, 48000.0, 2);
        let mut out = Vec::new();
        resampler.process(&[0.1, 0.2, 0.3], &mut out);
        assert_eq!(out, vec![0.1, 0.2]);
    }

    #[test]
    fn test_upsample_doubles_frames() {
        let mut resampler = LinearResampler::new(22050.0, 44100.0, 1);
        let mut out = Vec::new();
        resampler.process(&[0.0, 1.0, 2.0], &mut out);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.5]);

        // Continues seamlessly across calls.
        resampler.process(&[3.0], &mut out);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn test_downsample_stereo() {
        let mut resampler = LinearResampler::new(96000.0, 48000.0, 2);
        let input: Vec<f32> = (0..16).map(|i| (i / 2) as f32).collect();
        let mut out = Vec::new();
        resampler.process(&input, &mut out);
        assert_eq!(out, vec![0.0, 0.0, 2.0, 2.0, 4.0, 4.0, 6.0, 6.0]);
    }
}
