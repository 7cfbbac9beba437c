//! Audio output for retrohost
//!
//! Cores produce interleaved stereo `i16` samples once per frame. A sink
//! accepts them, converts to `f32`, resamples to the output rate and queues
//! them for the device.

pub mod backend;
pub mod resampler;
pub mod ring;
pub mod sink;

pub use backend::open_sink;
pub use resampler::LinearResampler;
pub use ring::{SampleReader, SampleRing};
pub use sink::{AudioSink, BufferedSink, NullSink};

/// Channels produced by every core
pub const CHANNELS: usize = 2;
