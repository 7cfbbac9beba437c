//! Audio backends

#[cfg(feature = "cpal")]
pub mod cpal_backend;

#[cfg(feature = "cpal")]
pub use cpal_backend::CpalSink;

use crate::sink::{AudioSink, BufferedSink, NullSink};
use rh_core::config::{AudioBackendKind, AudioConfig};

/// Rate used when no device dictates one
pub const DEFAULT_OUTPUT_RATE: u32 = 48000;

/// Open the sink selected by the configuration for a core running at `sample_rate`
pub fn open_sink(config: &AudioConfig, sample_rate: f64) -> Box<dyn AudioSink> {
    if !config.enable {
        return Box::new(NullSink::new());
    }

    match config.backend {
        AudioBackendKind::Null => Box::new(NullSink::new()),
        AudioBackendKind::Buffered => Box::new(buffered(config, sample_rate)),
        AudioBackendKind::Auto => open_device(config, sample_rate),
    }
}

fn buffered(config: &AudioConfig, sample_rate: f64) -> BufferedSink {
    BufferedSink::new(
        sample_rate,
        DEFAULT_OUTPUT_RATE,
        config.buffer_duration_ms,
        config.volume,
    )
}

#[cfg(feature = "cpal")]
fn open_device(config: &AudioConfig, sample_rate: f64) -> Box<dyn AudioSink> {
    match CpalSink::open(config, sample_rate) {
        Ok(sink) => Box::new(sink),
        Err(e) => {
            tracing::warn!("Audio device unavailable ({}), buffering instead", e);
            Box::new(buffered(config, sample_rate))
        }
    }
}

#[cfg(not(feature = "cpal"))]
fn open_device(config: &AudioConfig, sample_rate: f64) -> Box<dyn AudioSink> {
    tracing::debug!("Built without device output, buffering audio");
    Box::new(buffered(config, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_audio_uses_null_sink() {
        let config = AudioConfig {
            enable: false,
            ..AudioConfig::default()
        };
        assert_eq!(open_sink(&config, 44100.0).name(), "null");
    }

    #[test]
    fn test_explicit_backends() {
        let mut config = AudioConfig {
            backend: AudioBackendKind::Null,
            ..AudioConfig::default()
        };
        assert_eq!(open_sink(&config, 44100.0).name(), "null");

        config.backend = AudioBackendKind::Buffered;
        let mut sink = open_sink(&config, 44100.0);
        assert_eq!(sink.name(), "buffered");
        assert_eq!(sink.push_samples(&[0; 1470]), 735);
    }
}
