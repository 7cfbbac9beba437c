//! cpal audio backend
//!
//! Device output through cpal. Streams are not `Send` on every host, so the
//! device and its stream live on a dedicated thread driven by commands; the
//! sink itself only touches the shared sample ring.

use crate::ring::SampleReader;
use crate::sink::{AudioSink, BufferedSink};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam::channel::{self, Receiver, Sender};
use rh_core::config::AudioConfig;
use std::thread::JoinHandle;

enum StreamCommand {
    Play,
    Pause,
    Stop,
}

/// Sink feeding the default output device
pub struct CpalSink {
    buffer: BufferedSink,
    commands: Sender<StreamCommand>,
    thread: Option<JoinHandle<()>>,
    device_name: String,
    output_rate: u32,
}

impl CpalSink {
    /// Open the default output device and start streaming silence
    pub fn open(config: &AudioConfig, sample_rate: f64) -> Result<Self, String> {
        let (ready_tx, ready_rx) = channel::bounded::<Result<(u32, String), String>>(1);
        let (reader_tx, reader_rx) = channel::bounded::<SampleReader>(1);
        let (started_tx, started_rx) = channel::bounded::<Result<(), String>>(1);
        let (command_tx, command_rx) = channel::unbounded();

        let thread = std::thread::Builder::new()
            .name("rh-audio".to_string())
            .spawn(move || stream_thread(ready_tx, reader_rx, started_tx, command_rx))
            .map_err(|e| format!("Failed to spawn audio thread: {}", e))?;

        let (output_rate, device_name) = ready_rx
            .recv()
            .map_err(|_| "Audio thread exited".to_string())??;

        let buffer = BufferedSink::new(
            sample_rate,
            output_rate,
            config.buffer_duration_ms,
            config.volume,
        );
        reader_tx
            .send(buffer.reader())
            .map_err(|_| "Audio thread exited".to_string())?;
        started_rx
            .recv()
            .map_err(|_| "Audio thread exited".to_string())??;

        tracing::info!("Audio device: {} at {} Hz", device_name, output_rate);

        Ok(Self {
            buffer,
            commands: command_tx,
            thread: Some(thread),
            device_name,
            output_rate,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }
}

fn stream_thread(
    ready: Sender<Result<(u32, String), String>>,
    readers: Receiver<SampleReader>,
    started: Sender<Result<(), String>>,
    commands: Receiver<StreamCommand>,
) {
    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        let _ = ready.send(Err("No output device available".to_string()));
        return;
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let supported = match device.default_output_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready.send(Err(format!("Failed to get output config: {}", e)));
            return;
        }
    };
    if supported.sample_format() != cpal::SampleFormat::F32 {
        let _ = ready.send(Err(format!(
            "Unsupported sample format: {:?}",
            supported.sample_format()
        )));
        return;
    }

    let output_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    if ready.send(Ok((output_rate, device_name))).is_err() {
        return;
    }
    let Ok(reader) = readers.recv() else {
        return;
    };

    let stream_config: StreamConfig = supported.into();
    let mut stereo = Vec::new();
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels.max(1);
            stereo.resize(frames * crate::CHANNELS, 0.0);
            reader.fill(&mut stereo);
            for (out, src) in data.chunks_exact_mut(channels.max(1)).zip(stereo.chunks_exact(2)) {
                if out.len() == 1 {
                    out[0] = (src[0] + src[1]) * 0.5;
                    continue;
                }
                out[0] = src[0];
                out[1] = src[1];
                out[2..].fill(0.0);
            }
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    );
    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = started.send(Err(format!("Failed to build output stream: {}", e)));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = started.send(Err(format!("Failed to play stream: {}", e)));
        return;
    }
    let _ = started.send(Ok(()));

    while let Ok(command) = commands.recv() {
        let result = match command {
            StreamCommand::Play => stream.play().map_err(|e| e.to_string()),
            StreamCommand::Pause => stream.pause().map_err(|e| e.to_string()),
            StreamCommand::Stop => break,
        };
        if let Err(e) = result {
            tracing::warn!("Audio stream command failed: {}", e);
        }
    }
    tracing::info!("Audio stream stopped");
}

impl AudioSink for CpalSink {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn push_samples(&mut self, samples: &[i16]) -> usize {
        self.buffer.push_samples(samples)
    }

    fn pause(&mut self) {
        self.buffer.pause();
        let _ = self.commands.send(StreamCommand::Pause);
    }

    fn resume(&mut self) {
        self.buffer.resume();
        let _ = self.commands.send(StreamCommand::Play);
    }

    fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.commands.send(StreamCommand::Stop);
            if thread.join().is_err() {
                tracing::error!("Audio thread panicked");
            }
        }
        self.buffer.shutdown();
    }

    fn frames_received(&self) -> u64 {
        self.buffer.frames_received()
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}
