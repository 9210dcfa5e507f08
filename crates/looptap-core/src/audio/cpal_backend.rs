//! CPAL audio backend implementation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │  Control Thread  │───push()───────────►│   Command Queue     │
//! │                  │                     │  (lock-free SPSC)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!         ▲                                           │ pop()
//!         │ Relaxed atomics / events                  ▼
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │  LooperAtomics   │◄────────────────────│  CPAL Output Thread │
//! │   EventReceiver  │                     │  (owns LoopEngine)  │
//! └──────────────────┘                     └──────────▲──────────┘
//!                                                     │ pop()
//!                                          ┌──────────┴──────────┐
//!                                          │  Input Sample Queue │
//!                                          │ (SPSC, 4x buffer)   │
//!                                          └──────────▲──────────┘
//!                                                     │ push()
//!                                          ┌──────────┴──────────┐
//!                                          │  CPAL Input Thread  │
//!                                          └─────────────────────┘
//! ```
//!
//! The output callback is the engine's clock: it pulls exactly one block of
//! input per output block and pads with silence when the input stream is
//! behind.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig, SupportedStreamConfigRange};

use super::backend::AudioSystemResult;
use super::config::{AudioConfig, MAX_BUFFER_SIZE};
use super::device::{resolve_device, Direction};
use super::error::{AudioError, AudioResult};
use crate::config::LooperConfig;
use crate::engine::{command_channel, LoopEngine, LooperCommand, LooperHandle};
use crate::types::{StereoBuffer, StereoSample, TrackId};

/// Input queue capacity in output blocks (absorbs jitter between streams)
const INPUT_QUEUE_BLOCKS: usize = 4;

/// CPAL-specific audio handle
///
/// Keeps the audio streams alive. Drop this to stop audio.
pub struct CpalAudioHandle {
    _input_stream: Stream,
    _output_stream: Stream,
    /// Sample rate of the audio system
    sample_rate: u32,
    /// Actual buffer size in frames (as negotiated with the device)
    buffer_size: u32,
}

impl CpalAudioHandle {
    /// Get the sample rate of the audio system
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the actual buffer size in frames
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Get the audio latency in milliseconds (one-way, output only)
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Start the duplex stream pair around a freshly prepared engine
pub fn start_audio_system(
    config: &AudioConfig,
    looper_config: LooperConfig,
) -> AudioResult<AudioSystemResult> {
    let output_device = resolve_device(config.output_device.as_ref(), Direction::Output)?;
    let input_device = resolve_device(config.input_device.as_ref(), Direction::Input)?;

    let output_name = output_device.name().unwrap_or_else(|_| "Unknown".to_string());
    let input_name = input_device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Output device: {}", output_name);
    log::info!("Input device: {}", input_name);

    let output_configs: Vec<_> = output_device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();
    let output_supported = select_config(&output_configs, config.target_sample_rate(), 2)?;
    let sample_rate = output_supported.sample_rate().0;

    // The input has to follow the output rate; there is no resampling
    let input_configs: Vec<_> = input_device
        .supported_input_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();
    let input_supported = select_config(&input_configs, sample_rate, 1)?;
    if input_supported.sample_rate().0 != sample_rate {
        return Err(AudioError::SampleRateMismatch {
            output: sample_rate,
            input: input_supported.sample_rate().0,
        });
    }

    let buffer_size = config.buffer_size.frames();
    let output_stream_config = StreamConfig {
        channels: output_supported.channels(),
        sample_rate: output_supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };
    let input_stream_config = StreamConfig {
        channels: input_supported.channels(),
        sample_rate: input_supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };

    let latency_ms = (buffer_size as f32 / sample_rate as f32) * 1000.0;
    log::info!(
        "Audio config: {} in / {} out channels, {}Hz, {} frames (~{:.1}ms latency)",
        input_stream_config.channels,
        output_stream_config.channels,
        sample_rate,
        buffer_size,
        latency_ms
    );

    // Engine is prepared and fully allocated before it moves to the audio thread
    let mut engine = LoopEngine::new(looper_config);
    engine.prepare(sample_rate, MAX_BUFFER_SIZE);
    for id in 1..=engine.config().track_slots() {
        engine.add_track(TrackId(id));
    }
    let events = engine
        .take_events()
        .ok_or_else(|| AudioError::ConfigError("Event receiver already taken".to_string()))?;
    log::info!(
        "Loop engine ready: {} tracks, {} samples per track",
        engine.config().track_slots(),
        engine.capacity()
    );

    let (command_tx, command_rx) = command_channel();
    let looper = LooperHandle::new(command_tx, &engine);

    let input_capacity = buffer_size as usize * INPUT_QUEUE_BLOCKS;
    let (input_tx, input_rx) = rtrb::RingBuffer::<StereoSample>::new(input_capacity);
    log::debug!("Input sample queue created with capacity {} samples", input_capacity);

    let input_stream = build_input_stream(&input_device, &input_stream_config, input_tx)?;
    let state = AudioCallbackState::new(engine, command_rx, input_rx, buffer_size as usize);
    let output_stream = build_output_stream(&output_device, &output_stream_config, state)?;

    input_stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(format!("Input: {}", e)))?;
    output_stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(format!("Output: {}", e)))?;

    log::info!("Audio streams started");

    let handle = CpalAudioHandle {
        _input_stream: input_stream,
        _output_stream: output_stream,
        sample_rate,
        buffer_size,
    };

    Ok(AudioSystemResult {
        handle,
        looper,
        events,
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// State owned by the output callback
struct AudioCallbackState {
    /// The loop engine (owned exclusively by the audio thread)
    engine: LoopEngine,
    /// Command receiver from the control thread
    command_rx: rtrb::Consumer<LooperCommand>,
    /// Frames captured by the input stream
    input_rx: rtrb::Consumer<StereoSample>,
    /// Pre-allocated input block
    input_buffer: StereoBuffer,
    /// Pre-allocated output block
    output_buffer: StereoBuffer,
    /// Queued input beyond one block plus this is stale and dropped
    max_queued_input: usize,
}

impl AudioCallbackState {
    fn new(
        engine: LoopEngine,
        command_rx: rtrb::Consumer<LooperCommand>,
        input_rx: rtrb::Consumer<StereoSample>,
        buffer_size: usize,
    ) -> Self {
        Self {
            engine,
            command_rx,
            input_rx,
            input_buffer: StereoBuffer::silence(MAX_BUFFER_SIZE),
            output_buffer: StereoBuffer::silence(MAX_BUFFER_SIZE),
            max_queued_input: buffer_size,
        }
    }

    /// Pull one block of input and run the engine
    fn process(&mut self, n_frames: usize) {
        // Set working buffer length (RT-safe: no allocation)
        self.input_buffer.set_len_from_capacity(n_frames);
        self.output_buffer.set_len_from_capacity(n_frames);
        let n = self.output_buffer.len();

        // Keep input-to-output latency bounded if the input ran ahead
        let stale = self
            .input_rx
            .slots()
            .saturating_sub(n + self.max_queued_input);
        for _ in 0..stale {
            let _ = self.input_rx.pop();
        }
        for sample in self.input_buffer.as_mut_slice() {
            *sample = self.input_rx.pop().unwrap_or_default();
        }

        self.engine.process_commands(&mut self.command_rx);
        self.engine
            .process_block(self.output_buffer.as_mut_slice(), self.input_buffer.as_slice());
    }
}

/// Pick the best matching configuration
///
/// Prefers f32 with enough channels at the target rate, then any config
/// with enough channels, then anything. Falls back to the config's maximum
/// rate if the target is out of range.
fn select_config(
    configs: &[SupportedStreamConfigRange],
    target_sample_rate: u32,
    min_channels: u16,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let in_range = |c: &SupportedStreamConfigRange| {
        target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
    };

    let best_config = configs
        .iter()
        .find(|c| {
            c.sample_format() == SampleFormat::F32 && c.channels() >= min_channels && in_range(c)
        })
        .or_else(|| configs.iter().find(|c| c.channels() >= min_channels && in_range(c)))
        .or_else(|| configs.iter().find(|c| c.channels() >= min_channels))
        .or_else(|| configs.first())
        .ok_or_else(|| AudioError::ConfigError("No supported stream configurations".to_string()))?;

    if best_config.sample_format() != SampleFormat::F32 {
        log::warn!(
            "Device prefers {:?} samples; requesting f32 anyway",
            best_config.sample_format()
        );
    }

    let sample_rate = if in_range(best_config) {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best_config.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    Ok(best_config.clone().with_sample_rate(sample_rate))
}

/// Build the capture stream feeding the input queue
fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: rtrb::Producer<StereoSample>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                push_input_frames(data, channels, &mut producer);
            },
            move |err| {
                log::error!("Input audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

/// Build the output stream that owns and runs the engine
fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut state: AudioCallbackState,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let n_frames = data.len() / channels.max(1);
                state.process(n_frames);
                write_output_frames(data, channels, &state.output_buffer);
            },
            move |err| {
                log::error!("Output audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

/// Convert interleaved device frames to stereo and queue them
///
/// Mono input is duplicated to both channels; extra channels are ignored.
/// Returns the number of frames dropped because the queue was full.
fn push_input_frames(
    data: &[f32],
    channels: usize,
    producer: &mut rtrb::Producer<StereoSample>,
) -> usize {
    let mut dropped = 0;
    for frame in data.chunks(channels.max(1)) {
        let left = frame[0];
        let right = frame.get(1).copied().unwrap_or(left);
        if producer.push(StereoSample::new(left, right)).is_err() {
            dropped += 1;
        }
    }
    dropped
}

/// Write stereo samples into interleaved device frames
///
/// Channels beyond the second, and frames beyond `buffer`, are silenced.
fn write_output_frames(data: &mut [f32], channels: usize, buffer: &StereoBuffer) {
    if channels == 2 {
        // Same layout as the device: straight copy
        let interleaved = buffer.as_interleaved();
        let n = interleaved.len().min(data.len());
        data[..n].copy_from_slice(&interleaved[..n]);
        data[n..].fill(0.0);
        return;
    }

    let samples = buffer.as_slice();
    for (i, frame) in data.chunks_mut(channels.max(1)).enumerate() {
        match samples.get(i) {
            Some(sample) => {
                frame[0] = sample.left;
                if channels > 1 {
                    frame[1] = sample.right;
                }
                for ch in frame.iter_mut().skip(2) {
                    *ch = 0.0;
                }
            }
            None => frame.fill(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_input_frames_stereo_and_mono() {
        let (mut tx, mut rx) = rtrb::RingBuffer::<StereoSample>::new(8);

        push_input_frames(&[0.1, 0.2, 0.3, 0.4], 2, &mut tx);
        assert_eq!(rx.pop().ok(), Some(StereoSample::new(0.1, 0.2)));
        assert_eq!(rx.pop().ok(), Some(StereoSample::new(0.3, 0.4)));

        push_input_frames(&[0.5, 0.6], 1, &mut tx);
        assert_eq!(rx.pop().ok(), Some(StereoSample::mono(0.5)));
        assert_eq!(rx.pop().ok(), Some(StereoSample::mono(0.6)));

        // Four-channel interface: channels 3 and 4 are ignored
        push_input_frames(&[0.1, 0.2, 0.9, 0.9], 4, &mut tx);
        assert_eq!(rx.pop().ok(), Some(StereoSample::new(0.1, 0.2)));
    }

    #[test]
    fn test_push_input_frames_reports_overrun() {
        let (mut tx, _rx) = rtrb::RingBuffer::<StereoSample>::new(2);
        let dropped = push_input_frames(&[0.0; 8], 2, &mut tx);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_write_output_frames() {
        let mut samples = StereoBuffer::silence(2);
        samples[0] = StereoSample::new(0.1, 0.2);
        samples[1] = StereoSample::new(0.3, 0.4);

        let mut stereo = [9.0f32; 6];
        write_output_frames(&mut stereo, 2, &samples);
        assert_eq!(stereo, [0.1, 0.2, 0.3, 0.4, 0.0, 0.0]);

        // Device period shorter than the rendered block
        let mut short = [9.0f32; 2];
        write_output_frames(&mut short, 2, &samples);
        assert_eq!(short, [0.1, 0.2]);

        let mut quad = [9.0f32; 8];
        write_output_frames(&mut quad, 4, &samples);
        assert_eq!(quad, [0.1, 0.2, 0.0, 0.0, 0.3, 0.4, 0.0, 0.0]);

        let mut mono = [9.0f32; 2];
        write_output_frames(&mut mono, 1, &samples);
        assert_eq!(mono, [0.1, 0.3]);
    }

    #[test]
    fn test_callback_state_runs_engine_on_queued_input() {
        let mut config = LooperConfig::default();
        config.max_loop_seconds = 1.0;
        let mut engine = LoopEngine::new(config);
        engine.prepare(1000, MAX_BUFFER_SIZE);
        engine.add_track(TrackId(1));

        let (mut command_tx, command_rx) = command_channel();
        let (mut input_tx, input_rx) = rtrb::RingBuffer::<StereoSample>::new(256);
        let mut state = AudioCallbackState::new(engine, command_rx, input_rx, 64);

        for _ in 0..64 {
            input_tx.push(StereoSample::mono(0.5)).ok();
        }
        assert!(command_tx
            .push(LooperCommand::StartRecording(TrackId(1)))
            .is_ok());
        state.process(64);

        // Monitoring is on by default
        assert!(state.output_buffer.as_slice().iter().all(|s| s.left == 0.5));
        let track = state.engine.track(TrackId(1)).unwrap();
        assert_eq!(track.write_position(), 64);

        // Input queue empty: the next block is silent
        state.process(64);
        assert!(state
            .output_buffer
            .as_slice()
            .iter()
            .all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_callback_state_drops_stale_input() {
        let engine = LoopEngine::new(LooperConfig::default());
        let (_command_tx, command_rx) = command_channel();
        let (mut input_tx, input_rx) = rtrb::RingBuffer::<StereoSample>::new(512);
        let mut state = AudioCallbackState::new(engine, command_rx, input_rx, 64);

        for _ in 0..400 {
            input_tx.push(StereoSample::silence()).ok();
        }
        state.process(64);

        // Only the allowance stays queued
        assert_eq!(input_tx.slots(), 512 - 64);
    }
}
