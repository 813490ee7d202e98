use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::adapters::sinks::AudioSink;
use crate::domain::{AppError, AtomicCaptureState, AudioHandle, CaptureConfig, CaptureState};
use crate::ports::Recorder;

/// Lock-free ring buffer for audio samples.
type RingProducer = ringbuf::HeapProd<i16>;
type RingConsumer = ringbuf::HeapCons<i16>;

/// Commands sent to the audio thread.
enum CaptureCommand {
    Start {
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<Option<Vec<i16>>, AppError>>,
    },
    Shutdown,
}

/// Audio processing utilities.
mod capture_dsp {
    use super::*;

    pub fn get_device() -> Result<Device, AppError> {
        let host = cpal::default_host();
        host.default_input_device().ok_or_else(|| {
            AppError::Permission(
                "no input device available; microphone access may be denied".to_string(),
            )
        })
    }

    pub fn build_stream_config(device: &Device) -> Result<StreamConfig, AppError> {
        let supported = device
            .default_input_config()
            .map_err(|e| AppError::Audio(format!("failed to get default config: {}", e)))?;

        debug!(
            sample_rate = ?supported.sample_rate(),
            channels = supported.channels(),
            format = ?supported.sample_format(),
            "Device default config"
        );

        Ok(StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        })
    }

    pub fn build_stream(
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        target_sample_rate: u32,
        mut producer: RingProducer,
    ) -> Result<Stream, AppError> {
        let channels = config.channels as usize;
        let device_sample_rate = config.sample_rate.0;

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    process_samples_i16(
                        data,
                        channels,
                        device_sample_rate,
                        target_sample_rate,
                        &mut producer,
                    );
                },
                move |err| {
                    error!(?err, "audio stream error");
                },
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let i16_data: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                        .collect();

                    process_samples_i16(
                        &i16_data,
                        channels,
                        device_sample_rate,
                        target_sample_rate,
                        &mut producer,
                    );
                },
                move |err| {
                    error!(?err, "audio stream error");
                },
                None,
            ),
            _ => {
                return Err(AppError::Audio(format!(
                    "unsupported sample format: {:?}",
                    sample_format
                )));
            }
        }
        .map_err(|e| AppError::Audio(format!("failed to build stream: {}", e)))?;

        Ok(stream)
    }

    fn process_samples_i16(
        data: &[i16],
        channels: usize,
        device_sample_rate: u32,
        target_sample_rate: u32,
        producer: &mut RingProducer,
    ) {
        // Convert stereo to mono
        let mono_samples: Vec<i16> = if channels > 1 {
            data.chunks(channels)
                .map(|chunk| {
                    let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        } else {
            data.to_vec()
        };

        // Resample if needed
        let resampled = if device_sample_rate != target_sample_rate {
            resample(&mono_samples, device_sample_rate, target_sample_rate)
        } else {
            mono_samples
        };

        let _ = producer.push_slice(&resampled);
    }

    pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
        if from_rate == to_rate || samples.is_empty() {
            return samples.to_vec();
        }

        let ratio = from_rate as f64 / to_rate as f64;
        let output_len = (samples.len() as f64 / ratio).ceil() as usize;
        let mut output = Vec::with_capacity(output_len);

        for i in 0..output_len {
            let src_pos = i as f64 * ratio;
            let src_idx = src_pos.floor() as usize;
            let frac = src_pos.fract();

            let sample = if src_idx + 1 < samples.len() {
                let s0 = samples[src_idx] as f64;
                let s1 = samples[src_idx + 1] as f64;
                (s0 + (s1 - s0) * frac) as i16
            } else if src_idx < samples.len() {
                samples[src_idx]
            } else {
                0
            };
            output.push(sample);
        }
        output
    }
}

/// Audio thread runner - creates the Stream on the audio thread.
fn audio_thread_main(
    config: CaptureConfig,
    state: Arc<AtomicCaptureState>,
    mut cmd_rx: mpsc::Receiver<CaptureCommand>,
) {
    // Stream is kept here on the audio thread (not Send)
    let mut stream: Option<Stream> = None;
    let mut ring_consumer: Option<RingConsumer> = None;

    while let Some(cmd) = cmd_rx.blocking_recv() {
        match cmd {
            CaptureCommand::Start { reply } => {
                // Double-tap tolerance: an in-flight session is
                // terminated, not an error.
                if stream.take().is_some() {
                    ring_consumer.take();
                    state.store(CaptureState::Stopped);
                    warn!("existing recording session terminated by new start");
                }

                let result = (|| -> Result<(), AppError> {
                    let device = capture_dsp::get_device()?;
                    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                    let stream_config = capture_dsp::build_stream_config(&device)?;

                    let capacity = config.buffer_capacity();
                    let ring = HeapRb::<i16>::new(capacity);
                    let (producer, consumer) = ring.split();

                    let sample_format = device
                        .default_input_config()
                        .map_err(|e| AppError::Audio(format!("failed to get config: {}", e)))?
                        .sample_format();

                    let new_stream = capture_dsp::build_stream(
                        &device,
                        &stream_config,
                        sample_format,
                        config.sample_rate,
                        producer,
                    )?;

                    new_stream
                        .play()
                        .map_err(|e| AppError::Audio(format!("failed to start stream: {}", e)))?;

                    stream = Some(new_stream);
                    ring_consumer = Some(consumer);
                    state.store(CaptureState::Recording);

                    info!(device = %device_name, "recording started");
                    Ok(())
                })();
                let _ = reply.send(result);
            }
            CaptureCommand::Stop { reply } => {
                let result = (|| -> Result<Option<Vec<i16>>, AppError> {
                    if !state.load().is_recording() {
                        return Ok(None);
                    }

                    // Stop and drop the stream
                    stream.take();

                    let mut consumer = match ring_consumer.take() {
                        Some(consumer) => consumer,
                        None => {
                            state.store(CaptureState::Stopped);
                            return Ok(None);
                        }
                    };

                    let available = consumer.occupied_len();
                    let mut samples = vec![0i16; available];
                    let read = consumer.pop_slice(&mut samples);
                    samples.truncate(read);

                    state.store(CaptureState::Stopped);

                    info!(samples = samples.len(), "recording stopped");
                    Ok(Some(samples))
                })();
                let _ = reply.send(result);
            }
            CaptureCommand::Shutdown => {
                break;
            }
        }
    }
    debug!("audio thread shutting down");
}

/// cpal-based recorder.
///
/// Uses a dedicated audio thread to handle the non-Send Stream type.
/// The platform-appropriate sink materializes stopped recordings into
/// audio handles.
pub struct CpalRecorder {
    config: CaptureConfig,
    sink: Arc<dyn AudioSink>,
    state: Arc<AtomicCaptureState>,
    recording_start: Mutex<Option<Instant>>,
    last_handle: Mutex<Option<AudioHandle>>,
    cmd_tx: mpsc::Sender<CaptureCommand>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CpalRecorder {
    pub fn new(config: CaptureConfig, sink: Arc<dyn AudioSink>) -> Result<Self, AppError> {
        let state = Arc::new(AtomicCaptureState::default());
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let thread_config = config.clone();
        let thread_state = Arc::clone(&state);

        let thread_handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || audio_thread_main(thread_config, thread_state, cmd_rx))
            .map_err(|e| AppError::Audio(format!("failed to spawn audio thread: {}", e)))?;

        info!(
            sample_rate = config.sample_rate,
            buffer_duration = config.buffer_duration_secs,
            "recorder initialized"
        );

        Ok(Self {
            config,
            sink,
            state,
            recording_start: Mutex::new(None),
            last_handle: Mutex::new(None),
            cmd_tx,
            thread_handle: Mutex::new(Some(thread_handle)),
        })
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(CaptureCommand::Shutdown);

        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

#[async_trait]
impl Recorder for CpalRecorder {
    async fn start(&self) -> Result<(), AppError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(CaptureCommand::Start { reply: reply_tx })
            .await
            .map_err(|_| AppError::Audio("audio thread not running".to_string()))?;

        reply_rx
            .await
            .map_err(|_| AppError::Audio("audio thread did not respond".to_string()))??;

        *self.recording_start.lock() = Some(Instant::now());
        Ok(())
    }

    async fn stop(&self) -> Result<Option<AudioHandle>, AppError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(CaptureCommand::Stop { reply: reply_tx })
            .await
            .map_err(|_| AppError::Audio("audio thread not running".to_string()))?;

        let samples = reply_rx
            .await
            .map_err(|_| AppError::Audio("audio thread did not respond".to_string()))??;

        self.recording_start.lock().take();

        match samples {
            Some(samples) => {
                let handle = self.sink.materialize(&samples, self.config.sample_rate)?;
                *self.last_handle.lock() = Some(handle.clone());
                Ok(Some(handle))
            }
            // Stopping while stopped is an idempotent no-op.
            None => Ok(None),
        }
    }

    async fn cleanup(&self) {
        if let Some(handle) = self.last_handle.lock().as_ref() {
            handle.release();
        }
    }

    fn state(&self) -> CaptureState {
        self.state.load()
    }

    fn current_duration(&self) -> f32 {
        self.recording_start
            .lock()
            .as_ref()
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or(0.0)
    }
}
