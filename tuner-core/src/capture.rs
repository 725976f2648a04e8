//! # Audio Capture Module
//!
//! This module acquires the live microphone stream. A [`CaptureProvider`]
//! answers one capture request with a [`PendingCapture`], a single-resolution
//! result that the caller polls without blocking.
//!
//! ## Features
//! - CPAL input stream on a dedicated audio thread
//! - Mono downmix of multi-channel devices
//! - Fixed-size frames streamed over crossbeam channels
//! - A simulated provider (sine tone or denial) for tests and demos

use std::f32::consts::PI;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::{Result, TunerError};

/// Number of mono samples per frame sent to the analysis stage.
pub const FRAME_SIZE: usize = 2048;

/// Frames the audio thread may queue before new ones are dropped.
const FRAME_QUEUE: usize = 256;

/// What the caller asks the provider for. Only audio capture is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: false,
        }
    }
}

impl CaptureConstraints {
    fn check(&self) -> Result<()> {
        if !self.audio {
            return Err(TunerError::CapabilityDenied("no audio track requested".into()));
        }
        if self.video {
            return Err(TunerError::CapabilityDenied("video capture is not supported".into()));
        }
        Ok(())
    }
}

/// A granted microphone stream.
///
/// Frames of mono `f32` samples arrive on `samples`. Dropping the handle
/// tells the producing thread to stop.
#[derive(Debug)]
pub struct AudioStream {
    samples: Receiver<Vec<f32>>,
    sample_rate: u32,
    _shutdown: Option<Sender<()>>,
}

impl AudioStream {
    /// Wraps a frame receiver that is fed by the caller.
    pub fn new(samples: Receiver<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            _shutdown: None,
        }
    }

    fn with_shutdown(samples: Receiver<Vec<f32>>, sample_rate: u32, shutdown: Sender<()>) -> Self {
        Self {
            samples,
            sample_rate,
            _shutdown: Some(shutdown),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &Receiver<Vec<f32>> {
        &self.samples
    }
}

/// The outstanding answer to one capture request.
#[derive(Debug)]
pub struct PendingCapture {
    grant: Receiver<Result<AudioStream>>,
}

impl PendingCapture {
    /// Creates a pending capture together with the sender that resolves it.
    pub fn channel() -> (Sender<Result<AudioStream>>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (tx, Self { grant: rx })
    }

    /// A capture that has already resolved.
    pub fn resolved(result: Result<AudioStream>) -> Self {
        let (tx, pending) = Self::channel();
        // The receiver is alive and the channel empty, so this cannot fail.
        let _ = tx.send(result);
        pending
    }

    /// Returns the outcome if the provider has answered, without blocking.
    pub fn try_resolve(&self) -> Option<Result<AudioStream>> {
        match self.grant.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(provider_gone())),
        }
    }

    /// Blocks until the provider answers.
    pub fn wait(self) -> Result<AudioStream> {
        self.grant.recv().unwrap_or_else(|_| Err(provider_gone()))
    }
}

fn provider_gone() -> TunerError {
    TunerError::CapabilityDenied("capture provider exited without answering".into())
}

/// Something that can grant access to a microphone.
pub trait CaptureProvider {
    /// Starts one capture request. Never blocks on the grant itself.
    fn request_audio_capture(&self, constraints: &CaptureConstraints) -> PendingCapture;
}

/// Captures from the default CPAL input device.
#[derive(Debug, Clone)]
pub struct CpalProvider {
    pub target_sample_rate: u32,
}

impl CaptureProvider for CpalProvider {
    fn request_audio_capture(&self, constraints: &CaptureConstraints) -> PendingCapture {
        if let Err(e) = constraints.check() {
            return PendingCapture::resolved(Err(e));
        }

        let (grant_tx, pending) = PendingCapture::channel();
        let target_rate = self.target_sample_rate;
        thread::spawn(move || {
            log::info!("[AUDIO-THREAD] Starting audio thread...");
            let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE);
            let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

            let (stream, sample_rate) = match start_audio_capture(frame_tx, target_rate) {
                Ok(tuple) => {
                    log::info!("[AUDIO-THREAD] Audio capture started successfully");
                    tuple
                }
                Err(e) => {
                    log::error!("[AUDIO-THREAD] Error starting audio: {e}");
                    let _ = grant_tx.send(Err(TunerError::CapabilityDenied(e.to_string())));
                    return;
                }
            };

            let handle = AudioStream::with_shutdown(frame_rx, sample_rate, shutdown_tx);
            if grant_tx.send(Ok(handle)).is_err() {
                log::warn!("[AUDIO-THREAD] Nobody is waiting for the stream, stopping");
                return;
            }

            // Returns once the AudioStream handle (and its sender) is dropped.
            let _ = shutdown_rx.recv();

            log::info!("[AUDIO-THREAD] Stopping stream and exiting...");
            if let Err(e) = stream.pause() {
                log::warn!("[AUDIO-THREAD] Error pausing stream: {e}");
            }
            drop(stream);
            log::info!("[AUDIO-THREAD] Audio thread finished");
        });
        pending
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an `f32` configuration as close as possible to `target_rate`
/// 3. Downmixes every callback to mono and sends fixed-size frames
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
/// * `Err(e)` - Error if audio setup fails
fn start_audio_capture(
    sender: Sender<Vec<f32>>,
    target_rate: u32,
) -> anyhow::Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("[AUDIO-THREAD] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let channels = usize::from(config.channels().max(1));
    let config: cpal::StreamConfig = config.into();

    log::info!("[AUDIO-THREAD] Selected sample rate: {sample_rate} Hz, {channels} channel(s)");

    let err_fn = |err| log::error!("[AUDIO-THREAD] An error occurred on the audio stream: {err}");

    // Accumulates downmixed samples until a whole frame is available.
    let mut audio_buffer = Vec::with_capacity(FRAME_SIZE * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            audio_buffer.extend(
                data.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );

            while audio_buffer.len() >= FRAME_SIZE {
                let frame: Vec<f32> = audio_buffer.drain(..FRAME_SIZE).collect();
                // A full queue means the consumer is behind; drop the frame.
                let _ = sender.try_send(frame);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Finds the best supported `f32` configuration, preferring mono, then the
/// range closest to the target sample rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let (min, max) = (c.min_sample_rate().0, c.max_sample_rate().0);
            let rate_distance = if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            };
            (c.channels() != 1, rate_distance)
        })
}

/// A provider that needs no hardware.
#[derive(Debug, Clone)]
pub enum Simulated {
    /// Grants a stream carrying a steady sine tone, paced in real time.
    Tone {
        frequency: f32,
        amplitude: f32,
        sample_rate: u32,
    },
    /// Refuses every request with the given reason.
    Deny(String),
}

impl CaptureProvider for Simulated {
    fn request_audio_capture(&self, constraints: &CaptureConstraints) -> PendingCapture {
        if let Err(e) = constraints.check() {
            return PendingCapture::resolved(Err(e));
        }

        match *self {
            Simulated::Deny(ref reason) => {
                PendingCapture::resolved(Err(TunerError::CapabilityDenied(reason.clone())))
            }
            Simulated::Tone {
                frequency,
                amplitude,
                sample_rate,
            } => {
                let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE);
                let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
                thread::spawn(move || {
                    log::info!("[AUDIO-THREAD] Simulated {frequency} Hz tone started");
                    let frame_duration =
                        Duration::from_secs_f64(FRAME_SIZE as f64 / f64::from(sample_rate));
                    let step = 2.0 * PI * frequency / sample_rate as f32;
                    let mut phase = 0.0_f32;
                    loop {
                        match shutdown_rx.recv_timeout(frame_duration) {
                            Err(RecvTimeoutError::Timeout) => {
                                let frame: Vec<f32> = (0..FRAME_SIZE)
                                    .map(|_| {
                                        let s = amplitude * phase.sin();
                                        phase = (phase + step) % (2.0 * PI);
                                        s
                                    })
                                    .collect();
                                let _ = frame_tx.try_send(frame);
                            }
                            _ => break,
                        }
                    }
                    log::info!("[AUDIO-THREAD] Simulated tone stopped");
                });
                PendingCapture::resolved(Ok(AudioStream::with_shutdown(
                    frame_rx,
                    sample_rate,
                    shutdown_tx,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constraints_request_audio_only() {
        let c = CaptureConstraints::default();
        assert!(c.audio);
        assert!(!c.video);
        assert!(c.check().is_ok());
    }

    #[test]
    fn video_is_refused() {
        let provider = Simulated::Tone {
            frequency: 440.0,
            amplitude: 0.5,
            sample_rate: 8000,
        };
        let pending = provider.request_audio_capture(&CaptureConstraints {
            audio: true,
            video: true,
        });
        assert!(matches!(pending.wait(), Err(TunerError::CapabilityDenied(_))));
    }

    #[test]
    fn denial_carries_the_reason() {
        let pending = Simulated::Deny("permission denied".into())
            .request_audio_capture(&CaptureConstraints::default());
        match pending.try_resolve() {
            Some(Err(TunerError::CapabilityDenied(reason))) => {
                assert_eq!(reason, "permission denied")
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn pending_capture_resolves_once_answered() {
        let (tx, pending) = PendingCapture::channel();
        assert!(pending.try_resolve().is_none());
        let (_frames_tx, frames_rx) = crossbeam_channel::unbounded();
        tx.send(Ok(AudioStream::new(frames_rx, 44100))).unwrap();
        let stream = pending.try_resolve().expect("answered").expect("granted");
        assert_eq!(stream.sample_rate(), 44100);
    }

    #[test]
    fn dropped_provider_counts_as_denial() {
        let (tx, pending) = PendingCapture::channel();
        drop(tx);
        assert!(matches!(
            pending.try_resolve(),
            Some(Err(TunerError::CapabilityDenied(_)))
        ));
    }

    #[test]
    fn simulated_tone_streams_frames() {
        let provider = Simulated::Tone {
            frequency: 1000.0,
            amplitude: 0.5,
            sample_rate: 48000,
        };
        let stream = provider
            .request_audio_capture(&CaptureConstraints::default())
            .wait()
            .expect("simulated grant");
        let frame = stream
            .samples()
            .recv_timeout(Duration::from_secs(2))
            .expect("a frame within two seconds");
        assert_eq!(frame.len(), FRAME_SIZE);
        assert!(frame.iter().all(|s| s.abs() <= 0.5 + 1e-6));
    }
}
