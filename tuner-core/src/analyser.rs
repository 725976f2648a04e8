//! # Analyser Module
//!
//! The analysis node between the capture stream and the visualization loop.
//! It keeps the most recent `fft_size` samples and answers pull requests with
//! byte snapshots of the waveform and of the magnitude spectrum.
//!
//! ## Features
//! - Byte-scaled time-domain snapshots (128 = silence)
//! - Blackman-windowed FFT spectrum using RustFFT, plan computed once
//! - Exponential smoothing between snapshots and decibel scaling

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

use crossbeam_channel::TryRecvError;
use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::capture::AudioStream;
use crate::config::ScopeConfig;
use crate::error::{Result, TunerError};

/// Weight of the previous spectrum when smoothing a new one.
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
/// Level mapped to byte 0.
pub const MIN_DECIBELS: f32 = -100.0;
/// Level mapped to byte 255.
pub const MAX_DECIBELS: f32 = -30.0;

/// A source of byte snapshots of a live signal.
pub trait AnalysisSource {
    /// Length of both snapshot buffers. Fixed for the lifetime of the source.
    fn bin_count(&self) -> usize;

    /// Overwrites `buffer` with the current waveform.
    fn fill_time_domain(&mut self, buffer: &mut [u8]) -> Result<()>;

    /// Overwrites `buffer` with the current magnitude spectrum.
    fn fill_frequency(&mut self, buffer: &mut [u8]) -> Result<()>;
}

/// Spectrum analyser fed by an [`AudioStream`].
pub struct Analyser {
    stream: AudioStream,
    fft_size: usize,
    history: VecDeque<f32>,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl std::fmt::Debug for Analyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyser")
            .field("fft_size", &self.fft_size)
            .field("sample_rate", &self.stream.sample_rate())
            .finish_non_exhaustive()
    }
}

impl Analyser {
    /// Creates an analyser over `stream` with the given transform size.
    ///
    /// # Errors
    /// * `TunerError::Config` if `fft_size` is not a power of two of at
    ///   least 32
    pub fn new(stream: AudioStream, fft_size: usize) -> Result<Self> {
        if !fft_size.is_power_of_two() || fft_size < 32 {
            return Err(TunerError::Config(format!(
                "analyser fft_size must be a power of two >= 32, got {fft_size}"
            )));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];

        Ok(Self {
            stream,
            fft_size,
            history: VecDeque::from(vec![0.0; fft_size]),
            window: blackman_window(fft_size),
            fft,
            spectrum: vec![Complex::default(); fft_size],
            scratch,
            smoothed: vec![0.0; fft_size / 2],
        })
    }

    pub fn from_config(stream: AudioStream, config: &ScopeConfig) -> Result<Self> {
        Self::new(stream, config.fft_size)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.stream.sample_rate()
    }

    /// Width of one frequency bin in Hz.
    pub fn bin_spacing_hz(&self) -> f32 {
        self.sample_rate() as f32 / self.fft_size as f32
    }

    /// Moves every frame the capture thread has queued into the history.
    fn ingest(&mut self) -> Result<()> {
        loop {
            match self.stream.samples().try_recv() {
                Ok(frame) => {
                    self.history.extend(frame);
                    let excess = self.history.len().saturating_sub(self.fft_size);
                    self.history.drain(..excess);
                }
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(TunerError::SourceClosed),
            }
        }
    }

    fn check_len(&self, buffer: &[u8]) -> Result<()> {
        let expected = self.bin_count();
        if buffer.len() != expected {
            return Err(TunerError::BufferLength {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(())
    }
}

impl AnalysisSource for Analyser {
    fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn fill_time_domain(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.check_len(buffer)?;
        self.ingest()?;

        let recent = self.history.iter().skip(self.fft_size - buffer.len());
        for (out, &sample) in buffer.iter_mut().zip(recent) {
            *out = (128.0 * (1.0 + sample)).floor().clamp(0.0, 255.0) as u8;
        }
        Ok(())
    }

    fn fill_frequency(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.check_len(buffer)?;
        self.ingest()?;

        for ((bin, &sample), &w) in self.spectrum.iter_mut().zip(&self.history).zip(&self.window) {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for ((out, level), bin) in buffer.iter_mut().zip(&mut self.smoothed).zip(&self.spectrum) {
            let magnitude = bin.norm() * scale;
            *level = SMOOTHING_TIME_CONSTANT * *level + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            let db = 20.0 * level.log10();
            *out = (255.0 * (db - MIN_DECIBELS) / range).floor().clamp(0.0, 255.0) as u8;
        }
        Ok(())
    }
}

/// Blackman window coefficients for a transform of length `n`.
fn blackman_window(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / n as f32;
            A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Sender;

    fn analyser(fft_size: usize, sample_rate: u32) -> (Sender<Vec<f32>>, Analyser) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let analyser = Analyser::new(AudioStream::new(rx, sample_rate), fft_size).unwrap();
        (tx, analyser)
    }

    #[test]
    fn bin_count_is_half_the_transform() {
        let (_tx, a) = analyser(16384, 44100);
        assert_eq!(a.bin_count(), 8192);
        assert!((a.bin_spacing_hz() - 2.69).abs() < 0.01);
    }

    #[test]
    fn rejects_odd_transform_sizes() {
        let (_tx, rx) = crossbeam_channel::unbounded();
        assert!(Analyser::new(AudioStream::new(rx, 44100), 1000).is_err());
    }

    #[test]
    fn silence_sits_on_the_midline() {
        let (_tx, mut a) = analyser(32, 8000);
        let mut buf = vec![0u8; 16];
        a.fill_time_domain(&mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 128));

        a.fill_frequency(&mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn waveform_bytes_follow_the_signal() {
        let (tx, mut a) = analyser(32, 8000);
        let mut frame = vec![0.0; 24];
        frame.extend([-1.0, -0.5, 0.0, 0.5, 1.0, 2.0, -3.0, 0.25]);
        tx.send(frame).unwrap();

        let mut buf = vec![0u8; 16];
        a.fill_time_domain(&mut buf).unwrap();
        assert_eq!(&buf[8..], &[0, 64, 128, 192, 255, 255, 0, 160]);
    }

    #[test]
    fn history_keeps_only_the_latest_window() {
        let (tx, mut a) = analyser(32, 8000);
        tx.send(vec![1.0; 64]).unwrap();
        tx.send(vec![-1.0; 16]).unwrap();

        let mut buf = vec![0u8; 16];
        a.fill_time_domain(&mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let (tx, mut a) = analyser(1024, 1024);
        let tone: Vec<f32> = (0..1024)
            .map(|i| (2.0 * PI * 64.0 * i as f32 / 1024.0).sin())
            .collect();
        tx.send(tone).unwrap();

        let mut buf = vec![0u8; 512];
        a.fill_frequency(&mut buf).unwrap();
        assert_eq!(buf[64], 255);
        assert!(buf[400] < 40, "far bin leaked: {}", buf[400]);
    }

    #[test]
    fn wrong_buffer_length_is_reported() {
        let (_tx, mut a) = analyser(32, 8000);
        let mut buf = vec![0u8; 10];
        assert!(matches!(
            a.fill_time_domain(&mut buf),
            Err(TunerError::BufferLength { expected: 16, actual: 10 })
        ));
    }

    #[test]
    fn closed_stream_is_reported() {
        let (tx, mut a) = analyser(32, 8000);
        drop(tx);
        let mut buf = vec![0u8; 16];
        assert!(matches!(a.fill_frequency(&mut buf), Err(TunerError::SourceClosed)));
    }
}
