//! # Visualization Loop Module
//!
//! Owns the two sample buffers and redraws both plots once per display
//! frame. Drawing one frame ([`Visualizer::step`]) is separate from the
//! driving harness ([`Visualizer::run`]) that keeps re-entering a
//! [`FrameClock`] until a [`StopToken`] fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::analyser::AnalysisSource;
use crate::error::Result;
use crate::render::{Orientation, Surface, SurfaceId, SurfaceSet, draw_array};

/// Refresh interval of [`IntervalClock::display_rate`], about 60 Hz.
pub const DISPLAY_INTERVAL: Duration = Duration::from_millis(16);

/// The host's source of display-refresh opportunities.
pub trait FrameClock {
    /// Waits for the next refresh. Returns `false` once the host will not
    /// provide any more frames.
    fn next_frame(&mut self) -> bool;
}

/// A clock for hosts without vsync: sleeps out the rest of each interval.
#[derive(Debug)]
pub struct IntervalClock {
    interval: Duration,
    last: Option<Instant>,
}

impl IntervalClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn display_rate() -> Self {
        Self::new(DISPLAY_INTERVAL)
    }
}

impl FrameClock for IntervalClock {
    fn next_frame(&mut self) -> bool {
        if let Some(last) = self.last {
            let due = last + self.interval;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }
        self.last = Some(Instant::now());
        true
    }
}

/// Cooperative cancellation flag shared between the loop and its owner.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pulls snapshots from an analysis source and renders them.
pub struct Visualizer<A, S> {
    source: A,
    surfaces: SurfaceSet<S>,
    time_data: Vec<u8>,
    freq_data: Vec<u8>,
    iterations: u64,
    frames_drawn: u64,
    failing: bool,
}

impl<A: AnalysisSource, S: Surface> Visualizer<A, S> {
    /// Binds a source to the two plot surfaces.
    ///
    /// Both buffers are sized once to the source's bin count.
    ///
    /// # Errors
    /// * `TunerError::MisconfiguredSurface` if either surface has a zero or
    ///   non-finite dimension
    pub fn new(source: A, surfaces: SurfaceSet<S>) -> Result<Self> {
        surfaces.validate()?;
        let bins = source.bin_count();
        log::info!("[SCOPE] Visualization bound to {bins} bins");
        Ok(Self {
            source,
            surfaces,
            time_data: vec![0; bins],
            freq_data: vec![0; bins],
            iterations: 0,
            frames_drawn: 0,
            failing: false,
        })
    }

    /// Pulls both snapshots, then renders the waveform and the spectrum.
    pub fn draw_frame(&mut self) -> Result<()> {
        self.source.fill_time_domain(&mut self.time_data)?;
        self.source.fill_frequency(&mut self.freq_data)?;

        draw_array(
            &self.time_data,
            Orientation::Direct,
            self.surfaces.get_mut(SurfaceId::Time),
        );
        draw_array(
            &self.freq_data,
            Orientation::Inverted,
            self.surfaces.get_mut(SurfaceId::Freq),
        );
        Ok(())
    }

    /// Runs one iteration. A failed frame is logged and swallowed so that
    /// the next iteration still happens.
    pub fn step(&mut self) -> bool {
        self.iterations += 1;
        match self.draw_frame() {
            Ok(()) => {
                self.frames_drawn += 1;
                if self.failing {
                    log::info!("[SCOPE] Frame {} drawn, recovered", self.iterations);
                    self.failing = false;
                }
                true
            }
            Err(e) => {
                if !self.failing {
                    log::warn!("[SCOPE] Frame {} failed: {e}", self.iterations);
                    self.failing = true;
                }
                false
            }
        }
    }

    /// Draws a frame on every refresh of `clock` until `stop` fires or the
    /// clock runs out. The stop flag is checked before each re-entry.
    ///
    /// # Returns
    /// * Number of iterations run by this call
    pub fn run<C: FrameClock + ?Sized>(&mut self, clock: &mut C, stop: &StopToken) -> u64 {
        let start = self.iterations;
        while !stop.is_stopped() && clock.next_frame() {
            self.step();
        }
        log::info!(
            "[SCOPE] Loop stopped after {} iterations",
            self.iterations - start
        );
        self.iterations - start
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn surfaces(&self) -> &SurfaceSet<S> {
        &self.surfaces
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    pub fn time_data(&self) -> &[u8] {
        &self.time_data
    }

    pub fn freq_data(&self) -> &[u8] {
        &self.freq_data
    }
}
