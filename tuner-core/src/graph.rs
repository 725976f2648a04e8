//! # Audio Graph Module
//!
//! Wires a capture grant into an analysis node and starts the visualization
//! loop on it. Provisioning makes exactly one capture request; it never
//! retries and never falls back to a silent visualization.

use crate::analyser::{AnalysisSource, Analyser};
use crate::capture::{AudioStream, CaptureConstraints, CaptureProvider, PendingCapture};
use crate::config::ScopeConfig;
use crate::error::{Result, TunerError};
use crate::render::{Surface, SurfaceSet};
use crate::visualizer::Visualizer;

type Connect<A> = Box<dyn FnOnce(AudioStream) -> Result<A> + Send>;

/// Outcome of one [`Provisioning::poll`].
pub enum ProvisionStatus<A, S> {
    /// The provider has not answered yet.
    Pending,
    /// Capture was granted and the loop is ready to run.
    Started(Visualizer<A, S>),
    /// Capture was refused or the graph could not be built.
    Failed(TunerError),
    /// A previous poll already returned `Started` or `Failed`.
    Resolved,
}

/// An in-flight audio graph: one outstanding capture request plus what is
/// needed to build the graph once it is granted.
pub struct Provisioning<A, S> {
    pending: Option<PendingCapture>,
    surfaces: Option<SurfaceSet<S>>,
    connect: Option<Connect<A>>,
}

impl<S: Surface> Provisioning<Analyser, S> {
    /// Requests the microphone and, once granted, connects it to an
    /// [`Analyser`] configured from `config`.
    pub fn request<P: CaptureProvider + ?Sized>(
        provider: &P,
        config: &ScopeConfig,
        surfaces: SurfaceSet<S>,
    ) -> Self {
        let config = config.clone();
        Self::request_with(provider, surfaces, move |stream| {
            let analyser = Analyser::from_config(stream, &config)?;
            log::info!(
                "[GRAPH] Analyser connected: {} bins at {} Hz ({:.2} Hz per bin)",
                analyser.bin_count(),
                analyser.sample_rate(),
                analyser.bin_spacing_hz()
            );
            Ok(analyser)
        })
    }
}

impl<A: AnalysisSource, S: Surface> Provisioning<A, S> {
    /// Requests the microphone and builds the analysis source with `connect`
    /// once granted.
    pub fn request_with<P, F>(provider: &P, surfaces: SurfaceSet<S>, connect: F) -> Self
    where
        P: CaptureProvider + ?Sized,
        F: FnOnce(AudioStream) -> Result<A> + Send + 'static,
    {
        log::info!("[GRAPH] Requesting audio capture...");
        let pending = provider.request_audio_capture(&CaptureConstraints::default());
        Self {
            pending: Some(pending),
            surfaces: Some(surfaces),
            connect: Some(Box::new(connect)),
        }
    }

    /// Checks whether the capture request has been answered, without
    /// blocking.
    pub fn poll(&mut self) -> ProvisionStatus<A, S> {
        let Some(pending) = &self.pending else {
            return ProvisionStatus::Resolved;
        };
        match pending.try_resolve() {
            None => ProvisionStatus::Pending,
            Some(result) => {
                self.pending = None;
                self.finish(result)
            }
        }
    }

    /// Blocks until the capture request has been answered.
    pub fn wait(mut self) -> Result<Visualizer<A, S>> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| TunerError::CapabilityDenied("capture request already resolved".into()))?;
        match self.finish(pending.wait()) {
            ProvisionStatus::Started(visualizer) => Ok(visualizer),
            ProvisionStatus::Failed(e) => Err(e),
            ProvisionStatus::Pending | ProvisionStatus::Resolved => {
                Err(TunerError::CapabilityDenied("capture request already resolved".into()))
            }
        }
    }

    fn finish(&mut self, grant: Result<AudioStream>) -> ProvisionStatus<A, S> {
        let (Some(connect), Some(surfaces)) = (self.connect.take(), self.surfaces.take()) else {
            return ProvisionStatus::Resolved;
        };
        let started = grant.and_then(connect).and_then(|source| Visualizer::new(source, surfaces));
        match started {
            Ok(visualizer) => {
                log::info!("[GRAPH] Audio graph ready, starting visualization");
                ProvisionStatus::Started(visualizer)
            }
            Err(e) => {
                log::error!("[GRAPH] Error while getting user media: {e}");
                ProvisionStatus::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Simulated;
    use crate::render::DisplayList;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A source that only counts how often it is pulled.
    struct CountingSource {
        pulls: Arc<AtomicUsize>,
    }

    impl AnalysisSource for CountingSource {
        fn bin_count(&self) -> usize {
            4
        }
        fn fill_time_domain(&mut self, _buffer: &mut [u8]) -> Result<()> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn fill_frequency(&mut self, _buffer: &mut [u8]) -> Result<()> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Counts requests and answers each with a fixed denial.
    struct RefusingProvider {
        requests: Cell<usize>,
    }

    impl CaptureProvider for RefusingProvider {
        fn request_audio_capture(&self, constraints: &CaptureConstraints) -> PendingCapture {
            assert!(constraints.audio && !constraints.video);
            self.requests.set(self.requests.get() + 1);
            PendingCapture::resolved(Err(TunerError::CapabilityDenied("permission denied".into())))
        }
    }

    fn plots(width: f32) -> SurfaceSet<DisplayList> {
        SurfaceSet::new(DisplayList::new(width, 200.0), DisplayList::new(width, 200.0))
    }

    #[test]
    fn denied_capture_never_starts_the_loop() {
        let provider = RefusingProvider {
            requests: Cell::new(0),
        };
        let pulls = Arc::new(AtomicUsize::new(0));
        let connected = Arc::new(AtomicUsize::new(0));

        let (p, c) = (pulls.clone(), connected.clone());
        let mut graph = Provisioning::request_with(&provider, plots(400.0), move |_stream| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(CountingSource { pulls: p })
        });

        match graph.poll() {
            ProvisionStatus::Failed(TunerError::CapabilityDenied(reason)) => {
                assert_eq!(reason, "permission denied")
            }
            _ => panic!("expected a denial"),
        }
        assert!(matches!(graph.poll(), ProvisionStatus::Resolved));
        assert_eq!(provider.requests.get(), 1);
        assert_eq!(connected.load(Ordering::SeqCst), 0);
        assert_eq!(pulls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pending_until_the_provider_answers() {
        struct SlowProvider(Cell<Option<crossbeam_channel::Sender<Result<AudioStream>>>>);
        impl CaptureProvider for SlowProvider {
            fn request_audio_capture(&self, _: &CaptureConstraints) -> PendingCapture {
                let (tx, pending) = PendingCapture::channel();
                self.0.set(Some(tx));
                pending
            }
        }

        let provider = SlowProvider(Cell::new(None));
        let mut graph = Provisioning::request(&provider, &ScopeConfig::default(), plots(400.0));
        assert!(matches!(graph.poll(), ProvisionStatus::Pending));

        let (_frames_tx, frames_rx) = crossbeam_channel::unbounded();
        let grant = provider.0.take().expect("request was made");
        grant.send(Ok(AudioStream::new(frames_rx, 44100))).unwrap();

        match graph.poll() {
            ProvisionStatus::Started(vis) => {
                assert_eq!(vis.source().bin_count(), 8192);
                assert_eq!(vis.time_data().len(), 8192);
            }
            _ => panic!("expected the loop to start"),
        }
    }

    #[test]
    fn granted_capture_draws_frames() {
        let provider = Simulated::Tone {
            frequency: 440.0,
            amplitude: 0.8,
            sample_rate: 44100,
        };
        let config = ScopeConfig {
            fft_size: 2048,
            ..ScopeConfig::default()
        };
        let mut vis = Provisioning::request(&provider, &config, plots(400.0))
            .wait()
            .expect("simulated capture is granted");
        assert!(vis.step());
        assert_eq!(vis.frames_drawn(), 1);
        assert_eq!(vis.surfaces().get(crate::render::SurfaceId::Time).stroke_count(), 1);
    }

    #[test]
    fn zero_width_surface_fails_provisioning() {
        let provider = Simulated::Tone {
            frequency: 440.0,
            amplitude: 0.8,
            sample_rate: 44100,
        };
        let result = Provisioning::request(&provider, &ScopeConfig::default(), plots(0.0)).wait();
        assert!(matches!(result, Err(TunerError::MisconfiguredSurface { .. })));
    }
}
