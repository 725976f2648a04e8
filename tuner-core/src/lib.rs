// tuner-core/src/lib.rs

//! The core logic for the live tuner scope.
//! This crate is responsible for audio capture, spectrum analysis, the
//! per-frame visualization loop and the equal-tempered note model. It is
//! completely headless and contains no GUI code.

pub mod analyser;
pub mod capture;
pub mod config;
pub mod error;
pub mod graph;
pub mod note;
pub mod render;
pub mod visualizer;

pub use analyser::{AnalysisSource, Analyser};
pub use capture::{AudioStream, CaptureConstraints, CaptureProvider, CpalProvider, Simulated};
pub use config::ScopeConfig;
pub use error::{Result, TunerError};
pub use graph::{ProvisionStatus, Provisioning};
pub use note::Note;
pub use render::{DisplayList, Orientation, PathCommand, Surface, SurfaceId, SurfaceSet, draw_array};
pub use visualizer::{FrameClock, IntervalClock, StopToken, Visualizer};
