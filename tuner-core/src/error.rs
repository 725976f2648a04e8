//! # Error Module
//!
//! Error taxonomy shared by the capture, analysis and visualization stages.

use thiserror::Error;

use crate::render::SurfaceId;

/// Errors raised by the tuner core.
#[derive(Debug, Error)]
pub enum TunerError {
    /// The capture provider refused or could not open a microphone stream.
    #[error("audio capture denied: {0}")]
    CapabilityDenied(String),

    /// A drawing surface has a zero or non-finite dimension.
    #[error("surface `{id}` is misconfigured ({width}x{height})")]
    MisconfiguredSurface {
        id: SurfaceId,
        width: f32,
        height: f32,
    },

    /// A pull was asked to fill a buffer of the wrong size.
    #[error("sample buffer has length {actual}, analysis node expects {expected}")]
    BufferLength { expected: usize, actual: usize },

    /// The capture stream feeding an analyser has gone away.
    #[error("audio source disconnected")]
    SourceClosed,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TunerError>;
