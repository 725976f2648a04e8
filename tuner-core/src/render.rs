//! # Signal Rendering Module
//!
//! Draws a byte-valued sample array as one polyline across a 2D surface.
//! Surfaces are immediate-mode targets; [`DisplayList`] is the recording
//! implementation the GUI replays into its canvas.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TunerError};

/// An immediate-mode 2D drawing target with fixed pixel dimensions.
pub trait Surface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    /// Erases everything drawn so far.
    fn clear(&mut self);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    /// Strokes the current path.
    fn stroke(&mut self);
}

/// How a sample byte maps onto the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `y = sample * H / 256`
    Direct,
    /// `y = (255 - sample) * H / 256`
    Inverted,
}

impl Orientation {
    fn level(self, sample: u8) -> f32 {
        match self {
            Orientation::Direct => f32::from(sample),
            Orientation::Inverted => f32::from(255 - sample),
        }
    }
}

/// Draws a data array onto a surface as a function of its index, matching
/// the surface width.
///
/// The surface is always cleared first. An empty array leaves it cleared
/// with nothing stroked.
pub fn draw_array<S: Surface + ?Sized>(data: &[u8], orientation: Orientation, surface: &mut S) {
    let width = surface.width();
    let height = surface.height();
    surface.clear();

    if data.is_empty() {
        return;
    }

    let dx = width / data.len() as f32;
    surface.begin_path();
    for (i, &sample) in data.iter().enumerate() {
        let x = i as f32 * dx;
        let y = orientation.level(sample) * height / 256.0;
        if i == 0 {
            surface.move_to(x, y);
        } else {
            surface.line_to(x, y);
        }
    }
    surface.stroke();
}

/// Identifier of one of the two plot surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    Time,
    Freq,
}

impl SurfaceId {
    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceId::Time => "time",
            SurfaceId::Freq => "freq",
        }
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurfaceId {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "time" => Ok(SurfaceId::Time),
            "freq" => Ok(SurfaceId::Freq),
            other => Err(TunerError::Config(format!("unknown surface `{other}`"))),
        }
    }
}

/// The time-domain and frequency-domain surfaces, addressable by id.
#[derive(Debug, Clone)]
pub struct SurfaceSet<S> {
    time: S,
    freq: S,
}

impl<S: Surface> SurfaceSet<S> {
    pub fn new(time: S, freq: S) -> Self {
        Self { time, freq }
    }

    pub fn get(&self, id: SurfaceId) -> &S {
        match id {
            SurfaceId::Time => &self.time,
            SurfaceId::Freq => &self.freq,
        }
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> &mut S {
        match id {
            SurfaceId::Time => &mut self.time,
            SurfaceId::Freq => &mut self.freq,
        }
    }

    /// Looks a surface up by its string identifier ("time" or "freq").
    pub fn lookup(&self, name: &str) -> Option<&S> {
        name.parse().ok().map(|id| self.get(id))
    }

    /// Rejects surfaces that cannot be drawn on.
    pub fn validate(&self) -> Result<()> {
        for id in [SurfaceId::Time, SurfaceId::Freq] {
            let surface = self.get(id);
            let (width, height) = (surface.width(), surface.height());
            let usable = |v: f32| v.is_finite() && v > 0.0;
            if !usable(width) || !usable(height) {
                return Err(TunerError::MisconfiguredSurface { id, width, height });
            }
        }
        Ok(())
    }
}

/// A single recorded drawing command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    Clear,
    BeginPath,
    MoveTo(f32, f32),
    LineTo(f32, f32),
    Stroke,
}

/// A surface that records its commands instead of rasterizing them.
///
/// `clear` drops everything recorded so far, so the list always holds
/// exactly one frame.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    width: f32,
    height: f32,
    commands: Vec<PathCommand>,
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// Number of strokes in the current frame.
    pub fn stroke_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, PathCommand::Stroke))
            .count()
    }

    /// All path vertices of the current frame, in drawing order.
    pub fn vertices(&self) -> Vec<(f32, f32)> {
        self.commands
            .iter()
            .filter_map(|c| match *c {
                PathCommand::MoveTo(x, y) | PathCommand::LineTo(x, y) => Some((x, y)),
                _ => None,
            })
            .collect()
    }
}

impl Surface for DisplayList {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(PathCommand::Clear);
    }

    fn begin_path(&mut self) {
        self.commands.push(PathCommand::BeginPath);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(PathCommand::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(PathCommand::LineTo(x, y));
    }

    fn stroke(&mut self) {
        self.commands.push(PathCommand::Stroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vertices(actual: &[(f32, f32)], expected: &[(f32, f32)]) {
        assert_eq!(actual.len(), expected.len());
        for (&(ax, ay), &(ex, ey)) in actual.iter().zip(expected) {
            assert!((ax - ex).abs() < 0.01, "x: {ax} != {ex}");
            assert!((ay - ey).abs() < 0.01, "y: {ay} != {ey}");
        }
    }

    #[test]
    fn direct_waveform_vertices() {
        let mut surface = DisplayList::new(400.0, 200.0);
        draw_array(&[0, 85, 170, 255], Orientation::Direct, &mut surface);
        assert_vertices(
            &surface.vertices(),
            &[(0.0, 0.0), (100.0, 66.4), (200.0, 132.8), (300.0, 199.2)],
        );
        assert_eq!(surface.stroke_count(), 1);
    }

    #[test]
    fn inverted_spectrum_vertices() {
        let mut surface = DisplayList::new(400.0, 200.0);
        draw_array(&[255, 170, 85, 0], Orientation::Inverted, &mut surface);
        assert_vertices(
            &surface.vertices(),
            &[(0.0, 0.0), (100.0, 66.4), (200.0, 132.8), (300.0, 199.2)],
        );
    }

    #[test]
    fn empty_data_only_clears() {
        let mut surface = DisplayList::new(400.0, 200.0);
        draw_array(&[10, 20], Orientation::Direct, &mut surface);
        draw_array(&[], Orientation::Direct, &mut surface);
        assert_eq!(surface.commands(), &[PathCommand::Clear]);
        assert_eq!(surface.stroke_count(), 0);
    }

    #[test]
    fn redraw_does_not_accumulate() {
        let data = [12, 200, 7, 90, 128];
        let mut surface = DisplayList::new(640.0, 120.0);
        draw_array(&data, Orientation::Inverted, &mut surface);
        let first = surface.commands().to_vec();
        draw_array(&data, Orientation::Inverted, &mut surface);
        assert_eq!(surface.commands(), first.as_slice());
        assert_eq!(surface.stroke_count(), 1);
    }

    #[test]
    fn single_sample_is_a_lone_move() {
        let mut surface = DisplayList::new(100.0, 256.0);
        draw_array(&[128], Orientation::Direct, &mut surface);
        assert_eq!(
            surface.commands(),
            &[
                PathCommand::Clear,
                PathCommand::BeginPath,
                PathCommand::MoveTo(0.0, 128.0),
                PathCommand::Stroke,
            ]
        );
    }

    #[test]
    fn surface_lookup_by_name() {
        let set = SurfaceSet::new(DisplayList::new(1.0, 2.0), DisplayList::new(3.0, 4.0));
        assert_eq!(set.lookup("time").map(|s| s.width()), Some(1.0));
        assert_eq!(set.lookup("freq").map(|s| s.width()), Some(3.0));
        assert!(set.lookup("phase").is_none());
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        let set = SurfaceSet::new(DisplayList::new(400.0, 200.0), DisplayList::new(400.0, 0.0));
        match set.validate() {
            Err(TunerError::MisconfiguredSurface { id, .. }) => assert_eq!(id, SurfaceId::Freq),
            other => panic!("expected misconfigured surface, got {other:?}"),
        }
    }
}
