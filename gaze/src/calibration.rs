//! Linear range remapping of gaze ratios.
//!
//! Raw ratios rarely span the whole `[0, 1]` range, a calibration stretches
//! whatever range the user's eyes actually cover back onto it.

use std::fmt;

use serde::Deserialize;

use crate::{
    error::{GazeErr, Result},
    reading::GazeRatio,
};

/// Remaps filtered ratios into calibrated ones.
pub trait Calibration: Send {
    /// Adjusts a ratio using this calibration.
    ///
    /// # Arguments
    /// * `ratio` - The filtered ratio.
    ///
    /// # Returns
    /// The calibrated ratio.
    fn adjust(&mut self, ratio: GazeRatio) -> GazeRatio;

    /// The reference points worth drawing on top of the frame.
    fn markers(&self) -> Vec<GazeRatio>;

    /// Where a centered gaze lands after `adjust`, if this calibration knows
    /// it better than `GazeRatio::CENTER`.
    fn center(&self) -> Option<GazeRatio> {
        None
    }
}

/// The points the user is asked to look at while calibrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Center,
    Left,
    Right,
    Up,
    Down,
}

impl Target {
    /// Every target in the order they're sampled.
    pub const ALL: [Target; 5] = [
        Target::Center,
        Target::Left,
        Target::Right,
        Target::Up,
        Target::Down,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Target::Center => "center",
            Target::Left => "left",
            Target::Right => "right",
            Target::Up => "up",
            Target::Down => "down",
        };
        f.write_str(s)
    }
}

/// A calibration measured by looking at the center and the four extremes.
///
/// Each axis is remapped in two linear pieces so that the measured center
/// lands on `0.5` and the measured extremes on `0.0` and `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FivePointCalibration {
    pub center: GazeRatio,
    /// The horizontal ratios looking `(right, left)`.
    pub horizontal: (f32, f32),
    /// The vertical ratios looking `(up, down)`.
    pub vertical: (f32, f32),
}

impl FivePointCalibration {
    fn adjust_axis(ratio: f32, (lo, hi): (f32, f32), center: f32) -> f32 {
        if ratio < center {
            let span = center - lo;
            if span == 0. {
                return 0.5;
            }
            0.5 * (ratio - lo) / span
        } else {
            let span = hi - center;
            if span == 0. {
                return 0.5;
            }
            0.5 * (ratio - center) / span + 0.5
        }
    }
}

impl Calibration for FivePointCalibration {
    fn adjust(&mut self, ratio: GazeRatio) -> GazeRatio {
        let Self {
            center,
            horizontal,
            vertical,
        } = *self;

        GazeRatio::new(
            Self::adjust_axis(ratio.horizontal, horizontal, center.horizontal),
            Self::adjust_axis(ratio.vertical, vertical, center.vertical),
        )
    }

    fn markers(&self) -> Vec<GazeRatio> {
        let Self {
            center,
            horizontal: (right, left),
            vertical: (up, down),
        } = *self;

        vec![
            center,
            GazeRatio::new(right, center.vertical),
            GazeRatio::new(left, center.vertical),
            GazeRatio::new(center.horizontal, up),
            GazeRatio::new(center.horizontal, down),
        ]
    }
}

impl fmt::Display for FivePointCalibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "center {}, horizontal range ({:.3}, {:.3}), vertical range ({:.3}, {:.3})",
            self.center, self.horizontal.0, self.horizontal.1, self.vertical.0, self.vertical.1
        )
    }
}

/// Accumulates samples for every `Target` of a `FivePointCalibration`.
#[derive(Debug, Default)]
pub struct FivePointSampler {
    sums: [(f32, f32, usize); 5],
}

impl FivePointSampler {
    /// Creates a new empty `FivePointSampler`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single ratio observed while looking at `target`.
    pub fn record(&mut self, target: Target, ratio: GazeRatio) {
        let (h, v, n) = &mut self.sums[target.index()];
        *h += ratio.horizontal;
        *v += ratio.vertical;
        *n += 1;
    }

    /// Returns the amount of samples recorded for `target`.
    pub fn samples(&self, target: Target) -> usize {
        self.sums[target.index()].2
    }

    fn mean(&self, target: Target) -> Result<GazeRatio> {
        match self.sums[target.index()] {
            (_, _, 0) => Err(GazeErr::MissingSamples(target)),
            (h, v, n) => Ok(GazeRatio::new(h / n as f32, v / n as f32)),
        }
    }

    /// Builds the calibration from the averaged samples.
    ///
    /// # Returns
    /// The calibration or `GazeErr::MissingSamples` naming the first target
    /// without any samples.
    pub fn finish(&self) -> Result<FivePointCalibration> {
        let center = self.mean(Target::Center)?;
        let left = self.mean(Target::Left)?;
        let right = self.mean(Target::Right)?;
        let up = self.mean(Target::Up)?;
        let down = self.mean(Target::Down)?;

        Ok(FivePointCalibration {
            center,
            horizontal: (right.horizontal, left.horizontal),
            vertical: (up.vertical, down.vertical),
        })
    }
}

/// A calibration that only measures where the center is. It doesn't remap
/// ratios but gives triggers a per-user reference point.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CenterCalibration {
    pub center: GazeRatio,
}

impl CenterCalibration {
    /// Averages `samples` into a `CenterCalibration`.
    ///
    /// # Returns
    /// `None` if there are no samples.
    pub fn from_samples(samples: &[GazeRatio]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f32;
        let (h, v) = samples
            .iter()
            .fold((0., 0.), |(h, v), r| (h + r.horizontal, v + r.vertical));

        Some(Self {
            center: GazeRatio::new(h / n, v / n),
        })
    }
}

impl Calibration for CenterCalibration {
    fn adjust(&mut self, ratio: GazeRatio) -> GazeRatio {
        ratio
    }

    fn markers(&self) -> Vec<GazeRatio> {
        vec![self.center]
    }

    fn center(&self) -> Option<GazeRatio> {
        Some(self.center)
    }
}

/// A self-calibrating remap that widens its range with every observed ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCalibration {
    horizontal: [f32; 2],
    vertical: [f32; 2],
}

impl RangeCalibration {
    /// Creates a new `RangeCalibration` with an inverted, empty range.
    pub fn new() -> Self {
        Self {
            horizontal: [1., 0.],
            vertical: [1., 0.],
        }
    }

    fn widen(range: &mut [f32; 2], ratio: f32) {
        range[0] = range[0].min(ratio);
        range[1] = range[1].max(ratio);
    }

    fn normalize([lo, hi]: [f32; 2], ratio: f32) -> f32 {
        if lo == hi {
            return ratio;
        }
        (ratio - lo) / (hi - lo)
    }
}

impl Default for RangeCalibration {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibration for RangeCalibration {
    fn adjust(&mut self, ratio: GazeRatio) -> GazeRatio {
        Self::widen(&mut self.horizontal, ratio.horizontal);
        Self::widen(&mut self.vertical, ratio.vertical);

        GazeRatio::new(
            Self::normalize(self.horizontal, ratio.horizontal),
            Self::normalize(self.vertical, ratio.vertical),
        )
    }

    fn markers(&self) -> Vec<GazeRatio> {
        let [h0, h1] = self.horizontal;
        let [v0, v1] = self.vertical;

        vec![
            GazeRatio::new(h0, v0),
            GazeRatio::new(h0, v1),
            GazeRatio::new(h1, v0),
            GazeRatio::new(h1, v1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_close(got: GazeRatio, expected: (f32, f32)) {
        assert!(
            (got.horizontal - expected.0).abs() < EPS && (got.vertical - expected.1).abs() < EPS,
            "got {got}, expected {expected:?}"
        );
    }

    fn five_point() -> FivePointCalibration {
        FivePointCalibration {
            center: GazeRatio::new(0.55, 0.45),
            horizontal: (0.35, 0.75),
            vertical: (0.25, 0.6),
        }
    }

    #[test]
    fn test_five_point_maps_reference_points() {
        let mut cal = five_point();

        assert_close(cal.adjust(GazeRatio::new(0.55, 0.45)), (0.5, 0.5));
        assert_close(cal.adjust(GazeRatio::new(0.35, 0.25)), (0.0, 0.0));
        assert_close(cal.adjust(GazeRatio::new(0.75, 0.6)), (1.0, 1.0));
        assert_close(cal.adjust(GazeRatio::new(0.45, 0.525)), (0.25, 0.75));
    }

    #[test]
    fn test_five_point_degenerate_side() {
        let mut cal = FivePointCalibration {
            center: GazeRatio::new(0.5, 0.5),
            horizontal: (0.5, 0.8),
            vertical: (0.2, 0.5),
        };

        assert_close(cal.adjust(GazeRatio::new(0.4, 0.6)), (0.5, 0.5));
    }

    #[test]
    fn test_five_point_markers() {
        let markers = five_point().markers();
        assert_eq!(markers.len(), 5);
        assert_eq!(markers[0], GazeRatio::new(0.55, 0.45));
        assert_eq!(markers[1], GazeRatio::new(0.35, 0.45));
        assert_eq!(markers[4], GazeRatio::new(0.55, 0.6));
    }

    #[test]
    fn test_sampler_averages_targets() {
        let mut sampler = FivePointSampler::new();

        sampler.record(Target::Center, GazeRatio::new(0.5, 0.4));
        sampler.record(Target::Center, GazeRatio::new(0.6, 0.6));
        sampler.record(Target::Left, GazeRatio::new(0.8, 0.5));
        sampler.record(Target::Right, GazeRatio::new(0.3, 0.5));
        sampler.record(Target::Up, GazeRatio::new(0.5, 0.2));
        sampler.record(Target::Down, GazeRatio::new(0.5, 0.7));

        assert_eq!(sampler.samples(Target::Center), 2);

        let cal = sampler.finish().unwrap();
        assert_close(cal.center, (0.55, 0.5));
        assert_eq!(cal.horizontal, (0.3, 0.8));
        assert_eq!(cal.vertical, (0.2, 0.7));
    }

    #[test]
    fn test_sampler_reports_missing_target() {
        let mut sampler = FivePointSampler::new();
        sampler.record(Target::Center, GazeRatio::CENTER);
        sampler.record(Target::Left, GazeRatio::CENTER);

        assert_eq!(
            sampler.finish(),
            Err(GazeErr::MissingSamples(Target::Right))
        );
    }

    #[test]
    fn test_center_from_samples() {
        let cal = CenterCalibration::from_samples(&[
            GazeRatio::new(0.4, 0.6),
            GazeRatio::new(0.6, 0.8),
        ])
        .unwrap();

        assert_close(cal.center, (0.5, 0.7));
        assert!(CenterCalibration::from_samples(&[]).is_none());
    }

    #[test]
    fn test_reference_center_is_in_adjusted_space() {
        let mut five = five_point();
        let adjusted = five.adjust(five.center);
        let reference = five.center().unwrap_or(GazeRatio::CENTER);
        assert_close(reference, (adjusted.horizontal, adjusted.vertical));

        let mut center = CenterCalibration {
            center: GazeRatio::new(0.5, 0.2),
        };
        assert_eq!(center.center(), Some(center.adjust(center.center)));
    }

    #[test]
    fn test_range_passes_through_until_it_has_a_span() {
        let mut cal = RangeCalibration::new();
        let first = GazeRatio::new(0.4, 0.7);

        assert_eq!(cal.adjust(first), first);
    }

    #[test]
    fn test_range_normalizes_after_two_samples() {
        let mut cal = RangeCalibration::new();
        cal.adjust(GazeRatio::new(0.4, 0.3));
        cal.adjust(GazeRatio::new(0.6, 0.7));

        assert_close(cal.adjust(GazeRatio::new(0.5, 0.5)), (0.5, 0.5));
        assert_close(cal.adjust(GazeRatio::new(0.6, 0.3)), (1.0, 0.0));

        let markers = cal.markers();
        assert_eq!(markers[0], GazeRatio::new(0.4, 0.3));
        assert_eq!(markers[3], GazeRatio::new(0.6, 0.7));
    }
}
