//! Pupil detection.
//!
//! The pipeline only depends on the `GazeDetector` trait, `PupilDetector` is a
//! lightweight implementation that looks for the darkest blob inside fixed
//! eye regions of the frame, which works well for head mounted or otherwise
//! static cameras.

use std::collections::HashMap;

use image::{GrayImage, Luma, imageops};
use imageproc::{
    distance_transform::Norm,
    filter::gaussian_blur_f32,
    morphology::erode,
    region_labelling::{Connectivity, connected_components},
};
use log::debug;
use serde::Deserialize;

use crate::{
    Frame,
    error::{GazeErr, Result},
    reading::{GazeRatio, GazeReading},
};

/// Detects pupils and gaze ratios on single frames.
pub trait GazeDetector: Send {
    /// Runs the detection over `frame`.
    ///
    /// # Arguments
    /// * `frame` - The frame to analyze.
    ///
    /// # Returns
    /// The reading for this frame or an error if the frame can't be analyzed.
    fn detect(&mut self, frame: &Frame) -> Result<GazeReading>;
}

/// A rectangle expressed as fractions of the frame size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Resolves the region into pixel coordinates `(x, y, width, height)`.
    ///
    /// # Returns
    /// `None` if the region falls outside of a `width`x`height` frame or is too
    /// small to hold an eye.
    fn to_pixels(self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let (fw, fh) = (width as f32, height as f32);
        if self.x < 0. || self.y < 0. || self.x + self.width > 1. || self.y + self.height > 1. {
            return None;
        }

        let px = (self.x * fw) as u32;
        let py = (self.y * fh) as u32;
        let pw = ((self.width * fw) as u32).min(width - px);
        let ph = ((self.height * fh) as u32).min(height - py);

        (pw > MIN_EYE_SIZE && ph > MIN_EYE_SIZE).then_some((px, py, pw, ph))
    }
}

/// Where the eyes are in the frame. `left` is the one on the left side of the
/// image.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EyeRegions {
    pub left: Region,
    pub right: Region,
}

impl Default for EyeRegions {
    fn default() -> Self {
        Self {
            left: Region::new(0.2, 0.3, 0.25, 0.15),
            right: Region::new(0.55, 0.3, 0.25, 0.15),
        }
    }
}

const MIN_EYE_SIZE: u32 = 10;
const BLUR_SIGMA: f32 = 1.5;
const MIN_PUPIL_AREA: u32 = 4;
const CALIBRATION_FRAMES: usize = 20;
const TARGET_IRIS_FRACTION: f32 = 0.48;

/// Picks a binarization threshold per eye during the first frames.
#[derive(Debug, Default, Clone)]
struct ThresholdCalibration {
    samples: Vec<u8>,
}

impl ThresholdCalibration {
    fn is_complete(&self) -> bool {
        self.samples.len() >= CALIBRATION_FRAMES
    }

    fn threshold(&self) -> u8 {
        if self.samples.is_empty() {
            return 50;
        }
        let sum: u32 = self.samples.iter().map(|&t| t as u32).sum();
        (sum / self.samples.len() as u32) as u8
    }

    /// Finds the threshold whose dark area is closest to the average iris size.
    fn evaluate(&mut self, eye: &GrayImage) {
        let total = (eye.width() * eye.height()) as f32;

        let best = (5..100u8)
            .step_by(5)
            .map(|t| {
                let bin = binarize(eye, t);
                let dark = bin.pixels().filter(|p| p.0[0] == 0).count() as f32;
                (t, (dark / total - TARGET_IRIS_FRACTION).abs())
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t)
            .unwrap_or(50);

        self.samples.push(best);
    }
}

fn binarize(eye: &GrayImage, threshold: u8) -> GrayImage {
    let bin = GrayImage::from_fn(eye.width(), eye.height(), |x, y| {
        if eye.get_pixel(x, y).0[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    erode(&bin, Norm::LInf, 1)
}

/// Returns the centroid of the largest dark blob of a binarized eye.
fn largest_dark_blob(bin: &GrayImage) -> Option<(f32, f32)> {
    let labels = connected_components(bin, Connectivity::Eight, Luma([255u8]));

    let mut blobs: HashMap<u32, (u32, u64, u64)> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0];
        if label == 0 {
            continue;
        }

        let (n, sx, sy) = blobs.entry(label).or_default();
        *n += 1;
        *sx += x as u64;
        *sy += y as u64;
    }

    blobs
        .into_values()
        .filter(|(n, _, _)| *n >= MIN_PUPIL_AREA)
        .max_by_key(|(n, _, _)| *n)
        .map(|(n, sx, sy)| (sx as f32 / n as f32, sy as f32 / n as f32))
}

/// A located pupil in both frame and eye region relative terms.
struct Pupil {
    frame_pos: (u32, u32),
    ratio: GazeRatio,
}

/// Threshold based pupil detector over fixed eye regions.
pub struct PupilDetector {
    regions: EyeRegions,
    calibrations: [ThresholdCalibration; 2],
}

impl PupilDetector {
    /// Creates a new `PupilDetector`.
    ///
    /// # Arguments
    /// * `regions` - Where to look for each eye.
    ///
    /// # Returns
    /// A new `PupilDetector` instance.
    pub fn new(regions: EyeRegions) -> Self {
        Self {
            regions,
            calibrations: Default::default(),
        }
    }

    /// Whether both eyes finished picking their threshold.
    pub fn is_calibrated(&self) -> bool {
        self.calibrations.iter().all(ThresholdCalibration::is_complete)
    }

    fn locate(&mut self, frame: &Frame, side: usize) -> Result<Option<Pupil>> {
        let (region, eye) = match side {
            0 => (self.regions.left, "left"),
            _ => (self.regions.right, "right"),
        };

        let (width, height) = frame.dimensions();
        let (px, py, pw, ph) = region
            .to_pixels(width, height)
            .ok_or(GazeErr::RegionOutOfBounds { eye, width, height })?;

        let crop = imageops::crop_imm(frame, px, py, pw, ph).to_image();
        let gray = gaussian_blur_f32(&imageops::grayscale(&crop), BLUR_SIGMA);

        let calibration = &mut self.calibrations[side];
        if !calibration.is_complete() {
            calibration.evaluate(&gray);
        }

        let bin = binarize(&gray, calibration.threshold());
        let Some((cx, cy)) = largest_dark_blob(&bin) else {
            return Ok(None);
        };

        Ok(Some(Pupil {
            frame_pos: (px + cx.round() as u32, py + cy.round() as u32),
            ratio: GazeRatio::new(cx / (pw - 1) as f32, cy / (ph - 1) as f32),
        }))
    }
}

impl Default for PupilDetector {
    fn default() -> Self {
        Self::new(EyeRegions::default())
    }
}

impl GazeDetector for PupilDetector {
    fn detect(&mut self, frame: &Frame) -> Result<GazeReading> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(GazeErr::EmptyFrame);
        }

        let left = self.locate(frame, 0)?;
        let right = self.locate(frame, 1)?;

        let ratio = match (&left, &right) {
            (Some(l), Some(r)) => Some(GazeRatio::new(
                (l.ratio.horizontal + r.ratio.horizontal) / 2.,
                (l.ratio.vertical + r.ratio.vertical) / 2.,
            )),
            _ => None,
        };

        let reading = GazeReading {
            blinking: left.is_none() && right.is_none(),
            left_pupil: left.map(|p| p.frame_pos),
            right_pupil: right.map(|p| p.frame_pos),
            ratio,
        };

        debug!("gaze reading {reading:?}");
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;
    use imageproc::drawing::draw_filled_circle_mut;

    use super::*;

    const WIDTH: u32 = 320;
    const HEIGHT: u32 = 240;

    /// Draws two eyes with their pupils shifted by `offset` pixels.
    fn eyes_frame(offset: i32) -> Frame {
        let mut frame = Frame::from_pixel(WIDTH, HEIGHT, Rgb([210, 200, 190]));
        let regions = EyeRegions::default();

        for region in [regions.left, regions.right] {
            let cx = ((region.x + region.width / 2.) * WIDTH as f32) as i32;
            let cy = ((region.y + region.height / 2.) * HEIGHT as f32) as i32;
            draw_filled_circle_mut(&mut frame, (cx + offset, cy), 7, Rgb([15, 15, 15]));
        }

        frame
    }

    #[test]
    fn test_centered_pupils() {
        let mut detector = PupilDetector::default();
        let reading = detector.detect(&eyes_frame(0)).unwrap();

        assert!(reading.pupils_located());
        assert!(!reading.blinking);

        let ratio = reading.ratio.unwrap();
        assert!((ratio.horizontal - 0.5).abs() < 0.1, "{ratio}");
        assert!((ratio.vertical - 0.5).abs() < 0.1, "{ratio}");
    }

    #[test]
    fn test_shifted_pupils_move_the_ratio() {
        let mut detector = PupilDetector::default();

        let left = detector.detect(&eyes_frame(-20)).unwrap().ratio.unwrap();
        let right = detector.detect(&eyes_frame(20)).unwrap().ratio.unwrap();

        assert!(left.horizontal < 0.35, "{left}");
        assert!(right.horizontal > 0.65, "{right}");
    }

    #[test]
    fn test_closed_eyes_blink() {
        let mut detector = PupilDetector::default();
        let frame = Frame::from_pixel(WIDTH, HEIGHT, Rgb([200, 200, 200]));

        let reading = detector.detect(&frame).unwrap();
        assert!(reading.blinking);
        assert!(reading.ratio.is_none());
    }

    #[test]
    fn test_region_out_of_bounds() {
        let mut detector = PupilDetector::new(EyeRegions {
            left: Region::new(0.9, 0.1, 0.2, 0.1),
            right: Region::new(0.5, 0.1, 0.2, 0.1),
        });

        let err = detector.detect(&eyes_frame(0)).unwrap_err();
        assert!(matches!(err, GazeErr::RegionOutOfBounds { eye: "left", .. }));
    }

    #[test]
    fn test_empty_frame() {
        let mut detector = PupilDetector::default();
        assert_eq!(detector.detect(&Frame::new(0, 0)), Err(GazeErr::EmptyFrame));
    }

    #[test]
    fn test_threshold_calibration_completes() {
        let mut detector = PupilDetector::default();
        let frame = eyes_frame(0);

        for _ in 0..CALIBRATION_FRAMES {
            detector.detect(&frame).unwrap();
        }

        assert!(detector.is_calibrated());
    }
}
