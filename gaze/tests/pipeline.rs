use std::collections::VecDeque;

use gaze::{
    Frame, FrameProcessor, GazeDetector, GazeErr, GazeRatio, GazeReading, ProcessorOptions,
    calibration::{CenterCalibration, FivePointCalibration},
    overlay::{GREEN, RED, WHITE},
    processor::{MessageTrigger, PHRASES},
};
use image::Rgb;

const WIDTH: u32 = 200;
const HEIGHT: u32 = 100;
const GREY: Rgb<u8> = Rgb([90, 90, 90]);

/// Replays a fixed list of readings, failing once it runs out.
struct ScriptedDetector {
    readings: VecDeque<gaze::Result<GazeReading>>,
}

impl ScriptedDetector {
    fn boxed(readings: Vec<gaze::Result<GazeReading>>) -> Box<Self> {
        Box::new(Self {
            readings: readings.into(),
        })
    }
}

impl GazeDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> gaze::Result<GazeReading> {
        self.readings.pop_front().unwrap_or(Err(GazeErr::EmptyFrame))
    }
}

fn looking_at(horizontal: f32, vertical: f32) -> gaze::Result<GazeReading> {
    Ok(GazeReading {
        left_pupil: Some((60, 50)),
        right_pupil: Some((140, 50)),
        ratio: Some(GazeRatio::new(horizontal, vertical)),
        blinking: false,
    })
}

fn grey_frame() -> Frame {
    Frame::from_pixel(WIDTH, HEIGHT, GREY)
}

fn count(frame: &Frame, color: Rgb<u8>) -> usize {
    frame.pixels().filter(|p| **p == color).count()
}

fn quiet_options() -> ProcessorOptions {
    ProcessorOptions {
        show_eye_positions: false,
        show_gaze_position: false,
        filter_size: 0,
        ..Default::default()
    }
}

#[test]
fn detection_errors_leave_the_frame_untouched() {
    let detector = ScriptedDetector::boxed(vec![Err(GazeErr::EmptyFrame)]);
    let mut processor = FrameProcessor::new(detector, ProcessorOptions::default());

    let out = processor.process(grey_frame());
    assert_eq!(out, grey_frame());
    assert!(processor.last_ratio().is_none());
}

#[test]
fn disabled_tracking_skips_detection() {
    let detector = ScriptedDetector::boxed(vec![]);
    let options = ProcessorOptions {
        gaze_tracking: false,
        show_center_marker: true,
        output_size: Some((320, 240)),
        ..Default::default()
    };
    let mut processor = FrameProcessor::new(detector, options);

    let out = processor.process(grey_frame());
    assert_eq!(out.dimensions(), (320, 240));
    assert_eq!(out.get_pixel(160 + 50, 120), &GREEN);
}

#[test]
fn gaze_circle_follows_the_filtered_ratio() {
    let detector = ScriptedDetector::boxed(vec![looking_at(1.0, 0.5)]);
    let options = ProcessorOptions {
        show_eye_positions: false,
        filter_size: 1,
        ..Default::default()
    };
    let mut processor = FrameProcessor::new(detector, options);

    let out = processor.process(grey_frame());

    // (0.5 * 1 + 1.0) / 2 = 0.75 of the width.
    assert_eq!(processor.last_ratio(), Some(GazeRatio::new(0.75, 0.5)));
    assert_eq!(out.get_pixel(150 + 10, 50), &GREEN);
}

#[test]
fn pupils_without_ratio_are_still_drawn() {
    let reading = GazeReading {
        left_pupil: Some((60, 50)),
        right_pupil: None,
        ratio: None,
        blinking: false,
    };
    let detector = ScriptedDetector::boxed(vec![Ok(reading)]);
    let mut processor = FrameProcessor::new(detector, ProcessorOptions::default());

    let out = processor.process(grey_frame());
    assert_eq!(out.get_pixel(60, 50), &GREEN);
    assert!(processor.last_ratio().is_none());
}

#[test]
fn five_point_calibration_is_applied() {
    let detector = ScriptedDetector::boxed(vec![looking_at(0.6, 0.4)]);
    let calibration = FivePointCalibration {
        center: GazeRatio::new(0.6, 0.4),
        horizontal: (0.4, 0.8),
        vertical: (0.2, 0.6),
    };
    let options = ProcessorOptions {
        show_calibration_points: true,
        ..quiet_options()
    };
    let mut processor =
        FrameProcessor::new(detector, options).with_calibration(Box::new(calibration));

    let out = processor.process(grey_frame());
    assert_eq!(processor.last_ratio(), Some(GazeRatio::new(0.5, 0.5)));

    // Markers sit on the raw calibration points.
    assert_eq!(out.get_pixel(120 + 5, 40), &GREEN);
}

#[test]
fn center_gaze_replaces_the_frame_with_a_message() {
    let detector = ScriptedDetector::boxed(vec![looking_at(0.9, 0.5), looking_at(0.5, 0.5)]);
    let options = ProcessorOptions {
        show_text_message: true,
        ..quiet_options()
    };
    let mut processor = FrameProcessor::new(detector, options);

    let away = processor.process(grey_frame());
    assert_eq!(away, grey_frame());

    let centered = processor.process(grey_frame());
    assert_eq!(count(&centered, GREY), 0);
    assert!(count(&centered, WHITE) > 0);
    let painted = count(&centered, WHITE) + count(&centered, Rgb([0, 0, 0]));
    assert_eq!(painted, (WIDTH * HEIGHT) as usize);
}

#[test]
fn looking_down_uses_the_calibrated_center() {
    let detector = ScriptedDetector::boxed(vec![
        looking_at(0.5, 0.3),
        looking_at(0.5, 0.6),
        looking_at(0.5, 0.4),
    ]);
    let options = ProcessorOptions {
        show_text_message: true,
        show_calibration_points: true,
        message_trigger: MessageTrigger::LookingDown,
        ..quiet_options()
    };
    let calibration = CenterCalibration {
        center: GazeRatio::new(0.5, 0.2),
    };
    let mut processor = FrameProcessor::new(detector, options)
        .with_calibration(Box::new(calibration))
        .with_seed(7);

    let first = processor.process(grey_frame());
    assert_eq!(first.get_pixel(100 + 10, 20), &RED);

    let second = processor.process(grey_frame());
    assert!(count(&second, WHITE) > 0);
    assert!(!PHRASES.is_empty());

    // Still looking down.
    let third = processor.process(grey_frame());
    assert_eq!(count(&third, GREY), 0);
}

#[test]
fn five_point_center_does_not_trigger_looking_down() {
    let detector = ScriptedDetector::boxed(vec![looking_at(0.5, 0.2), looking_at(0.5, 0.4)]);
    let calibration = FivePointCalibration {
        center: GazeRatio::new(0.5, 0.2),
        horizontal: (0.3, 0.7),
        vertical: (0.1, 0.4),
    };
    let options = ProcessorOptions {
        show_text_message: true,
        message_trigger: MessageTrigger::LookingDown,
        ..quiet_options()
    };
    let mut processor = FrameProcessor::new(detector, options)
        .with_calibration(Box::new(calibration))
        .with_seed(3);

    let centered = processor.process(grey_frame());
    assert_eq!(processor.last_ratio(), Some(GazeRatio::new(0.5, 0.5)));
    assert_eq!(count(&centered, WHITE), 0);
    assert_eq!(centered, grey_frame());

    // The bottom calibration point maps to 1.0, well below the center.
    let down = processor.process(grey_frame());
    assert_eq!(processor.last_ratio(), Some(GazeRatio::new(0.5, 1.0)));
    assert!(count(&down, WHITE) > 0);
}

#[test]
fn gaze_radius_sizes_the_circle() {
    let detector = ScriptedDetector::boxed(vec![looking_at(0.5, 0.5)]);
    let options = ProcessorOptions {
        show_gaze_position: true,
        gaze_radius: 30,
        ..quiet_options()
    };
    let mut processor = FrameProcessor::new(detector, options);

    let out = processor.process(grey_frame());
    assert_eq!(out.get_pixel(100 + 30, 50), &GREEN);
    assert_eq!(out.get_pixel(100 + 10, 50), &GREY);
}
