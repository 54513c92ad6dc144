//! The per-frame gaze pipeline: detect, filter, calibrate and annotate.

use image::imageops::{self, FilterType};
use log::{debug, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Deserialize;

use crate::{
    Frame,
    attention::{CenterGaze, Glance, LookingDown},
    calibration::Calibration,
    detector::GazeDetector,
    filter::RatioFilter,
    overlay::{self, GREEN, LABEL, RED, WHITE},
    reading::GazeRatio,
};

const MARKER_RADIUS: i32 = 5;
const CENTER_MARKER_RADIUS: i32 = 10;
const MESSAGE_SCALE: u32 = 2;
const LABEL_SCALE: u32 = 3;
const LABEL_ORIGIN: (i32, i32) = (90, 40);

/// Phrases shown when the user looks down.
pub const PHRASES: &[&str] = &[
    "Hello there",
    "I see you",
    "What's up?",
    "My eyes are up here",
    "Caught you looking!",
    "Hey, over here!",
    "Eye contact, please",
    "Trying to hide, huh?",
    "Focus, focus!",
    "Looking sharp, but listen too",
    "Eyes front, please",
    "Are we playing peek-a-boo?",
    "This is not a mirror!",
    "Oh, hello self-observer",
    "Got distracted?",
    "Look at me when I'm talking",
    "Admiring the view?",
    "This isn't a photoshoot",
    "Stop the screen stare",
    "Your attention, please",
    ":(",
];

/// Which attention trigger replaces the frame with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTrigger {
    /// The first phrase while the user looks at the center.
    #[default]
    CenterGaze,
    /// A random phrase, picked every time the user starts looking down.
    LookingDown,
}

/// What the processor does and draws on every frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorOptions {
    pub gaze_tracking: bool,
    pub show_eye_positions: bool,
    pub show_gaze_position: bool,
    pub show_calibration_points: bool,
    pub show_text_message: bool,
    pub cover_eyes: bool,
    pub show_direction: bool,
    pub show_center_marker: bool,
    pub message_trigger: MessageTrigger,
    pub filter_size: u32,
    /// Radius of the gaze circle, in pixels.
    pub gaze_radius: i32,
    /// Frames are resized to this `(width, height)` before anything else.
    pub output_size: Option<(u32, u32)>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            gaze_tracking: true,
            show_eye_positions: true,
            show_gaze_position: true,
            show_calibration_points: false,
            show_text_message: false,
            cover_eyes: false,
            show_direction: false,
            show_center_marker: false,
            message_trigger: MessageTrigger::default(),
            filter_size: 5,
            gaze_radius: 10,
            output_size: None,
        }
    }
}

enum Trigger {
    Center(CenterGaze),
    Down(LookingDown),
}

/// Runs a `GazeDetector` over frames and draws the feedback on top of them.
pub struct FrameProcessor {
    detector: Box<dyn GazeDetector>,
    options: ProcessorOptions,
    filter: RatioFilter,
    calibration: Option<Box<dyn Calibration>>,
    trigger: Trigger,
    phrase: usize,
    rng: StdRng,
    last_ratio: Option<GazeRatio>,
}

impl FrameProcessor {
    /// Creates a new `FrameProcessor` without calibration.
    ///
    /// # Arguments
    /// * `detector` - The detector to run on every frame.
    /// * `options` - What to do and draw.
    ///
    /// # Returns
    /// A new `FrameProcessor` instance.
    pub fn new(detector: Box<dyn GazeDetector>, options: ProcessorOptions) -> Self {
        let filter = RatioFilter::new(options.filter_size);
        let trigger = Self::make_trigger(options.message_trigger, None);

        Self {
            detector,
            options,
            filter,
            calibration: None,
            trigger,
            phrase: 0,
            rng: StdRng::from_os_rng(),
            last_ratio: None,
        }
    }

    /// Sets the calibration applied after filtering.
    pub fn with_calibration(mut self, calibration: Box<dyn Calibration>) -> Self {
        self.trigger = Self::make_trigger(self.options.message_trigger, calibration.center());
        self.calibration = Some(calibration);
        self
    }

    /// Seeds the phrase picker, mostly useful for deterministic output.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn make_trigger(kind: MessageTrigger, center: Option<GazeRatio>) -> Trigger {
        match kind {
            MessageTrigger::CenterGaze => Trigger::Center(CenterGaze::default()),
            MessageTrigger::LookingDown => {
                Trigger::Down(LookingDown::with_center(center.unwrap_or(GazeRatio::CENTER)))
            }
        }
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// The last filtered and calibrated ratio.
    pub fn last_ratio(&self) -> Option<GazeRatio> {
        self.last_ratio
    }

    /// Processes a single frame.
    ///
    /// Detection failures are logged and the frame is returned as it came.
    ///
    /// # Arguments
    /// * `frame` - The captured frame.
    ///
    /// # Returns
    /// The annotated frame.
    pub fn process(&mut self, mut frame: Frame) -> Frame {
        if let Some((width, height)) = self.options.output_size {
            if frame.dimensions() != (width, height) {
                frame = imageops::resize(&frame, width, height, FilterType::Triangle);
            }
        }

        if self.options.show_center_marker {
            overlay::draw_center_marker(&mut frame);
        }

        if !self.options.gaze_tracking {
            return frame;
        }

        let reading = match self.detector.detect(&frame) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("gaze detection failed, skipping frame: {e}");
                return frame;
            }
        };

        if self.options.show_eye_positions {
            overlay::draw_pupils(&mut frame, &reading);
        }

        if self.options.show_direction {
            if let Some(direction) = reading.direction() {
                overlay::draw_text(&mut frame, direction.label(), LABEL_ORIGIN, LABEL_SCALE, LABEL);
            }
        }

        let Some(raw) = reading.ratio else {
            return frame;
        };

        let mut ratio = self.filter.apply(raw);
        if let Some(calibration) = &mut self.calibration {
            ratio = calibration.adjust(ratio);
        }
        self.last_ratio = Some(ratio);
        debug!("HR: {:.3} | VR: {:.3}", ratio.horizontal, ratio.vertical);

        if self.options.show_gaze_position {
            overlay::show_gaze_location(&mut frame, ratio, self.options.gaze_radius, GREEN);
        }

        if self.options.show_calibration_points {
            if let Some(calibration) = &self.calibration {
                let markers = calibration.markers();
                match markers.as_slice() {
                    [center] => {
                        overlay::show_gaze_location(&mut frame, *center, CENTER_MARKER_RADIUS, RED)
                    }
                    markers => overlay::draw_markers(&mut frame, markers, MARKER_RADIUS, GREEN),
                }
            }
        }

        if self.options.cover_eyes {
            overlay::cover_eyes(&mut frame, &reading);
        }

        let triggered = self.update_trigger(ratio);
        if self.options.show_text_message && triggered {
            let (width, height) = frame.dimensions();
            frame = overlay::black_frame(width, height);
            overlay::draw_centered_text(&mut frame, PHRASES[self.phrase], MESSAGE_SCALE, WHITE);
        }

        frame
    }

    fn update_trigger(&mut self, ratio: GazeRatio) -> bool {
        match &mut self.trigger {
            Trigger::Center(trigger) => {
                self.phrase = 0;
                trigger.update(ratio)
            }
            Trigger::Down(trigger) => {
                let glance = trigger.update(ratio);
                if glance == Glance::Entered {
                    self.phrase = self.rng.random_range(0..PHRASES.len());
                }
                glance.is_down()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GazeErr, GazeReading};

    struct NoDetector;

    impl GazeDetector for NoDetector {
        fn detect(&mut self, _frame: &Frame) -> crate::Result<GazeReading> {
            Err(GazeErr::EmptyFrame)
        }
    }

    fn processor(trigger: MessageTrigger) -> FrameProcessor {
        let options = ProcessorOptions {
            message_trigger: trigger,
            ..Default::default()
        };
        FrameProcessor::new(Box::new(NoDetector), options).with_seed(11)
    }

    #[test]
    fn test_make_trigger_defaults_to_the_frame_center() {
        let trigger = FrameProcessor::make_trigger(MessageTrigger::LookingDown, None);
        let Trigger::Down(mut down) = trigger else {
            panic!("expected a looking down trigger");
        };
        assert_eq!(down.update(GazeRatio::new(0.5, 0.7)), Glance::Away);
        assert_eq!(down.update(GazeRatio::new(0.5, 0.8)), Glance::Entered);

        let center = Some(GazeRatio::new(0.5, 0.2));
        let trigger = FrameProcessor::make_trigger(MessageTrigger::LookingDown, center);
        let Trigger::Down(mut down) = trigger else {
            panic!("expected a looking down trigger");
        };
        assert_eq!(down.update(GazeRatio::new(0.5, 0.5)), Glance::Entered);

        let trigger = FrameProcessor::make_trigger(MessageTrigger::CenterGaze, center);
        assert!(matches!(trigger, Trigger::Center(_)));
    }

    #[test]
    fn test_center_trigger_always_uses_the_first_phrase() {
        let mut processor = processor(MessageTrigger::CenterGaze);
        processor.phrase = 4;

        assert!(processor.update_trigger(GazeRatio::CENTER));
        assert_eq!(processor.phrase, 0);
        assert!(!processor.update_trigger(GazeRatio::new(0.9, 0.5)));
    }

    #[test]
    fn test_down_trigger_picks_a_phrase_only_on_entry() {
        let mut processor = processor(MessageTrigger::LookingDown);

        assert!(!processor.update_trigger(GazeRatio::CENTER));
        assert!(processor.update_trigger(GazeRatio::new(0.5, 0.9)));
        let picked = processor.phrase;
        assert!(picked < PHRASES.len());

        processor.phrase = PHRASES.len();
        assert!(processor.update_trigger(GazeRatio::new(0.5, 0.9)));
        assert_eq!(processor.phrase, PHRASES.len());

        assert!(!processor.update_trigger(GazeRatio::CENTER));
    }

    #[test]
    fn test_with_calibration_reseeds_the_trigger() {
        use crate::calibration::CenterCalibration;

        let calibration = CenterCalibration {
            center: GazeRatio::new(0.5, 0.2),
        };
        let mut processor =
            processor(MessageTrigger::LookingDown).with_calibration(Box::new(calibration));

        assert!(processor.update_trigger(GazeRatio::new(0.5, 0.5)));
    }
}
