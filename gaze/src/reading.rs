use std::fmt;

use serde::Deserialize;

/// Horizontal ratios at or below this mean the user looks right.
const RIGHT_THRESHOLD: f32 = 0.35;

/// Horizontal ratios at or above this mean the user looks left.
const LEFT_THRESHOLD: f32 = 0.65;

/// A normalized pupil position along both axes.
///
/// Horizontally `0.0` is the extreme right and `1.0` the extreme left, as seen
/// by a camera facing the user. Vertically `0.0` is the top.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GazeRatio {
    pub horizontal: f32,
    pub vertical: f32,
}

impl GazeRatio {
    /// The ratio of a centered gaze.
    pub const CENTER: Self = Self::new(0.5, 0.5);

    /// Creates a new `GazeRatio`.
    pub const fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

impl fmt::Display for GazeRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.horizontal, self.vertical)
    }
}

/// A coarse gaze classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Blinking,
    Right,
    Left,
    Center,
}

impl Direction {
    /// Returns the label drawn on annotated frames.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Blinking => "Blinking",
            Direction::Right => "Looking right",
            Direction::Left => "Looking left",
            Direction::Center => "Looking center",
        }
    }
}

/// The result of running a detector over a single frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazeReading {
    /// The left pupil in frame coordinates.
    pub left_pupil: Option<(u32, u32)>,
    /// The right pupil in frame coordinates.
    pub right_pupil: Option<(u32, u32)>,
    /// Present only if both pupils were located.
    pub ratio: Option<GazeRatio>,
    pub blinking: bool,
}

impl GazeReading {
    /// Whether both pupils were located.
    pub fn pupils_located(&self) -> bool {
        self.left_pupil.is_some() && self.right_pupil.is_some()
    }

    /// Classifies the reading.
    ///
    /// # Returns
    /// `None` when there's nothing to classify, blinking takes precedence over
    /// any ratio.
    pub fn direction(&self) -> Option<Direction> {
        if self.blinking {
            return Some(Direction::Blinking);
        }

        let ratio = self.ratio?;
        let direction = if ratio.horizontal <= RIGHT_THRESHOLD {
            Direction::Right
        } else if ratio.horizontal >= LEFT_THRESHOLD {
            Direction::Left
        } else {
            Direction::Center
        };

        Some(direction)
    }
}
