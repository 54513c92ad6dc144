use std::{error::Error, fmt};

use crate::calibration::Target;

/// The gaze module's result type.
pub type Result<T> = std::result::Result<T, GazeErr>;

/// Failures while detecting or calibrating gaze.
#[derive(Debug, Clone, PartialEq)]
pub enum GazeErr {
    /// The frame has no pixels.
    EmptyFrame,
    /// An eye region doesn't fit inside the frame.
    RegionOutOfBounds {
        eye: &'static str,
        width: u32,
        height: u32,
    },
    /// Calibration ended without a single valid sample for a target.
    MissingSamples(Target),
}

impl fmt::Display for GazeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GazeErr::EmptyFrame => f.write_str("the frame is empty"),
            GazeErr::RegionOutOfBounds { eye, width, height } => write!(
                f,
                "the {eye} eye region doesn't fit in a {width}x{height} frame"
            ),
            GazeErr::MissingSamples(target) => {
                write!(f, "gaze not properly detected looking {target}")
            }
        }
    }
}

impl Error for GazeErr {}
