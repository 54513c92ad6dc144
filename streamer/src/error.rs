use std::{error::Error, fmt, io};

use gaze::GazeErr;

/// The streamer's result type.
pub type Result<T> = std::result::Result<T, StreamerErr>;

/// Streamer runtime failures.
#[derive(Debug)]
pub enum StreamerErr {
    Io(io::Error),
    Gaze(GazeErr),
    InvalidConfig(String),
    /// The operator closed the input during an interactive calibration.
    CalibrationAborted,
}

impl fmt::Display for StreamerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamerErr::Io(e) => write!(f, "io error: {e}"),
            StreamerErr::Gaze(e) => write!(f, "gaze error: {e}"),
            StreamerErr::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            StreamerErr::CalibrationAborted => write!(f, "calibration aborted by the operator"),
        }
    }
}

impl Error for StreamerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StreamerErr::Io(e) => Some(e),
            StreamerErr::Gaze(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StreamerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<GazeErr> for StreamerErr {
    fn from(value: GazeErr) -> Self {
        Self::Gaze(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<StreamerErr> for io::Error {
    fn from(value: StreamerErr) -> Self {
        match value {
            StreamerErr::Io(e) => e,
            StreamerErr::InvalidConfig(_) => io::Error::new(io::ErrorKind::InvalidInput, value),
            other => io::Error::other(other),
        }
    }
}
