pub mod attention;
pub mod calibration;
pub mod detector;
pub mod error;
pub mod filter;
pub mod overlay;
pub mod processor;
pub mod reading;

pub use comms::Frame;
pub use detector::{EyeRegions, GazeDetector, PupilDetector, Region};
pub use error::{GazeErr, Result};
pub use filter::RatioFilter;
pub use processor::{FrameProcessor, ProcessorOptions};
pub use reading::{Direction, GazeRatio, GazeReading};
