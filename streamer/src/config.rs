use std::{env, fs, path::PathBuf};

use gaze::{EyeRegions, ProcessorOptions, calibration::FivePointCalibration};
use serde::Deserialize;

use crate::error::{Result, StreamerErr};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UDP_BIND: &str = "0.0.0.0:3000";
const DEFAULT_UDP_TARGET: &str = "127.0.0.1:3000";
const DEFAULT_FRAME_RATE: u32 = 60;
const DEFAULT_SEND_SIZE: (u32, u32) = (640, 480);

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A synthetic pair of eyes looking left and right.
    Pattern { width: u32, height: u32, fps: u32 },
    /// A JPEG/PNG file, or a directory of them played in name order.
    Still { path: PathBuf, fps: u32 },
    /// A V4L2 capture device, only available with the `v4l` feature.
    Camera { device: usize, width: u32, height: u32 },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Pattern {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

fn default_point_samples() -> usize {
    10
}

fn default_center_samples() -> usize {
    50
}

fn default_center_attempts() -> usize {
    500
}

/// How gaze ratios get calibrated before being drawn.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CalibrationConfig {
    #[default]
    None,
    /// Interactive, looking at the center and the four extremes.
    FivePoint {
        #[serde(default = "default_point_samples")]
        samples: usize,
    },
    /// Interactive, looking at the center only.
    Center {
        #[serde(default = "default_center_samples")]
        samples: usize,
        #[serde(default = "default_center_attempts")]
        attempts: usize,
    },
    /// Widens its range with every observed ratio.
    Range,
    /// A five point calibration measured beforehand.
    Fixed(FivePointCalibration),
}

/// The complete streamer configuration.
///
/// Defaults are overridden by an optional JSON file named by
/// `STREAMER_CONFIG`, which in turn is overridden by `HOST`, `PORT`,
/// `UDP_BIND` and `UDP_TARGET`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    pub host: String,
    pub port: u16,
    pub udp_bind: String,
    pub udp_target: String,
    pub source: SourceConfig,
    pub jpeg_quality: u8,
    /// Pace of the relay render loop.
    pub frame_rate: u32,
    /// Frames are resized to this `(width, height)` before being sent.
    pub send_size: Option<(u32, u32)>,
    pub processor: ProcessorOptions,
    pub eyes: EyeRegions,
    pub calibration: CalibrationConfig,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            udp_bind: DEFAULT_UDP_BIND.to_string(),
            udp_target: DEFAULT_UDP_TARGET.to_string(),
            source: SourceConfig::default(),
            jpeg_quality: comms::DEFAULT_JPEG_QUALITY,
            frame_rate: DEFAULT_FRAME_RATE,
            send_size: Some(DEFAULT_SEND_SIZE),
            processor: ProcessorOptions::default(),
            eyes: EyeRegions::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl StreamerConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Loads the configuration reading variables through `var`.
    ///
    /// # Arguments
    /// * `var` - Looks up an environment variable by name.
    ///
    /// # Returns
    /// The validated configuration or `StreamerErr::InvalidConfig`.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match var("STREAMER_CONFIG") {
            Some(path) => {
                let raw = fs::read_to_string(&path)?;
                Self::from_json(&raw)
                    .map_err(|e| StreamerErr::InvalidConfig(format!("{path}: {e}")))?
            }
            None => Self::default(),
        };

        if let Some(host) = var("HOST") {
            config.host = host;
        }

        if let Some(port) = var("PORT") {
            config.port = port
                .parse()
                .map_err(|e| StreamerErr::InvalidConfig(format!("PORT {port:?}: {e}")))?;
        }

        if let Some(addr) = var("UDP_BIND") {
            config.udp_bind = addr;
        }

        if let Some(addr) = var("UDP_TARGET") {
            config.udp_target = addr;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document, missing fields take their default.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// The `host:port` the HTTP server binds to.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(StreamerErr::InvalidConfig(reason.to_string()));

        if !(1..=100).contains(&self.jpeg_quality) {
            return invalid("jpeg_quality must be within 1 and 100");
        }

        if self.frame_rate == 0 {
            return invalid("frame_rate must be positive");
        }

        if matches!(self.send_size, Some((0, _)) | Some((_, 0)))
            || matches!(self.processor.output_size, Some((0, _)) | Some((_, 0)))
        {
            return invalid("frame sizes must be positive");
        }

        match &self.source {
            SourceConfig::Pattern { width, height, .. } | SourceConfig::Camera { width, height, .. }
                if *width == 0 || *height == 0 =>
            {
                return invalid("source frame size must be positive");
            }
            SourceConfig::Pattern { fps: 0, .. } | SourceConfig::Still { fps: 0, .. } => {
                return invalid("source fps must be positive");
            }
            _ => {}
        }

        match self.calibration {
            CalibrationConfig::FivePoint { samples: 0 }
            | CalibrationConfig::Center { samples: 0, .. } => {
                invalid("calibration needs at least one sample")
            }
            CalibrationConfig::Center { samples, attempts } if attempts < samples => {
                invalid("calibration attempts can't be less than its samples")
            }
            _ => Ok(()),
        }
    }
}
