//! Interactive calibration routines, run before streaming starts.

use std::io::{BufRead, Write};

use gaze::{
    GazeDetector, GazeErr, GazeRatio,
    calibration::{
        Calibration, CenterCalibration, FivePointCalibration, FivePointSampler, RangeCalibration,
        Target,
    },
};
use log::{info, warn};

use crate::{
    config::CalibrationConfig,
    error::{Result, StreamerErr},
    source::FrameSource,
};

const RULE: &str = "----------------------------------------";

/// Builds the calibration described by `config`, asking the operator through
/// `input` and `output` when it's interactive.
///
/// # Arguments
/// * `config` - Which calibration to run.
/// * `source` - Where samples are captured from.
/// * `detector` - What measures every sample.
/// * `input` - Where the operator confirms each step.
/// * `output` - Where prompts are written.
///
/// # Returns
/// The calibration, `None` if disabled, or an error if it couldn't be measured.
pub fn run<S, R, W>(
    config: &CalibrationConfig,
    source: &mut S,
    detector: &mut dyn GazeDetector,
    input: &mut R,
    output: &mut W,
) -> Result<Option<Box<dyn Calibration>>>
where
    S: FrameSource + ?Sized,
    R: BufRead,
    W: Write,
{
    let calibration: Box<dyn Calibration> = match config {
        CalibrationConfig::None => return Ok(None),
        CalibrationConfig::Range => Box::new(RangeCalibration::new()),
        CalibrationConfig::Fixed(calibration) => Box::new(*calibration),
        CalibrationConfig::FivePoint { samples } => {
            Box::new(five_point(source, detector, *samples, input, output)?)
        }
        CalibrationConfig::Center { samples, attempts } => {
            Box::new(center(source, detector, *samples, *attempts, input, output)?)
        }
    };

    Ok(Some(calibration))
}

/// Measures a `FivePointCalibration`, starting over whenever a target gets no
/// valid sample.
///
/// # Arguments
/// * `samples` - Frames captured per target.
pub fn five_point<S, R, W>(
    source: &mut S,
    detector: &mut dyn GazeDetector,
    samples: usize,
    input: &mut R,
    output: &mut W,
) -> Result<FivePointCalibration>
where
    S: FrameSource + ?Sized,
    R: BufRead,
    W: Write,
{
    'attempt: loop {
        let mut sampler = FivePointSampler::new();

        for target in Target::ALL {
            writeln!(output, "{RULE}")?;
            prompt(input, output, &format!("Look {target} and press Enter."))?;

            for ratio in measure(source, detector, samples)? {
                sampler.record(target, ratio);
            }

            if sampler.samples(target) == 0 {
                writeln!(output, "Gaze not properly detected for {target}. Please retry.")?;
                warn!("no valid samples looking {target}, restarting calibration");
                continue 'attempt;
            }
        }

        writeln!(output, "{RULE}")?;
        let calibration = sampler.finish()?;

        writeln!(output, "------------ CALIBRATION ------------")?;
        writeln!(output, "Center: {}", calibration.center)?;
        writeln!(
            output,
            "Horizontal range: ({:.3}, {:.3})",
            calibration.horizontal.0, calibration.horizontal.1
        )?;
        writeln!(
            output,
            "Vertical range: ({:.3}, {:.3})",
            calibration.vertical.0, calibration.vertical.1
        )?;
        writeln!(output, "-------------------------------------")?;

        info!("calibrated: {calibration}");
        return Ok(calibration);
    }
}

/// Measures where the center is by averaging `samples` valid readings,
/// capturing at most `attempts` frames.
pub fn center<S, R, W>(
    source: &mut S,
    detector: &mut dyn GazeDetector,
    samples: usize,
    attempts: usize,
    input: &mut R,
    output: &mut W,
) -> Result<CenterCalibration>
where
    S: FrameSource + ?Sized,
    R: BufRead,
    W: Write,
{
    prompt(input, output, "Look at the center. Press Enter to continue...")?;

    let mut ratios = Vec::with_capacity(samples);
    for _ in 0..attempts {
        if ratios.len() == samples {
            break;
        }
        ratios.extend(measure(source, detector, 1)?);
    }

    if ratios.len() < samples {
        warn!(
            "only {} of {samples} center samples after {attempts} frames",
            ratios.len()
        );
        return Err(GazeErr::MissingSamples(Target::Center).into());
    }

    let calibration =
        CenterCalibration::from_samples(&ratios).ok_or(GazeErr::MissingSamples(Target::Center))?;

    writeln!(output, "Center: {}", calibration.center)?;
    info!("calibrated center at {}", calibration.center);
    Ok(calibration)
}

/// Captures `frames` frames and returns every ratio the detector found.
fn measure<S>(
    source: &mut S,
    detector: &mut dyn GazeDetector,
    frames: usize,
) -> Result<Vec<GazeRatio>>
where
    S: FrameSource + ?Sized,
{
    let mut ratios = Vec::with_capacity(frames);

    for _ in 0..frames {
        let Some(frame) = source.next_frame()? else {
            continue;
        };

        match detector.detect(&frame) {
            Ok(reading) => ratios.extend(reading.ratio),
            Err(e) => warn!("gaze detection failed, skipping frame: {e}"),
        }
    }

    Ok(ratios)
}

fn prompt<R, W>(input: &mut R, output: &mut W, message: &str) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "{message}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(StreamerErr::CalibrationAborted);
    }

    Ok(())
}
