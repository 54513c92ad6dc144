//! Frame sources and the capture thread driving them.

use std::{
    f32::consts::TAU,
    fs, io,
    path::{Path, PathBuf},
    thread,
};

use comms::Frame;
use gaze::EyeRegions;
use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_ellipse_mut};
use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::{
    config::SourceConfig,
    error::Result,
    pace::Pacer,
};

/// Produces frames, blocking until the next one is available.
pub trait FrameSource: Send {
    /// Reads the next frame.
    ///
    /// # Returns
    /// `None` when this read failed but the source is still usable, or an
    /// error if the source is gone.
    fn next_frame(&mut self) -> io::Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Plays a fixed set of images in a loop.
pub struct StillSource {
    frames: Vec<Frame>,
    next: usize,
    pacer: Pacer,
}

impl StillSource {
    /// Loads a single image or every JPEG/PNG inside a directory.
    ///
    /// # Arguments
    /// * `path` - An image file or a directory of them.
    /// * `fps` - How many frames to produce per second.
    ///
    /// # Returns
    /// A new `StillSource` instance or an io error if nothing could be loaded.
    pub fn open<P: AsRef<Path>>(path: P, fps: u32) -> io::Result<Self> {
        let path = path.as_ref();

        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            paths.sort();
            paths
        } else {
            vec![path.to_path_buf()]
        };

        let frames = paths
            .iter()
            .map(|p| image::open(p).map(|img| img.into_rgb8()).map_err(io::Error::other))
            .collect::<io::Result<Vec<_>>>()?;

        info!("loaded {} still frames from {}", frames.len(), path.display());
        Self::from_frames(frames, fps)
    }

    pub fn from_frames(frames: Vec<Frame>, fps: u32) -> io::Result<Self> {
        if frames.is_empty() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no frames to play"));
        }

        Ok(Self {
            frames,
            next: 0,
            pacer: Pacer::new(fps),
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
}

impl FrameSource for StillSource {
    fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        self.pacer.wait();

        let frame = self.frames[self.next].clone();
        self.next = (self.next + 1) % self.frames.len();
        Ok(Some(frame))
    }
}

const SKIN: Rgb<u8> = Rgb([205, 170, 150]);
const SCLERA: Rgb<u8> = Rgb([240, 240, 235]);
const PUPIL: Rgb<u8> = Rgb([20, 15, 15]);
const SWEEP_FRAMES: u32 = 120;

/// A synthetic face whose pupils sweep from side to side, placed inside the
/// eye regions so the pupil detector can follow them.
pub struct PatternSource {
    width: u32,
    height: u32,
    eyes: EyeRegions,
    tick: u32,
    pacer: Pacer,
}

impl PatternSource {
    pub fn new(width: u32, height: u32, fps: u32, eyes: EyeRegions) -> Self {
        Self {
            width,
            height,
            eyes,
            tick: 0,
            pacer: Pacer::new(fps),
        }
    }

    fn render(&self) -> Frame {
        let (w, h) = (self.width as f32, self.height as f32);
        let mut frame = Frame::from_pixel(self.width, self.height, SKIN);
        let phase = (self.tick % SWEEP_FRAMES) as f32 / SWEEP_FRAMES as f32 * TAU;

        for region in [self.eyes.left, self.eyes.right] {
            let (rw, rh) = (region.width * w, region.height * h);
            let cx = region.x * w + rw / 2.;
            let cy = region.y * h + rh / 2.;

            let center = (cx as i32, cy as i32);
            let sclera = ((rw * 0.45) as i32, (rh * 0.45) as i32);
            draw_filled_ellipse_mut(&mut frame, center, sclera.0, sclera.1, SCLERA);

            let pupil = ((cx + phase.sin() * rw * 0.25) as i32, cy as i32);
            draw_filled_circle_mut(&mut frame, pupil, (rh * 0.2).max(2.) as i32, PUPIL);
        }

        frame
    }
}

impl FrameSource for PatternSource {
    fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        self.pacer.wait();

        let frame = self.render();
        self.tick = self.tick.wrapping_add(1);
        Ok(Some(frame))
    }
}

#[cfg(feature = "v4l")]
pub use camera::V4lCamera;

#[cfg(feature = "v4l")]
mod camera {
    use std::io;

    use comms::Frame;
    use log::info;
    use v4l::{
        Device, FourCC, buffer::Type, io::traits::CaptureStream, prelude::MmapStream,
        video::Capture,
    };

    use super::FrameSource;

    const BUFFERS: u32 = 4;

    /// A V4L2 camera delivering MJPEG frames.
    pub struct V4lCamera {
        stream: MmapStream<'static>,
    }

    impl V4lCamera {
        /// Opens `/dev/video<index>` asking for `width`x`height` MJPEG frames.
        pub fn open(index: usize, width: u32, height: u32) -> io::Result<Self> {
            let device = Device::new(index)?;

            let mut format = device.format()?;
            format.width = width;
            format.height = height;
            format.fourcc = FourCC::new(b"MJPG");
            let format = device.set_format(&format)?;
            info!(
                "camera {index} capturing {}x{} {}",
                format.width, format.height, format.fourcc
            );

            let stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFERS)?;
            Ok(Self { stream })
        }
    }

    impl FrameSource for V4lCamera {
        fn next_frame(&mut self) -> io::Result<Option<Frame>> {
            let (data, _meta) = self.stream.next()?;
            Ok(comms::decode_jpeg(data))
        }
    }
}

/// Builds the source described by `config`.
///
/// # Arguments
/// * `config` - Which source to open.
/// * `eyes` - Where the synthetic pattern draws its eyes.
///
/// # Returns
/// The opened source or an error if it isn't available.
pub fn open(config: &SourceConfig, eyes: &EyeRegions) -> Result<Box<dyn FrameSource>> {
    match config {
        SourceConfig::Pattern { width, height, fps } => {
            Ok(Box::new(PatternSource::new(*width, *height, *fps, *eyes)))
        }
        SourceConfig::Still { path, fps } => Ok(Box::new(StillSource::open(path, *fps)?)),
        #[cfg(feature = "v4l")]
        SourceConfig::Camera {
            device,
            width,
            height,
        } => Ok(Box::new(V4lCamera::open(*device, *width, *height)?)),
        #[cfg(not(feature = "v4l"))]
        SourceConfig::Camera { .. } => Err(crate::error::StreamerErr::InvalidConfig(
            "camera sources need the v4l feature".to_string(),
        )),
    }
}

/// Runs `source` on a dedicated thread, passing every frame through `stage`
/// and forwarding its output.
///
/// The thread ends when the source fails or the returned receiver is dropped.
///
/// # Arguments
/// * `source` - Where frames come from.
/// * `stage` - CPU bound work done on the capture thread, `None` skips the frame.
///
/// # Returns
/// The receiving end of the stage's output.
pub fn spawn_capture<S, T, F>(mut source: S, mut stage: F) -> io::Result<mpsc::Receiver<T>>
where
    S: FrameSource + 'static,
    T: Send + 'static,
    F: FnMut(Frame) -> Option<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || {
            loop {
                let frame = match source.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        debug!("failed to read a frame, skipping");
                        continue;
                    }
                    Err(e) => {
                        error!("capture stopped: {e}");
                        break;
                    }
                };

                let Some(out) = stage(frame) else {
                    continue;
                };

                if tx.blocking_send(out).is_err() {
                    debug!("capture receiver dropped, stopping");
                    break;
                }
            }
        })?;

    Ok(rx)
}
