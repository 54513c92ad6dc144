//! JPEG encoding and decoding of frames.

use std::io;

use image::{ImageFormat, codecs::jpeg::JpegEncoder};

use crate::{DEFAULT_JPEG_QUALITY, Frame};

/// Encodes frames into JPEG, reusing the same output buffer between calls.
pub struct FrameEncoder {
    quality: u8,
    buf: Vec<u8>,
}

impl FrameEncoder {
    /// Creates a new `FrameEncoder`.
    ///
    /// # Arguments
    /// * `quality` - The JPEG quality, clamped to `1..=100`.
    ///
    /// # Returns
    /// A new `FrameEncoder` instance.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            buf: Vec::new(),
        }
    }

    /// Returns the configured JPEG quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encodes `frame` as a JPEG image.
    ///
    /// # Arguments
    /// * `frame` - The frame to encode.
    ///
    /// # Returns
    /// The encoded bytes, valid until the next call, or an `io::Error` if the
    /// encoder rejected the frame.
    pub fn encode(&mut self, frame: &Frame) -> io::Result<&[u8]> {
        let Self { quality, buf } = self;
        buf.clear();

        {
            let mut encoder = JpegEncoder::new_with_quality(&mut *buf, *quality);
            encoder.encode_image(frame).map_err(io::Error::other)?;
        }

        Ok(buf.as_slice())
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

/// Decodes a JPEG image into a frame.
///
/// # Arguments
/// * `bytes` - The encoded image.
///
/// # Returns
/// The decoded frame, or `None` if `bytes` isn't a valid JPEG image.
pub fn decode_jpeg(bytes: &[u8]) -> Option<Frame> {
    image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .ok()
        .map(|img| img.into_rgb8())
}
