//! Sends captured frames as JPEG datagrams.

use std::io;

use comms::{DatagramSender, Frame, FrameEncoder};
use image::imageops::{self, FilterType};
use log::{debug, warn};
use tokio::sync::mpsc;

/// Builds the capture stage of the sender: resize, then encode.
///
/// # Arguments
/// * `size` - Frames are resized to this `(width, height)` when set.
/// * `quality` - The JPEG quality.
///
/// # Returns
/// A stage for `spawn_capture` yielding encoded frames.
pub fn encode_stage(
    size: Option<(u32, u32)>,
    quality: u8,
) -> impl FnMut(Frame) -> Option<Vec<u8>> + Send {
    let mut encoder = FrameEncoder::new(quality);

    move |mut frame| {
        if let Some((width, height)) = size {
            if frame.dimensions() != (width, height) {
                frame = imageops::resize(&frame, width, height, FilterType::Triangle);
            }
        }

        match encoder.encode(&frame) {
            Ok(jpeg) => Some(jpeg.to_vec()),
            Err(e) => {
                warn!("failed to encode frame: {e}");
                None
            }
        }
    }
}

/// Sends every encoded frame from `frames` to the target of `tx`.
///
/// Frames too large for a datagram and failed sends are logged and skipped.
///
/// # Returns
/// How many frames were sent once `frames` is closed.
pub async fn run(mut frames: mpsc::Receiver<Vec<u8>>, tx: DatagramSender) -> u64 {
    let mut sent = 0;

    while let Some(jpeg) = frames.recv().await {
        match tx.send(&jpeg).await {
            Ok(()) => {
                sent += 1;
                debug!(bytes = jpeg.len(); "frame sent");
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                warn!("skipping frame: {e}");
            }
            Err(e) => warn!("failed to send frame to {}: {e}", tx.target()),
        }
    }

    sent
}
