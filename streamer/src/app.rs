//! The three ways of running the streamer.

use std::io;

use comms::{DatagramReceiver, DatagramSender, FrameEncoder, LatestFrame};
use gaze::{FrameProcessor, PupilDetector};
use log::{info, warn};
use tokio::task;

use crate::{
    calibrate,
    config::StreamerConfig,
    error::{Result, StreamerErr},
    http::HttpServer,
    hub::{FrameHub, Jpeg},
    relay::{self, Renderer, SlotSource},
    sender,
    source::{self, FrameSource, spawn_capture},
};

/// Local address the sending socket binds to.
const SEND_BIND: &str = "0.0.0.0:0";

/// Runs the configured calibration on `source` and builds the processor.
///
/// Interactive calibrations block on stdin, so this runs on the blocking pool.
///
/// # Returns
/// The source back, ready for streaming, and the processor.
async fn calibrated_processor<S>(
    config: &StreamerConfig,
    mut source: S,
) -> Result<(S, FrameProcessor)>
where
    S: FrameSource + 'static,
{
    let calibration = config.calibration.clone();
    let eyes = config.eyes;

    let (source, detector, calibration) = task::spawn_blocking(move || {
        let mut detector = PupilDetector::new(eyes);
        let mut input = io::stdin().lock();
        let mut output = io::stdout();

        let calibration =
            calibrate::run(&calibration, &mut source, &mut detector, &mut input, &mut output)?;
        Ok::<_, StreamerErr>((source, detector, calibration))
    })
    .await
    .map_err(io::Error::other)??;

    let mut processor = FrameProcessor::new(Box::new(detector), config.processor.clone());
    if let Some(calibration) = calibration {
        processor = processor.with_calibration(calibration);
    }

    Ok((source, processor))
}

/// Captures locally, processes every frame and serves the result over HTTP.
pub async fn serve(config: StreamerConfig) -> Result<()> {
    let source = source::open(&config.source, &config.eyes)?;
    let (source, mut processor) = calibrated_processor(&config, source).await?;

    let hub = FrameHub::new();
    let server = HttpServer::bind(config.http_addr(), hub.clone()).await?;
    info!("serving video at http://{}", server.local_addr()?);

    let mut encoder = FrameEncoder::new(config.jpeg_quality);
    let mut frames = spawn_capture(source, move |frame| {
        let frame = processor.process(frame);
        match encoder.encode(&frame) {
            Ok(jpeg) => Some(Jpeg::from(jpeg)),
            Err(e) => {
                warn!("failed to encode frame: {e}");
                None
            }
        }
    })?;

    let publisher = async {
        while let Some(jpeg) = frames.recv().await {
            hub.publish(jpeg);
        }
    };

    tokio::select! {
        ret = server.run() => ret?,
        _ = publisher => warn!("capture ended, no more frames to serve"),
    }

    Ok(())
}

/// Captures locally and sends every frame as a JPEG datagram.
pub async fn send(config: StreamerConfig) -> Result<()> {
    let source = source::open(&config.source, &config.eyes)?;

    let tx = DatagramSender::connect(SEND_BIND, &config.udp_target).await?;
    info!("streaming to udp://{}", tx.target());

    let stage = sender::encode_stage(config.send_size, config.jpeg_quality);
    let frames = spawn_capture(source, stage)?;

    let sent = sender::run(frames, tx).await;
    info!("capture ended after {sent} frames");
    Ok(())
}

/// Receives frames over UDP, processes the newest one at a steady pace and
/// serves the result over HTTP.
pub async fn relay(config: StreamerConfig) -> Result<()> {
    let rx = DatagramReceiver::bind(&config.udp_bind).await?;
    info!("listening for video stream on UDP {}", rx.local_addr()?);

    let slot = LatestFrame::new();
    let listener = tokio::spawn(relay::listen(rx, slot.clone()));

    let source = SlotSource::new(slot.clone(), config.frame_rate);
    let (_, processor) = calibrated_processor(&config, source).await?;

    let hub = FrameHub::new();
    let quality = config.jpeg_quality;
    let renderer = Renderer::spawn(slot, processor, quality, hub.clone(), config.frame_rate)?;

    let server = HttpServer::bind(config.http_addr(), hub).await?;
    info!("serving video at http://{}", server.local_addr()?);

    let ret = tokio::select! {
        ret = server.run() => ret,
        ret = listener => ret.map_err(io::Error::other).and_then(|ret| ret),
    };

    let rendered = renderer.stop();
    info!("rendered {rendered} frames");

    Ok(ret?)
}
