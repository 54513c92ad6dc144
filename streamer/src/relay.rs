//! Receives frames over UDP and re-renders the newest one at a steady pace.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use comms::{DatagramReceiver, Frame, FrameEncoder, LatestFrame};
use gaze::FrameProcessor;
use log::{debug, info, warn};

use crate::{hub::FrameHub, pace::Pacer, source::FrameSource};

/// Decodes incoming datagrams into `slot` until the socket fails.
///
/// # Arguments
/// * `rx` - The bound receiving socket.
/// * `slot` - Where the newest frame is kept.
///
/// # Returns
/// An io error if the socket failed.
pub async fn listen(mut rx: DatagramReceiver, slot: LatestFrame) -> io::Result<()> {
    let mut received: u64 = 0;

    loop {
        let frame = rx.recv().await?;
        if received == 0 {
            let (width, height) = frame.dimensions();
            info!("receiving {width}x{height} frames");
        }

        received += 1;
        slot.publish(frame);

        if received % 1000 == 0 {
            debug!(received = received, dropped = rx.dropped(); "relay stats");
        }
    }
}

/// Reads the newest frame of a `LatestFrame`, used to calibrate on relayed
/// video.
pub struct SlotSource {
    slot: LatestFrame,
    pacer: Pacer,
}

impl SlotSource {
    pub fn new(slot: LatestFrame, rate: u32) -> Self {
        Self {
            slot,
            pacer: Pacer::new(rate),
        }
    }
}

impl FrameSource for SlotSource {
    fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        self.pacer.wait();
        Ok(self.slot.snapshot())
    }
}

/// The paced render loop of the relay, running on its own thread.
pub struct Renderer {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl Renderer {
    /// Spawns the render loop.
    ///
    /// Every tick the newest frame is processed, encoded and published. Ticks
    /// with an empty slot publish nothing.
    ///
    /// # Arguments
    /// * `slot` - Where frames are read from.
    /// * `processor` - What is done to every frame.
    /// * `quality` - The JPEG quality of the published frames.
    /// * `hub` - Where encoded frames go.
    /// * `frame_rate` - Ticks per second.
    ///
    /// # Returns
    /// A handle to stop the loop or an io error if the thread couldn't start.
    pub fn spawn(
        slot: LatestFrame,
        mut processor: FrameProcessor,
        quality: u8,
        hub: FrameHub,
        frame_rate: u32,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let running = Arc::clone(&stop);

        let thread = thread::Builder::new().name("render".to_string()).spawn(move || {
            let mut pacer = Pacer::new(frame_rate);
            let mut encoder = FrameEncoder::new(quality);
            let mut rendered = 0;

            while !running.load(Ordering::Relaxed) {
                pacer.wait();

                let Some(frame) = slot.snapshot() else {
                    continue;
                };

                let frame = processor.process(frame);
                match encoder.encode(&frame) {
                    Ok(jpeg) => {
                        hub.publish(jpeg);
                        rendered += 1;
                    }
                    Err(e) => warn!("failed to encode frame: {e}"),
                }
            }

            rendered
        })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stops the loop and waits for it.
    ///
    /// # Returns
    /// How many frames were rendered.
    pub fn stop(mut self) -> u64 {
        self.stop.store(true, Ordering::Relaxed);
        self.thread
            .take()
            .and_then(|thread| thread.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
