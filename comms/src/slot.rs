use std::sync::Arc;

use parking_lot::Mutex;

use crate::Frame;

/// A single-slot, latest-frame-wins cell shared between a producer and any
/// amount of consumers. Publishing overwrites whatever was there.
#[derive(Clone, Default)]
pub struct LatestFrame {
    inner: Arc<Mutex<Option<Frame>>>,
}

impl LatestFrame {
    /// Creates a new empty `LatestFrame`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored frame with `frame`.
    ///
    /// # Arguments
    /// * `frame` - The newest frame.
    pub fn publish(&self, frame: Frame) {
        *self.inner.lock() = Some(frame);
    }

    /// Clones the stored frame, if any, leaving it in place.
    ///
    /// # Returns
    /// The latest published frame or `None` if nothing was published yet.
    pub fn snapshot(&self) -> Option<Frame> {
        self.inner.lock().clone()
    }

    /// Whether a frame has been published yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn test_snapshot_of_empty_slot() {
        let slot = LatestFrame::new();
        assert!(slot.is_empty());
        assert!(slot.snapshot().is_none());
    }

    #[test]
    fn test_latest_frame_wins() {
        let slot = LatestFrame::new();
        let producer = slot.clone();

        producer.publish(Frame::from_pixel(2, 2, Rgb([1, 1, 1])));
        producer.publish(Frame::from_pixel(2, 2, Rgb([9, 9, 9])));

        let frame = slot.snapshot().unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgb([9, 9, 9]));

        // Snapshots don't consume the slot.
        assert!(!slot.is_empty());
    }
}
