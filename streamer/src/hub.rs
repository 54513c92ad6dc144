//! Fan-out of the newest encoded frame to every connected viewer.

use std::sync::Arc;

use tokio::sync::watch;

/// A JPEG shared between viewers.
pub type Jpeg = Arc<[u8]>;

/// A stream of encoded frames a viewer can pull from.
#[async_trait::async_trait]
pub trait FrameFeed: Send {
    /// Waits for the next frame.
    ///
    /// # Returns
    /// `None` once no more frames will come.
    async fn next_frame(&mut self) -> Option<Jpeg>;
}

/// Holds the newest frame, viewers that fall behind skip straight to it.
#[derive(Clone)]
pub struct FrameHub {
    tx: Arc<watch::Sender<Option<Jpeg>>>,
}

impl FrameHub {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replaces the current frame and wakes every subscriber.
    pub fn publish<J: Into<Jpeg>>(&self, jpeg: J) {
        self.tx.send_replace(Some(jpeg.into()));
    }

    /// Creates a new subscriber, its first frame is the current one if any.
    pub fn subscribe(&self) -> FrameSubscriber {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        FrameSubscriber { rx }
    }

    /// How many subscribers are alive.
    pub fn viewers(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A single viewer's handle on a `FrameHub`.
pub struct FrameSubscriber {
    rx: watch::Receiver<Option<Jpeg>>,
}

#[async_trait::async_trait]
impl FrameFeed for FrameSubscriber {
    async fn next_frame(&mut self) -> Option<Jpeg> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(jpeg) = self.rx.borrow_and_update().clone() {
                return Some(jpeg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_current_frame_is_delivered_first() {
        let hub = FrameHub::new();
        hub.publish(vec![1, 2, 3]);

        let mut sub = hub.subscribe();
        assert_eq!(sub.next_frame().await.as_deref(), Some(&[1, 2, 3][..]));
    }

    #[tokio::test]
    async fn test_slow_viewers_skip_to_newest() {
        let hub = FrameHub::new();
        let mut sub = hub.subscribe();

        hub.publish(vec![1]);
        hub.publish(vec![2]);
        hub.publish(vec![3]);

        assert_eq!(sub.next_frame().await.as_deref(), Some(&[3][..]));

        let pending = timeout(Duration::from_millis(50), sub.next_frame()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_empty_hub_waits() {
        let hub = FrameHub::new();
        let mut sub = hub.subscribe();
        assert_eq!(hub.viewers(), 1);

        let pending = timeout(Duration::from_millis(50), sub.next_frame()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_feed_ends_with_the_hub() {
        let hub = FrameHub::new();
        let mut sub = hub.subscribe();
        drop(hub);

        assert_eq!(sub.next_frame().await, None);
    }
}
