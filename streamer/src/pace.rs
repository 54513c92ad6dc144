use std::{
    thread,
    time::{Duration, Instant},
};

/// Blocking rate limiter for capture and render loops.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    next: Option<Instant>,
}

impl Pacer {
    /// Creates a new `Pacer` ticking `rate` times per second.
    pub fn new(rate: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1. / rate.max(1) as f64),
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Blocks until the next tick is due. The first tick is immediate and a
    /// late tick doesn't make the following ones catch up.
    pub fn wait(&mut self) {
        let now = Instant::now();
        let due = self.next.unwrap_or(now);

        if due > now {
            thread::sleep(due - now);
        }

        self.next = Some(due.max(now) + self.interval);
    }
}
