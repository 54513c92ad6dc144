//! Hysteresis triggers deciding when the user's attention changed.

use crate::reading::GazeRatio;

/// Tracks whether the user is looking at the center of the frame.
///
/// The trigger enters when both axes are within `enter` of the center and only
/// leaves once either axis drifts further than `exit`, so it doesn't flicker
/// around a single threshold.
#[derive(Debug, Clone)]
pub struct CenterGaze {
    enter: f32,
    exit: f32,
    active: bool,
}

impl CenterGaze {
    pub const DEFAULT_ENTER: f32 = 0.125;
    pub const DEFAULT_EXIT: f32 = 0.25;

    /// Creates a new inactive `CenterGaze` trigger.
    ///
    /// # Arguments
    /// * `enter` - The distance to the center both axes must be under to enter.
    /// * `exit` - The distance to the center either axis must exceed to exit.
    pub fn new(enter: f32, exit: f32) -> Self {
        Self {
            enter,
            exit,
            active: false,
        }
    }

    /// Feeds a new calibrated ratio.
    ///
    /// # Returns
    /// Whether the user is looking at the center.
    pub fn update(&mut self, ratio: GazeRatio) -> bool {
        let dh = (ratio.horizontal - 0.5).abs();
        let dv = (ratio.vertical - 0.5).abs();

        if dh < self.enter && dv < self.enter {
            self.active = true;
        } else if dh > self.exit || dv > self.exit {
            self.active = false;
        }

        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Default for CenterGaze {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ENTER, Self::DEFAULT_EXIT)
    }
}

/// The state reported by `LookingDown::update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glance {
    /// Not looking down.
    Away,
    /// Just started looking down on this sample.
    Entered,
    /// Still looking down.
    Holding,
}

impl Glance {
    pub fn is_down(self) -> bool {
        self != Glance::Away
    }
}

/// Tracks whether the user looks below a calibrated center.
#[derive(Debug, Clone)]
pub struct LookingDown {
    center: GazeRatio,
    enter: f32,
    exit: f32,
    active: bool,
}

impl LookingDown {
    pub const DEFAULT_ENTER: f32 = 0.25;
    pub const DEFAULT_EXIT: f32 = 0.125;

    /// Creates a new inactive `LookingDown` trigger.
    ///
    /// # Arguments
    /// * `center` - The user's measured center ratio.
    /// * `enter` - The vertical delta below the center required to enter.
    /// * `exit` - The vertical delta under which the trigger exits.
    pub fn new(center: GazeRatio, enter: f32, exit: f32) -> Self {
        Self {
            center,
            enter,
            exit,
            active: false,
        }
    }

    /// Creates a new trigger with the default thresholds.
    pub fn with_center(center: GazeRatio) -> Self {
        Self::new(center, Self::DEFAULT_ENTER, Self::DEFAULT_EXIT)
    }

    /// Feeds a new calibrated ratio.
    pub fn update(&mut self, ratio: GazeRatio) -> Glance {
        let delta = ratio.vertical - self.center.vertical;

        if delta > self.enter {
            let was_active = self.active;
            self.active = true;
            return if was_active {
                Glance::Holding
            } else {
                Glance::Entered
            };
        }

        if delta < self.exit {
            self.active = false;
        }

        if self.active {
            Glance::Holding
        } else {
            Glance::Away
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_gaze_hysteresis() {
        let mut trigger = CenterGaze::default();

        assert!(!trigger.update(GazeRatio::new(0.7, 0.5)));
        assert!(trigger.update(GazeRatio::new(0.55, 0.45)));
        // Inside the dead band the state holds.
        assert!(trigger.update(GazeRatio::new(0.7, 0.5)));
        assert!(!trigger.update(GazeRatio::new(0.5, 0.8)));
        // And holds while off as well.
        assert!(!trigger.update(GazeRatio::new(0.7, 0.5)));
    }

    #[test]
    fn test_looking_down_reports_fresh_entries() {
        let mut trigger = LookingDown::with_center(GazeRatio::new(0.5, 0.4));

        assert_eq!(trigger.update(GazeRatio::new(0.5, 0.5)), Glance::Away);
        assert_eq!(trigger.update(GazeRatio::new(0.5, 0.7)), Glance::Entered);
        assert_eq!(trigger.update(GazeRatio::new(0.5, 0.75)), Glance::Holding);
        // Between exit and enter the trigger keeps looking down.
        assert_eq!(trigger.update(GazeRatio::new(0.5, 0.6)), Glance::Holding);
        assert_eq!(trigger.update(GazeRatio::new(0.5, 0.45)), Glance::Away);
        assert_eq!(trigger.update(GazeRatio::new(0.5, 0.9)), Glance::Entered);
        assert!(Glance::Entered.is_down());
    }
}
