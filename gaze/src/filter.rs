use crate::reading::GazeRatio;

/// A first order low-pass filter over gaze ratios.
///
/// Each new sample is averaged against the running state weighted by `size`,
/// so bigger sizes react slower.
#[derive(Debug, Clone)]
pub struct RatioFilter {
    size: f32,
    state: GazeRatio,
}

impl RatioFilter {
    /// Creates a new `RatioFilter` seeded at the center.
    ///
    /// # Arguments
    /// * `size` - The weight of the running state against a new sample, zero
    ///   disables filtering.
    ///
    /// # Returns
    /// A new `RatioFilter` instance.
    pub fn new(size: u32) -> Self {
        Self {
            size: size as f32,
            state: GazeRatio::CENTER,
        }
    }

    /// Feeds a new sample into the filter.
    ///
    /// # Arguments
    /// * `ratio` - The raw ratio.
    ///
    /// # Returns
    /// The filtered ratio.
    pub fn apply(&mut self, ratio: GazeRatio) -> GazeRatio {
        let Self { size, state } = self;

        state.horizontal = (state.horizontal * *size + ratio.horizontal) / (*size + 1.);
        state.vertical = (state.vertical * *size + ratio.vertical) / (*size + 1.);

        *state
    }

    /// Returns the current filtered value.
    pub fn value(&self) -> GazeRatio {
        self.state
    }

    /// Moves the filter back to the center.
    pub fn reset(&mut self) {
        self.state = GazeRatio::CENTER;
    }
}
