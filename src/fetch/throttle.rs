//! Adaptive concurrency ceiling for page requests.
//!
//! Every successful attempt nudges the ceiling up by [`SUCCESS_STEP`] and
//! every failed attempt pulls it down by [`FAILURE_STEP`]. The usable pool
//! size is the floor of the current value, never below 1 and never above the
//! configured maximum.

/// Increase applied per successful attempt.
pub const SUCCESS_STEP: f64 = 0.1;

/// Decrease applied per failed attempt.
pub const FAILURE_STEP: f64 = 0.5;

/// Lowest value `current` may reach.
const FLOOR: f64 = 1.0;

/// Live concurrency state, owned by the queue coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleController {
    current: f64,
    max: usize,
}

impl ThrottleController {
    /// Creates a controller starting at full concurrency. A `max` of 0 is
    /// treated as 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            current: max as f64,
            max,
        }
    }

    /// Records a successful attempt.
    #[allow(clippy::cast_precision_loss)]
    pub fn on_success(&mut self) {
        self.current = (self.current + SUCCESS_STEP).min(self.max as f64);
    }

    /// Records a failed attempt.
    pub fn on_failure(&mut self) {
        self.current = (self.current - FAILURE_STEP).max(FLOOR);
    }

    /// Number of requests that may be in flight right now.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn limit(&self) -> usize {
        (self.current.floor() as usize).clamp(1, self.max)
    }

    /// Current (fractional) concurrency level.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Configured maximum.
    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }
}
