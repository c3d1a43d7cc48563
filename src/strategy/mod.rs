// Trading strategy module
pub mod breakout;

pub use breakout::{BreakoutConfig, RangeBreakoutStrategy};

use chrono::{DateTime, Utc};

use crate::models::{Bar, Side};

/// Base trait for all entry strategies
pub trait Strategy: Send + Sync {
    /// Evaluate the two most recent bars for a directional entry signal
    ///
    /// `at` is the timestamp of the tick being processed, so decisions are
    /// deterministic with respect to the tick stream.
    fn detect(
        &self,
        current_bar: &Bar,
        previous_bar: &Bar,
        current_price: f64,
        at: DateTime<Utc>,
    ) -> Option<Side>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum completed-or-in-progress bars required
    fn min_bars_required(&self) -> usize {
        2
    }
}
