use chrono::{DateTime, Utc};

use super::Strategy;
use crate::models::{Bar, Side};

/// Tunables for the range-breakout comparison
#[derive(Debug, Clone)]
pub struct BreakoutConfig {
    /// Only trust the range comparison this early into the current bar's
    /// life; past this point the current bar's range has had time to grow
    /// larger by chance.
    pub signal_window_secs: i64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            signal_window_secs: 180,
        }
    }
}

/// Range-expansion breakout over two consecutive 5-minute bars
///
/// Fires when the current bar's observed range has already exceeded the
/// previous bar's full range while the current bar is still young. The
/// direction comes from where the price sits relative to the current bar's
/// opening tick.
#[derive(Debug, Clone)]
pub struct RangeBreakoutStrategy {
    config: BreakoutConfig,
}

impl RangeBreakoutStrategy {
    pub fn new(config: BreakoutConfig) -> Self {
        Self { config }
    }
}

impl Default for RangeBreakoutStrategy {
    fn default() -> Self {
        Self::new(BreakoutConfig::default())
    }
}

impl Strategy for RangeBreakoutStrategy {
    fn detect(
        &self,
        current_bar: &Bar,
        previous_bar: &Bar,
        current_price: f64,
        at: DateTime<Utc>,
    ) -> Option<Side> {
        if current_bar.range() <= previous_bar.range() {
            return None;
        }

        let elapsed = (at - current_bar.start_time).num_seconds();
        if elapsed >= self.config.signal_window_secs {
            return None;
        }

        let open = current_bar.open();
        if current_price > open {
            Some(Side::Long)
        } else if current_price < open {
            Some(Side::Short)
        } else {
            None
        }
    }

    fn name(&self) -> &str {
        "RangeBreakoutStrategy"
    }
}
