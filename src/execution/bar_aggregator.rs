use std::collections::VecDeque;

use crate::models::{Bar, Tick};

/// The current bar and, once history exists, the bar before it
#[derive(Debug)]
pub struct BarSnapshot<'a> {
    pub current: &'a Bar,
    pub previous: Option<&'a Bar>,
}

/// Folds ticks into fixed-width 5-minute bars
///
/// Maintains a rolling window of bars. Only the two most recent bars are
/// ever read back; older bars are evicted once the window is full.
pub struct BarAggregator {
    bars: VecDeque<Bar>,
    max_bars: usize,
}

impl BarAggregator {
    /// Create a new aggregator
    ///
    /// # Arguments
    /// * `max_bars` - Maximum number of bars to retain (at least 2)
    pub fn new(max_bars: usize) -> Self {
        assert!(max_bars >= 2, "aggregator must retain at least two bars");
        Self {
            bars: VecDeque::with_capacity(max_bars),
            max_bars,
        }
    }

    /// Fold a tick into the bar window
    ///
    /// Opens a new bar whenever the tick's 5-minute floor differs from the
    /// latest bar's start time, otherwise appends to the latest bar. Ticks
    /// with out-of-order timestamps are not rejected; a backward tick whose
    /// floor differs simply opens a fresh bar keyed by its own floor.
    pub fn ingest(&mut self, tick: &Tick) -> BarSnapshot<'_> {
        let bar_start = tick.bar_start();

        let starts_new_bar = self
            .bars
            .back()
            .map(|bar| bar.start_time != bar_start)
            .unwrap_or(true);

        if starts_new_bar {
            self.bars.push_back(Bar::new(bar_start, tick.price));
            while self.bars.len() > self.max_bars {
                self.bars.pop_front();
            }
        } else if let Some(bar) = self.bars.back_mut() {
            bar.record(tick.price);
        }

        let len = self.bars.len();
        BarSnapshot {
            current: &self.bars[len - 1],
            previous: if len >= 2 { self.bars.get(len - 2) } else { None },
        }
    }

    /// Number of bars currently retained
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    /// Latest bar, if any tick has been ingested
    pub fn current_bar(&self) -> Option<&Bar> {
        self.bars.back()
    }
}
