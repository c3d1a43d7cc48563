use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Width of one aggregation bar in minutes
pub const BAR_WIDTH_MINUTES: u32 = 5;

/// A single trade observation pushed by the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    /// Floor this tick's timestamp to the start of its 5-minute bar
    pub fn bar_start(&self) -> DateTime<Utc> {
        floor_to_bar(self.timestamp)
    }
}

/// Floor a timestamp to the 5-minute grid (XX:00, XX:05, XX:10, ...)
pub fn floor_to_bar(time: DateTime<Utc>) -> DateTime<Utc> {
    let minute = time.minute();
    time.with_minute(minute - minute % BAR_WIDTH_MINUTES)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// All prices observed within one 5-minute window
///
/// The price sequence is append-only and non-empty from construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub start_time: DateTime<Utc>,
    prices: Vec<f64>,
}

impl Bar {
    /// Create a bar seeded with its first observed price
    pub fn new(start_time: DateTime<Utc>, price: f64) -> Self {
        Self {
            start_time,
            prices: vec![price],
        }
    }

    /// Append a price to this bar
    pub fn record(&mut self, price: f64) {
        self.prices.push(price);
    }

    /// First price observed in this bar
    pub fn open(&self) -> f64 {
        self.prices[0]
    }

    pub fn high(&self) -> f64 {
        self.prices.iter().cloned().fold(f64::MIN, f64::max)
    }

    pub fn low(&self) -> f64 {
        self.prices.iter().cloned().fold(f64::MAX, f64::min)
    }

    /// Observed dispersion: high minus low. Zero for a single-price bar.
    pub fn range(&self) -> f64 {
        self.high() - self.low()
    }

    pub fn tick_count(&self) -> usize {
        self.prices.len()
    }
}

/// Direction of a trade signal or open position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

/// An open directional position with its risk thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub side: Side,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub entry_time: DateTime<Utc>,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

/// Result of a completed round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Fractional P&L signed from the position's perspective
    pub pnl: f64,
    pub reason: ExitReason,
}
