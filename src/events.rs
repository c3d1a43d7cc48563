use serde::Serialize;

use crate::models::{ClosedPosition, ExitReason, Position, Side, Tick};

/// Everything the engine publishes for the presentation layer
///
/// Serialized with an `event` tag so a dashboard or log shipper can route
/// on it without knowing the payload shapes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    /// Latest tick for the subscribed symbol
    PriceUpdate { price: f64, volume: u64 },

    /// A breakout signal fired and a position is now open
    PositionOpened {
        side: Side,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
    },

    /// An exit threshold closed the position
    PositionClosed {
        side: Side,
        entry_price: f64,
        exit_price: f64,
        pnl: f64,
        reason: ExitReason,
    },

    /// The detector ran and declined to fire
    NoSignal,

    /// The transport failed; the engine state is unchanged and processing
    /// resumes when the feed reconnects
    FeedError { message: String },
}

impl EngineEvent {
    pub fn price_update(tick: &Tick) -> Self {
        Self::PriceUpdate {
            price: tick.price,
            volume: tick.volume,
        }
    }

    pub fn position_opened(position: &Position) -> Self {
        Self::PositionOpened {
            side: position.side,
            entry_price: position.entry_price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
        }
    }

    pub fn position_closed(closed: &ClosedPosition) -> Self {
        Self::PositionClosed {
            side: closed.side,
            entry_price: closed.entry_price,
            exit_price: closed.exit_price,
            pnl: closed.pnl,
            reason: closed.reason,
        }
    }
}
