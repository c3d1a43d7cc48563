use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ClosedPosition, ExitReason, Position, Side};

/// Stop loss trips at -0.75% from entry, sign-adjusted for side
const STOP_LOSS_PCT: f64 = 0.0075;
/// Take profit trips at +1% from entry
const TAKE_PROFIT_PCT: f64 = 0.01;
/// Take profit also trips on a 1.5 move in quote currency, regardless of
/// the percentage P&L
const TAKE_PROFIT_ABS_MOVE: f64 = 1.5;

/// Owns the single open position and its exit thresholds
///
/// At most one position exists at any time. While a position is open the
/// orchestrator stops evaluating entry signals, so open and close strictly
/// alternate.
pub struct PositionManager {
    position: Option<Position>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self { position: None }
    }

    /// Open a position in the direction of a signal
    ///
    /// Fails if a position is already open; the orchestrator's state
    /// machine never calls `open` in that state.
    pub fn open(
        &mut self,
        side: Side,
        entry_price: f64,
        entry_time: DateTime<Utc>,
    ) -> anyhow::Result<&Position> {
        if self.position.is_some() {
            anyhow::bail!("Already have an open position");
        }

        let (stop_loss, take_profit) = match side {
            Side::Long => (
                entry_price * (1.0 - STOP_LOSS_PCT),
                entry_price * (1.0 + TAKE_PROFIT_PCT),
            ),
            Side::Short => (
                entry_price * (1.0 + STOP_LOSS_PCT),
                entry_price * (1.0 - TAKE_PROFIT_PCT),
            ),
        };

        let position = Position {
            id: Uuid::new_v4(),
            side,
            entry_price,
            stop_loss,
            take_profit,
            entry_time,
        };

        tracing::info!(
            "Opened {:?} @ {:.4} (stop loss {:.4}, take profit {:.4})",
            side,
            entry_price,
            stop_loss,
            take_profit
        );

        Ok(self.position.insert(position))
    }

    /// Check the open position against the latest price
    ///
    /// Returns `None` when no position is open or no exit threshold is
    /// met. Stop loss is evaluated before take profit, so a large adverse
    /// absolute move closes as a stop, never as a profit take. On exit the
    /// position is cleared before the result is returned.
    pub fn check_exit(&mut self, current_price: f64) -> Option<ClosedPosition> {
        let position = self.position.as_ref()?;

        let mut pnl = (current_price - position.entry_price) / position.entry_price;
        if position.side == Side::Short {
            pnl = -pnl;
        }

        let reason = if pnl <= -STOP_LOSS_PCT {
            ExitReason::StopLoss
        } else if pnl >= TAKE_PROFIT_PCT
            || (current_price - position.entry_price).abs() >= TAKE_PROFIT_ABS_MOVE
        {
            ExitReason::TakeProfit
        } else {
            return None;
        };

        let position = self.position.take()?;

        tracing::info!(
            "Closed {:?} @ {:.4} ({:?}, P&L {:+.2}%)",
            position.side,
            current_price,
            reason,
            pnl * 100.0
        );

        Some(ClosedPosition {
            side: position.side,
            entry_price: position.entry_price,
            exit_price: current_price,
            pnl,
            reason,
        })
    }

    /// Check if a position is currently open
    pub fn has_open_position(&self) -> bool {
        self.position.is_some()
    }

    /// Get the open position, if any
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }
}

impl Default for PositionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn open_at(pm: &mut PositionManager, side: Side, price: f64) {
        pm.open(side, price, Utc::now()).unwrap();
    }

    #[test]
    fn test_open_long_sets_thresholds() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 100.0);

        let position = pm.position().unwrap();
        assert_eq!(position.side, Side::Long);
        assert!((position.stop_loss - 99.25).abs() < TOLERANCE);
        assert!((position.take_profit - 101.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_open_short_sets_thresholds() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Short, 100.0);

        let position = pm.position().unwrap();
        assert_eq!(position.side, Side::Short);
        assert!((position.stop_loss - 100.75).abs() < TOLERANCE);
        assert!((position.take_profit - 99.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_prevent_duplicate_positions() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 100.0);

        let result = pm.open(Side::Short, 105.0, Utc::now());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Already have an open position"));
    }

    #[test]
    fn test_check_exit_without_position() {
        let mut pm = PositionManager::new();
        assert!(pm.check_exit(100.0).is_none());
    }

    #[test]
    fn test_long_stop_loss() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 100.0);

        // Above the stop, still holding
        assert!(pm.check_exit(99.3).is_none());

        let exit = pm.check_exit(99.25).unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
        assert!((exit.pnl - (-0.0075)).abs() < TOLERANCE);
        assert!(!pm.has_open_position());
    }

    #[test]
    fn test_long_take_profit() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 100.0);

        let exit = pm.check_exit(101.0).unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);
        assert!((exit.pnl - 0.01).abs() < TOLERANCE);
    }

    #[test]
    fn test_short_stop_loss() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Short, 100.0);

        // Price rising hurts a short
        let exit = pm.check_exit(100.75).unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
        assert!((exit.pnl - (-0.0075)).abs() < TOLERANCE);
    }

    #[test]
    fn test_short_take_profit() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Short, 100.0);

        let exit = pm.check_exit(99.0).unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);
        assert!((exit.pnl - 0.01).abs() < TOLERANCE);
    }

    #[test]
    fn test_absolute_move_triggers_take_profit_early() {
        // At a 200 entry, a 1.5 move is only +0.75% -- below the
        // percentage threshold but at the absolute override
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 200.0);

        assert!(pm.check_exit(201.4).is_none());

        let exit = pm.check_exit(201.5).unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);
        assert!(exit.pnl < TAKE_PROFIT_PCT);
    }

    #[test]
    fn test_stop_loss_wins_over_absolute_move() {
        // A 1.5 adverse move at a 100 entry is both past the absolute
        // override and past the stop; the stop must win
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 100.0);

        let exit = pm.check_exit(98.5).unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
    }

    #[test]
    fn test_no_exit_is_idempotent() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 100.0);

        for _ in 0..5 {
            assert!(pm.check_exit(100.2).is_none());
            assert!(pm.has_open_position());
        }
        assert_eq!(pm.position().unwrap().entry_price, 100.0);
    }

    #[test]
    fn test_no_position_after_close() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 100.0);
        pm.check_exit(101.0).unwrap();

        assert!(pm.check_exit(150.0).is_none());
        assert!(pm.check_exit(50.0).is_none());
    }

    #[test]
    fn test_reopen_after_close() {
        let mut pm = PositionManager::new();
        open_at(&mut pm, Side::Long, 100.0);
        pm.check_exit(99.0).unwrap();

        open_at(&mut pm, Side::Short, 99.0);
        assert_eq!(pm.position().unwrap().side, Side::Short);
    }
}
