use tokio::sync::broadcast;

use crate::events::EngineEvent;
use crate::execution::{BarAggregator, PositionManager};
use crate::models::Tick;
use crate::strategy::Strategy;

/// Drives the per-tick pipeline: aggregate, then either look for an entry
/// or check the open position's exits
///
/// The whole of `process` runs under one `&mut self` borrow; callers share
/// the processor behind `Arc<Mutex<...>>` so a signal computed from a set
/// of bars is always acted on before the next tick can mutate them.
pub struct TickProcessor {
    symbol: String,
    aggregator: BarAggregator,
    strategy: Box<dyn Strategy>,
    position_manager: PositionManager,
    events: broadcast::Sender<EngineEvent>,
}

impl TickProcessor {
    pub fn new(
        symbol: String,
        max_bars: usize,
        strategy: Box<dyn Strategy>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            symbol,
            aggregator: BarAggregator::new(max_bars),
            strategy,
            position_manager: PositionManager::new(),
            events,
        }
    }

    /// Process one tick end to end
    ///
    /// Ticks for other symbols are dropped. Delivery is at-least-once, so
    /// the subscription filter upstream is not trusted to be exhaustive.
    pub fn process(&mut self, tick: &Tick) {
        if tick.symbol != self.symbol {
            tracing::debug!(symbol = %tick.symbol, "Ignoring tick for unsubscribed symbol");
            return;
        }

        self.publish(EngineEvent::price_update(tick));

        let snapshot = self.aggregator.ingest(tick);

        if self.position_manager.has_open_position() {
            if let Some(closed) = self.position_manager.check_exit(tick.price) {
                self.publish(EngineEvent::position_closed(&closed));
            }
            return;
        }

        let signal = snapshot.previous.and_then(|previous| {
            self.strategy
                .detect(snapshot.current, previous, tick.price, tick.timestamp)
        });

        match signal {
            Some(side) => match self.position_manager.open(side, tick.price, tick.timestamp) {
                Ok(position) => {
                    let event = EngineEvent::position_opened(position);
                    self.publish(event);
                }
                Err(e) => {
                    // Unreachable through this state machine; log and drop
                    tracing::error!("Failed to open position: {}", e);
                }
            },
            None => self.publish(EngineEvent::NoSignal),
        }
    }

    fn publish(&self, event: EngineEvent) {
        // A send error just means no renderer is subscribed right now
        let _ = self.events.send(event);
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn has_open_position(&self) -> bool {
        self.position_manager.has_open_position()
    }

    pub fn bar_count(&self) -> usize {
        self.aggregator.bar_count()
    }
}
