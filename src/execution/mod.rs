// Streaming aggregation and decision module
pub mod bar_aggregator;
pub mod position_manager;
pub mod processor;

pub use bar_aggregator::{BarAggregator, BarSnapshot};
pub use position_manager::PositionManager;
pub use processor::TickProcessor;
