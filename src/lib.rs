// Core modules
pub mod api;
pub mod events;
pub mod execution;
pub mod feed;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use events::EngineEvent;
pub use models::*;
pub use strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
