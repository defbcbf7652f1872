//! Services module for rentroll-service.

pub mod audit;
pub mod database;
pub mod events;
pub mod metrics;
pub mod settlement;

pub use database::Database;
pub use events::EventPublisher;
pub use metrics::{get_metrics, init_metrics};
