//! The task queue: submission, a single background worker, and queries.

pub mod config;
pub mod pipeline_queue;
mod table;
mod worker;

pub use config::QueueConfig;
pub use pipeline_queue::PipelineQueue;
pub use table::CancelOutcome;
