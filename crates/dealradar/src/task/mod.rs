//! Tasks: queued requests to onboard companies, and their external view.

pub mod model;
pub mod view;

pub use model::{Task, TaskKind, TaskPayload, TaskStatus};
pub use view::TaskView;
