//! Task tracker example
//!
//! A small interactive tool built from the three routers:
//! - `focus` is an interactive command whose sessions add, list, start and
//!   delete tasks
//! - adding or deleting a task is a typed intent routed to [`TaskService`]
//! - the service publishes `created_task` / `deleted_task` events and keeps
//!   its list as a projection of them, so `replay` can rebuild it

pub mod app;
pub mod events;
pub mod focus;
pub mod intents;
pub mod service;
pub mod types;


// Re-export commonly used types
pub use app::{ReplayCommand, TaskApp};
pub use events::{TaskCreated, TaskDeleted, TaskEvent, CREATED_TASK, DELETED_TASK};
pub use focus::FocusCommand;
pub use intents::{CreateTask, DeleteTask};
pub use service::{TaskProjection, TaskService, TASK_SERVICE_SOURCE};
pub use types::{Task, TaskId, TaskName};
