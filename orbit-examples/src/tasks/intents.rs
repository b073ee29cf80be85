//! Intents understood by the task service

use crate::tasks::types::{TaskId, TaskName};
use orbit::intent::IntentPayload;

/// Add a task to the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTask {
    /// Name of the new task
    pub name: TaskName,
}

impl IntentPayload for CreateTask {
    const NAME: &'static str = "CreateTask";
}

/// Remove a task from the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTask {
    /// Task to remove
    pub task_id: TaskId,
}

impl IntentPayload for DeleteTask {
    const NAME: &'static str = "DeleteTask";
}
