//! Events published by the task tracker
//!
//! Payloads travel as JSON maps on the bus; these types give them a shape.

use crate::tasks::types::{Task, TaskId, TaskName};
use orbit::event::{Event, Payload};
use orbit::types::EventType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event type of [`TaskCreated`]
pub const CREATED_TASK: &str = "created_task";

/// Event type of [`TaskDeleted`]
pub const DELETED_TASK: &str = "deleted_task";

/// A payload could not be converted to or from its typed form
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload is not a JSON object
    #[error("Payload is not an object")]
    NotAnObject,

    /// A field is missing or has the wrong shape
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Emitted after a task was added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    /// The new task's id
    pub task_id: TaskId,
    /// The new task's name
    pub task_name: TaskName,
}

/// Emitted after a task was removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDeleted {
    /// The removed task's id
    pub task_id: TaskId,
}

/// A typed payload bound to one event type
pub trait TaskEvent: Serialize + DeserializeOwned {
    /// The event type name on the bus
    const TYPE: &'static str;

    /// The event type as a validated value
    fn event_type() -> EventType {
        EventType::try_new(Self::TYPE).expect("task event type names are not blank")
    }

    /// Serializes into a bus payload
    fn to_payload(&self) -> Result<Payload, PayloadError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    /// Reads the typed payload back out of an event
    fn from_event(event: &Event) -> Result<Self, PayloadError> {
        let map: serde_json::Map<String, serde_json::Value> = event
            .payload()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }
}

impl TaskEvent for TaskCreated {
    const TYPE: &'static str = CREATED_TASK;
}

impl TaskEvent for TaskDeleted {
    const TYPE: &'static str = DELETED_TASK;
}

impl From<&Task> for TaskCreated {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
        }
    }
}

impl From<TaskCreated> for Task {
    fn from(event: TaskCreated) -> Self {
        Self {
            id: event.task_id,
            name: event.task_name,
        }
    }
}
