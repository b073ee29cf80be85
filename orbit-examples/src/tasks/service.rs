//! The task service: owns the task list and the intents that change it
//!
//! The list is a projection of `created_task` / `deleted_task` events. Intent
//! handlers only publish; the projection applies what the bus delivers, so a
//! live publish and a replay of the same history end in the same list.

use crate::tasks::events::{TaskCreated, TaskDeleted, TaskEvent, CREATED_TASK, DELETED_TASK};
use crate::tasks::intents::{CreateTask, DeleteTask};
use crate::tasks::types::{Task, TaskId};
use async_trait::async_trait;
use orbit::binding::{ListenerBinding, ListenerSet};
use orbit::bus::{EventBus, EventListener};
use orbit::context::EventContext;
use orbit::errors::{BusResult, HandlerError, HandlerResult};
use orbit::event::{Event, EventFactory};
use orbit::intent::{Intent, IntentHandler, IntentRouter};
use orbit::replay::{ReplayRange, ReplaySummary};
use orbit::types::{EventSource, ReplayLevel, SemanticTier, TraceId};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Source name stamped on every task event
pub const TASK_SERVICE_SOURCE: &str = "TaskService";

/// Applies task events to the shared list
#[derive(Debug, Clone, Default)]
pub struct TaskProjection {
    tasks: Arc<RwLock<Vec<Task>>>,
}

impl TaskProjection {
    fn read(&self) -> RwLockReadGuard<'_, Vec<Task>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Task>> {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inspect-level and dry-run replays observe without changing state.
    fn mutates(context: &EventContext) -> bool {
        !context.is_dry_run() && context.replay_level() != Some(ReplayLevel::Inspect)
    }

    /// Handles `created_task`.
    pub fn apply_created(&self, context: &EventContext, event: &Event) -> HandlerResult {
        let created = TaskCreated::from_event(event).map_err(HandlerError::other)?;
        info!(
            task_id = %created.task_id,
            task_name = %created.task_name,
            "Received task created event"
        );
        if context.is_replay() {
            info!(level = ?context.replay_level(), "This is a replayed event");
        }
        if !Self::mutates(context) {
            return Ok(());
        }

        let mut tasks = self.write();
        if tasks.iter().any(|t| t.id == created.task_id) {
            debug!(task_id = %created.task_id, "Task already present");
        } else {
            tasks.push(created.into());
        }
        Ok(())
    }

    /// Handles `deleted_task`.
    pub fn apply_deleted(&self, context: &EventContext, event: &Event) -> HandlerResult {
        let deleted = TaskDeleted::from_event(event).map_err(HandlerError::other)?;
        info!(task_id = %deleted.task_id, "Received task deleted event");
        if Self::mutates(context) {
            self.write().retain(|t| t.id != deleted.task_id);
        }
        Ok(())
    }
}

/// Only the task service's own events feed the list, live or replayed.
fn from_task_service(event: &Event) -> bool {
    event.source().as_str() == TASK_SERVICE_SOURCE
}

#[async_trait]
impl EventListener for TaskProjection {
    async fn on_event(&self, context: &EventContext, event: &Event) -> HandlerResult {
        if !from_task_service(event) {
            return Ok(());
        }
        match event.event_type().as_str() {
            CREATED_TASK => self.apply_created(context, event),
            DELETED_TASK => self.apply_deleted(context, event),
            _ => Ok(()),
        }
    }
}

/// Handles task intents and keeps the task list
pub struct TaskService {
    bus: Arc<dyn EventBus>,
    events: EventFactory,
    projection: TaskProjection,
}

impl TaskService {
    /// Creates a service publishing on `bus`.
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        let source = EventSource::try_new(TASK_SERVICE_SOURCE)
            .expect("service source name is not blank");
        Self {
            bus,
            events: EventFactory::new(source),
            projection: TaskProjection::default(),
        }
    }

    /// Routes [`CreateTask`] and [`DeleteTask`] to this service.
    pub fn register_routes(self: &Arc<Self>, router: &IntentRouter) {
        router.register::<CreateTask, _>(Arc::clone(self));
        router.register::<DeleteTask, _>(Arc::clone(self));
    }

    /// Snapshot of the current list, in creation order.
    pub fn tasks(&self) -> Vec<Task> {
        self.projection.read().clone()
    }

    /// Looks a task up by id.
    pub fn find(&self, id: &TaskId) -> Option<Task> {
        self.projection.read().iter().find(|t| &t.id == id).cloned()
    }

    /// Replays persisted task events into the list.
    pub async fn replay(&self, range: ReplayRange) -> BusResult<ReplaySummary> {
        self.bus.replay(range, &self.projection).await
    }

    fn factory_for(&self, trace_id: Option<TraceId>) -> EventFactory {
        self.events
            .with_trace_id(trace_id.unwrap_or_else(TraceId::generate))
    }
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("tasks", &self.projection.read().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IntentHandler<CreateTask> for TaskService {
    async fn handle(&self, intent: Intent<CreateTask>) -> HandlerResult {
        let (CreateTask { name }, trace_id) = intent.into_parts();
        let task = Task::new(name);
        let payload = TaskCreated::from(&task)
            .to_payload()
            .map_err(HandlerError::other)?;

        let event = self
            .factory_for(trace_id)
            .create_with_payload(TaskCreated::event_type(), SemanticTier::Internal, payload);
        let event = self.bus.publish(event).await?;

        info!(task_id = %task.id, event_id = %event.id(), "Task created");
        Ok(())
    }
}

#[async_trait]
impl IntentHandler<DeleteTask> for TaskService {
    async fn handle(&self, intent: Intent<DeleteTask>) -> HandlerResult {
        let (DeleteTask { task_id }, trace_id) = intent.into_parts();
        if self.find(&task_id).is_none() {
            return Err(HandlerError::msg(format!("No task with id {task_id}")));
        }

        let payload = TaskDeleted {
            task_id: task_id.clone(),
        }
        .to_payload()
        .map_err(HandlerError::other)?;

        let event = self
            .factory_for(trace_id)
            .create_with_payload(TaskDeleted::event_type(), SemanticTier::Internal, payload);
        let event = self.bus.publish(event).await?;

        info!(task_id = %task_id, event_id = %event.id(), "Task deleted");
        Ok(())
    }
}

impl ListenerSet for TaskService {
    fn listener_bindings(&self) -> Vec<ListenerBinding> {
        let created = self.projection.clone();
        let deleted = self.projection.clone();
        vec![
            ListenerBinding::for_type(CREATED_TASK)
                .from_source(TASK_SERVICE_SOURCE)
                .on_context_event(move |ctx, event| created.apply_created(ctx, event)),
            ListenerBinding::for_type(DELETED_TASK)
                .from_source(TASK_SERVICE_SOURCE)
                .on_context_event(move |ctx, event| deleted.apply_deleted(ctx, event)),
        ]
    }
}
