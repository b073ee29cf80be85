//! The task tracker wired end to end: shell line, intent, event, listener.

use orbit::bus::{EventBus, EventBusExt};
use orbit::config::{BusConfig, HistoryCapacity, HistoryRetention};
use orbit::errors::DispatchError;
use orbit::event::Event;
use orbit::intent::{DispatchOutcome, Intent, IntentRouter};
use orbit::replay::ReplayRange;
use orbit::types::{EventId, ReplayLevel, TraceId};
use orbit_examples::tasks::{
    CreateTask, DeleteTask, TaskApp, TaskId, TaskName, CREATED_TASK, TASK_SERVICE_SOURCE,
};
use orbit_memory::InMemoryEventStore;
use orbit_testing::{RecordingListener, ScriptedTerminal};
use std::sync::Arc;
use tracing_test::traced_test;

fn app_over(store: &InMemoryEventStore) -> TaskApp {
    TaskApp::compose(Arc::new(store.clone()), BusConfig::default()).unwrap()
}

fn created_task(event: &Event) -> bool {
    event.event_type().as_str() == CREATED_TASK
}

#[tokio::test]
async fn create_task_intent_notifies_other_listeners_once() {
    let app = app_over(&InMemoryEventStore::new());
    let observer = RecordingListener::new();
    app.bus().on(created_task, observer.clone()).unwrap();
    let trace = TraceId::generate();

    app.router()
        .execute(
            Intent::new(CreateTask {
                name: TaskName::try_new("ship it").unwrap(),
            })
            .with_trace_id(trace.clone()),
        )
        .await
        .unwrap();

    let deliveries = observer.deliveries();
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert!(!delivery.context.is_replay());
    assert_eq!(delivery.event.source().as_str(), TASK_SERVICE_SOURCE);
    assert_eq!(delivery.event.trace_id(), Some(&trace));
    assert_eq!(delivery.event.field("taskName").unwrap(), "ship it");
    assert_eq!(app.tasks().tasks().len(), 1);
}

#[tokio::test]
async fn shell_session_and_intents_share_one_task_list() {
    let app = app_over(&InMemoryEventStore::new());
    app.router()
        .execute(Intent::new(CreateTask {
            name: TaskName::try_new("from code").unwrap(),
        }))
        .await
        .unwrap();
    let mut terminal = ScriptedTerminal::new(["task add from shell", "task ls", "exit"]);

    let outcome = app.run_line("FOCUS", &mut terminal).await;

    assert!(outcome.is_success());
    let output = terminal.output();
    assert!(output.iter().any(|l| l.starts_with("1. from code (ID: ")));
    assert!(output.iter().any(|l| l.starts_with("2. from shell (ID: ")));
}

#[tokio::test]
async fn deleting_an_unknown_task_is_a_dispatch_error() {
    let app = app_over(&InMemoryEventStore::new());

    let result = app
        .router()
        .execute(Intent::new(DeleteTask {
            task_id: TaskId::try_new("task-missing").unwrap(),
        }))
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::Handler { intent: "DeleteTask", .. })
    ));
    assert!(app.bus().history().is_empty());
}

#[tokio::test]
#[traced_test]
async fn intent_without_a_route_is_logged_and_dropped() {
    let router = IntentRouter::new();

    let outcome = router
        .execute(Intent::new(CreateTask {
            name: TaskName::try_new("nobody listens").unwrap(),
        }))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Unrouted);
    assert!(logs_contain("No intent handler registered"));
    assert!(logs_contain("CreateTask"));
}

#[tokio::test]
async fn replay_from_an_id_restores_only_later_tasks() {
    let store = InMemoryEventStore::new();
    let first = app_over(&store);
    let mut terminal = ScriptedTerminal::new(["task add one", "task add two", "task add three"]);
    first.run_line("focus", &mut terminal).await;

    let second = app_over(&store);
    second
        .tasks()
        .replay(
            ReplayRange::from_beginning(ReplayLevel::StateOnly)
                .from_event_id(EventId::try_new(2).unwrap()),
        )
        .await
        .unwrap();

    let names: Vec<String> = second
        .tasks()
        .tasks()
        .iter()
        .map(|t| t.name.to_string())
        .collect();
    assert_eq!(names, vec!["two".to_string(), "three".to_string()]);
}

#[tokio::test]
async fn bounded_history_keeps_only_the_latest_events() {
    let config = BusConfig::default()
        .with_history(HistoryRetention::Bounded(HistoryCapacity::try_new(2).unwrap()));
    let store = InMemoryEventStore::new();
    let app = TaskApp::compose(Arc::new(store.clone()), config).unwrap();
    let mut terminal = ScriptedTerminal::new(["task add a", "task add b", "task add c"]);

    app.run_line("focus", &mut terminal).await;

    let kept: Vec<u64> = app.bus().history().iter().map(|e| e.id().into()).collect();
    assert_eq!(kept, vec![2, 3]);
    assert_eq!(store.len(), 3);
    assert_eq!(app.tasks().tasks().len(), 3);
}

#[tokio::test]
async fn shutdown_closes_the_bus_for_every_component() {
    let app = app_over(&InMemoryEventStore::new());
    app.shutdown();

    let result = app
        .router()
        .execute(Intent::new(CreateTask {
            name: TaskName::try_new("too late").unwrap(),
        }))
        .await;

    assert!(app.bus().is_closed());
    assert!(matches!(result, Err(DispatchError::Handler { .. })));
    assert!(app.tasks().tasks().is_empty());
}
