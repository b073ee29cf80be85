//! Composition root for the task tracker
//!
//! Builds the bus, the router and the registry once and wires the task
//! service into all three. Nothing is discovered at runtime.

use crate::tasks::focus::FocusCommand;
use crate::tasks::service::TaskService;
use async_trait::async_trait;
use orbit::bus::{EventBus, EventBusExt, StandardEventBus};
use orbit::command::{CommandContext, CommandHandler, CommandInfo, CommandOutcome, CommandRegistry};
use orbit::config::BusConfig;
use orbit::errors::{BindingError, HandlerResult};
use orbit::intent::IntentRouter;
use orbit::replay::ReplayRange;
use orbit::store::EventStore;
use orbit::terminal::Terminal;
use orbit::types::ReplayLevel;
use std::sync::Arc;
use tracing::info;

const REPLAY_USAGE: &str = "Usage: replay [full|state|inspect] [dry]";

/// `replay [level] [dry]`: replays the whole history into the task list.
#[derive(Debug, Clone)]
pub struct ReplayCommand {
    tasks: Arc<TaskService>,
}

impl ReplayCommand {
    /// Creates the command over the task service.
    pub fn new(tasks: Arc<TaskService>) -> Self {
        Self { tasks }
    }

    /// Registration info: `replay`.
    pub fn info() -> CommandInfo {
        CommandInfo::new("replay").description("Replay task history into the task list")
    }

    fn parse(args: &[String]) -> Option<ReplayRange> {
        let mut level = ReplayLevel::Full;
        let mut dry_run = false;
        for arg in args {
            match arg.to_lowercase().as_str() {
                "full" => level = ReplayLevel::Full,
                "state" => level = ReplayLevel::StateOnly,
                "inspect" => level = ReplayLevel::Inspect,
                "dry" | "--dry-run" => dry_run = true,
                _ => return None,
            }
        }
        let range = ReplayRange::from_beginning(level);
        Some(if dry_run { range.dry_run() } else { range })
    }
}

#[async_trait]
impl CommandHandler for ReplayCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> HandlerResult<bool> {
        let Some(range) = Self::parse(ctx.args()) else {
            ctx.write_line(REPLAY_USAGE);
            return Ok(false);
        };

        let summary = self.tasks.replay(range).await?;
        ctx.write_line(&format!(
            "Replayed {} events over {} pages ({} failed)",
            summary.delivered, summary.pages, summary.failed
        ));
        Ok(true)
    }
}

/// The wired task tracker
#[derive(Debug)]
pub struct TaskApp {
    bus: Arc<StandardEventBus>,
    router: Arc<IntentRouter>,
    registry: CommandRegistry,
    tasks: Arc<TaskService>,
}

impl TaskApp {
    /// Wires every component over `store`.
    pub fn compose(store: Arc<dyn EventStore>, config: BusConfig) -> Result<Self, BindingError> {
        let bus = Arc::new(StandardEventBus::with_config(store, config));
        let shared: Arc<dyn EventBus> = bus.clone();
        let router = Arc::new(IntentRouter::new());

        let tasks = Arc::new(TaskService::new(shared));
        tasks.register_routes(&router);
        let listeners = bus.bind_set(tasks.as_ref())?;

        let registry = CommandRegistry::with_builtins();
        registry.register_interactive(
            FocusCommand::info(),
            FocusCommand::new(Arc::clone(&router), Arc::clone(&tasks)),
        );
        registry.register(ReplayCommand::info(), ReplayCommand::new(Arc::clone(&tasks)));

        info!(
            listeners,
            routes = router.route_count(),
            commands = registry.command_names().len(),
            "Task tracker composed"
        );
        Ok(Self {
            bus,
            router,
            registry,
            tasks,
        })
    }

    /// The event bus.
    pub fn bus(&self) -> &Arc<StandardEventBus> {
        &self.bus
    }

    /// The intent router.
    pub fn router(&self) -> &Arc<IntentRouter> {
        &self.router
    }

    /// The command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// The task service.
    pub fn tasks(&self) -> &Arc<TaskService> {
        &self.tasks
    }

    /// Runs one shell line.
    pub async fn run_line(&self, line: &str, terminal: &mut dyn Terminal) -> CommandOutcome {
        self.registry.execute_command(line, terminal).await
    }

    /// Closes the bus.
    pub fn shutdown(&self) {
        self.bus.close();
    }
}
