//! The interactive `focus` command
//!
//! ```text
//! > focus
//! Entering interactive mode.
//! focus> task add write release notes
//! Task added: write release notes
//! focus> task ls
//! Current tasks:
//! 1. write release notes (ID: task-0190...)
//! focus> start 1
//! Starting task: write release notes (ID: task-0190...)
//! focus> exit
//! Exiting interactive mode.
//! ```

use crate::tasks::intents::{CreateTask, DeleteTask};
use crate::tasks::service::TaskService;
use crate::tasks::types::{Task, TaskName};
use async_trait::async_trait;
use orbit::command::{CommandContext, CommandInfo, InteractiveCommand, InteractiveCommandFactory};
use orbit::errors::HandlerResult;
use orbit::intent::{DispatchOutcome, Intent, IntentRouter};
use orbit::terminal::Terminal;
use orbit::types::TraceId;
use std::sync::Arc;
use tracing::debug;

const PROMPT: &str = "focus> ";

/// Starts a [`FocusSession`] per invocation
#[derive(Debug, Clone)]
pub struct FocusCommand {
    router: Arc<IntentRouter>,
    tasks: Arc<TaskService>,
}

impl FocusCommand {
    /// Creates the command over the shared router and task service.
    pub fn new(router: Arc<IntentRouter>, tasks: Arc<TaskService>) -> Self {
        Self { router, tasks }
    }

    /// Registration info: `focus`, alias `f`.
    pub fn info() -> CommandInfo {
        CommandInfo::new("focus")
            .description("Interactive task mode: add, list, start and delete tasks")
            .alias("f")
    }
}

impl InteractiveCommandFactory for FocusCommand {
    fn create(&self) -> Box<dyn InteractiveCommand> {
        Box::new(FocusSession {
            router: Arc::clone(&self.router),
            tasks: Arc::clone(&self.tasks),
            listed: Vec::new(),
            exit: false,
        })
    }
}

/// One `focus` session
///
/// Task numbers refer to the list printed by the most recent `task ls`.
pub struct FocusSession {
    router: Arc<IntentRouter>,
    tasks: Arc<TaskService>,
    listed: Vec<Task>,
    exit: bool,
}

/// A parsed session line.
#[derive(Debug, PartialEq, Eq)]
enum FocusInput<'a> {
    Exit,
    Add(&'a str),
    List,
    Start(&'a str),
    Delete(&'a str),
    Unknown,
}

impl<'a> FocusInput<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return Self::Exit;
        }
        if let Some(name) = strip_keyword(line, "task add") {
            return Self::Add(name);
        }
        if line == "task ls" {
            return Self::List;
        }
        if let Some(number) = strip_keyword(line, "start") {
            return Self::Start(number);
        }
        if let Some(number) = strip_keyword(line, "task del") {
            return Self::Delete(number);
        }
        Self::Unknown
    }
}

/// `rest` of `line` when it is `keyword` alone or `keyword` plus whitespace.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn describe(task: &Task) -> String {
    format!("{} (ID: {})", task.name, task.id)
}

impl FocusSession {
    /// Resolves a 1-based number against the last listing.
    fn pick(&self, number: &str, usage: &str, ctx: &mut CommandContext<'_>) -> Option<usize> {
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            ctx.write_line(usage);
            return None;
        }
        match number.parse::<usize>() {
            Ok(n) if (1..=self.listed.len()).contains(&n) => Some(n - 1),
            _ => {
                ctx.write_line(&format!("Invalid task number: {number}"));
                None
            }
        }
    }

    async fn add_task(&self, name: &str, ctx: &mut CommandContext<'_>) -> HandlerResult {
        if name.is_empty() {
            ctx.write_line("Usage: task add <task_name>");
            return Ok(());
        }
        let Ok(task_name) = TaskName::try_new(name) else {
            ctx.write_line(&format!("Invalid task name: {name}"));
            return Ok(());
        };

        let intent = Intent::new(CreateTask { name: task_name }).with_trace_id(TraceId::generate());
        match self.router.execute(intent).await? {
            DispatchOutcome::Handled => ctx.write_line(&format!("Task added: {name}")),
            DispatchOutcome::Unrouted => ctx.write_line("Task service is not available."),
        }
        Ok(())
    }

    fn list_tasks(&mut self, ctx: &mut CommandContext<'_>) {
        self.listed = self.tasks.tasks();
        ctx.write_line("Current tasks:");
        for (i, task) in self.listed.iter().enumerate() {
            ctx.write_line(&format!("{}. {}", i + 1, describe(task)));
        }
    }

    fn start_task(&self, number: &str, ctx: &mut CommandContext<'_>) {
        if let Some(index) = self.pick(number, "Usage: start <task_number>", ctx) {
            ctx.write_line(&format!("Starting task: {}", describe(&self.listed[index])));
        }
    }

    async fn delete_task(&mut self, number: &str, ctx: &mut CommandContext<'_>) -> HandlerResult {
        let Some(index) = self.pick(number, "Usage: task del <task_number>", ctx) else {
            return Ok(());
        };
        let task = self.listed[index].clone();
        if self.tasks.find(&task.id).is_none() {
            ctx.write_line(&format!("Task already removed: {}", describe(&task)));
            return Ok(());
        }

        let intent = Intent::new(DeleteTask {
            task_id: task.id.clone(),
        })
        .with_trace_id(TraceId::generate());
        match self.router.execute(intent).await? {
            DispatchOutcome::Handled => {
                self.listed.remove(index);
                ctx.write_line(&format!("Deleted task: {}", describe(&task)));
            }
            DispatchOutcome::Unrouted => ctx.write_line("Task service is not available."),
        }
        Ok(())
    }
}

#[async_trait]
impl InteractiveCommand for FocusSession {
    async fn start(&mut self, _ctx: &mut CommandContext<'_>) -> HandlerResult<bool> {
        self.exit = false;
        self.listed.clear();
        Ok(true)
    }

    async fn handle_input(&mut self, line: &str, ctx: &mut CommandContext<'_>) -> HandlerResult {
        let input = FocusInput::parse(line);
        debug!(?input, "Focus input");
        match input {
            FocusInput::Exit => self.exit = true,
            FocusInput::Add(name) => self.add_task(name, ctx).await?,
            FocusInput::List => self.list_tasks(ctx),
            FocusInput::Start(number) => self.start_task(number, ctx),
            FocusInput::Delete(number) => self.delete_task(number, ctx).await?,
            FocusInput::Unknown if line.trim().is_empty() => {}
            FocusInput::Unknown => ctx.write_line(&format!("Unknown command: {}", line.trim())),
        }
        Ok(())
    }

    fn should_exit(&self) -> bool {
        self.exit
    }

    fn on_enter(&mut self, terminal: &mut dyn Terminal) {
        terminal.write_line("Entering interactive mode.");
    }

    fn on_exit(&mut self, terminal: &mut dyn Terminal) {
        terminal.write_line("Exiting interactive mode.");
    }

    fn prompt(&self) -> Option<&str> {
        Some(PROMPT)
    }
}
