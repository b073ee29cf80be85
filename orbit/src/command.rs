//! Textual command registry.
//!
//! A command line is split on runs of whitespace. The first token,
//! lowercased, selects a registered command (by name or alias); the rest
//! become its arguments verbatim. There is no quoting or escaping.
//!
//! Commands come in two shapes:
//!
//! - **Single-shot** ([`CommandHandler`]): invoked once per line.
//! - **Interactive** ([`InteractiveCommand`]): a fresh session is created for
//!   every invocation and owns a read/respond loop until it asks to exit,
//!   the user types `exit`/`quit`, or the input is interrupted or closed.
//!
//! The registry is the catch point between the shell and command code: a
//! failing or panicking handler is logged, reported on the terminal and turned
//! into [`CommandOutcome::Failed`]. Nothing escapes to the caller.

use crate::config::RegistryConfig;
use crate::errors::{HandlerError, HandlerResult, SessionIoError};
use crate::sync::RwLockRecovery;
use crate::terminal::Terminal;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Everything a command handler gets for one invocation.
pub struct CommandContext<'a> {
    name: String,
    args: Vec<String>,
    terminal: &'a mut dyn Terminal,
    registry: &'a CommandRegistry,
}

impl<'a> CommandContext<'a> {
    /// The command name as typed, lowercased.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments following the command name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// One argument by position.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// The session's terminal.
    pub fn terminal(&mut self) -> &mut dyn Terminal {
        &mut *self.terminal
    }

    /// Writes one line to the session's terminal.
    pub fn write_line(&mut self, line: &str) {
        self.terminal.write_line(line);
    }

    /// The registry that dispatched this command.
    pub const fn registry(&self) -> &'a CommandRegistry {
        self.registry
    }
}

/// A single-shot command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs the command. `Ok(false)` reports failure without an error.
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> HandlerResult<bool>;
}

/// Adapts an async closure into a [`CommandHandler`].
struct FnCommand<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnCommand<F>
where
    F: Fn(Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<(bool, Vec<String>)>> + Send + 'static,
{
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> HandlerResult<bool> {
        let (success, output) = (self.0)(ctx.args().to_vec()).await?;
        for line in &output {
            ctx.write_line(line);
        }
        Ok(success)
    }
}

/// One interactive session.
///
/// Lifecycle: `start` → `on_enter` → `handle_input`* → `on_exit`. `on_exit`
/// runs whenever `on_enter` ran, however the loop ended.
#[async_trait]
pub trait InteractiveCommand: Send {
    /// Initialises the session from the initial arguments. Returning
    /// `Ok(false)` or an error skips the loop and both hooks.
    async fn start(&mut self, ctx: &mut CommandContext<'_>) -> HandlerResult<bool>;

    /// Handles one line of input.
    async fn handle_input(&mut self, line: &str, ctx: &mut CommandContext<'_>) -> HandlerResult;

    /// Whether the session wants to leave the loop.
    fn should_exit(&self) -> bool;

    /// Called once before the first read.
    fn on_enter(&mut self, _terminal: &mut dyn Terminal) {}

    /// Called once after the loop ends.
    fn on_exit(&mut self, _terminal: &mut dyn Terminal) {}

    /// Prompt override for this session.
    fn prompt(&self) -> Option<&str> {
        None
    }
}

/// Creates a fresh [`InteractiveCommand`] for every invocation.
pub trait InteractiveCommandFactory: Send + Sync {
    /// Creates a new session.
    fn create(&self) -> Box<dyn InteractiveCommand>;
}

impl<F> InteractiveCommandFactory for F
where
    F: Fn() -> Box<dyn InteractiveCommand> + Send + Sync,
{
    fn create(&self) -> Box<dyn InteractiveCommand> {
        self()
    }
}

/// Name, description and aliases of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    name: String,
    description: String,
    aliases: Vec<String>,
}

impl CommandInfo {
    /// Describes a command called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            aliases: Vec::new(),
        }
    }

    /// Sets the description shown by `help`.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds an alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Adds several aliases.
    #[must_use]
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }
}

/// Why a command line did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandFailure {
    /// The line held no tokens.
    #[error("empty command line")]
    EmptyLine,

    /// No command is registered under the name.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The handler ran and reported failure.
    #[error("command reported failure")]
    Rejected,

    /// The handler raised an error or panicked.
    #[error("Error executing command: {0}")]
    Handler(String),

    /// The interactive session's input failed.
    #[error("Error in interactive mode: {0}")]
    Session(String),
}

/// Result of [`CommandRegistry::execute_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command ran and succeeded.
    Completed,
    /// The command did not succeed.
    Failed(CommandFailure),
}

impl CommandOutcome {
    /// Whether the command succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// The failure, if any.
    pub const fn failure(&self) -> Option<&CommandFailure> {
        match self {
            Self::Completed => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

#[derive(Clone)]
enum CommandKind {
    Single(Arc<dyn CommandHandler>),
    Interactive(Arc<dyn InteractiveCommandFactory>),
}

struct CommandRecord {
    name: String,
    description: String,
    kind: CommandKind,
}

/// Maps command names and aliases to handlers.
pub struct CommandRegistry {
    config: RegistryConfig,
    commands: RwLock<HashMap<String, Arc<CommandRecord>>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Creates an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            commands: RwLock::new(HashMap::new()),
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Registers a single-shot command under its name and aliases.
    pub fn register<H>(&self, info: CommandInfo, handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.insert(info, CommandKind::Single(Arc::new(handler)));
    }

    /// Registers an async closure taking the arguments and returning
    /// `(success, output lines)`.
    pub fn register_fn<F, Fut>(&self, info: CommandInfo, handler: F)
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<(bool, Vec<String>)>> + Send + 'static,
    {
        self.register(info, FnCommand(handler));
    }

    /// Registers an interactive command. `factory` runs once per invocation.
    pub fn register_interactive<F>(&self, info: CommandInfo, factory: F)
    where
        F: InteractiveCommandFactory + 'static,
    {
        self.insert(info, CommandKind::Interactive(Arc::new(factory)));
    }

    fn insert(&self, info: CommandInfo, kind: CommandKind) {
        let record = Arc::new(CommandRecord {
            name: info.name.clone(),
            description: info.description,
            kind,
        });
        let interactive = matches!(record.kind, CommandKind::Interactive(_));

        let mut commands = self.commands.write_recover();
        if commands
            .insert(info.name.to_lowercase(), Arc::clone(&record))
            .is_some()
        {
            debug!(command = %info.name, "Replaced existing command");
        }
        info!(command = %info.name, interactive, "Registered command");

        for alias in &info.aliases {
            commands.insert(alias.to_lowercase(), Arc::clone(&record));
            info!(alias = %alias, command = %info.name, "Registered command alias");
        }
    }

    /// Every registered name and alias, sorted.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read_recover().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Description of the command registered under `name` (case-insensitive).
    pub fn description(&self, name: &str) -> Option<String> {
        self.lookup(name).map(|record| record.description.clone())
    }

    /// Whether a command is registered under `name` (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.commands
            .read_recover()
            .contains_key(&name.to_lowercase())
    }

    fn lookup(&self, name: &str) -> Option<Arc<CommandRecord>> {
        self.commands
            .read_recover()
            .get(&name.to_lowercase())
            .cloned()
    }

    /// Parses and runs one command line against `terminal`.
    #[instrument(skip(self, terminal))]
    pub async fn execute_command(&self, line: &str, terminal: &mut dyn Terminal) -> CommandOutcome {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            return CommandOutcome::Failed(CommandFailure::EmptyLine);
        };
        let name = first.to_lowercase();

        let Some(record) = self.lookup(&name) else {
            let failure = CommandFailure::UnknownCommand(name);
            terminal.write_line(&failure.to_string());
            return CommandOutcome::Failed(failure);
        };

        let mut ctx = CommandContext {
            name,
            args: tokens.map(str::to_string).collect(),
            terminal,
            registry: self,
        };
        debug!(command = %record.name, args = ctx.args.len(), "Executing command");

        match &record.kind {
            CommandKind::Single(handler) => run_single(handler.as_ref(), &mut ctx).await,
            CommandKind::Interactive(factory) => {
                run_interactive(factory.create(), &mut ctx, &self.config.interactive_prompt).await
            }
        }
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("config", &self.config)
            .field("commands", &self.command_names())
            .finish()
    }
}

/// Awaits handler code, turning a panic into a [`HandlerError`].
async fn guarded<T, F>(future: F) -> HandlerResult<T>
where
    F: Future<Output = HandlerResult<T>>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload.as_ref())))
}

/// Runs a synchronous hook, logging instead of unwinding if it panics.
fn guarded_hook(command: &str, hook: &'static str, run: impl FnOnce()) {
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(run)) {
        let err = HandlerError::from_panic(payload.as_ref());
        error!(command, hook, error = %err, "Interactive hook panicked");
    }
}

fn report(ctx: &mut CommandContext<'_>, err: &HandlerError) -> CommandOutcome {
    error!(command = %ctx.name, error = %err, "Error executing command");
    let failure = CommandFailure::Handler(err.to_string());
    ctx.write_line(&failure.to_string());
    CommandOutcome::Failed(failure)
}

async fn run_single(handler: &dyn CommandHandler, ctx: &mut CommandContext<'_>) -> CommandOutcome {
    match guarded(handler.execute(ctx)).await {
        Ok(true) => CommandOutcome::Completed,
        Ok(false) => CommandOutcome::Failed(CommandFailure::Rejected),
        Err(err) => report(ctx, &err),
    }
}

fn is_exit_token(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

async fn run_interactive(
    mut session: Box<dyn InteractiveCommand>,
    ctx: &mut CommandContext<'_>,
    default_prompt: &str,
) -> CommandOutcome {
    match guarded(session.start(ctx)).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(command = %ctx.name, "Interactive command declined to start");
            return CommandOutcome::Failed(CommandFailure::Rejected);
        }
        Err(err) => return report(ctx, &err),
    }

    let command = ctx.name.clone();
    guarded_hook(&command, "on_enter", || session.on_enter(ctx.terminal()));
    info!(command = %command, "Entered interactive mode");

    let failure = loop {
        if session.should_exit() {
            break None;
        }

        let prompt = session.prompt().unwrap_or(default_prompt).to_string();
        let line = match ctx.terminal().read_line(&prompt).await {
            Ok(line) => line,
            Err(SessionIoError::Interrupted) => {
                ctx.write_line("Interrupted. Exiting interactive mode.");
                break None;
            }
            Err(SessionIoError::EndOfInput) => {
                ctx.write_line("End of input. Exiting interactive mode.");
                break None;
            }
            Err(SessionIoError::Io(err)) => {
                warn!(command = %command, error = %err, "Interactive input failed");
                let failure = CommandFailure::Session(err.to_string());
                ctx.write_line(&failure.to_string());
                break Some(failure);
            }
        };

        if is_exit_token(&line) {
            break None;
        }

        if let Err(err) = guarded(session.handle_input(&line, ctx)).await {
            error!(command = %command, error = %err, "Error in interactive command");
            let failure = CommandFailure::Session(err.to_string());
            ctx.write_line(&failure.to_string());
            break Some(failure);
        }
    };

    guarded_hook(&command, "on_exit", || session.on_exit(ctx.terminal()));
    info!(command = %command, "Left interactive mode");

    failure.map_or(CommandOutcome::Completed, CommandOutcome::Failed)
}
