//! Commands every shell gets: `help`, `echo` and `date`.

use crate::command::{CommandContext, CommandHandler, CommandInfo, CommandRegistry};
use crate::errors::HandlerResult;
use async_trait::async_trait;
use chrono::Local;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `help [name]`: lists every command, or describes one.
#[derive(Debug, Default, Clone, Copy)]
pub struct HelpCommand;

impl HelpCommand {
    /// Registration info: `help`, aliases `?` and `h`.
    pub fn info() -> CommandInfo {
        CommandInfo::new("help")
            .description("Display help information")
            .aliases(["?", "h"])
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> HandlerResult<bool> {
        let registry = ctx.registry();

        if let Some(name) = ctx.arg(0).map(str::to_string) {
            match registry.description(&name) {
                Some(description) => {
                    ctx.write_line(&format!("Command: {name}"));
                    ctx.write_line(&format!("Description: {description}"));
                }
                None => ctx.write_line(&format!("Unknown command: {name}")),
            }
            return Ok(true);
        }

        ctx.write_line("Available Commands:");
        ctx.write_line("==================");
        ctx.write_line("");
        for name in registry.command_names() {
            let line = match registry.description(&name) {
                Some(description) if !description.is_empty() => {
                    format!("  {name:<15} - {description}")
                }
                _ => format!("  {name:<15}"),
            };
            ctx.write_line(line.trim_end());
        }
        ctx.write_line("");
        ctx.write_line("Type 'help <command>' for more information about a specific command.");
        Ok(true)
    }
}

/// `echo <text...>`: prints its arguments joined by single spaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoCommand;

impl EchoCommand {
    /// Registration info.
    pub fn info() -> CommandInfo {
        CommandInfo::new("echo").description("Echo the input text")
    }
}

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> HandlerResult<bool> {
        let text = ctx.args().join(" ");
        ctx.write_line(&text);
        Ok(true)
    }
}

/// `date`: prints the local date and time.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateCommand;

impl DateCommand {
    /// Registration info.
    pub fn info() -> CommandInfo {
        CommandInfo::new("date").description("Display current date and time")
    }
}

#[async_trait]
impl CommandHandler for DateCommand {
    async fn execute(&self, ctx: &mut CommandContext<'_>) -> HandlerResult<bool> {
        let now = Local::now().format(DATE_FORMAT);
        ctx.write_line(&format!("Current date and time: {now}"));
        Ok(true)
    }
}

impl CommandRegistry {
    /// Creates a registry with `help`, `echo` and `date` already registered.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Registers `help`, `echo` and `date`.
    pub fn register_builtins(&self) {
        self.register(HelpCommand::info(), HelpCommand);
        self.register(EchoCommand::info(), EchoCommand);
        self.register(DateCommand::info(), DateCommand);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SessionIoError;
    use crate::terminal::Terminal;

    #[derive(Default)]
    struct Capture(Vec<String>);

    #[async_trait]
    impl Terminal for Capture {
        async fn read_line(&mut self, _prompt: &str) -> Result<String, SessionIoError> {
            Err(SessionIoError::EndOfInput)
        }

        fn write_line(&mut self, line: &str) {
            self.0.push(line.to_string());
        }
    }

    #[tokio::test]
    async fn help_lists_sorted_names_with_descriptions() {
        let registry = CommandRegistry::with_builtins();
        let mut term = Capture::default();

        assert!(registry.execute_command("help", &mut term).await.is_success());

        assert_eq!(term.0[0], "Available Commands:");
        let listed: Vec<&str> = term
            .0
            .iter()
            .filter(|l| l.starts_with("  "))
            .map(|l| l.split_whitespace().next().unwrap_or_default())
            .collect();
        assert_eq!(listed, vec!["?", "date", "echo", "h", "help"]);
        assert!(term
            .0
            .contains(&format!("  {:<15} - Echo the input text", "echo")));
    }

    #[tokio::test]
    async fn help_describes_one_command() {
        let registry = CommandRegistry::with_builtins();
        let mut term = Capture::default();

        registry.execute_command("? DATE", &mut term).await;
        registry.execute_command("h missing", &mut term).await;

        assert_eq!(
            term.0,
            vec![
                "Command: DATE",
                "Description: Display current date and time",
                "Unknown command: missing",
            ]
        );
    }

    #[tokio::test]
    async fn echo_joins_arguments() {
        let registry = CommandRegistry::with_builtins();
        let mut term = Capture::default();

        registry.execute_command("echo  hello   orbit ", &mut term).await;
        registry.execute_command("echo", &mut term).await;

        assert_eq!(term.0, vec!["hello orbit", ""]);
    }

    #[tokio::test]
    async fn date_prints_a_formatted_timestamp() {
        let registry = CommandRegistry::with_builtins();
        let mut term = Capture::default();

        assert!(registry.execute_command("date", &mut term).await.is_success());

        let stamp = term.0[0]
            .strip_prefix("Current date and time: ")
            .unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, DATE_FORMAT).is_ok());
    }
}
