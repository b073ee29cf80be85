//! Task tracker shell
//!
//! Reads command lines from stdin and runs them through the registry:
//! `help`, `echo`, `date`, `focus` and `replay`. `exit` or end of input
//! leaves the shell. Set `RUST_LOG=info` to watch events and intents flow.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use orbit::config::BusConfig;
use orbit::errors::SessionIoError;
use orbit::terminal::Terminal;
use orbit_examples::tasks::TaskApp;
use orbit_memory::InMemoryEventStore;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Line-buffered stdin/stdout terminal.
struct StdinTerminal;

#[async_trait]
impl Terminal for StdinTerminal {
    async fn read_line(&mut self, prompt: &str) -> Result<String, SessionIoError> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let (read, line) = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|read| (read, line))
        })
        .await
        .map_err(std::io::Error::other)??;

        if read == 0 {
            return Err(SessionIoError::EndOfInput);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with the prompt
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting task tracker");

    let store = InMemoryEventStore::new();
    let app = TaskApp::compose(Arc::new(store), BusConfig::default())?;
    let prompt = app.registry().config().interactive_prompt.clone();
    let mut terminal = StdinTerminal;

    terminal.write_line("Task tracker. Type 'help' for commands, 'exit' to leave.");
    loop {
        let line = match terminal.read_line(&prompt).await {
            Ok(line) => line,
            Err(err) if err.is_exit_signal() => break,
            Err(err) => return Err(err.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }

        let outcome = app.run_line(line, &mut terminal).await;
        if let Some(failure) = outcome.failure() {
            debug!(%failure, "Command did not succeed");
        }
    }

    app.shutdown();
    info!(tasks = app.tasks().tasks().len(), "Task tracker stopped");
    Ok(())
}
