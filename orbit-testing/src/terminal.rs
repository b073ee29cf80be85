//! A [`Terminal`] driven by a prepared script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use orbit::errors::SessionIoError;
use orbit::terminal::Terminal;

/// Terminal whose input comes from a queue and whose output is captured.
///
/// When the script runs out, reads report [`SessionIoError::EndOfInput`], so
/// an interactive session always terminates.
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    input: VecDeque<Result<String, SessionIoError>>,
    output: TerminalOutput,
    prompts: Vec<String>,
}

impl ScriptedTerminal {
    /// A terminal that will read `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(|l| Ok(l.into())).collect(),
            ..Self::default()
        }
    }

    /// Queues another input line.
    #[must_use]
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.input.push_back(Ok(line.into()));
        self
    }

    /// Queues a Ctrl+C.
    #[must_use]
    pub fn interrupt(mut self) -> Self {
        self.input.push_back(Err(SessionIoError::Interrupted));
        self
    }

    /// Queues a Ctrl+D.
    #[must_use]
    pub fn end_of_input(mut self) -> Self {
        self.input.push_back(Err(SessionIoError::EndOfInput));
        self
    }

    /// Queues a transport failure.
    #[must_use]
    pub fn io_error(mut self, message: &str) -> Self {
        self.input
            .push_back(Err(SessionIoError::Io(std::io::Error::other(message.to_string()))));
        self
    }

    /// Everything written so far.
    pub fn output(&self) -> Vec<String> {
        self.output.lines()
    }

    /// A handle that keeps observing output after the terminal is moved.
    pub fn output_handle(&self) -> TerminalOutput {
        self.output.clone()
    }

    /// Prompts shown, one per read.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Input lines not consumed yet.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    async fn read_line(&mut self, prompt: &str) -> Result<String, SessionIoError> {
        self.prompts.push(prompt.to_string());
        self.input
            .pop_front()
            .unwrap_or(Err(SessionIoError::EndOfInput))
    }

    fn write_line(&mut self, line: &str) {
        self.output.push(line);
    }
}

/// Shared view of a [`ScriptedTerminal`]'s output.
#[derive(Debug, Clone, Default)]
pub struct TerminalOutput {
    lines: Arc<Mutex<Vec<String>>>,
}

impl TerminalOutput {
    /// All lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any written line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|line| line.contains(needle))
    }

    fn push(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_script_then_reports_end_of_input() {
        let mut terminal = ScriptedTerminal::new(["a"]).interrupt();

        assert_eq!(terminal.read_line("> ").await.unwrap(), "a");
        assert!(matches!(
            terminal.read_line("> ").await,
            Err(SessionIoError::Interrupted)
        ));
        assert!(matches!(
            terminal.read_line("> ").await,
            Err(SessionIoError::EndOfInput)
        ));
        assert_eq!(terminal.prompts().len(), 3);
    }

    #[test]
    fn output_handle_sees_later_writes() {
        let mut terminal = ScriptedTerminal::default();
        let handle = terminal.output_handle();

        terminal.write_line("hello");

        assert_eq!(handle.lines(), vec!["hello".to_string()]);
        assert!(handle.contains("ell"));
    }
}
