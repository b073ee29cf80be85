//! The line-oriented terminal a command session talks to.
//!
//! The transport that accepts remote sessions provides the implementation;
//! the registry only needs to read one line at a time and write output.

use crate::errors::SessionIoError;
use async_trait::async_trait;

/// One session's input and output.
#[async_trait]
pub trait Terminal: Send {
    /// Reads the next line after showing `prompt`, without its line terminator.
    ///
    /// Returns [`SessionIoError::Interrupted`] or [`SessionIoError::EndOfInput`]
    /// when the user interrupts or the input closes.
    async fn read_line(&mut self, prompt: &str) -> Result<String, SessionIoError>;

    /// Writes one line of output.
    fn write_line(&mut self, line: &str);
}
