//! Error types for Orbit.
//!
//! Every boundary between the core and application code is a catch point: the
//! bus, the router and the registry turn handler failures into values instead
//! of letting them escape. The categories are:
//!
//! - **EventStoreError**: persistence failures, always propagated to the caller
//! - **BusError**: the bus was closed, or the store failed underneath it
//! - **HandlerError**: raised by listener, intent or command handler code
//! - **DispatchError**: an intent handler failed while being executed
//! - **BindingError**: a declarative listener binding was rejected at registration
//! - **SessionIoError**: the interactive input source was interrupted or ran dry

use thiserror::Error;

/// Errors reported by an [`EventStore`](crate::store::EventStore) implementation.
#[derive(Debug, Clone, Error)]
pub enum EventStoreError {
    /// The backing store could not be reached.
    #[error("Event store unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors returned by the event bus.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// The bus has been closed; no further publish, subscribe or replay is accepted.
    #[error("Event bus is closed")]
    Closed,

    /// Persisting or querying events failed.
    #[error("Event store error: {0}")]
    Store(#[from] EventStoreError),
}

/// A failure raised by application handler code.
///
/// Listeners, intent handlers and command handlers all report failure with
/// this type so the core can log and surface it uniformly.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler rejected the work with a message.
    #[error("{0}")]
    Failed(String),

    /// The handler called into the bus and the bus failed.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// The handler executed a nested intent and that intent failed.
    #[error(transparent)]
    Dispatch(Box<DispatchError>),

    /// The handler panicked; the payload message is kept when it was a string.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Any other error raised by handler code.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Creates a handler failure carrying a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wraps an arbitrary error raised by handler code.
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }

    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(message)
    }
}

impl From<DispatchError> for HandlerError {
    fn from(err: DispatchError) -> Self {
        Self::Dispatch(Box::new(err))
    }
}

/// Errors returned by [`IntentRouter::execute`](crate::intent::IntentRouter::execute).
///
/// A missing route is not an error; see
/// [`DispatchOutcome::Unrouted`](crate::intent::DispatchOutcome::Unrouted).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The registered handler ran and failed.
    #[error("Intent handler for '{intent}' failed: {source}")]
    Handler {
        /// Name of the intent payload type
        intent: &'static str,
        /// The failure raised by the handler
        #[source]
        source: HandlerError,
    },
}

/// Errors raised when a declarative listener binding is registered.
#[derive(Debug, Clone, Error)]
pub enum BindingError {
    /// The binding names no event type.
    #[error("Listener binding has an invalid event type: {0}")]
    InvalidEventType(String),

    /// The binding's source filter is not a valid source name.
    #[error("Listener binding has an invalid source filter: {0}")]
    InvalidSource(String),

    /// The binding has no callback, so it could never be invoked.
    #[error("Listener binding for '{event_type}' has no callback")]
    MissingCallback {
        /// Event type the binding was declared for
        event_type: String,
    },

    /// Registering the binding on the bus failed.
    #[error("Failed to subscribe binding: {0}")]
    Bus(#[from] BusError),
}

/// Errors produced by a [`Terminal`](crate::terminal::Terminal) while reading input.
///
/// `Interrupted` and `EndOfInput` are out-of-band signals, not failures: the
/// interactive loop treats them exactly like an exit request.
#[derive(Debug, Error)]
pub enum SessionIoError {
    /// The user interrupted input (Ctrl+C).
    #[error("Input interrupted")]
    Interrupted,

    /// The input source is exhausted (Ctrl+D).
    #[error("End of input")]
    EndOfInput,

    /// Reading from the underlying transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionIoError {
    /// Returns whether the error is a graceful exit signal.
    pub const fn is_exit_signal(&self) -> bool {
        matches!(self, Self::Interrupted | Self::EndOfInput)
    }
}

/// Type alias for event store results.
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Type alias for event bus results.
pub type BusResult<T> = Result<T, BusError>;

/// Type alias for handler results.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// Type alias for intent dispatch results.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_error_messages_are_descriptive() {
        assert_eq!(BusError::Closed.to_string(), "Event bus is closed");

        let err = BusError::from(EventStoreError::Unavailable("disk full".to_string()));
        assert_eq!(
            err.to_string(),
            "Event store error: Event store unavailable: disk full"
        );
    }

    #[test]
    fn dispatch_error_names_the_intent() {
        let err = DispatchError::Handler {
            intent: "CreateTask",
            source: HandlerError::msg("name taken"),
        };
        assert_eq!(
            err.to_string(),
            "Intent handler for 'CreateTask' failed: name taken"
        );
    }

    #[test]
    fn nested_dispatch_error_converts_into_handler_error() {
        let err: HandlerError = DispatchError::Handler {
            intent: "CreateTask",
            source: HandlerError::msg("boom"),
        }
        .into();
        assert!(matches!(err, HandlerError::Dispatch(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn panic_payloads_keep_their_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("listener exploded");
        let err = HandlerError::from_panic(payload.as_ref());
        assert_eq!(err.to_string(), "handler panicked: listener exploded");

        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        let err = HandlerError::from_panic(payload.as_ref());
        assert_eq!(err.to_string(), "handler panicked: non-string panic payload");
    }

    #[test]
    fn only_interrupt_and_eof_are_exit_signals() {
        assert!(SessionIoError::Interrupted.is_exit_signal());
        assert!(SessionIoError::EndOfInput.is_exit_signal());
        let io = SessionIoError::from(std::io::Error::other("pipe closed"));
        assert!(!io.is_exit_signal());
    }
}
