//! `Orbit` - in-process message routing for command-driven applications
//!
//! Three cooperating routers sit between a line-oriented shell and the
//! application's services:
//!
//! - [`CommandRegistry`] parses a command line and dispatches it to a
//!   single-shot or interactive handler.
//! - [`IntentRouter`] hands each typed [`Intent`] to the one handler
//!   registered for its payload type.
//! - [`StandardEventBus`] persists events through an [`EventStore`], notifies
//!   matching listeners, and replays persisted history to a single listener.
//!
//! Everything is wired by explicit composition: build the routers once, pass
//! them (usually behind an `Arc`) to the components that need them, and
//! register handlers and listeners at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod binding;
pub mod builtins;
pub mod bus;
pub mod command;
pub mod config;
pub mod context;
pub mod errors;
pub mod event;
pub mod intent;
pub mod replay;
pub mod store;
pub mod terminal;
pub mod types;

mod sync;

pub use binding::{bind_all, BindingFilter, ListenerBinding, ListenerSet};
pub use builtins::{DateCommand, EchoCommand, HelpCommand};
pub use bus::{EventBus, EventBusExt, EventFilter, EventListener, StandardEventBus};
pub use command::{
    CommandContext, CommandFailure, CommandHandler, CommandInfo, CommandOutcome, CommandRegistry,
    InteractiveCommand, InteractiveCommandFactory,
};
pub use config::{BusConfig, HistoryCapacity, HistoryRetention, PageSize, RegistryConfig};
pub use context::EventContext;
pub use errors::{
    BindingError, BusError, BusResult, DispatchError, DispatchResult, EventStoreError,
    EventStoreResult, HandlerError, HandlerResult, SessionIoError,
};
pub use event::{Event, EventFactory, NewEvent, Payload};
pub use intent::{DispatchOutcome, Intent, IntentHandler, IntentPayload, IntentRouter};
pub use replay::{ReplayCancellation, ReplayQuery, ReplayRange, ReplaySummary};
pub use store::{EventStore, Page, PageRequest};
pub use terminal::Terminal;
pub use types::{
    CauseId, EventId, EventSource, EventType, ReplayLevel, SemanticTier, Timestamp, TraceId,
};
