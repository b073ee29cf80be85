//! Per-delivery context handed to listeners alongside each event.

use crate::types::ReplayLevel;
use serde::{Deserialize, Serialize};

/// Describes how an event is being delivered.
///
/// `replay` is true exactly when the delivery comes from
/// [`EventBus::replay`](crate::bus::EventBus::replay); live publishes always
/// carry `replay == false`, `dry_run == false` and no level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    replay: bool,
    dry_run: bool,
    replay_level: Option<ReplayLevel>,
}

impl EventContext {
    /// Context for a live publish.
    pub const fn live() -> Self {
        Self {
            replay: false,
            dry_run: false,
            replay_level: None,
        }
    }

    /// Context for a replayed delivery at `level`.
    pub const fn replayed(level: ReplayLevel, dry_run: bool) -> Self {
        Self {
            replay: true,
            dry_run,
            replay_level: Some(level),
        }
    }

    /// Whether this delivery is a replay of persisted history.
    pub const fn is_replay(&self) -> bool {
        self.replay
    }

    /// Whether listeners should avoid external side effects.
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The replay level, present only for replayed deliveries.
    pub const fn replay_level(&self) -> Option<ReplayLevel> {
        self.replay_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_context_is_not_a_replay() {
        let ctx = EventContext::live();
        assert!(!ctx.is_replay());
        assert!(!ctx.is_dry_run());
        assert_eq!(ctx.replay_level(), None);
        assert_eq!(ctx, EventContext::default());
    }

    #[test]
    fn replayed_context_carries_level() {
        let ctx = EventContext::replayed(ReplayLevel::Inspect, true);
        assert!(ctx.is_replay());
        assert!(ctx.is_dry_run());
        assert_eq!(ctx.replay_level(), Some(ReplayLevel::Inspect));
    }
}
