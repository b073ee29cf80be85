//! Configuration with type-safe validation.
//!
//! Every tunable uses `nutype` validation so an out-of-range value is rejected
//! when the configuration is built or deserialized, never while routing.

use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Number of events fetched per store query during replay.
///
/// Validated to be between 1 and 10,000; defaults to 1,000.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 10_000),
    default = 1_000,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Into,
        Default,
        Serialize,
        Deserialize
    )
)]
pub struct PageSize(usize);

impl PageSize {
    /// The page size as a plain count.
    pub fn get(self) -> usize {
        self.into()
    }
}

/// Maximum number of events kept in the bus's in-memory history.
///
/// Validated to be between 1 and 10 million.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 10_000_000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct HistoryCapacity(usize);

/// How much publish history the bus keeps in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRetention {
    /// Keep every published event until the bus is closed.
    #[default]
    Unbounded,
    /// Keep the most recent events, evicting the oldest first.
    Bounded(HistoryCapacity),
}

/// Event bus configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Page size used by replay queries.
    #[serde(default)]
    pub page_size: PageSize,
    /// In-memory history policy.
    #[serde(default)]
    pub history: HistoryRetention,
}

impl BusConfig {
    /// Sets the replay page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the history policy.
    #[must_use]
    pub const fn with_history(mut self, history: HistoryRetention) -> Self {
        self.history = history;
        self
    }
}

/// Command registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Prompt shown by interactive command loops.
    #[serde(default = "default_prompt")]
    pub interactive_prompt: String,
}

fn default_prompt() -> String {
    "> ".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            interactive_prompt: default_prompt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let config = BusConfig::default();
        assert_eq!(config.page_size.get(), 1_000);
        assert_eq!(config.history, HistoryRetention::Unbounded);
        assert_eq!(RegistryConfig::default().interactive_prompt, "> ");
    }

    #[test]
    fn bus_config_deserializes_with_missing_fields() {
        let config: BusConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BusConfig::default());

        let config: BusConfig =
            serde_json::from_str(r#"{"page_size": 50, "history": {"bounded": 10}}"#).unwrap();
        assert_eq!(config.page_size.get(), 50);
        assert_eq!(
            config.history,
            HistoryRetention::Bounded(HistoryCapacity::try_new(10).unwrap())
        );
    }

    #[test]
    fn invalid_page_size_is_rejected_at_deserialization() {
        let result: Result<BusConfig, _> = serde_json::from_str(r#"{"page_size": 0}"#);
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn page_size_accepts_valid_range(n in 1usize..=10_000) {
            prop_assert_eq!(PageSize::try_new(n).unwrap().get(), n);
        }

        #[test]
        fn page_size_rejects_oversized(n in 10_001usize..1_000_000) {
            prop_assert!(PageSize::try_new(n).is_err());
        }
    }
}
