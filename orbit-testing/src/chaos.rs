//! Fault injection for event stores.
//!
//! [`ChaosEventStore`] wraps any [`EventStore`] and fails reads or writes with
//! a configured probability, so callers can be tested against an unreliable
//! backend. [`ChaosConfig::deterministic`] turns every failure off.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use nutype::nutype;
use orbit::errors::{EventStoreError, EventStoreResult};
use orbit::event::{Event, NewEvent};
use orbit::store::{EventStore, Page, PageRequest};
use orbit::types::{EventId, Timestamp};
use rand::{random, rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

/// Probability value for chaos engineering injection rates.
///
/// Probability represents a value in the range [0.0, 1.0] where 0.0 means
/// never inject failures and 1.0 means always inject failures.
///
/// # Examples
///
/// ```ignore
/// use orbit_testing::chaos::Probability;
///
/// let never = Probability::try_new(0.0).unwrap();
/// let always = Probability::try_new(1.0).unwrap();
///
/// // Values outside [0.0, 1.0] are rejected
/// assert!(Probability::try_new(1.5).is_err());
/// ```
#[nutype(
    validate(greater_or_equal = 0.0, less_or_equal = 1.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Into)
)]
pub struct Probability(f32);

impl Probability {
    fn clamped(value: f32) -> Self {
        Self::try_new(value.clamp(0.0, 1.0)).expect("clamped value is always valid")
    }
}

/// How often a [`ChaosEventStore`] fails writes and reads.
#[derive(Debug, Clone)]
pub struct ChaosConfig {
    deterministic_seed: Option<u64>,
    write_failure_probability: Probability,
    read_failure_probability: Probability,
}

impl ChaosConfig {
    /// A config with a fixed seed, so runs are reproducible.
    pub fn deterministic() -> Self {
        Self {
            deterministic_seed: Some(0),
            ..Self::default()
        }
    }

    /// Sets both write and read failure rates.
    #[must_use]
    pub fn with_failure_probability(self, probability: f32) -> Self {
        self.with_write_failure_probability(probability)
            .with_read_failure_probability(probability)
    }

    /// Sets the rate at which `save` fails.
    #[must_use]
    pub fn with_write_failure_probability(mut self, probability: f32) -> Self {
        self.write_failure_probability = Probability::clamped(probability);
        self
    }

    /// Sets the rate at which queries fail.
    #[must_use]
    pub fn with_read_failure_probability(mut self, probability: f32) -> Self {
        self.read_failure_probability = Probability::clamped(probability);
        self
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            deterministic_seed: None,
            write_failure_probability: Probability::clamped(0.0),
            read_failure_probability: Probability::clamped(0.0),
        }
    }
}

/// Wraps any store in a [`ChaosEventStore`].
pub trait ChaosEventStoreExt: Sized {
    /// Injects failures according to `config`.
    fn with_chaos(self, config: ChaosConfig) -> ChaosEventStore<Self>;
}

/// An event store that fails some operations before reaching the real store.
///
/// Injected failures are [`EventStoreError::Unavailable`], the kind a real
/// backend reports when it cannot be reached.
pub struct ChaosEventStore<S> {
    store: S,
    config: ChaosConfig,
    rng: Mutex<StdRng>,
}

impl<S> ChaosEventStore<S> {
    /// Wraps `store`.
    pub fn new(store: S, config: ChaosConfig) -> Self {
        let rng = match config.deterministic_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(random()),
        };

        Self {
            store,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.store
    }

    fn should_inject(&self, probability: Probability) -> bool {
        let prob_f32: f32 = probability.into();

        if prob_f32 <= 0.0 {
            return false;
        }

        if prob_f32 >= 1.0 {
            return true;
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_bool(f64::from(prob_f32))
    }

    fn read_guard(&self, operation: &'static str) -> EventStoreResult<()> {
        if self.should_inject(self.config.read_failure_probability) {
            debug!(operation, "Injecting chaos read failure");
            return Err(EventStoreError::Unavailable(format!(
                "chaos: injected {operation} failure"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<S> EventStore for ChaosEventStore<S>
where
    S: EventStore,
{
    async fn save(&self, event: NewEvent) -> EventStoreResult<Event> {
        if self.should_inject(self.config.write_failure_probability) {
            debug!(event_type = %event.event_type(), "Injecting chaos write failure");
            return Err(EventStoreError::Unavailable(
                "chaos: injected save failure".to_string(),
            ));
        }
        self.store.save(event).await
    }

    async fn find_all(&self, page: PageRequest) -> EventStoreResult<Page<Event>> {
        self.read_guard("find_all")?;
        self.store.find_all(page).await
    }

    async fn find_from_id(
        &self,
        from: EventId,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>> {
        self.read_guard("find_from_id")?;
        self.store.find_from_id(from, page).await
    }

    async fn find_from_time(
        &self,
        from: Timestamp,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>> {
        self.read_guard("find_from_time")?;
        self.store.find_from_time(from, page).await
    }

    async fn find_from_id_and_time(
        &self,
        from_id: EventId,
        from_time: Timestamp,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>> {
        self.read_guard("find_from_id_and_time")?;
        self.store
            .find_from_id_and_time(from_id, from_time, page)
            .await
    }
}

impl<S> ChaosEventStoreExt for S
where
    S: EventStore,
{
    fn with_chaos(self, config: ChaosConfig) -> ChaosEventStore<Self> {
        ChaosEventStore::new(self, config)
    }
}
