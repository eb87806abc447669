//! Periodic refresh of tracked entities.
//!
//! Each cycle takes a registry snapshot, resolves every slot, fetches the
//! current value and renames the slot. Failures are isolated per entity: a
//! bad fetch or a rejected rename only affects that entity for this tick.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, instrument, warn};
use tracing_futures::Instrument;

use crate::error::SlotError;
use crate::key::{EntityKey, SlotId};
use crate::price_client::{GasOracle, PriceSource, REQUEST_TIMEOUT};
use crate::registry::Registry;
use crate::render::{Rendered, render_gas, render_spot, render_spot_first};

/// Upper bound for one slot call. Platform clients may hold a request back
/// while a rate-limit bucket refills; past this bound the call counts as
/// rate limited.
pub const SLOT_TIMEOUT: Duration = REQUEST_TIMEOUT;

/// Externally managed, renameable label surface.
#[async_trait]
pub trait SlotDirectory: Send + Sync {
    /// Check the slot still exists. `SlotError::NotFound` deregisters it.
    async fn resolve(&self, slot: SlotId) -> Result<(), SlotError>;

    async fn rename(&self, slot: SlotId, name: &str) -> Result<(), SlotError>;
}

/// Counters for one tick of a cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub updated: usize,
    pub skipped: usize,
    pub removed: usize,
    pub rename_failed: usize,
    /// The previous tick of this cycle was still running; nothing was done.
    pub overlapped: bool,
}

impl TickReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Updated => self.updated += 1,
            Outcome::RenameFailed => self.rename_failed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Removed => self.removed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Updated,
    RenameFailed,
    Skipped,
    Removed,
}

pub struct Scheduler {
    registry: Arc<Registry>,
    slots: Arc<dyn SlotDirectory>,
    prices: Arc<dyn PriceSource>,
    gas: Arc<dyn GasOracle>,
    price_running: Mutex<()>,
    gas_running: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<Registry>,
        slots: Arc<dyn SlotDirectory>,
        prices: Arc<dyn PriceSource>,
        gas: Arc<dyn GasOracle>,
    ) -> Self {
        Self {
            registry,
            slots,
            prices,
            gas,
            price_running: Mutex::new(()),
            gas_running: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Register a spot entity and render it once right away.
    ///
    /// Returns the rendered label, or `None` when the first fetch failed; the
    /// entity stays registered either way and the next tick retries.
    #[instrument(skip_all, fields(entity = %key, slot = %slot))]
    pub async fn track_spot(&self, key: EntityKey, slot: SlotId) -> Option<Rendered> {
        let Some(symbol) = key.symbol() else {
            return self.track_gas(slot).await;
        };
        self.registry.add(key.clone(), slot);
        info!("tracking entity");

        let price = match self.prices.price(&symbol).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "initial fetch failed");
                return None;
            }
        };

        self.registry.set_last_value(&key, price);
        let rendered = render_spot_first(&key.asset, price);
        self.apply(slot, &rendered.label).await;
        Some(rendered)
    }

    /// Register the network-fee entity and render it once right away.
    #[instrument(skip_all, fields(slot = %slot))]
    pub async fn track_gas(&self, slot: SlotId) -> Option<Rendered> {
        let key = EntityKey::network_fee();
        self.registry.add(key.clone(), slot);
        info!("tracking network fee");

        let tiers = match self.gas.gas_tiers().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "initial gas fetch failed");
                return None;
            }
        };

        self.registry.set_last_value(&key, tiers.medium);
        let rendered = render_gas(&tiers);
        self.apply(slot, &rendered.label).await;
        Some(rendered)
    }

    /// Stop tracking `key`. Returns the slot it was displayed in, if any.
    pub fn untrack(&self, key: &EntityKey) -> Option<SlotId> {
        let slot = self.registry.remove(key);
        if slot.is_some() {
            info!(entity = %key, "untracked entity");
        }
        slot
    }

    /// One tick of the spot-price cycle.
    #[instrument(name = "price_tick", skip(self))]
    pub async fn run_price_tick(&self) -> TickReport {
        let Ok(_running) = self.price_running.try_lock() else {
            warn!("previous price tick still running, skipping");
            return TickReport {
                overlapped: true,
                ..TickReport::default()
            };
        };

        let entries: Vec<_> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|(key, _)| !key.is_network_fee())
            .collect();
        debug!(entities = entries.len(), "starting price tick");

        let mut report = TickReport::default();
        for (key, slot) in entries {
            let span = info_span!("refresh_spot", entity = %key, slot = %slot);
            let outcome = self.refresh_spot(&key, slot).instrument(span).await;
            report.record(outcome);
        }

        info!(
            updated = report.updated,
            skipped = report.skipped,
            removed = report.removed,
            rename_failed = report.rename_failed,
            "price tick completed"
        );
        report
    }

    /// One tick of the gas-fee cycle. The oracle is queried at most once.
    #[instrument(name = "gas_tick", skip(self))]
    pub async fn run_gas_tick(&self) -> TickReport {
        let Ok(_running) = self.gas_running.try_lock() else {
            warn!("previous gas tick still running, skipping");
            return TickReport {
                overlapped: true,
                ..TickReport::default()
            };
        };

        let mut report = TickReport::default();
        let mut live = Vec::new();
        for (key, slot) in self.registry.snapshot() {
            if !key.is_network_fee() {
                continue;
            }
            match self.resolve(&key, slot).await {
                Some(outcome) => report.record(outcome),
                None => live.push((key, slot)),
            }
        }

        if live.is_empty() {
            debug!("no gas slot tracked");
            return report;
        }

        let tiers = match self.gas.gas_tiers().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "gas fetch failed, skipping tick");
                report.skipped += live.len();
                return report;
            }
        };

        let rendered = render_gas(&tiers);
        for (key, slot) in live {
            self.registry.set_last_value(&key, tiers.medium);
            let outcome = if self.apply(slot, &rendered.label).await {
                Outcome::Updated
            } else {
                Outcome::RenameFailed
            };
            report.record(outcome);
        }

        info!(
            updated = report.updated,
            skipped = report.skipped,
            removed = report.removed,
            rename_failed = report.rename_failed,
            medium_gwei = tiers.medium,
            "gas tick completed"
        );
        report
    }

    async fn refresh_spot(&self, key: &EntityKey, slot: SlotId) -> Outcome {
        if let Some(outcome) = self.resolve(key, slot).await {
            return outcome;
        }

        let Some(symbol) = key.symbol() else {
            return Outcome::Skipped;
        };
        let current = match self.prices.price(&symbol).await {
            Ok(p) => p,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "fetch failed, keeping previous label");
                return Outcome::Skipped;
            }
        };

        let previous = self.registry.last_value_or(key, current);
        let rendered = render_spot(&key.asset, previous, current);
        if !self.registry.set_last_value(key, current) {
            debug!("entity removed during refresh");
            return Outcome::Skipped;
        }

        if self.apply(slot, &rendered.label).await {
            Outcome::Updated
        } else {
            Outcome::RenameFailed
        }
    }

    /// `None` when the slot is live; otherwise the outcome for this entity.
    async fn resolve(&self, key: &EntityKey, slot: SlotId) -> Option<Outcome> {
        match bounded(self.slots.resolve(slot)).await {
            Ok(()) => None,
            Err(SlotError::NotFound) => {
                warn!(entity = %key, slot = %slot, "display slot gone, removing entity");
                self.registry.remove(key);
                Some(Outcome::Removed)
            }
            Err(e) => {
                warn!(entity = %key, slot = %slot, error = %e, "could not resolve display slot");
                Some(Outcome::Skipped)
            }
        }
    }

    /// Rename `slot`; failures are logged and reported as `false`.
    async fn apply(&self, slot: SlotId, label: &str) -> bool {
        match bounded(self.slots.rename(slot, label)).await {
            Ok(()) => {
                info!(slot = %slot, label, "display slot updated");
                true
            }
            Err(e) => {
                warn!(slot = %slot, label, error = %e, "rename failed");
                false
            }
        }
    }
}

async fn bounded<F>(call: F) -> Result<(), SlotError>
where
    F: Future<Output = Result<(), SlotError>>,
{
    tokio::time::timeout(SLOT_TIMEOUT, call)
        .await
        .unwrap_or(Err(SlotError::RateLimited))
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use parking_lot::Mutex as SyncMutex;

    use super::*;
    use crate::error::FetchError;
    use crate::price_client::{GasTiers, MockGasOracle, MockPriceSource};

    #[derive(Default)]
    struct FakeSlots {
        names: SyncMutex<HashMap<SlotId, String>>,
        missing: SyncMutex<HashSet<SlotId>>,
        forbidden: HashSet<SlotId>,
        slow_resolve: HashSet<SlotId>,
        slow_rename: HashSet<SlotId>,
    }

    #[async_trait]
    impl SlotDirectory for FakeSlots {
        async fn resolve(&self, slot: SlotId) -> Result<(), SlotError> {
            if self.slow_resolve.contains(&slot) {
                tokio::time::sleep(Duration::from_secs(600)).await;
            }
            if self.missing.lock().contains(&slot) {
                return Err(SlotError::NotFound);
            }
            Ok(())
        }

        async fn rename(&self, slot: SlotId, name: &str) -> Result<(), SlotError> {
            if self.forbidden.contains(&slot) {
                return Err(SlotError::Forbidden);
            }
            if self.slow_rename.contains(&slot) {
                tokio::time::sleep(Duration::from_secs(600)).await;
            }
            self.names.lock().insert(slot, name.to_string());
            Ok(())
        }
    }

    impl FakeSlots {
        fn name(&self, slot: SlotId) -> Option<String> {
            self.names.lock().get(&slot).cloned()
        }
    }

    fn no_gas() -> MockGasOracle {
        let mut gas = MockGasOracle::new();
        gas.expect_gas_tiers().never();
        gas
    }

    fn scheduler(
        slots: Arc<FakeSlots>,
        prices: MockPriceSource,
        gas: MockGasOracle,
    ) -> Scheduler {
        Scheduler::new(
            Arc::new(Registry::new()),
            slots,
            Arc::new(prices),
            Arc::new(gas),
        )
    }

    #[tokio::test]
    async fn track_spot_renders_immediately_as_up() {
        let slots = Arc::new(FakeSlots::default());
        let mut prices = MockPriceSource::new();
        prices
            .expect_price()
            .times(1)
            .returning(|symbol| {
                assert_eq!(symbol, "BTCUSDT");
                Ok(64_000.0)
            });
        let sched = scheduler(slots.clone(), prices, no_gas());

        let key = EntityKey::spot("BTC", "USDT");
        let rendered = sched.track_spot(key.clone(), SlotId(7)).await.unwrap();

        assert_eq!(rendered.label, "🟢 ↗️ BTC: $64,000.00");
        assert_eq!(slots.name(SlotId(7)).as_deref(), Some("🟢 ↗️ BTC: $64,000.00"));
        assert_eq!(sched.registry().last_value(&key), Some(64_000.0));
    }

    #[tokio::test]
    async fn track_spot_keeps_entity_when_first_fetch_fails() {
        let slots = Arc::new(FakeSlots::default());
        let mut prices = MockPriceSource::new();
        prices
            .expect_price()
            .returning(|_| Err(FetchError::Status(503)));
        let sched = scheduler(slots.clone(), prices, no_gas());

        let key = EntityKey::spot("ETH", "EUR");
        assert!(sched.track_spot(key.clone(), SlotId(1)).await.is_none());
        assert_eq!(sched.registry().slot(&key), Some(SlotId(1)));
        assert!(slots.name(SlotId(1)).is_none());
    }

    #[tokio::test]
    async fn price_tick_renders_against_previous_value() {
        let slots = Arc::new(FakeSlots::default());
        let mut prices = MockPriceSource::new();
        prices.expect_price().returning(|_| Ok(65_000.0));
        let sched = scheduler(slots.clone(), prices, no_gas());

        let key = EntityKey::spot("BTC", "USDT");
        sched.registry().add(key.clone(), SlotId(1));
        sched.registry().set_last_value(&key, 64_000.0);

        let report = sched.run_price_tick().await;

        assert_eq!(report.updated, 1);
        assert_eq!(slots.name(SlotId(1)).as_deref(), Some("🟢 ↗️ BTC: $65,000.00"));
        assert_eq!(sched.registry().last_value(&key), Some(65_000.0));
    }

    #[tokio::test]
    async fn first_tick_without_history_is_down() {
        let slots = Arc::new(FakeSlots::default());
        let mut prices = MockPriceSource::new();
        prices.expect_price().returning(|_| Ok(2.5));
        let sched = scheduler(slots.clone(), prices, no_gas());
        sched.registry().add(EntityKey::spot("ADA", "BRL"), SlotId(3));

        sched.run_price_tick().await;

        assert_eq!(slots.name(SlotId(3)).as_deref(), Some("🔴 ↘️ ADA: $2.50"));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_entity_untouched() {
        let slots = Arc::new(FakeSlots::default());
        let mut prices = MockPriceSource::new();
        prices.expect_price().returning(|symbol| match symbol {
            "DOGEUSDT" => Err(FetchError::MissingField("price")),
            _ => Ok(150.0),
        });
        let sched = scheduler(slots.clone(), prices, no_gas());

        let doge = EntityKey::spot("DOGE", "USDT");
        let sol = EntityKey::spot("SOL", "USDT");
        sched.registry().add(doge.clone(), SlotId(1));
        sched.registry().set_last_value(&doge, 0.1);
        sched.registry().add(sol.clone(), SlotId(2));

        let report = sched.run_price_tick().await;

        assert_eq!((report.updated, report.skipped), (1, 1));
        assert!(slots.name(SlotId(1)).is_none());
        assert_eq!(sched.registry().last_value(&doge), Some(0.1));
        assert_eq!(slots.name(SlotId(2)).as_deref(), Some("🔴 ↘️ SOL: $150.00"));
    }

    #[tokio::test]
    async fn missing_slot_is_deregistered_without_fetching() {
        let slots = Arc::new(FakeSlots::default());
        slots.missing.lock().insert(SlotId(9));
        let mut prices = MockPriceSource::new();
        prices.expect_price().never();
        let sched = scheduler(slots, prices, no_gas());

        let key = EntityKey::spot("AAVE", "USDT");
        sched.registry().add(key.clone(), SlotId(9));
        sched.registry().set_last_value(&key, 90.0);

        let report = sched.run_price_tick().await;

        assert_eq!(report.removed, 1);
        assert!(sched.registry().is_empty());
        assert!(sched.registry().last_value(&key).is_none());
    }

    #[tokio::test]
    async fn rename_failure_still_records_value() {
        let slots = Arc::new(FakeSlots {
            forbidden: HashSet::from([SlotId(4)]),
            ..FakeSlots::default()
        });
        let mut prices = MockPriceSource::new();
        prices.expect_price().returning(|_| Ok(3_000.0));
        let sched = scheduler(slots, prices, no_gas());

        let key = EntityKey::spot("ETH", "USDT");
        sched.registry().add(key.clone(), SlotId(4));

        let report = sched.run_price_tick().await;

        assert_eq!(report.rename_failed, 1);
        assert_eq!(sched.registry().last_value(&key), Some(3_000.0));
        assert_eq!(sched.registry().slot(&key), Some(SlotId(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn held_back_rename_does_not_stall_the_tick() {
        let slots = Arc::new(FakeSlots {
            slow_rename: HashSet::from([SlotId(1)]),
            ..FakeSlots::default()
        });
        let mut prices = MockPriceSource::new();
        prices.expect_price().returning(|_| Ok(100.0));
        let sched = scheduler(slots.clone(), prices, no_gas());
        sched.registry().add(EntityKey::spot("BTC", "USDT"), SlotId(1));
        sched.registry().add(EntityKey::spot("ETH", "USDT"), SlotId(2));

        let started = tokio::time::Instant::now();
        let report = sched.run_price_tick().await;

        assert_eq!((report.updated, report.rename_failed), (1, 1));
        assert_eq!(started.elapsed(), SLOT_TIMEOUT);
        assert_eq!(slots.name(SlotId(2)).as_deref(), Some("🔴 ↘️ ETH: $100.00"));
        assert_eq!(sched.registry().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn held_back_resolve_skips_entity() {
        let slots = Arc::new(FakeSlots {
            slow_resolve: HashSet::from([SlotId(3)]),
            ..FakeSlots::default()
        });
        let mut prices = MockPriceSource::new();
        prices.expect_price().never();
        let sched = scheduler(slots, prices, no_gas());
        sched.registry().add(EntityKey::spot("SOL", "EUR"), SlotId(3));

        let report = sched.run_price_tick().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(sched.registry().slot(&EntityKey::spot("SOL", "EUR")), Some(SlotId(3)));
    }

    #[tokio::test]
    async fn track_spot_with_fee_key_tracks_gas() {
        let slots = Arc::new(FakeSlots::default());
        let mut prices = MockPriceSource::new();
        prices.expect_price().never();
        let mut gas = MockGasOracle::new();
        gas.expect_gas_tiers().times(1).returning(|| {
            Ok(GasTiers {
                low: 1.0,
                medium: 2.0,
                high: 3.0,
            })
        });
        let sched = scheduler(slots.clone(), prices, gas);

        let rendered = sched
            .track_spot(EntityKey::network_fee(), SlotId(6))
            .await
            .unwrap();

        assert_eq!(rendered.label, "🟢 ↘️ GAS: 2.00 Gwei");
        assert_eq!(sched.registry().slot(&EntityKey::network_fee()), Some(SlotId(6)));
    }

    #[tokio::test]
    async fn price_tick_ignores_gas_entity() {
        let slots = Arc::new(FakeSlots::default());
        let mut prices = MockPriceSource::new();
        prices.expect_price().never();
        let sched = scheduler(slots.clone(), prices, no_gas());
        sched.registry().add(EntityKey::network_fee(), SlotId(5));

        let report = sched.run_price_tick().await;

        assert_eq!(report, TickReport::default());
        assert!(slots.name(SlotId(5)).is_none());
    }

    #[tokio::test]
    async fn gas_tick_queries_oracle_once_and_keeps_medium_tier() {
        let slots = Arc::new(FakeSlots::default());
        let mut prices = MockPriceSource::new();
        prices.expect_price().never();
        let mut gas = MockGasOracle::new();
        gas.expect_gas_tiers().times(1).returning(|| {
            Ok(GasTiers {
                low: 5.0,
                medium: 6.0,
                high: 9.0,
            })
        });
        let sched = scheduler(slots.clone(), prices, gas);
        sched.registry().add(EntityKey::network_fee(), SlotId(8));
        sched.registry().add(EntityKey::spot("BTC", "USDT"), SlotId(1));

        let report = sched.run_gas_tick().await;

        assert_eq!(report.updated, 1);
        assert_eq!(slots.name(SlotId(8)).as_deref(), Some("🟢 ↘️ GAS: 6.00 Gwei"));
        assert!(slots.name(SlotId(1)).is_none());
        assert_eq!(
            sched.registry().last_value(&EntityKey::network_fee()),
            Some(6.0)
        );
    }

    #[tokio::test]
    async fn gas_tick_without_slot_does_not_query_oracle() {
        let sched = scheduler(
            Arc::new(FakeSlots::default()),
            MockPriceSource::new(),
            no_gas(),
        );
        assert_eq!(sched.run_gas_tick().await, TickReport::default());
    }

    #[tokio::test]
    async fn gas_tick_removes_deleted_slot() {
        let slots = Arc::new(FakeSlots::default());
        slots.missing.lock().insert(SlotId(8));
        let sched = scheduler(slots, MockPriceSource::new(), no_gas());
        sched.registry().add(EntityKey::network_fee(), SlotId(8));

        let report = sched.run_gas_tick().await;

        assert_eq!(report.removed, 1);
        assert!(sched.registry().is_empty());
    }

    #[tokio::test]
    async fn untrack_removes_entity() {
        let sched = scheduler(
            Arc::new(FakeSlots::default()),
            MockPriceSource::new(),
            no_gas(),
        );
        let key = EntityKey::spot("XRP", "EUR");
        sched.registry().add(key.clone(), SlotId(2));

        assert_eq!(sched.untrack(&key), Some(SlotId(2)));
        assert_eq!(sched.untrack(&key), None);
    }
}
