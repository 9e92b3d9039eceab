use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use vent_types::utils::timestamp;

use crate::{RegisterCatalog, RunMode, SensorSnapshot, SensorValue, SharedBus};

/// Gap between consecutive reads, giving the device time to turn the line around.
pub const DEFAULT_READ_SPACING: Duration = Duration::from_millis(50);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub reads_attempted: u64,
    pub reads_failed: u64,
}

/// Reads every catalog register in order and assembles a [SensorSnapshot].
///
/// A failed read is left out of the snapshot and not retried until the next cycle.
pub struct PollingEngine {
    catalog: Arc<RegisterCatalog>,
    bus: SharedBus,
    read_spacing: Duration,
    stats: PollStats,
}

impl PollingEngine {
    pub fn new(catalog: Arc<RegisterCatalog>, bus: SharedBus) -> Self {
        Self {
            catalog,
            bus,
            read_spacing: DEFAULT_READ_SPACING,
            stats: PollStats::default(),
        }
    }

    pub fn with_read_spacing(mut self, read_spacing: Duration) -> Self {
        self.read_spacing = read_spacing;
        self
    }

    pub fn catalog(&self) -> &Arc<RegisterCatalog> {
        &self.catalog
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// Run one poll cycle.
    ///
    /// The bus is locked per read so actuator writes can interleave with a cycle.
    pub async fn poll(&mut self) -> SensorSnapshot {
        let catalog = self.catalog.clone();
        let mut snapshot = SensorSnapshot::begin(timestamp());

        for (idx, register) in catalog.iter().enumerate() {
            if idx > 0 && !self.read_spacing.is_zero() {
                tokio::time::sleep(self.read_spacing).await;
            }

            self.stats.reads_attempted += 1;
            let result = {
                let mut bus = self.bus.lock().await;
                bus.read_registers(register.address, 1).await
            };

            match result {
                Ok(words) => {
                    let sample = words.first().map(|raw| register.sample(*raw));
                    snapshot.record(&register.name, sample);
                }
                Err(e) => {
                    self.stats.reads_failed += 1;
                    warn!(
                        "Register read failed. name={} address={} error={e}",
                        register.name, register.address
                    );
                    snapshot.record(&register.name, None);
                }
            }
        }

        self.stats.cycles += 1;
        let snapshot = snapshot.finish();
        if snapshot.is_valid() {
            debug!(
                "Poll cycle complete. success={} total={}",
                snapshot.success_count(),
                snapshot.total_count()
            );
            if let Some(SensorValue::Raw(mode)) = snapshot.get("RunMode") {
                info!("Unit status. run_mode={}", RunMode::describe(mode));
            }
        } else {
            warn!(
                "Poll cycle produced no readings. total={}",
                snapshot.total_count()
            );
        }
        snapshot
    }
}
