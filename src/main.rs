/*!
 * Entity Locker - Demo Workload
 *
 * Hammers a set of entity counters from many threads, each read-modify-write
 * done under the entity's lock, then checks that no update was lost.
 *
 * Usage: entity-locker-demo [config.json]
 */

use anyhow::{bail, Context, Result};
use entity_locker::{
    init_tracing, EntityLocker, HashingConfig, HashingEntityLocker, MapConfig, MapEntityLocker,
    StatsSnapshot,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Strategy {
    Map,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct DemoConfig {
    strategy: Strategy,
    map: MapConfig,
    hashing: HashingConfig,
    threads: usize,
    entities: u64,
    iterations: u64,
    /// Every n-th acquisition uses a timed lock
    timed_every: u64,
    timeout_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Map,
            map: MapConfig::default(),
            hashing: HashingConfig::default(),
            threads: 8,
            entities: 64,
            iterations: 10_000,
            timed_every: 4,
            timeout_ms: 50,
        }
    }
}

fn load_config() -> Result<DemoConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("Invalid config file {}", path))
        }
        None => Ok(DemoConfig::default()),
    }
}

/// Per-entity counters updated with a deliberately non-atomic read-then-write
struct Counters {
    values: Vec<AtomicU64>,
}

impl Counters {
    fn new(entities: u64) -> Self {
        Self {
            values: (0..entities).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn bump(&self, id: u64) {
        let slot = &self.values[id as usize];
        let current = slot.load(Ordering::Relaxed);
        thread::yield_now();
        slot.store(current + 1, Ordering::Relaxed);
    }

    fn total(&self) -> u64 {
        self.values.iter().map(|v| v.load(Ordering::Relaxed)).sum()
    }
}

fn run<L>(locker: Arc<L>, config: &DemoConfig) -> Result<u64>
where
    L: EntityLocker<u64> + 'static,
{
    let counters = Arc::new(Counters::new(config.entities));
    let timeouts = Arc::new(AtomicU64::new(0));
    let timeout = Duration::from_millis(config.timeout_ms);

    let handles: Vec<_> = (0..config.threads as u64)
        .map(|t| {
            let locker = locker.clone();
            let counters = counters.clone();
            let timeouts = timeouts.clone();
            let (entities, iterations, timed_every) =
                (config.entities, config.iterations, config.timed_every);

            thread::Builder::new()
                .name(format!("worker-{}", t))
                .spawn(move || -> entity_locker::LockResult<()> {
                    for i in 0..iterations {
                        let id = (t * 31 + i * 17) % entities;
                        if timed_every > 0 && i % timed_every == 0 {
                            match locker.try_lock_guard_for(&id, timeout)? {
                                Some(_guard) => counters.bump(id),
                                None => {
                                    timeouts.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        } else {
                            locker.with_lock(&id, || counters.bump(id))?;
                        }
                    }
                    Ok(())
                })
        })
        .collect::<std::io::Result<_>>()
        .context("Failed to spawn worker thread")?;

    for handle in handles {
        match handle.join() {
            Ok(result) => result?,
            Err(_) => bail!("Worker thread panicked"),
        }
    }

    let expected = config.threads as u64 * config.iterations - timeouts.load(Ordering::Relaxed);
    let total = counters.total();
    if total != expected {
        bail!("Lost updates: expected {}, counted {}", expected, total);
    }
    Ok(total)
}

fn report(strategy: Strategy, total: u64, elapsed: Duration, stats: StatsSnapshot) -> Result<()> {
    info!(
        ?strategy,
        total,
        elapsed_ms = elapsed.as_millis() as u64,
        "Workload complete, no lost updates"
    );
    info!(stats = %serde_json::to_string(&stats)?, "Locker statistics");
    if stats.timed_out > 0 {
        warn!(timed_out = stats.timed_out, "Some timed acquisitions gave up");
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();

    let config = load_config()?;
    if config.entities == 0 {
        bail!("entities must be more than 0");
    }
    info!(?config, "Entity locker demo starting");

    let start = Instant::now();
    match config.strategy {
        Strategy::Map => {
            let locker = Arc::new(MapEntityLocker::<u64>::with_config(config.map));
            let total = run(locker.clone(), &config)?;
            report(config.strategy, total, start.elapsed(), locker.stats())?;
            info!(active_locks = locker.active_locks(), "Map entries left behind");
        }
        Strategy::Hashing => {
            let locker = Arc::new(HashingEntityLocker::<u64>::with_config(config.hashing)?);
            info!(slot_count = locker.slot_count(), "Hashing locker ready");
            let total = run(locker.clone(), &config)?;
            report(config.strategy, total, start.elapsed(), locker.stats())?;
        }
    }

    Ok(())
}
