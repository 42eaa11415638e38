/*!
 * Monitoring
 * Tracing setup and per-locker outcome counters
 */

mod stats;
mod tracer;

pub use stats::{LockerStats, StatsSnapshot};
pub use tracer::init_tracing;
