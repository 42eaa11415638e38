/*!
 * Structured Tracing
 * Subscriber setup for binaries embedding the locker
 *
 * The locker emits events only, no spans. Lock ownership is per thread, so
 * every line carries the thread name and id.
 */

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const JSON_ENV: &str = "ENTITY_LOCKER_TRACE_JSON";
const DEFAULT_DIRECTIVE: &str = "info";

fn json_requested() -> bool {
    matches!(
        std::env::var(JSON_ENV).as_deref(),
        Ok("1") | Ok("true")
    )
}

/// Install a global subscriber
///
/// `RUST_LOG` filters events (default `info`); `ENTITY_LOCKER_TRACE_JSON=1`
/// switches from compact text to one JSON object per line. A no-op if a
/// subscriber is already installed.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let json = json_requested();

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_thread_names(true)
            .with_thread_ids(true)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_names(true)
            .with_thread_ids(true)
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();

    if installed.is_ok() {
        info!(json, "Tracing initialized");
    }
}
