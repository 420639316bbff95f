#![forbid(unsafe_code)]

//! Subscriber setup for applications and tests (`tracing-json` feature).
//!
//! The library itself only emits `tracing` events. These helpers install a
//! global subscriber filtered by `RUST_LOG`, falling back to `default_filter`
//! when the variable is unset or invalid.
//!
//! | Target | Level | Events |
//! |--------|-------|--------|
//! | `uniflow_runtime::store` | debug | subscribe, unsubscribe, `uniflow.notify` spans |
//! | `uniflow_runtime::dispatch` | debug | `uniflow.dispatch` spans, reports |
//! | `uniflow_runtime::diagnostics` | warn | every recorded diagnostic |

use tracing_subscriber::EnvFilter;

fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a JSON-lines subscriber. Returns `false` if one was already set.
pub fn init_json(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_filter))
        .with_current_span(true)
        .try_init()
        .is_ok()
}

/// Install a human-readable subscriber. Returns `false` if one was already set.
pub fn init_pretty(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_filter))
        .with_target(true)
        .try_init()
        .is_ok()
}
