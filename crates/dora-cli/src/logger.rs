//! Logging setup on the `tracing` ecosystem.
//!
//! Verbosity resolution order: `--verbose` (debug for dora crates), then
//! `--quiet` (errors only), then `RUST_LOG`, then info.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATES: [&str; 7] = [
    "dora",
    "dora_graph",
    "dora_store",
    "dora_queue",
    "dora_analyzer",
    "dora_ingest",
    "dora_cli",
];

fn filter_at(level: &str) -> EnvFilter {
    let directives = CRATES
        .iter()
        .map(|c| format!("{c}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Initialize the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        filter_at("debug")
    } else if quiet {
        filter_at("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_at("info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_build_without_panicking() {
        let _ = filter_at("debug");
        let _ = filter_at("error");
        let _ = filter_at("info");
    }
}
