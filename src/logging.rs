//! Tracing subscriber setup for embedding hosts

use crate::config::schema::GeneralConfig;
use tracing_subscriber::EnvFilter;

/// Filter directive for a verbosity level: 0 = warn, 1 = info, 2+ = debug
pub fn filter_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "offline_agent=warn",
        1 => "offline_agent=info",
        _ => "offline_agent=debug",
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(config: &GeneralConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if config.log_format == "json" {
        builder.json().try_init()
    } else {
        builder.without_time().try_init()
    };

    result.is_ok()
}
