//! Logging setup
//!
//! `RUST_LOG` takes precedence over the configured level. The `json` format
//! emits one JSON object per event; anything else is the human-readable
//! pretty format.

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for a configured level, scoped to this crate
fn directive(level: &str) -> String {
    format!("trellis={level}")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(&config.level)));

    if config.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_is_scoped_to_the_crate() {
        assert_eq!(directive("debug"), "trellis=debug");
    }
}
