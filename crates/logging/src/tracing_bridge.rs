//! crates/logging/src/tracing_bridge.rs
//! Installs a `tracing-subscriber` stack driven by [`VerbosityConfig`].
//!
//! Events are written to stderr by a `fmt` layer and filtered by an
//! [`EnvFilter`] built from [`VerbosityConfig::filter_directive`]. An invalid
//! override directive falls back to the verbosity level instead of failing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! init_tracing(VerbosityConfig::from_verbose_level(2).with_env_override());
//! tracing::debug!(target: "compress::pool", "pool: created handle");
//! ```

use super::config::VerbosityConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Builds the event filter for `config`.
#[must_use]
pub fn build_filter(config: &VerbosityConfig) -> EnvFilter {
    EnvFilter::try_new(config.filter_directive())
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.as_directive()))
}

/// Installs the global subscriber, failing if one is already set.
pub fn try_init_tracing(config: &VerbosityConfig) -> Result<(), TryInitError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer)
        .try_init()
}

/// Installs the global subscriber. A subscriber installed earlier is kept.
pub fn init_tracing(config: VerbosityConfig) {
    let _ = try_init_tracing(&config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Verbosity;

    #[test]
    fn filter_follows_verbosity() {
        let filter = build_filter(&VerbosityConfig::from_verbose_level(2));
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn invalid_override_falls_back_to_level() {
        let config = VerbosityConfig {
            verbosity: Verbosity::Verbose,
            filter_override: Some("compress::pool=notalevel".to_owned()),
        };
        assert_eq!(build_filter(&config).to_string(), "info");
    }

    #[test]
    fn second_install_is_rejected() {
        init_tracing(VerbosityConfig::quiet());
        assert!(try_init_tracing(&VerbosityConfig::quiet()).is_err());
    }
}
