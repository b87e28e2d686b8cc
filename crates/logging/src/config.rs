//! crates/logging/src/config.rs
//! Verbosity configuration plus the optional filter override.

use super::verbosity::Verbosity;

/// Environment variable whose value replaces the verbosity-derived filter.
pub const LOG_ENV: &str = "BLOBPRESS_LOG";

/// Settings consumed by [`init_tracing`](crate::init_tracing).
#[derive(Clone, Default, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// Level derived from command-line flags.
    pub verbosity: Verbosity,
    /// Raw `EnvFilter` directive that, when set, takes precedence over
    /// [`verbosity`](Self::verbosity).
    pub filter_override: Option<String>,
}

impl VerbosityConfig {
    /// Creates a configuration from a `-v` count (0-3+).
    #[must_use]
    pub const fn from_verbose_level(level: u8) -> Self {
        Self {
            verbosity: Verbosity::from_flags(level, false),
            filter_override: None,
        }
    }

    /// Creates a configuration that only reports errors.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            verbosity: Verbosity::Quiet,
            filter_override: None,
        }
    }

    /// Sets the filter override. Blank directives are ignored.
    #[must_use]
    pub fn with_filter_override(mut self, directive: Option<String>) -> Self {
        self.filter_override = directive
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());
        self
    }

    /// Applies [`LOG_ENV`] from the process environment.
    #[must_use]
    pub fn with_env_override(self) -> Self {
        self.with_filter_override(std::env::var(LOG_ENV).ok())
    }

    /// Returns the directive the subscriber will be built from.
    #[must_use]
    pub fn filter_directive(&self) -> &str {
        self.filter_override
            .as_deref()
            .unwrap_or_else(|| self.verbosity.as_directive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_warn() {
        assert_eq!(VerbosityConfig::default().filter_directive(), "warn");
    }

    #[test]
    fn override_wins_over_level() {
        let config = VerbosityConfig::from_verbose_level(2)
            .with_filter_override(Some("compress::pool=trace".to_owned()));
        assert_eq!(config.filter_directive(), "compress::pool=trace");
    }

    #[test]
    fn blank_override_is_ignored() {
        let config = VerbosityConfig::quiet().with_filter_override(Some("  ".to_owned()));
        assert_eq!(config.filter_override, None);
        assert_eq!(config.filter_directive(), "error");
    }
}
