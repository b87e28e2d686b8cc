//! crates/logging/src/verbosity.rs
//! Coarse verbosity levels derived from `-q` and repeated `-v` flags.

use std::fmt;

/// How much diagnostic output a binary emits on stderr.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings and errors. Degraded-codec warnings are visible here.
    #[default]
    Normal,
    /// Adds informational events (`-v`).
    Verbose,
    /// Adds pool and stream lifecycle events (`-vv`).
    Debug,
    /// Everything, including per-handle reuse (`-vvv` and beyond).
    Trace,
}

impl Verbosity {
    /// Maps a `-v` count to a level. `quiet` wins over any count.
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Returns the `tracing` level directive for this verbosity.
    #[must_use]
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_counts_map_progressively() {
        assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(2, false), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(3, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(9, false), Verbosity::Trace);
    }

    #[test]
    fn quiet_overrides_verbose() {
        assert_eq!(Verbosity::from_flags(3, true), Verbosity::Quiet);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(Verbosity::Quiet < Verbosity::Normal);
        assert!(Verbosity::Debug < Verbosity::Trace);
    }
}
