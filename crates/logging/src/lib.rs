#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` turns the command-line verbosity flags of the blobpress binaries
//! into a `tracing` subscriber. Library crates emit events through `tracing`
//! macros on stable targets (`compress::codec`, `compress::pool`,
//! `compress::stream`); this crate decides which of those reach stderr.
//!
//! # Design
//!
//! - [`Verbosity`] is the coarse level built from `-q` and repeated `-v`.
//! - [`VerbosityConfig`] adds an optional raw filter directive, normally taken
//!   from the `BLOBPRESS_LOG` environment variable, that overrides the level.
//! - `init_tracing` (behind the `tracing` feature) installs a registry with an
//!   `EnvFilter` and a `fmt` layer writing to stderr.
//!
//! # Examples
//!
//! ```
//! use logging::{Verbosity, VerbosityConfig};
//!
//! let config = VerbosityConfig::from_verbose_level(1);
//! assert_eq!(config.verbosity, Verbosity::Verbose);
//! assert_eq!(config.filter_directive(), "info");
//! ```

mod config;
#[cfg(feature = "tracing")]
mod tracing_bridge;
mod verbosity;

pub use config::{LOG_ENV, VerbosityConfig};
#[cfg(feature = "tracing")]
pub use tracing_bridge::{build_filter, init_tracing, try_init_tracing};
pub use verbosity::Verbosity;
