#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the `blobpress` command: compress, decompress, sniff, and
//! size-estimate container image layer blobs with the [`compress`] crate.
//! The entry point is [`run`], which takes the argument list and the three
//! standard streams explicitly so that tests can drive it in-process.
//!
//! # Exit codes
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | invalid arguments or configuration |
//! | 2 | corrupt input or encoder failure |
//! | 3 | codec not available in this build |
//! | 4 | input or output file error |
//!
//! # Environment
//!
//! `BLOBPRESS_CODEC` and `BLOBPRESS_LEVEL` supply defaults for `--codec` and
//! `--level`. `BLOBPRESS_LOG` replaces the `-v`/`-q` derived log filter.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(
//!     ["blobpress", "estimate", "--codec", "gzip", "1000"],
//!     std::io::empty(),
//!     &mut stdout,
//!     &mut stderr,
//! );
//! assert_eq!(status, 0);
//! assert_eq!(String::from_utf8(stdout).unwrap(), "400\n");
//! ```

mod args;
mod command;
mod execute;
mod failure;

use std::ffi::OsString;
use std::io::{Read, Write};

use clap::error::ErrorKind;

pub use command::{CODEC_ENV, LEVEL_ENV, PROGRAM_NAME, clap_command};
pub use failure::{EXIT_CODEC, EXIT_IO, EXIT_OK, EXIT_UNSUPPORTED, EXIT_USAGE, Failure};

/// Runs `blobpress` against the process environment.
///
/// Returns the exit code the process should terminate with.
pub fn run<I, S, In, Out, Err>(arguments: I, stdin: In, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    In: Read + Send + 'static,
    Out: Write,
    Err: Write,
{
    run_with_env(arguments, |key| std::env::var(key).ok(), stdin, stdout, stderr)
}

/// Runs `blobpress`, resolving environment defaults through `env`.
pub fn run_with_env<I, S, E, In, Out, Err>(
    arguments: I,
    env: E,
    stdin: In,
    stdout: &mut Out,
    stderr: &mut Err,
) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    E: Fn(&str) -> Option<String>,
    In: Read + Send + 'static,
    Out: Write,
    Err: Write,
{
    let parsed = match args::parse_args(arguments) {
        Ok(parsed) => parsed,
        Err(error) => return report_clap_error(&error, stdout, stderr),
    };

    init_logging(parsed.verbose, parsed.quiet, &env);

    match execute::execute(parsed.action, &env, stdin, stdout, stderr) {
        Ok(()) => EXIT_OK,
        Err(failure) => {
            tracing::debug!(exit_code = failure.exit_code(), "command failed");
            let _ = writeln!(stderr, "{PROGRAM_NAME}: error: {failure}");
            failure.exit_code()
        }
    }
}

fn report_clap_error<Out: Write, Err: Write>(
    error: &clap::Error,
    stdout: &mut Out,
    stderr: &mut Err,
) -> i32 {
    let rendered = error.render().to_string();
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = stdout.write_all(rendered.as_bytes());
            EXIT_OK
        }
        _ => {
            let _ = stderr.write_all(rendered.as_bytes());
            EXIT_USAGE
        }
    }
}

fn init_logging<E: Fn(&str) -> Option<String>>(verbose: u8, quiet: bool, env: &E) {
    let config = logging::VerbosityConfig {
        verbosity: logging::Verbosity::from_flags(verbose, quiet),
        filter_override: None,
    }
    .with_filter_override(env(logging::LOG_ENV));
    logging::init_tracing(config);
}
