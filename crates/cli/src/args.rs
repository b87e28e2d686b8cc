//! Parsed command-line arguments.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::ArgMatches;

use crate::command::{PROGRAM_NAME, clap_command};

/// Subcommand selected on the command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Action {
    Compress {
        codec: Option<String>,
        level: Option<u32>,
        stream: bool,
        allow_degraded: bool,
        output: Option<PathBuf>,
        input: Option<PathBuf>,
    },
    Decompress {
        expect: Option<String>,
        output: Option<PathBuf>,
        input: Option<PathBuf>,
    },
    Detect {
        files: Vec<PathBuf>,
    },
    Estimate {
        codec: Option<String>,
        size: u64,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParsedArgs {
    pub(crate) verbose: u8,
    pub(crate) quiet: bool,
    pub(crate) action: Action,
}

/// Parses command-line arguments into a [`ParsedArgs`] structure.
pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();

    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command().try_get_matches_from(args)?;
    let verbose = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");

    let action = match matches.remove_subcommand() {
        Some((name, mut sub)) => match name.as_str() {
            "compress" => Action::Compress {
                codec: sub.remove_one::<String>("codec"),
                level: sub.remove_one::<u32>("level"),
                stream: sub.get_flag("stream"),
                allow_degraded: sub.get_flag("allow-degraded"),
                output: sub.remove_one::<PathBuf>("output"),
                input: sub.remove_one::<PathBuf>("input"),
            },
            "decompress" => Action::Decompress {
                expect: sub.remove_one::<String>("expect"),
                output: sub.remove_one::<PathBuf>("output"),
                input: sub.remove_one::<PathBuf>("input"),
            },
            "detect" => Action::Detect {
                files: remove_paths(&mut sub, "files"),
            },
            "estimate" => Action::Estimate {
                codec: sub.remove_one::<String>("codec"),
                size: sub.remove_one::<u64>("size").unwrap_or_default(),
            },
            other => {
                return Err(clap_command().error(
                    clap::error::ErrorKind::InvalidSubcommand,
                    format!("unrecognised subcommand '{other}'"),
                ));
            }
        },
        None => {
            return Err(clap_command().error(
                clap::error::ErrorKind::MissingSubcommand,
                "a subcommand is required",
            ));
        }
    };

    Ok(ParsedArgs {
        verbose,
        quiet,
        action,
    })
}

fn remove_paths(matches: &mut ArgMatches, id: &str) -> Vec<PathBuf> {
    matches
        .remove_many::<PathBuf>(id)
        .map(Iterator::collect)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_flags_are_collected() {
        let parsed = parse_args([
            "blobpress",
            "-vv",
            "compress",
            "--codec",
            "zstd",
            "--level",
            "7",
            "--stream",
            "--allow-degraded",
            "-o",
            "out.zst",
            "layer.tar",
        ])
        .expect("parse");
        assert_eq!(parsed.verbose, 2);
        assert!(!parsed.quiet);
        assert_eq!(
            parsed.action,
            Action::Compress {
                codec: Some("zstd".to_owned()),
                level: Some(7),
                stream: true,
                allow_degraded: true,
                output: Some(PathBuf::from("out.zst")),
                input: Some(PathBuf::from("layer.tar")),
            }
        );
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let parsed =
            parse_args(["blobpress", "decompress", "-q", "--expect", "gzip"]).expect("parse");
        assert!(parsed.quiet);
        assert_eq!(
            parsed.action,
            Action::Decompress {
                expect: Some("gzip".to_owned()),
                output: None,
                input: None,
            }
        );
    }

    #[test]
    fn detect_requires_a_file() {
        assert!(parse_args(["blobpress", "detect"]).is_err());
        let parsed = parse_args(["blobpress", "detect", "a", "b"]).expect("parse");
        assert_eq!(
            parsed.action,
            Action::Detect {
                files: vec![PathBuf::from("a"), PathBuf::from("b")],
            }
        );
    }

    #[test]
    fn estimate_size_must_be_numeric() {
        assert!(parse_args(["blobpress", "estimate", "lots"]).is_err());
        let parsed = parse_args(["blobpress", "estimate", "-c", "none", "42"]).expect("parse");
        assert_eq!(
            parsed.action,
            Action::Estimate {
                codec: Some("none".to_owned()),
                size: 42,
            }
        );
    }

    #[test]
    fn level_must_be_numeric() {
        let error =
            parse_args(["blobpress", "compress", "--level", "max"]).expect_err("not a number");
        assert_eq!(error.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
