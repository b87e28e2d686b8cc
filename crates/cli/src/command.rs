//! `clap` command definition for `blobpress`.

use clap::{Arg, ArgAction, Command, value_parser};

/// Program name used in help and diagnostics.
pub const PROGRAM_NAME: &str = "blobpress";

/// Environment variable supplying `--codec` when the flag is absent.
pub const CODEC_ENV: &str = "BLOBPRESS_CODEC";

/// Environment variable supplying `--level` when the flag is absent.
pub const LEVEL_ENV: &str = "BLOBPRESS_LEVEL";

fn codec_arg(help: &'static str) -> Arg {
    Arg::new("codec")
        .long("codec")
        .short('c')
        .value_name("CODEC")
        .help(help)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .value_name("FILE")
        .value_parser(value_parser!(std::path::PathBuf))
        .help("Write to FILE instead of standard output.")
}

fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("FILE")
        .value_parser(value_parser!(std::path::PathBuf))
        .help("Read from FILE instead of standard input.")
}

/// Builds the `clap` command used for parsing.
pub fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compress, decompress, and inspect container image layer blobs.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("Increase diagnostic output; repeat for more.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .help("Only report errors.")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("compress")
                .about("Compress a blob with the selected codec.")
                .arg(codec_arg("One of gzip, zstd, none. Defaults to $BLOBPRESS_CODEC, then gzip."))
                .arg(
                    Arg::new("level")
                        .long("level")
                        .short('l')
                        .value_name("N")
                        .value_parser(value_parser!(u32))
                        .help("Codec level (gzip 1-9, zstd 1-22). Defaults to $BLOBPRESS_LEVEL."),
                )
                .arg(
                    Arg::new("stream")
                        .long("stream")
                        .help("Encode on a worker thread while writing output.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("allow-degraded")
                        .long("allow-degraded")
                        .help("Fall back to gzip when the codec is not available in this build.")
                        .action(ArgAction::SetTrue),
                )
                .arg(output_arg())
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("decompress")
                .about("Decompress a blob, detecting its codec from the content.")
                .arg(
                    Arg::new("expect")
                        .long("expect")
                        .value_name("CODEC")
                        .help("Fail unless the input is encoded with CODEC."),
                )
                .arg(output_arg())
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("detect")
                .about("Print the detected codec of each file.")
                .arg(
                    Arg::new("files")
                        .value_name("FILE")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            Command::new("estimate")
                .about("Predict the compressed size of SIZE bytes.")
                .arg(codec_arg("Codec to estimate for. Defaults to $BLOBPRESS_CODEC, then gzip."))
                .arg(
                    Arg::new("size")
                        .value_name("SIZE")
                        .required(true)
                        .value_parser(value_parser!(u64)),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        clap_command().debug_assert();
    }
}
