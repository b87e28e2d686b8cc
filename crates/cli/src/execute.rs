//! Subcommand handlers.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use compress::{
    CodecId, CompressReader, CompressionLevel, Compressor, CompressorConfig, FallbackPolicy,
    algorithm::MAX_SIGNATURE_LEN, detect_algorithm, estimate,
};

use crate::args::Action;
use crate::command::{CODEC_ENV, LEVEL_ENV};
use crate::failure::Failure;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

pub(crate) fn execute<E, In, Out, Err>(
    action: Action,
    env: &E,
    stdin: In,
    stdout: &mut Out,
    stderr: &mut Err,
) -> Result<(), Failure>
where
    E: Fn(&str) -> Option<String>,
    In: Read + Send + 'static,
    Out: Write,
    Err: Write,
{
    match action {
        Action::Compress {
            codec,
            level,
            stream,
            allow_degraded,
            output,
            input,
        } => {
            let codec = resolve_codec(codec, env)?;
            let level = resolve_level(codec, level, env)?;
            let fallback = if allow_degraded {
                FallbackPolicy::Degrade
            } else {
                FallbackPolicy::Reject
            };
            let config = CompressorConfig::new(codec)
                .with_level(level)
                .with_streaming(stream)
                .with_fallback(fallback);
            let compressor = Compressor::new(config)?;
            if compressor.is_degraded() {
                let _ = writeln!(
                    stderr,
                    "warning: {codec} is not available in this build; compressing with {}",
                    compressor.effective_algorithm()
                );
            }
            let source = open_input(input.as_deref(), stdin)?;
            let reader = compressor.compress_reader(source)?;
            with_output(output.as_deref(), stdout, |sink| {
                compress_into(reader, sink, input.as_deref())
            })
        }
        Action::Decompress {
            expect,
            output,
            input,
        } => {
            let expected = expect.as_deref().map(parse_codec).transpose()?;
            let compressor = Compressor::new(CompressorConfig::default())?;
            let source = open_input(input.as_deref(), stdin)?;
            let mut reader = compressor.open_decompress_stream(source);
            if let Some(codec) = expected {
                reader = reader.expecting(codec);
            }
            with_output(output.as_deref(), stdout, |sink| {
                let written = copy(&mut reader, sink, input.as_deref())?;
                tracing::debug!(
                    codec = %reader.detected().unwrap_or(CodecId::None),
                    bytes_in = reader.bytes_in(),
                    bytes_out = written,
                    "decompressed"
                );
                Ok(())
            })
        }
        Action::Detect { files } => detect(&files, stdout, stderr),
        Action::Estimate { codec, size } => {
            let codec = resolve_codec(codec, env)?;
            writeln!(stdout, "{}", estimate(codec, size))
                .map_err(|error| Failure::io("standard output", error))
        }
    }
}

fn parse_codec(value: &str) -> Result<CodecId, Failure> {
    value
        .parse::<CodecId>()
        .map_err(|error| Failure::Usage(error.to_string()))
}

fn resolve_codec<E: Fn(&str) -> Option<String>>(
    flag: Option<String>,
    env: &E,
) -> Result<CodecId, Failure> {
    match flag {
        Some(value) => parse_codec(&value),
        None => match env(CODEC_ENV) {
            Some(value) => value
                .parse::<CodecId>()
                .map_err(|error| Failure::Usage(format!("{CODEC_ENV}: {error}"))),
            None => Ok(CodecId::default()),
        },
    }
}

fn resolve_level<E: Fn(&str) -> Option<String>>(
    codec: CodecId,
    flag: Option<u32>,
    env: &E,
) -> Result<CompressionLevel, Failure> {
    let numeric = match flag {
        Some(level) => level,
        None => match env(LEVEL_ENV) {
            Some(value) => value.trim().parse::<u32>().map_err(|_| {
                Failure::Usage(format!("{LEVEL_ENV}: invalid compression level '{value}'"))
            })?,
            None => return Ok(CompressionLevel::Default),
        },
    };
    CompressionLevel::for_codec(codec, numeric).map_err(|error| Failure::Usage(error.to_string()))
}

fn open_input<In>(path: Option<&Path>, stdin: In) -> Result<Box<dyn Read + Send>, Failure>
where
    In: Read + Send + 'static,
{
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|error| Failure::path(path, error))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(stdin)),
    }
}

/// Runs `body` against the requested output, removing a partially written
/// file when it fails.
fn with_output<Out, F>(path: Option<&Path>, stdout: &mut Out, body: F) -> Result<(), Failure>
where
    Out: Write,
    F: FnOnce(&mut dyn Write) -> Result<(), Failure>,
{
    let Some(path) = path else {
        body(&mut *stdout)?;
        return stdout
            .flush()
            .map_err(|error| Failure::io("standard output", error));
    };

    let file = File::create(path).map_err(|error| Failure::path(path, error))?;
    let mut writer = BufWriter::new(file);
    let result = body(&mut writer).and_then(|()| {
        writer
            .flush()
            .map_err(|error| Failure::path(path, error))
    });
    if result.is_err() {
        drop(writer);
        if let Err(error) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), %error, "failed to remove partial output");
        }
    }
    result
}

fn compress_into(
    mut reader: CompressReader,
    sink: &mut dyn Write,
    input: Option<&Path>,
) -> Result<(), Failure> {
    let written = copy(&mut reader, sink, input)?;
    if let CompressReader::Streaming(stream) = &mut reader {
        let outcome = stream
            .close()
            .map_err(|error| Failure::io(input_label(input), error))?;
        tracing::debug!(
            codec = %stream.codec(),
            bytes_in = stream.bytes_in(),
            bytes_out = written,
            ?outcome,
            "compressed"
        );
    } else {
        tracing::debug!(bytes_out = written, "compressed");
    }
    Ok(())
}

fn input_label(input: Option<&Path>) -> String {
    input.map_or_else(|| "standard input".to_owned(), |path| path.display().to_string())
}

/// Copies `reader` to `writer`, attributing failures to the side that raised them.
fn copy<R: Read + ?Sized>(
    reader: &mut R,
    writer: &mut dyn Write,
    input: Option<&Path>,
) -> Result<u64, Failure> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(Failure::io(input_label(input), error)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|error| Failure::io("output", error))?;
        total += read as u64;
    }
}

fn detect<Out: Write, Err: Write>(
    files: &[PathBuf],
    stdout: &mut Out,
    stderr: &mut Err,
) -> Result<(), Failure> {
    let mut first_failure = None;
    for path in files {
        match sniff_file(path) {
            Ok(codec) => writeln!(stdout, "{codec}\t{}", path.display())
                .map_err(|error| Failure::io("standard output", error))?,
            Err(failure) => {
                let _ = writeln!(stderr, "{}: error: {failure}", crate::PROGRAM_NAME);
                first_failure.get_or_insert(failure);
            }
        }
    }
    first_failure.map_or(Ok(()), Err)
}

fn sniff_file(path: &Path) -> Result<CodecId, Failure> {
    let file = File::open(path).map_err(|error| Failure::path(path, error))?;
    let mut prefix = Vec::with_capacity(MAX_SIGNATURE_LEN);
    file.take(MAX_SIGNATURE_LEN as u64)
        .read_to_end(&mut prefix)
        .map_err(|error| Failure::path(path, error))?;
    Ok(detect_algorithm(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn codec_flag_wins_over_environment() {
        let env = env_with(&[(CODEC_ENV, "zstd")]);
        assert_eq!(resolve_codec(Some("none".to_owned()), &env).unwrap(), CodecId::None);
        assert_eq!(resolve_codec(None, &env).unwrap(), CodecId::Zstd);
        assert_eq!(resolve_codec(None, &env_with(&[])).unwrap(), CodecId::Gzip);
    }

    #[test]
    fn invalid_environment_codec_is_a_usage_error() {
        let env = env_with(&[(CODEC_ENV, "brotli")]);
        let failure = resolve_codec(None, &env).unwrap_err();
        assert_eq!(failure.exit_code(), crate::EXIT_USAGE);
        assert!(failure.to_string().starts_with(CODEC_ENV));
    }

    #[test]
    fn level_is_validated_against_the_codec() {
        let env = env_with(&[(LEVEL_ENV, "12")]);
        assert!(resolve_level(CodecId::Gzip, None, &env).is_err());
        let level = resolve_level(CodecId::Gzip, Some(9), &env).unwrap();
        assert_eq!(level.numeric_for(CodecId::Gzip), 9);
        assert_eq!(
            resolve_level(CodecId::Gzip, None, &env_with(&[])).unwrap(),
            CompressionLevel::Default
        );
        assert!(resolve_level(CodecId::Gzip, None, &env_with(&[(LEVEL_ENV, "x")])).is_err());
    }

    #[test]
    fn copy_attributes_read_failures_to_the_input() {
        let mut source = test_support::FailingSource::new(3);
        let mut sink = Vec::new();
        let failure = copy(&mut source, &mut sink, Some(Path::new("layer.tar"))).unwrap_err();
        assert_eq!(failure.exit_code(), crate::EXIT_IO);
        assert!(failure.to_string().starts_with("layer.tar: "));
        assert_eq!(sink, [0, 0, 0]);
    }
}
