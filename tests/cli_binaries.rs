use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn binary_output(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blobpress"))
        .args(args)
        .env_remove("BLOBPRESS_CODEC")
        .env_remove("BLOBPRESS_LEVEL")
        .env_remove("BLOBPRESS_LOG")
        .output()
        .unwrap_or_else(|error| panic!("failed to run blobpress: {error}"))
}

fn piped_output(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_blobpress"))
        .args(args)
        .env_remove("BLOBPRESS_CODEC")
        .env_remove("BLOBPRESS_LEVEL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn blobpress");
    let mut input = child.stdin.take().expect("stdin is piped");
    let payload = stdin.to_vec();
    let feeder = std::thread::spawn(move || input.write_all(&payload));
    let output = child.wait_with_output().expect("wait for blobpress");
    feeder.join().expect("feeder thread").expect("write stdin");
    output
}

fn combined_utf8(output: &Output) -> String {
    let mut data = output.stdout.clone();
    data.extend_from_slice(&output.stderr);
    String::from_utf8(data).expect("binary output should be valid UTF-8")
}

#[test]
fn help_lists_subcommands() {
    let output = binary_output(&["--help"]);
    assert!(output.status.success(), "--help should succeed");
    assert!(
        output.stderr.is_empty(),
        "help output should not write to stderr"
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    for subcommand in ["compress", "decompress", "detect", "estimate"] {
        assert!(stdout.contains(subcommand), "help is missing {subcommand}");
    }
}

#[test]
fn version_reports_package_version() {
    let output = binary_output(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert_eq!(stdout.trim(), format!("blobpress {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_shows_usage_and_fails() {
    let output = binary_output(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_utf8(&output).contains("Usage:"));
}

#[test]
fn unknown_flag_exits_with_usage_code() {
    let output = binary_output(&["--definitely-not-a-flag"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}

#[test]
fn stdin_round_trip_preserves_bytes() {
    let payload = test_support::compressible_payload(300_000, 21);
    let compressed = piped_output(&["compress", "--stream"], &payload);
    assert!(compressed.status.success(), "{}", combined_utf8(&compressed));
    assert!(compressed.stdout.starts_with(&[0x1F, 0x8B]));
    assert!(compressed.stdout.len() < payload.len());

    let restored = piped_output(&["decompress"], &compressed.stdout);
    assert!(restored.status.success(), "{}", combined_utf8(&restored));
    assert_eq!(restored.stdout, payload);
}

#[test]
fn detect_and_exit_codes_for_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gz = dir.path().join("layer.tar.gz");
    let source = dir.path().join("layer.tar");
    fs::write(&source, test_support::compressible_payload(10_000, 2)).expect("write source");

    let output = binary_output(&[
        "compress",
        "-o",
        gz.to_str().unwrap(),
        source.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", combined_utf8(&output));

    let output = binary_output(&["detect", gz.to_str().unwrap(), source.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        format!("gzip\t{}\nnone\t{}\n", gz.display(), source.display())
    );

    let mut bytes = fs::read(&gz).expect("read compressed");
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&gz, &bytes).expect("corrupt trailer");
    let output = binary_output(&["decompress", gz.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2), "{}", combined_utf8(&output));

    let missing = dir.path().join("absent");
    let output = binary_output(&["decompress", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn environment_level_is_validated() {
    let output = Command::new(env!("CARGO_BIN_EXE_blobpress"))
        .args(["compress", "--codec", "gzip"])
        .env("BLOBPRESS_LEVEL", "0")
        .stdin(Stdio::null())
        .output()
        .expect("run blobpress");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("compression level 0"));
}
