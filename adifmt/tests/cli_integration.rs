//! Integration tests for the adifmt CLI

use std::io::Write;
use std::process::{Command, Stdio};

const SAMPLE: &str = "Sample log\n<ADIF_VER:5>3.1.4 <EOH>\n\
<CALL:4>W1AW <QSO_DATE:8>19870605 <TIME_ON:4>1234 <BAND:3>40m <MODE:2>CW <FREQ:5>7.020 <EOR>\n\
<CALL:5>K1ABC <QSO_DATE:8>19870604 <TIME_ON:4>0100 <BAND:3>20m <MODE:3>SSB <FREQ:6>14.250 <EOR>\n";

fn run_adifmt(args: &[&str], stdin: &str) -> (String, String, bool) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_adifmt"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait for adifmt");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_cli_help() {
    let (stdout, _, success) = run_adifmt(&["--help"], "");

    assert!(success);
    assert!(stdout.contains("adifmt"));
    for command in ["cat", "edit", "find", "fix", "select", "sort", "count", "flatten", "infer", "save", "validate"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
    assert!(stdout.contains("--output"));
}

#[test]
fn test_cli_version() {
    let (stdout, _, success) = run_adifmt(&["--version"], "");

    assert!(success);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cat_to_csv_from_stdin() {
    let (stdout, stderr, success) =
        run_adifmt(&["cat", "--output", "csv", "--field-order", "CALL,BAND"], SAMPLE);

    assert!(success, "{stderr}");
    let mut lines = stdout.lines();
    assert!(lines.next().unwrap().starts_with("CALL,BAND,"));
    assert!(lines.next().unwrap().starts_with("W1AW,40m,"));
    assert!(lines.next().unwrap().starts_with("K1ABC,20m,"));
}

#[test]
fn test_cat_stamps_header() {
    let (stdout, _, success) = run_adifmt(&["cat"], SAMPLE);

    assert!(success);
    assert!(stdout.contains("<PROGRAMID:6>adifmt"));
    assert!(stdout.contains("<EOH>"));
    assert_eq!(stdout.matches("<EOR>").count(), 2);
}

#[test]
fn test_find_and_select() {
    let (stdout, _, success) = run_adifmt(&["find", "--if", "BAND=20m", "--output", "tsv"], SAMPLE);
    assert!(success);
    assert!(stdout.contains("K1ABC"));
    assert!(!stdout.contains("W1AW"));

    let (stdout, _, success) = run_adifmt(&["select", "--fields", "call", "--output", "csv"], SAMPLE);
    assert!(success);
    assert_eq!(stdout, "CALL\nW1AW\nK1ABC\n");
}

#[test]
fn test_sort_by_date() {
    let (stdout, _, success) =
        run_adifmt(&["sort", "--fields", "QSO_DATE", "--output", "csv", "--field-order", "CALL"], SAMPLE);

    assert!(success);
    let calls: Vec<&str> = stdout.lines().skip(1).map(|l| l.split(',').next().unwrap()).collect();
    assert_eq!(calls, vec!["K1ABC", "W1AW"]);
}

#[test]
fn test_count_by_band() {
    let (stdout, _, success) = run_adifmt(&["count", "--fields", "MODE", "--output", "csv"], SAMPLE);

    assert!(success);
    assert_eq!(stdout, "COUNT,MODE\n1,CW\n1,SSB\n");
}

#[test]
fn test_validate_failure_exit_code() {
    let bad = "<ADIF_VER:5>3.1.4 <EOH>\n<CALL:4>W1AW <QSO_DATE:8>19871305 <EOR>\n";
    let (stdout, stderr, success) = run_adifmt(&["validate"], bad);

    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("QSO_DATE"));
    assert!(stderr.contains("(standard input)"));
}

#[test]
fn test_unknown_format_is_an_error() {
    let (_, stderr, success) = run_adifmt(&["cat", "--output", "xls"], SAMPLE);

    assert!(!success);
    assert!(stderr.contains("xls"));
}

#[test]
fn test_save_guesses_format_and_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.csv");
    let target = target.to_str().unwrap();

    let (_, stderr, success) = run_adifmt(&["save", "-", target], SAMPLE);
    assert!(success, "{stderr}");
    let written = std::fs::read_to_string(target).unwrap();
    assert!(written.contains("W1AW"));
    assert!(written.lines().next().unwrap().contains("CALL"));

    let (_, stderr, success) = run_adifmt(&["save", "-", target], SAMPLE);
    assert!(!success);
    assert!(stderr.contains("already exists"));

    let (_, _, success) = run_adifmt(&["save", "--overwrite-existing", "-", target], SAMPLE);
    assert!(success);
}

#[test]
fn test_save_skips_empty_log() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("empty.adi");
    let target = target.to_str().unwrap();

    let (_, _, success) = run_adifmt(&["save", "-", target], "<ADIF_VER:5>3.1.4 <EOH>\n");
    assert!(success);
    assert!(!std::path::Path::new(target).exists());

    let (_, _, success) = run_adifmt(&["save", "--write-if-empty", "-", target], "<ADIF_VER:5>3.1.4 <EOH>\n");
    assert!(success);
    assert!(std::fs::read_to_string(target).unwrap().contains("<EOH>"));
}
