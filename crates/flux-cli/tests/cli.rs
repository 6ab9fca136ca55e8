use serde_json::json;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;

const SIMPLE: &str = "\
#group,false,false,false
#datatype,string,long,dateTime:RFC3339
#default,_result,,
,result,table,_time
,,0,2023-01-01T00:00:00Z
";

fn flux2json() -> Command {
    Command::new(env!("CARGO_BIN_EXE_flux2json"))
}

fn run_with_stdin(input: &str) -> Output {
    let mut child = flux2json()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn input_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn expected_simple() -> serde_json::Value {
    json!({
        "tables": [{
            "columns": [
                {"name": "result", "type": "string", "index": 0},
                {"name": "table", "type": "long", "index": 1},
                {"name": "_time", "type": "datetime", "format": "rfc3339", "index": 2}
            ],
            "data": [
                {"result": "_result", "table": 0, "_time": "2023-01-01T00:00:00Z"}
            ]
        }]
    })
}

#[test]
fn test_converts_file_argument() {
    let file = input_file(SIMPLE);
    let output = flux2json().arg(file.path()).output().unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json, expected_simple());
}

#[test]
fn test_reads_stdin_without_argument() {
    let output = run_with_stdin(SIMPLE);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json, expected_simple());
}

#[test]
fn test_output_is_pretty_printed() {
    let output = run_with_stdin(SIMPLE);
    let text = String::from_utf8(output.stdout).unwrap();

    assert!(text.starts_with("{\n  \"tables\": [\n    {\n"));
    assert!(text.ends_with("}\n"));
}

#[test]
fn test_empty_input_has_no_tables() {
    let output = run_with_stdin("");

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "{\n  \"tables\": []\n}\n");
}

#[test]
fn test_missing_file_fails() {
    let output = flux2json().arg("/nonexistent/input.csv").output().unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("flux2json: "));
    assert!(stderr.contains("/nonexistent/input.csv"));
}

#[test]
fn test_conversion_error_fails_without_output() {
    let output = run_with_stdin("#datatype,long\n,count\n,12\n,lots\n");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("flux2json: parse error: "));
    assert!(stderr.contains("\"count\""));
    assert!(stderr.contains("\"lots\""));
}

#[test]
fn test_non_finite_double_fails_to_encode() {
    let output = run_with_stdin("#datatype,double\n,v\n,NaN\n");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("flux2json: "));
}

#[test]
fn test_help_prints_usage() {
    let output = flux2json().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Reads from stdin when no file argument is given."));
}

#[test]
fn test_no_version_flag() {
    let output = flux2json().arg("--version").output().unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
