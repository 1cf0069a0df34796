use super::common::run_of;
use clap::Parser;
use codedupe::cli::Cli;
use codedupe::error::ExitCode;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Two files sharing a 60-token, 6-line block.
fn project() -> TempDir {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir(&src).unwrap();
    let block = run_of("shared", 60, 10);
    fs::write(
        src.join("a.py"),
        format!("{}{}{}", run_of("pa", 10, 5), block, run_of("qa", 10, 5)),
    )
    .unwrap();
    fs::write(
        src.join("b.py"),
        format!("{}{}", block, run_of("qb", 10, 5)),
    )
    .unwrap();
    dir
}

fn run(dir: &Path, extra: &[&str]) -> ExitCode {
    let src = dir.join("src");
    let config = dir.join("missing-config.toml");
    let mut argv = vec![
        "codedupe".to_string(),
        "-q".to_string(),
        "scan".to_string(),
        src.to_string_lossy().into_owned(),
        "--config".to_string(),
        config.to_string_lossy().into_owned(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    let cli = Cli::try_parse_from(argv).unwrap();
    codedupe::run_app(cli).unwrap()
}

#[test]
fn test_json_report_written_to_file() {
    let dir = project();
    let out = dir.path().join("report.json");
    let code = run(dir.path(), &["-m", "40", "-o", out.to_str().unwrap()]);
    assert_eq!(code, ExitCode::Success);

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let duplicates = parsed["duplicates"].as_array().unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0]["tokens"], 60);
    assert_eq!(duplicates[0]["matched_lines"], 6);
    assert_eq!(duplicates[0]["digest"].as_str().unwrap().len(), 40);

    let occurrences = duplicates[0]["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 2);
    assert!(occurrences[0]["file"].as_str().unwrap().ends_with("a.py"));
    assert_eq!(occurrences[0]["start_line"], 3);
    assert_eq!(occurrences[1]["start_line"], 1);

    assert_eq!(parsed["summary"]["total_files"], 2);
    assert_eq!(parsed["summary"]["exit_code_name"], "CD000");
    assert!(parsed["generated_at"].is_string());
}

#[test]
fn test_csv_report_written_to_file() {
    let dir = project();
    let out = dir.path().join("report.csv");
    let code = run(dir.path(), &["-m", "40", "-o", out.to_str().unwrap()]);
    assert_eq!(code, ExitCode::Success);

    let csv = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "group_id,digest,file,start_line,line_count,matched_lines,tokens"
    );
    assert!(lines[1].starts_with("1,"));
    assert!(lines[1].ends_with(",3,6,6,60"));
    assert!(lines[2].ends_with(",1,6,6,60"));
}

#[test]
fn test_text_report_with_explicit_format() {
    let dir = project();
    let out = dir.path().join("report.out");
    let code = run(
        dir.path(),
        &["-m", "40", "-f", "text", "-o", out.to_str().unwrap()],
    );
    assert_eq!(code, ExitCode::Success);

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("Match 1:"));
    assert!(text.contains("Found an approx. 6 line duplication in 2 files."));
    assert!(text.lines().any(|l| l.starts_with("Starting at line 3 of") && l.ends_with("a.py")));
    assert!(!text.contains('\u{1b}'));
}

#[test]
fn test_no_duplicates_exit_code() {
    let dir = project();
    let out = dir.path().join("report.json");
    // The shared block is shorter than the window
    let code = run(dir.path(), &["-m", "100", "-o", out.to_str().unwrap()]);
    assert_eq!(code, ExitCode::NoDuplicates);

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert!(parsed["duplicates"].as_array().unwrap().is_empty());
    assert_eq!(parsed["summary"]["exit_code"], 2);
}

#[test]
fn test_partial_success_exit_code() {
    let dir = project();
    fs::write(dir.path().join("src/blob.py"), [0u8, 1, 2]).unwrap();
    let out = dir.path().join("report.json");
    let code = run(dir.path(), &["-m", "40", "-o", out.to_str().unwrap()]);
    assert_eq!(code, ExitCode::PartialSuccess);

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(parsed["summary"]["skipped_files"], 1);
    assert_eq!(parsed["summary"]["errors"].as_array().unwrap().len(), 1);
}

#[test]
fn test_config_file_supplies_defaults() {
    let dir = project();
    let config = dir.path().join("codedupe.toml");
    fs::write(&config, "min_tokens = 40\nformat = \"csv\"\n").unwrap();
    let out = dir.path().join("report.out");

    let cli = Cli::try_parse_from([
        "codedupe",
        "-q",
        "scan",
        dir.path().join("src").to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(codedupe::run_app(cli).unwrap(), ExitCode::Success);
    assert!(fs::read_to_string(&out).unwrap().starts_with("group_id,"));
}

#[test]
fn test_missing_path_is_general_error() {
    let dir = tempdir().unwrap();
    let cli = Cli::try_parse_from([
        "codedupe",
        "-q",
        "scan",
        dir.path().join("absent").to_str().unwrap(),
    ])
    .unwrap();
    let err = codedupe::run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{:#}", err).contains("absent"));
}
