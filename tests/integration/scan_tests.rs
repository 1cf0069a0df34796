use super::common::run_of;
use codedupe::detect::{DuplicateFinder, FinderConfig, FinderError, MatchGroup};
use codedupe::scanner::WalkerConfig;
use codedupe::tokens::TokenError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// 60 tokens on 6 lines.
fn shared_block() -> String {
    run_of("shared", 60, 10)
}

fn finder(min_tokens: usize) -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_min_tokens(min_tokens))
}

fn scan(finder: &DuplicateFinder, root: &Path) -> (Vec<MatchGroup>, codedupe::detect::ScanSummary) {
    finder.find_duplicates(&[root.to_path_buf()]).unwrap()
}

fn start_line_of(group: &MatchGroup, name: &str) -> Option<u32> {
    group
        .occurrences
        .iter()
        .find(|o| o.path.file_name().is_some_and(|f| f == name))
        .map(|o| o.start_line)
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (groups, summary) = scan(&DuplicateFinder::with_defaults(), dir.path());

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.py"), run_of("a", 80, 8)).unwrap();
    fs::write(dir.path().join("b.py"), run_of("b", 80, 8)).unwrap();
    fs::write(dir.path().join("c.py"), run_of("c", 80, 8)).unwrap();

    let (groups, summary) = scan(&finder(40), dir.path());

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.tokenized_files, 3);
    assert_eq!(summary.total_tokens, 240);
}

#[test]
fn test_block_in_three_files_forms_one_group() {
    let dir = tempdir().unwrap();
    let block = shared_block();
    fs::write(
        dir.path().join("a.py"),
        format!("{}{}{}", run_of("pa", 10, 5), block, run_of("qa", 10, 5)),
    )
    .unwrap();
    fs::write(
        dir.path().join("b.py"),
        format!("{}{}{}", run_of("pb", 15, 5), block, run_of("qb", 10, 5)),
    )
    .unwrap();
    fs::write(
        dir.path().join("c.py"),
        format!("{}{}", block, run_of("qc", 10, 5)),
    )
    .unwrap();

    let (groups, summary) = scan(&finder(40), dir.path());

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.len(), 3);
    assert_eq!(group.token_len, 60);
    assert_eq!(group.matched_lines(), 6);
    assert_eq!(start_line_of(group, "a.py"), Some(3));
    assert_eq!(start_line_of(group, "b.py"), Some(4));
    assert_eq!(start_line_of(group, "c.py"), Some(1));
    assert_eq!(summary.cross_file_groups, 1);
    assert_eq!(summary.duplicated_lines, 12);
}

#[test]
fn test_block_repeated_within_one_file() {
    let dir = tempdir().unwrap();
    let block = shared_block();
    fs::write(
        dir.path().join("only.py"),
        format!("{}{}{}", block, run_of("f", 50, 10), block),
    )
    .unwrap();

    let (groups, summary) = scan(&finder(40), dir.path());

    assert_eq!(groups.len(), 1);
    let starts: Vec<u32> = groups[0].occurrences.iter().map(|o| o.start_line).collect();
    assert_eq!(starts, vec![1, 12]);
    assert_eq!(groups[0].token_len, 60);
    assert_eq!(summary.cross_file_groups, 0);
}

#[test]
fn test_block_shorter_than_minimum_is_not_reported() {
    let dir = tempdir().unwrap();
    let block = run_of("shared", 30, 5);
    fs::write(dir.path().join("a.py"), format!("{}{}", block, run_of("qa", 20, 5))).unwrap();
    fs::write(dir.path().join("b.py"), format!("{}{}", block, run_of("qb", 20, 5))).unwrap();

    let (groups, _) = scan(&finder(40), dir.path());
    assert!(groups.is_empty());

    let (groups, _) = scan(&finder(25), dir.path());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].token_len, 30);
}

#[test]
fn test_min_lines_filters_long_lines() {
    let dir = tempdir().unwrap();
    // 60 tokens on only two lines
    let block = run_of("wide", 60, 30);
    fs::write(
        dir.path().join("a.py"),
        format!("{}{}{}", run_of("pa", 10, 5), block, run_of("qa", 10, 5)),
    )
    .unwrap();
    fs::write(
        dir.path().join("b.py"),
        format!("{}{}{}", run_of("pb", 10, 5), block, run_of("qb", 10, 5)),
    )
    .unwrap();

    let (groups, _) = scan(&finder(40), dir.path());
    assert!(groups.is_empty());

    let relaxed = DuplicateFinder::new(
        FinderConfig::default()
            .with_min_tokens(40)
            .with_min_lines(2),
    );
    let (groups, _) = scan(&relaxed, dir.path());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].matched_lines(), 2);
}

#[test]
fn test_groups_ranked_by_matched_lines() {
    let dir = tempdir().unwrap();
    let small = run_of("small", 40, 10);
    let large = run_of("large", 90, 10);
    fs::write(
        dir.path().join("a.py"),
        format!("{}{}{}{}", small, run_of("xa", 10, 5), large, run_of("ya", 10, 5)),
    )
    .unwrap();
    fs::write(
        dir.path().join("b.py"),
        format!("{}{}{}{}", small, run_of("xb", 10, 5), large, run_of("yb", 10, 5)),
    )
    .unwrap();

    let (groups, summary) = scan(&finder(30), dir.path());

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].matched_lines(), 9);
    assert_eq!(groups[1].matched_lines(), 4);
    assert_eq!(summary.duplicated_lines, 13);
}

#[test]
fn test_fuzzy_matches_renamed_code() {
    let dir = tempdir().unwrap();
    // Line k has 3 + 2k tokens, so no two windows share a structure
    let shape = |target: &str, operand: &str| -> String {
        (0..8)
            .map(|k| {
                let mut line = format!("{} = {}", target, operand);
                for _ in 0..k {
                    line.push_str(&format!(" + {}", operand));
                }
                line.push('\n');
                line
            })
            .collect()
    };
    fs::write(dir.path().join("a.py"), shape("r", "a")).unwrap();
    fs::write(dir.path().join("b.py"), shape("s", "b")).unwrap();

    let (groups, _) = scan(&finder(40), dir.path());
    assert!(groups.is_empty());

    let fuzzy = DuplicateFinder::new(FinderConfig::default().with_min_tokens(40).with_fuzzy(true));
    let (groups, summary) = scan(&fuzzy, dir.path());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].token_len, 80);
    assert_eq!(groups[0].matched_lines(), 8);
    assert_eq!(summary.total_tokens, 160);
}

#[test]
fn test_include_pattern_limits_languages() {
    let dir = tempdir().unwrap();
    let block = shared_block();
    fs::write(dir.path().join("a.py"), format!("{}{}", block, run_of("qa", 10, 5))).unwrap();
    fs::write(dir.path().join("b.py"), format!("{}{}", block, run_of("qb", 10, 5))).unwrap();
    fs::write(dir.path().join("c.js"), format!("{}{}", block, run_of("qc", 10, 5))).unwrap();

    let (groups, _) = scan(&finder(40), dir.path());
    assert_eq!(groups[0].len(), 3);

    let only_py = DuplicateFinder::new(
        FinderConfig::default()
            .with_min_tokens(40)
            .with_walker_config(WalkerConfig {
                pattern: Some("*.py".to_string()),
                ..Default::default()
            }),
    );
    let (groups, summary) = scan(&only_py, dir.path());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(summary.total_files, 2);
}

#[test]
fn test_ignore_patterns_and_gitignore() {
    let dir = tempdir().unwrap();
    let block = shared_block();
    fs::create_dir(dir.path().join("vendor")).unwrap();
    fs::create_dir(dir.path().join("build")).unwrap();
    fs::write(dir.path().join("a.py"), format!("{}{}", block, run_of("qa", 10, 5))).unwrap();
    fs::write(
        dir.path().join("vendor/b.py"),
        format!("{}{}", block, run_of("qb", 10, 5)),
    )
    .unwrap();
    fs::write(
        dir.path().join("build/c.py"),
        format!("{}{}", block, run_of("qc", 10, 5)),
    )
    .unwrap();
    fs::write(dir.path().join(".gitignore"), "build/\n").unwrap();

    let (groups, _) = scan(&finder(40), dir.path());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(start_line_of(&groups[0], "c.py"), None);

    let ignoring = DuplicateFinder::new(
        FinderConfig::default()
            .with_min_tokens(40)
            .with_walker_config(WalkerConfig {
                ignore_patterns: vec!["vendor/".to_string()],
                ..Default::default()
            }),
    );
    let (groups, summary) = scan(&ignoring, dir.path());
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
}

#[test]
fn test_multiple_roots_are_merged() {
    let dir = tempdir().unwrap();
    let left = dir.path().join("left");
    let right = dir.path().join("right");
    fs::create_dir(&left).unwrap();
    fs::create_dir(&right).unwrap();
    let block = shared_block();
    fs::write(left.join("a.py"), format!("{}{}", block, run_of("qa", 10, 5))).unwrap();
    fs::write(right.join("b.py"), format!("{}{}", block, run_of("qb", 10, 5))).unwrap();

    let f = finder(40);
    let (groups, summary) = f.find_duplicates(&[right.clone(), left.clone()]).unwrap();
    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].occurrences[0].path.as_ref(), left.join("a.py").as_path());

    // Overlapping roots do not count a file twice
    let (_, summary) = f
        .find_duplicates(&[dir.path().to_path_buf(), left.clone()])
        .unwrap();
    assert_eq!(summary.total_files, 2);
}

#[test]
fn test_unreadable_file_is_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let block = shared_block();
    fs::write(dir.path().join("a.py"), format!("{}{}", block, run_of("qa", 10, 5))).unwrap();
    fs::write(dir.path().join("b.py"), format!("{}{}", block, run_of("qb", 10, 5))).unwrap();
    fs::write(dir.path().join("blob.py"), [0u8, 159, 146, 150]).unwrap();

    let (groups, summary) = scan(&finder(40), dir.path());
    assert_eq!(groups.len(), 1);
    assert_eq!(summary.skipped_files, 1);
    assert!(summary.has_errors());

    let strict = DuplicateFinder::new(FinderConfig::default().with_min_tokens(40).with_strict(true));
    let err = strict.find_duplicates(&[dir.path().to_path_buf()]).unwrap_err();
    assert!(matches!(err, FinderError::Token(TokenError::Binary(_))));
}

#[test]
fn test_files_differing_only_in_invalid_utf8_are_not_duplicates() {
    let dir = tempdir().unwrap();
    let block = shared_block();
    for (name, byte) in [("e9.c", 0xe9u8), ("e8.c", 0xe8u8)] {
        let mut bytes = block.clone().into_bytes();
        bytes.extend_from_slice(b"char *s = \"caf");
        bytes.push(byte);
        bytes.extend_from_slice(b"\";\n");
        bytes.extend_from_slice(block.as_bytes());
        fs::write(dir.path().join(name), bytes).unwrap();
    }

    let (groups, summary) = scan(&finder(30), dir.path());
    assert!(groups.is_empty());
    assert_eq!(summary.skipped_files, 2);
    assert_eq!(summary.total_tokens, 0);
    assert!(summary
        .token_errors
        .iter()
        .all(|e| matches!(e, TokenError::InvalidUtf8(_))));
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempdir().unwrap();
    let missing: PathBuf = dir.path().join("nope");
    let err = finder(40).find_duplicates(&[missing]).unwrap_err();
    assert!(matches!(err, FinderError::PathNotFound(_)));
}
