use std::process::Output;

use assert_cmd::Command;

fn kwiz(home: &std::path::Path, args: &[&str]) -> Output {
    Command::cargo_bin("kwiz")
        .unwrap()
        .env("HOME", home)
        .args(args)
        .write_stdin("")
        .output()
        .unwrap()
}

#[test]
fn list_subjects_without_tty() {
    let home = tempfile::tempdir().unwrap();
    let out = kwiz(home.path(), &["--list-subjects"]);

    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.lines().any(|l| l.starts_with("geography")));
    assert!(stdout.contains("bundled:math"));
}

#[test]
fn list_subjects_includes_configured_ones() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("kwiz.json");
    std::fs::write(
        &config,
        r#"{"subjects": [{"key": "art", "title": "Art Challenge", "source": "bundled:math"}]}"#,
    )
    .unwrap();

    let out = kwiz(
        home.path(),
        &["--config", config.to_str().unwrap(), "--list-subjects"],
    );
    assert!(out.status.success());
    assert!(String::from_utf8(out.stdout).unwrap().contains("Art Challenge"));
}

#[test]
fn validate_bundled_bank_succeeds() {
    let home = tempfile::tempdir().unwrap();
    let out = kwiz(home.path(), &["--validate", "bundled:science"]);

    assert!(out.status.success());
    assert!(String::from_utf8(out.stdout).unwrap().contains("3 questions"));
}

#[test]
fn validate_malformed_file_fails() {
    let home = tempfile::tempdir().unwrap();
    let bank = home.path().join("bank.json");
    std::fs::write(&bank, r#"[{"question": "only one", "options": ["a"], "correctAnswer": 0}]"#)
        .unwrap();

    let out = kwiz(home.path(), &["--validate", bank.to_str().unwrap()]);
    assert!(!out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("failed to parse question bank"));
    assert!(stdout.contains("question 1 is invalid"));
}

#[test]
fn validate_unknown_bundle_fails() {
    let home = tempfile::tempdir().unwrap();
    let out = kwiz(home.path(), &["--validate", "bundled:history"]);
    assert!(!out.status.success());
}

#[test]
fn tui_refuses_piped_stdin() {
    let home = tempfile::tempdir().unwrap();
    let out = kwiz(home.path(), &["--subject", "demo-math"]);

    assert!(!out.status.success());
    assert!(String::from_utf8(out.stderr).unwrap().contains("stdin must be a tty"));
}
