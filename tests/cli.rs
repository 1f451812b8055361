//! End-to-end tests running the `ripple` binary against a temporary storage file.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn ripple(db_file: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ripple"))
        .env("RIPPLE_DB", db_file)
        .env_remove("RIPPLE_DIR")
        .env_remove("RIPPLE_LOG")
        .env("EDITOR", "true")
        .args(args)
        .output()
        .expect("failed to run ripple")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_stop_without_start_fails() {
    let temp = TempDir::new().unwrap();
    let db_file = temp.path().join("ripple.txt");

    let output = ripple(&db_file, &["stop"]);

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("nothing to end"), "{}", stderr(&output));
    assert!(!db_file.exists());
}

#[test]
fn test_track_and_list() {
    let temp = TempDir::new().unwrap();
    let db_file = temp.path().join("ripple.txt");

    let output = ripple(&db_file, &["track", "write", "+Docs"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let output = ripple(&db_file, &["start", "lunch"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(
        stderr(&output).contains("ending unfinished entry"),
        "{}",
        stderr(&output)
    );

    let output = ripple(&db_file, &["done"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let output = ripple(&db_file, &["done"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("nothing to end!"), "{}", stderr(&output));

    let content = fs::read_to_string(&db_file).unwrap();
    assert_eq!(content.lines().count(), 2, "{content}");
    assert!(!content.contains("running"), "{content}");

    let output = ripple(&db_file, &["list", "+docs", "@today", "bogus"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let listed = stdout(&output);
    assert!(listed.starts_with("Task 1, started today "), "{listed}");
    assert!(listed.contains(": write +Docs\n"), "{listed}");
    assert!(listed.contains("\nTotal: "), "{listed}");
    assert!(!listed.contains("lunch"), "{listed}");
    assert!(stderr(&output).contains("bogus"), "{}", stderr(&output));
}

#[test]
fn test_list_skips_bad_lines() {
    let temp = TempDir::new().unwrap();
    let db_file = temp.path().join("ripple.txt");
    fs::write(
        &db_file,
        "2014-08-01 09:00:00 2014-08-01 10:00:00: one\n\
         this is not an entry\n\
         2014-08-04 09:00:00 2014-08-04 09:00:03: two\n",
    )
    .unwrap();

    let output = ripple(&db_file, &["ls", "@2014-08-01..2014-08-04"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "Task 1, started 2014-08-01 09:00, finished 2014-08-01 10:00 (one hour): one\n\
         Task 2, started 2014-08-04 09:00, finished 2014-08-04 09:00 (3 sec): two\n\
         Total: one hour 3 sec\n"
    );
    assert!(stderr(&output).contains(":2: "), "{}", stderr(&output));
}

#[test]
fn test_invalid_date_fails() {
    let temp = TempDir::new().unwrap();
    let db_file = temp.path().join("ripple.txt");

    let output = ripple(&db_file, &["list", "@2014-13"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("unable to parse the given date 2014-13"),
        "{}",
        stderr(&output)
    );
}

#[test]
fn test_unknown_command_fails() {
    let temp = TempDir::new().unwrap();
    let db_file = temp.path().join("ripple.txt");

    let output = ripple(&db_file, &["frobnicate"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown command"), "{}", stderr(&output));
}

#[test]
fn test_help() {
    let temp = TempDir::new().unwrap();
    let output = ripple(&temp.path().join("ripple.txt"), &["?"]);

    assert!(output.status.success());
    assert!(stdout(&output).starts_with("Usage: ripple COMMAND"));
}
