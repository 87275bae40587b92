//! CLI tests for commands that need no environment manager or platform.
//!
//! Spawns the grader binary in scratch grading homes and checks stdout and
//! exit codes.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use grader::exit_codes;
use grader::io::init::{InitOptions, InitOutcome, init_grading};
use grader::test_support::write_zip;

fn grader(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_grader"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("run grader")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn initialized_home() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    let outcome = init_grading(temp.path(), &InitOptions { force: false }).expect("init");
    assert!(matches!(outcome, InitOutcome::Created(_)));
    temp
}

#[test]
fn init_writes_config_and_directories() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = grader(temp.path(), &["init"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(temp.path().join("grading.toml").is_file());
    assert!(temp.path().join("code").is_dir());
    assert!(temp.path().join("submissions").is_dir());
}

#[test]
fn missing_config_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = grader(temp.path(), &["roster"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("grader init"));
}

#[test]
fn unpack_then_roster() {
    let temp = initialized_home();
    let submissions = temp.path().join("submissions");
    write_zip(&submissions.join("bob_sub1.zip"), &[("main.py", "b")]);
    write_zip(&submissions.join("alice_sub1.zip"), &[("main.py", "a")]);

    let output = grader(temp.path(), &["unpack"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let output = grader(temp.path(), &["roster"]);
    assert_eq!(stdout(&output), "alice\nbob\n");
}

#[test]
fn broken_submission_fails_the_batch() {
    let temp = initialized_home();
    fs::write(temp.path().join("submissions/alice_sub1.zip"), "not a zip").expect("write");

    let output = grader(temp.path(), &["unpack"]);
    assert_eq!(output.status.code(), Some(exit_codes::BATCH_FAILED));
    assert!(stdout(&output).starts_with("alice: FAILED:"));
}

#[test]
fn shell_start_and_next_print_directives() {
    let temp = initialized_home();
    let root = fs::canonicalize(temp.path()).expect("canonical");
    let alice = root.join("code/alice");
    let bob = root.join("code/bob");
    fs::create_dir_all(&alice).expect("alice");
    fs::create_dir_all(&bob).expect("bob");

    let output = grader(&root, &["shell", "start"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&output),
        format!(
            "cd {};\nconda activate env_alice;\n",
            shell_words::quote(&alice.to_string_lossy())
        )
    );

    let output = grader(&alice, &["shell", "next"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).ends_with("conda activate env_bob;\n"));

    let output = grader(&bob, &["shell", "next"]);
    assert!(stdout(&output).ends_with("conda activate env_alice;\n"));
}

#[test]
fn shell_next_outside_student_directory_is_not_in_session() {
    let temp = initialized_home();
    fs::create_dir_all(temp.path().join("code/alice")).expect("alice");

    let output = grader(temp.path(), &["shell", "next"]);
    assert_eq!(output.status.code(), Some(exit_codes::NOT_IN_SESSION));
    assert!(stdout(&output).is_empty());
}

#[test]
fn shell_hook_needs_no_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = grader(temp.path(), &["shell", "hook"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("grade()"));
}

#[test]
fn workspace_option_scopes_commands_to_an_assignment() {
    let temp = initialized_home();
    let root = fs::canonicalize(temp.path()).expect("canonical");
    fs::create_dir_all(root.join("code/zed")).expect("zed");
    let carol = root.join("week-1/code/carol");
    fs::create_dir_all(&carol).expect("carol");

    let output = grader(&root, &["--workspace", "Week 1", "roster"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&output), "carol\n");

    let output = grader(&root, &["shell", "start", "--workspace", "week-1"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&output),
        format!(
            "cd {};\nconda activate env_carol;\n",
            shell_words::quote(&carol.to_string_lossy())
        )
    );
}

#[test]
fn shell_hook_forwards_arguments_and_defaults_to_next() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = grader(temp.path(), &["shell", "hook"]);
    let hook = stdout(&output);
    assert!(hook.contains("set -- next"));
    assert!(hook.contains("command grader shell \"$@\""));
}
