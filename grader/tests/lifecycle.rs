//! Library-level tests for roster-wide operations.
//!
//! Runs the orchestrator against a scratch grading home and a scripted
//! environment manager, covering batch failure policies, idempotence and a
//! full unpack-then-navigate walkthrough.

use grader::core::types::ItemOutcome;
use grader::test_support::{ScriptedManager, TestHome};

fn home_with_students(students: &[&str]) -> TestHome {
    let home = TestHome::new().expect("home");
    for student in students {
        home.add_manifest(student, "project/pyproject.toml");
    }
    home
}

#[test]
fn create_halts_at_first_failure() {
    let home = home_with_students(&["alice", "bob", "carol"]);
    let orchestrator = home.orchestrator(ScriptedManager::new().failing_create("env_bob"));

    let report = orchestrator.create_environments(false).expect("create");

    assert!(report.halted);
    assert!(report.has_failures());
    assert_eq!(report.processed(), vec!["alice", "bob"]);
    assert_eq!(
        orchestrator.manager().created(),
        vec!["env_alice", "env_bob"]
    );
    assert!(
        !orchestrator
            .manager()
            .environments()
            .contains(&"env_carol".to_string())
    );
}

#[test]
fn remove_continues_past_failure() {
    let home = home_with_students(&["alice", "bob", "carol"]);
    let manager = ScriptedManager::new()
        .with_environments(&["env_alice", "env_bob", "env_carol"])
        .failing_remove("env_bob");
    let orchestrator = home.orchestrator(manager);

    let report = orchestrator.remove_environments().expect("remove");

    assert!(!report.halted);
    assert_eq!(report.processed(), vec!["alice", "bob", "carol"]);
    assert_eq!(report.failed(), vec!["bob"]);
    assert_eq!(
        orchestrator.manager().removed(),
        vec!["env_alice", "env_bob", "env_carol"]
    );
    assert!(report.items[1].outcome.message().contains("is in use"));
}

#[test]
fn install_continues_past_failure() {
    let home = home_with_students(&["alice", "bob", "carol"]);
    let manager = ScriptedManager::new()
        .with_environments(&["env_alice", "env_bob", "env_carol"])
        .failing_run("env_bob", "poetry");
    let orchestrator = home.orchestrator(manager);

    let report = orchestrator.install_environments().expect("install");

    assert_eq!(report.failed(), vec!["bob"]);
    assert!(matches!(report.items[0].outcome, ItemOutcome::Applied(_)));
    assert!(matches!(report.items[2].outcome, ItemOutcome::Applied(_)));
    let runs = orchestrator.manager().runs();
    // Two phases for alice and carol, only the failed first phase for bob.
    assert_eq!(runs.len(), 5);
    assert!(!runs.contains(&("env_bob".to_string(), "python".to_string())));
}

#[test]
fn install_reports_missing_manifest_and_continues() {
    let home = home_with_students(&["alice", "carol"]);
    home.add_student("bob");
    let manager =
        ScriptedManager::new().with_environments(&["env_alice", "env_bob", "env_carol"]);
    let orchestrator = home.orchestrator(manager);

    let report = orchestrator.install_environments().expect("install");

    assert_eq!(report.failed(), vec!["bob"]);
    assert!(
        report.items[1]
            .outcome
            .message()
            .contains("manifest not found")
    );
}

#[test]
fn create_twice_calls_manager_once() {
    let home = home_with_students(&["alice"]);
    let orchestrator = home.orchestrator(ScriptedManager::new());

    orchestrator.create_environments(false).expect("first");
    let second = orchestrator.create_environments(false).expect("second");

    assert_eq!(orchestrator.manager().created(), vec!["env_alice"]);
    assert!(matches!(second.items[0].outcome, ItemOutcome::Skipped(_)));
    assert!(!second.has_failures());
}

#[test]
fn forced_batch_create_recreates_every_environment() {
    let home = home_with_students(&["alice", "bob"]);
    let orchestrator =
        home.orchestrator(ScriptedManager::new().with_environments(&["env_alice", "env_bob"]));

    let report = orchestrator.create_environments(true).expect("create");

    assert!(!report.has_failures());
    assert_eq!(orchestrator.manager().created(), vec!["env_alice", "env_bob"]);
}

#[test]
fn unpack_then_walk_the_roster() {
    let home = TestHome::new().expect("home");
    home.add_submission(
        "alice_sub1.zip",
        &[("pythondaq/pyproject.toml", "[tool.poetry]\n")],
    );
    home.add_submission("bob_sub1.zip", &[("pyproject.toml", "[tool.poetry]\n")]);
    let orchestrator = home.orchestrator(ScriptedManager::new());

    assert!(orchestrator.roster().expect("roster").is_empty());
    let report = orchestrator.unpack_submissions().expect("unpack");
    assert!(!report.has_failures());
    assert_eq!(orchestrator.roster().expect("roster"), vec!["alice", "bob"]);

    let alice_dir = home.paths.student_dir("alice").join("pythondaq");
    let bob_dir = home.paths.student_dir("bob");

    let start = orchestrator.start().expect("start");
    assert_eq!(start.student, "alice");
    assert_eq!(start.environment, "env_alice");
    assert_eq!(start.directory, alice_dir);

    let next = orchestrator.next(&alice_dir).expect("next");
    assert_eq!(next.student, "bob");
    assert_eq!(next.environment, "env_bob");
    assert_eq!(next.directory, bob_dir);

    let wrapped = orchestrator.next(&bob_dir).expect("wrap");
    assert_eq!(wrapped.student, "alice");

    let again = orchestrator.unpack_submissions().expect("unpack again");
    assert!(
        again
            .items
            .iter()
            .all(|item| matches!(item.outcome, ItemOutcome::Skipped(_)))
    );
}

#[test]
fn next_visits_every_student_once_per_cycle() {
    let students = ["alice", "bob", "carol", "dave"];
    let home = TestHome::new().expect("home");
    for student in students {
        home.add_student(student);
    }
    let orchestrator = home.orchestrator(ScriptedManager::new());

    let mut current = orchestrator.start().expect("start");
    let mut visited = vec![current.student.clone()];
    for _ in 0..students.len() {
        current = orchestrator.next(&current.directory).expect("next");
        visited.push(current.student.clone());
    }

    assert_eq!(visited, vec!["alice", "bob", "carol", "dave", "alice"]);
}
