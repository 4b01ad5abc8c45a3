use assert_cmd::Command;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use std::path::Path;

fn boardroom(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("boardroom").expect("boardroom binary");
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

fn start(data_dir: &Path, workflow: &str) -> String {
    let output = boardroom(data_dir)
        .args(["start", workflow])
        .output()
        .expect("run start");
    assert!(output.status.success(), "start failed: {output:?}");
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(
        stdout.contains("Sensitivity"),
        "start should ask the first question: {stdout}"
    );
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("session "))
        .expect("session id line")
        .trim()
        .to_string()
}

fn answer(data_dir: &Path, id: &str, text: &str) -> String {
    let output = boardroom(data_dir)
        .args(["answer", id, text])
        .output()
        .expect("run answer");
    assert!(output.status.success(), "answer {text:?} failed: {output:?}");
    String::from_utf8(output.stdout).expect("utf8")
}

#[test]
fn quick_audit_runs_to_a_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let id = start(dir.path(), "quick");

    answer(dir.path(), &id, "no");
    let out = answer(dir.path(), &id, "Staff engineer on the payments team");
    assert!(out.contains("Paid problems"));
    answer(dir.path(), &id, "Reconciling 3 payment processors every single week");
    answer(dir.path(), &id, "Reconciliation grows as we add 2 new markets");
    answer(dir.path(), &id, "Asking for the promotion I was promised in 2023");
    let out = answer(dir.path(), &id, "Rewriting docs nobody reads, 5 hours each week");
    assert!(out.contains("report written to"));

    boardroom(dir.path())
        .args(["report", &id])
        .assert()
        .success()
        .stdout(contains("# Quick audit"))
        .stdout(contains("Reconciling 3 payment processors"));

    let output = boardroom(dir.path())
        .args(["status", &id, "--json"])
        .output()
        .expect("status");
    let view: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json view");
    assert_eq!(view["state"], "finalized");
    assert_eq!(view["progress_percent"], 100);
    assert!(dir.path().join("reports").join(format!("{id}.md")).exists());
}

#[test]
fn vague_answers_ask_for_an_example_until_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let id = start(dir.path(), "quick");
    answer(dir.path(), &id, "yes");
    answer(dir.path(), &id, "Product manager for onboarding");

    let out = answer(dir.path(), &id, "stuff");
    assert!(out.contains("Add detail"));
    assert!(out.contains(&format!("boardroom skip {id}")));

    boardroom(dir.path())
        .args(["skip", &id])
        .assert()
        .success()
        .stdout(contains("Direction"));

    boardroom(dir.path())
        .args(["status", &id])
        .assert()
        .success()
        .stdout(contains("1 skip(s) left"));
}

#[test]
fn no_vagueness_check_accepts_and_says_so() {
    let dir = tempfile::tempdir().expect("tempdir");
    let id = start(dir.path(), "quick");
    answer(dir.path(), &id, "no");
    answer(dir.path(), &id, "Analyst");
    boardroom(dir.path())
        .args(["--no-vagueness-check", "answer", &id, "stuff"])
        .assert()
        .success()
        .stdout(contains("Answer checking is offline"));
}

#[test]
fn second_start_of_the_same_kind_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let id = start(dir.path(), "quick");
    boardroom(dir.path())
        .args(["start", "quick"])
        .assert()
        .failure()
        .stderr(contains("already in progress"))
        .stderr(contains(id.as_str()));

    boardroom(dir.path())
        .args(["abandon", &id])
        .assert()
        .success();
    start(dir.path(), "quick");
}

#[test]
fn quarterly_needs_a_portfolio() {
    let dir = tempfile::tempdir().expect("tempdir");
    boardroom(dir.path())
        .args(["start", "quarterly"])
        .assert()
        .failure()
        .stderr(contains("no portfolio found"));
}

#[test]
fn unknown_sessions_are_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    boardroom(dir.path())
        .args(["status", "7f1c1c56-3f0a-4a55-9d6a-1d2f0b7a6c11"])
        .assert()
        .failure()
        .stderr(contains("not found"));
}

#[test]
fn validation_errors_name_the_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let id = start(dir.path(), "setup");
    boardroom(dir.path())
        .args(["answer", &id, "maybe"])
        .assert()
        .failure()
        .stderr(contains("abstraction_mode: answer yes or no"));
}
