//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use chrono::{DateTime, Duration, TimeZone, Utc};
use predicates::prelude::*;
use tempfile::TempDir;

use markwise_core::history::HistorySnapshot;
use markwise_core::model::{AnswerRecord, EvaluationBreakdown, EvaluationResult, HistoryEntry};

fn markwise() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("markwise").unwrap()
}

const ANSWER: &str = "A primary key uniquely identifies each row in a table.";

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("markwise.toml");
    std::fs::write(&path, body).unwrap();
    path
}

const OFFLINE_CONFIG: &str = r#"
default_judge = "offline"
max_retries = 0

[judges.offline]
type = "mock"
score = 80
feedback = "Nice work"
"#;

fn grade(config: &Path) -> Command {
    let mut cmd = markwise();
    cmd.arg("grade")
        .arg("--question")
        .arg("What is a primary key?")
        .arg("--answer")
        .arg(ANSWER)
        .arg("--reference")
        .arg(ANSWER)
        .arg("--subject")
        .arg("Databases")
        .arg("--student")
        .arg("alice")
        .arg("--question-id")
        .arg("db-1")
        .arg("--config")
        .arg(config);
    cmd
}

fn result_with_score(score: u32) -> EvaluationResult {
    EvaluationResult {
        score,
        local_score: score,
        external_score: score,
        feedback: String::new(),
        feedback_items: vec![],
        breakdown: EvaluationBreakdown {
            lexical: score,
            semantic: score,
            grammar: 100,
        },
        strengths: vec![],
        improvements: vec![],
        grammar_issues: vec![],
    }
}

fn entry(student: &str, subject: &str, score: u32, at: DateTime<Utc>) -> HistoryEntry {
    let record =
        AnswerRecord::from_evaluation(student, "q-1", "answer", &result_with_score(score), 90, at);
    HistoryEntry::new(record, subject, None)
}

fn write_history(dir: &Path) -> std::path::PathBuf {
    let as_of = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
    let mut snapshot = HistorySnapshot::default();
    snapshot.append(entry("alice", "Physics", 50, as_of - Duration::days(1)));
    snapshot.append(entry("alice", "Math", 88, as_of));
    snapshot.append(entry("bob", "Math", 30, as_of));

    let path = dir.join("history.json");
    snapshot.save_json(&path).unwrap();
    path
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    markwise()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created markwise.toml"));

    assert!(dir.path().join("markwise.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    markwise()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    markwise()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn list_judges_marks_default() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), OFFLINE_CONFIG);

    markwise()
        .arg("list-judges")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("offline: mock (default)"));
}

#[test]
fn grade_with_offline_judge() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), OFFLINE_CONFIG);

    grade(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 90/100 (passed)"))
        .stdout(predicate::str::contains(
            "Excellent keyword coverage and terminology usage!",
        ))
        .stdout(predicate::str::contains("Nice work"));
}

#[test]
fn grade_json_output() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), OFFLINE_CONFIG);

    let output = grade(&config).arg("--format").arg("json").output().unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["score"], 90);
    assert_eq!(result["local_score"], 100);
    assert_eq!(result["external_score"], 80);
    assert_eq!(result["grammar_issues"], serde_json::json!([]));
}

#[test]
fn grade_appends_to_history() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), OFFLINE_CONFIG);
    let history = dir.path().join("data").join("history.json");

    grade(&config)
        .arg("--history")
        .arg(&history)
        .arg("--time-spent")
        .arg("45")
        .assert()
        .success();
    grade(&config).arg("--history").arg(&history).assert().success();

    let snapshot = HistorySnapshot::load_json(&history).unwrap();
    assert_eq!(snapshot.entries.len(), 2);
    let first = &snapshot.entries[0];
    assert_eq!(first.subject, "Databases");
    assert_eq!(first.record.student_id(), "alice");
    assert_eq!(first.record.score(), 90);
    assert_eq!(first.record.time_spent_secs(), 45);
    assert!(first.record.passed());
}

#[test]
fn grade_failure_asks_for_retry() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        r#"
default_judge = "openai"
max_retries = 0

[judges.openai]
type = "openai"
api_key = "sk-test"
base_url = "http://127.0.0.1:1"
"#,
    );
    let history = dir.path().join("history.json");

    grade(&config)
        .arg("--history")
        .arg(&history)
        .assert()
        .failure()
        .stderr(predicate::str::contains("evaluation failed, please retry"));

    assert!(!history.exists());
}

#[test]
fn grade_rejects_blank_reference() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), OFFLINE_CONFIG);

    markwise()
        .arg("grade")
        .args(["--question", "q", "--answer", "a", "--reference", "  "])
        .args(["--subject", "Databases", "--student", "alice"])
        .args(["--question-id", "db-1"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("reference_answer"));
}

#[test]
fn grade_unknown_judge() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), OFFLINE_CONFIG);

    grade(&config)
        .arg("--judge")
        .arg("nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("judge 'nope' not found"));
}

#[test]
fn grade_missing_config() {
    grade(Path::new("no_such_markwise.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn progress_text() {
    let dir = TempDir::new().unwrap();
    let history = write_history(dir.path());

    markwise()
        .arg("progress")
        .arg("--history")
        .arg(&history)
        .args(["--student", "alice", "--as-of", "2024-05-15T12:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress for alice"))
        .stdout(predicate::str::contains("2 answers, 69.00% average"))
        .stdout(predicate::str::contains("Physics"))
        .stdout(predicate::str::contains("Focus on Physics"));
}

#[test]
fn progress_json() {
    let dir = TempDir::new().unwrap();
    let history = write_history(dir.path());

    let output = markwise()
        .arg("progress")
        .arg("--history")
        .arg(&history)
        .args(["--student", "alice", "--as-of", "2024-05-15T12:00:00Z"])
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let dashboard: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(dashboard["student_id"], "alice");
    assert_eq!(dashboard["summary"]["total_answers"], 2);
    assert_eq!(dashboard["summary"]["study_streak_days"], 2);
    assert_eq!(dashboard["weekly_trend"].as_array().unwrap().len(), 6);
}

#[test]
fn progress_markdown() {
    let dir = TempDir::new().unwrap();
    let history = write_history(dir.path());

    markwise()
        .arg("progress")
        .arg("--history")
        .arg(&history)
        .args(["--student", "alice", "--as-of", "2024-05-15T12:00:00Z"])
        .args(["--format", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Progress for alice"))
        .stdout(predicate::str::contains("| Physics | 50% | 1 | weak |"));
}

fn write_time_of_day_history(dir: &Path) -> std::path::PathBuf {
    let mut snapshot = HistorySnapshot::default();
    snapshot.append(entry(
        "alice",
        "Math",
        90,
        Utc.with_ymd_and_hms(2024, 5, 14, 20, 0, 0).unwrap(),
    ));
    snapshot.append(entry(
        "alice",
        "Math",
        40,
        Utc.with_ymd_and_hms(2024, 5, 14, 8, 0, 0).unwrap(),
    ));

    let path = dir.join("history.json");
    snapshot.save_json(&path).unwrap();
    path
}

fn best_study_time(history: &Path, offset: Option<&str>) -> serde_json::Value {
    let mut cmd = markwise();
    cmd.arg("progress")
        .arg("--history")
        .arg(history)
        .args(["--student", "alice", "--as-of", "2024-05-15T12:00:00Z"])
        .args(["--format", "json"]);
    if let Some(offset) = offset {
        cmd.args(["--utc-offset", offset]);
    }
    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let dashboard: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    dashboard["insights"]["best_study_time"].clone()
}

#[test]
fn progress_uses_local_time_of_day() {
    let dir = TempDir::new().unwrap();
    let history = write_time_of_day_history(dir.path());

    assert_eq!(best_study_time(&history, None), "evening");
    assert_eq!(best_study_time(&history, Some("+05:00")), "night");
    assert_eq!(best_study_time(&history, Some("-08:00")), "afternoon");
}

#[test]
fn progress_rejects_bad_offset() {
    let dir = TempDir::new().unwrap();
    let history = write_time_of_day_history(dir.path());

    markwise()
        .arg("progress")
        .arg("--history")
        .arg(&history)
        .args(["--student", "alice", "--utc-offset", "noon"])
        .assert()
        .failure();
}

#[test]
fn progress_reads_history_path_from_config() {
    let dir = TempDir::new().unwrap();
    let history = write_history(dir.path());
    let config = write_config(
        dir.path(),
        &format!("history_path = {:?}\n", history.display().to_string()),
    );

    markwise()
        .arg("progress")
        .arg("--config")
        .arg(&config)
        .args(["--student", "alice", "--as-of", "2024-05-15T12:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 answers, 69.00% average"));
}

#[test]
fn progress_without_any_history_path() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), OFFLINE_CONFIG);

    markwise()
        .arg("progress")
        .arg("--config")
        .arg(&config)
        .args(["--student", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no history file"));
}

#[test]
fn grade_records_to_configured_history() {
    let dir = TempDir::new().unwrap();
    let history = dir.path().join("configured.json");
    let config = write_config(
        dir.path(),
        &format!(
            "history_path = {:?}\n{OFFLINE_CONFIG}",
            history.display().to_string()
        ),
    );

    grade(&config).assert().success();

    let snapshot = HistorySnapshot::load_json(&history).unwrap();
    assert_eq!(snapshot.entries.len(), 1);
}

#[test]
fn progress_missing_history() {
    markwise()
        .arg("progress")
        .args(["--history", "no_such_history.json", "--student", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn help_output() {
    markwise()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Answer grading and progress analytics engine",
        ));
}
