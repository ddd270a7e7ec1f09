//! The `markwise grade` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use markwise_core::batch::{evaluate_with_retry, ProgressReporter};
use markwise_core::history::HistorySnapshot;
use markwise_core::model::{AnswerRecord, EvaluationRequest, EvaluationResult, HistoryEntry};
use markwise_core::traits::Judge;
use markwise_core::{EvalError, Evaluator};
use markwise_judges::config::load_config_from;
use markwise_judges::create_judge;

/// Arguments of one `grade` invocation.
pub struct GradeArgs {
    pub question: String,
    pub answer: String,
    pub reference: String,
    pub subject: String,
    pub student: String,
    pub question_id: String,
    pub topic: Option<String>,
    pub time_spent: u64,
    pub judge: Option<String>,
    pub model: Option<String>,
    pub history: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub format: String,
}

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_attempt(&self, id: &str, attempt: u32) {
        if attempt > 1 {
            eprintln!("  Retrying: {id} (attempt {attempt})");
        }
    }

    fn on_complete(&self, id: &str, result: &EvaluationResult) {
        tracing::info!(id, score = result.score, "answer graded");
    }

    fn on_error(&self, id: &str, error: &EvalError) {
        tracing::warn!(id, "grading failed: {error}");
    }

    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

pub async fn execute(args: GradeArgs) -> Result<()> {
    anyhow::ensure!(
        matches!(args.format.as_str(), "text" | "json"),
        "unknown format '{}', expected text or json",
        args.format
    );

    let config = load_config_from(args.config.as_deref())?;

    let judge_name = args.judge.unwrap_or_else(|| config.default_judge.clone());
    let judge_config = config.judges.get(&judge_name).with_context(|| {
        let mut available: Vec<&String> = config.judges.keys().collect();
        available.sort();
        format!("judge '{judge_name}' not found in config. Available: {available:?}")
    })?;
    let judge: Arc<dyn Judge> = Arc::from(create_judge(&judge_name, judge_config)?);

    let mut evaluator_config = config.evaluator_config();
    if let Some(model) = args.model {
        evaluator_config.model = model;
    }
    let evaluator = Evaluator::new(judge, evaluator_config)?;

    let request = EvaluationRequest::new(
        args.question,
        args.answer.clone(),
        args.reference,
        args.subject.clone(),
    );
    request.validate()?;

    let reporter = ConsoleReporter;
    let (attempts, result) = evaluate_with_retry(
        &evaluator,
        &args.question_id,
        &request,
        &config.batch_config(),
        &reporter,
    )
    .await;
    tracing::debug!(attempts, "evaluation finished");
    match &result {
        Ok(r) => reporter.on_complete(&args.question_id, r),
        Err(e) => reporter.on_error(&args.question_id, e),
    }
    let result = result.context("evaluation failed, please retry")?;

    if let Some(path) = &config.history_file(args.history) {
        let record = AnswerRecord::from_evaluation(
            args.student,
            args.question_id,
            args.answer,
            &result,
            args.time_spent,
            Utc::now(),
        );
        let mut snapshot = HistorySnapshot::load_or_default(path)?;
        snapshot.append(HistoryEntry::new(record, args.subject, args.topic));
        snapshot.save_json(path)?;
        eprintln!("Recorded in: {}", path.display());
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_result(&result),
    }

    Ok(())
}

fn print_result(result: &EvaluationResult) {
    let verdict = if result.passed() { "passed" } else { "not passed" };
    println!("Score: {}/100 ({verdict})", result.score);
    println!(
        "  Local {} / External {} (lexical {}, semantic {}, grammar {})",
        result.local_score,
        result.external_score,
        result.breakdown.lexical,
        result.breakdown.semantic,
        result.breakdown.grammar
    );

    if !result.feedback_items.is_empty() {
        println!("\nFeedback:");
        for item in &result.feedback_items {
            println!("  - {item}");
        }
    }
    if !result.strengths.is_empty() {
        println!("\nStrengths:");
        for s in &result.strengths {
            println!("  - {s}");
        }
    }
    if !result.improvements.is_empty() {
        println!("\nImprovements:");
        for i in &result.improvements {
            println!("  - {i}");
        }
    }
    if !result.grammar_issues.is_empty() {
        println!("\nGrammar notes from the judge:");
        for g in &result.grammar_issues {
            println!("  - {g}");
        }
    }
}
