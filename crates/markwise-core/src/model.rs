//! Core data model types for markwise.
//!
//! These are the values that flow between the evaluator, the persistence
//! collaborator, and the analytics engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EvalError;

/// Minimum final score for an answer to count as passed.
pub const PASS_THRESHOLD: u32 = 70;

/// An answer as it arrives from the outside world, before validation.
///
/// Every text field is optional here so that a missing value can be
/// rejected explicitly instead of being scored as an empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerSubmission {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub candidate_answer: Option<String>,
    #[serde(default)]
    pub reference_answer: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

/// A validated request to grade one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// The question being answered.
    pub question: String,
    /// The student's answer. May be empty; an empty answer scores zero.
    pub candidate_answer: String,
    /// The reference (model) answer to grade against.
    pub reference_answer: String,
    /// Subject the question belongs to (e.g. "Computer Science").
    pub subject: String,
}

impl EvaluationRequest {
    pub fn new(
        question: impl Into<String>,
        candidate_answer: impl Into<String>,
        reference_answer: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            candidate_answer: candidate_answer.into(),
            reference_answer: reference_answer.into(),
            subject: subject.into(),
        }
    }

    /// Check the invariants a request must hold before it is scored.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.reference_answer.trim().is_empty() {
            return Err(EvalError::Validation {
                field: "reference_answer",
                reason: "reference answer is empty".into(),
            });
        }
        if self.subject.trim().is_empty() {
            return Err(EvalError::Validation {
                field: "subject",
                reason: "subject is empty".into(),
            });
        }
        Ok(())
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, EvalError> {
    value.ok_or(EvalError::Validation {
        field,
        reason: "value is missing".into(),
    })
}

impl TryFrom<AnswerSubmission> for EvaluationRequest {
    type Error = EvalError;

    fn try_from(submission: AnswerSubmission) -> Result<Self, Self::Error> {
        let request = EvaluationRequest {
            question: required(submission.question, "question")?,
            candidate_answer: required(submission.candidate_answer, "candidate_answer")?,
            reference_answer: required(submission.reference_answer, "reference_answer")?,
            subject: required(submission.subject, "subject")?,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Local sub-scores behind a final grade. Each is in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationBreakdown {
    /// Cosine similarity of term-frequency vectors, as a percentage.
    pub lexical: u32,
    /// Token-set Jaccard overlap, as a percentage.
    pub semantic: u32,
    /// Grammar heuristic score.
    pub grammar: u32,
}

/// The outcome of grading one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Final score: fusion of the local composite and the external score.
    pub score: u32,
    /// Weighted composite of the local breakdown.
    pub local_score: u32,
    /// Score reported by the external judge.
    pub external_score: u32,
    /// All feedback items joined into one text.
    pub feedback: String,
    /// Feedback items in order: local observations, then the judge's
    /// feedback, then its improvements.
    pub feedback_items: Vec<String>,
    pub breakdown: EvaluationBreakdown,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    /// Grammar remarks reported by the judge, kept apart from the local ones.
    #[serde(default)]
    pub grammar_issues: Vec<String>,
}

impl EvaluationResult {
    pub fn passed(&self) -> bool {
        self.score >= PASS_THRESHOLD
    }
}

/// Join feedback items the way they are stored on an answer record.
///
/// Items are separated by ". ", or by a single space when the previous item
/// already ends in `!` or `?`.
pub fn join_feedback(items: &[String]) -> String {
    let mut joined = String::new();
    for item in items {
        let item = item.trim().trim_end_matches('.');
        if item.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            if joined.ends_with(['!', '?']) {
                joined.push(' ');
            } else {
                joined.push_str(". ");
            }
        }
        joined.push_str(item);
    }
    joined
}

/// A single graded submission.
///
/// Records are immutable: an edited answer is a new record. The score can
/// only come from an [`EvaluationResult`], and stored records are checked
/// on load so that every score stays within 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredAnswerRecord")]
pub struct AnswerRecord {
    id: Uuid,
    student_id: String,
    question_id: String,
    answer_text: String,
    score: u32,
    feedback: String,
    breakdown: EvaluationBreakdown,
    time_spent_secs: u64,
    created_at: DateTime<Utc>,
}

/// An answer record as read from storage, before its scores are checked.
/// A stored `passed` flag, if any, is ignored and re-derived from the score.
#[derive(Deserialize)]
struct StoredAnswerRecord {
    id: Uuid,
    student_id: String,
    question_id: String,
    answer_text: String,
    score: u32,
    feedback: String,
    breakdown: EvaluationBreakdown,
    time_spent_secs: u64,
    created_at: DateTime<Utc>,
}

fn check_percentage(field: &'static str, value: u32) -> Result<(), EvalError> {
    if value > 100 {
        return Err(EvalError::Validation {
            field,
            reason: format!("{value} is outside 0..=100"),
        });
    }
    Ok(())
}

impl TryFrom<StoredAnswerRecord> for AnswerRecord {
    type Error = EvalError;

    fn try_from(stored: StoredAnswerRecord) -> Result<Self, Self::Error> {
        check_percentage("score", stored.score)?;
        check_percentage("breakdown.lexical", stored.breakdown.lexical)?;
        check_percentage("breakdown.semantic", stored.breakdown.semantic)?;
        check_percentage("breakdown.grammar", stored.breakdown.grammar)?;
        Ok(Self {
            id: stored.id,
            student_id: stored.student_id,
            question_id: stored.question_id,
            answer_text: stored.answer_text,
            score: stored.score,
            feedback: stored.feedback,
            breakdown: stored.breakdown,
            time_spent_secs: stored.time_spent_secs,
            created_at: stored.created_at,
        })
    }
}

impl AnswerRecord {
    /// Build the record persisted after a successful evaluation.
    pub fn from_evaluation(
        student_id: impl Into<String>,
        question_id: impl Into<String>,
        answer_text: impl Into<String>,
        result: &EvaluationResult,
        time_spent_secs: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            question_id: question_id.into(),
            answer_text: answer_text.into(),
            score: result.score.min(100),
            feedback: result.feedback.clone(),
            breakdown: result.breakdown,
            time_spent_secs,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn breakdown(&self) -> &EvaluationBreakdown {
        &self.breakdown
    }

    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    pub fn passed(&self) -> bool {
        self.score >= PASS_THRESHOLD
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// An answer record joined with its question's subject and topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: AnswerRecord,
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
}

impl HistoryEntry {
    pub fn new(record: AnswerRecord, subject: impl Into<String>, topic: Option<String>) -> Self {
        Self {
            record,
            subject: subject.into(),
            topic,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A result carrying only a final score, for analytics tests.
    pub fn result_with_score(score: u32) -> EvaluationResult {
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

    pub fn entry(subject: &str, score: u32, created_at: DateTime<Utc>) -> HistoryEntry {
        let record = AnswerRecord::from_evaluation(
            "student-1",
            "q-1",
            "answer",
            &result_with_score(score),
            60,
            created_at,
        );
        HistoryEntry::new(record, subject, None)
    }
}
