//! Collaborator contracts: the external judgment service and the
//! answer-history provider.
//!
//! Judges are implemented by the `markwise-judges` crate. History providers
//! belong to the surrounding application; [`crate::history::HistorySnapshot`]
//! is a file-backed one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::HistoryEntry;

// ---------------------------------------------------------------------------
// Judge trait
// ---------------------------------------------------------------------------

/// An external service that grades an answer holistically.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Human-readable judge name (e.g. "openai").
    fn name(&self) -> &str;

    /// Grade one answer. A single request/response; no retries.
    async fn judge(&self, request: &JudgeRequest) -> anyhow::Result<Verdict>;
}

/// What the judge is asked to grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Model identifier (e.g. "gpt-4o").
    pub model: String,
    pub question: String,
    pub candidate_answer: String,
    pub reference_answer: String,
    pub subject: String,
    /// Sampling temperature.
    pub temperature: f64,
}

/// The judge's holistic assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Score in 0..=100.
    pub score: u32,
    /// Free-text personalized feedback.
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub grammar_issues: Vec<String>,
}

/// Default sampling temperature for judgments.
pub const DEFAULT_JUDGE_TEMPERATURE: f64 = 0.3;

/// System prompt shared by chat-style judges.
pub const JUDGE_SYSTEM_PROMPT: &str = "You are an experienced educator who provides constructive, personalized feedback to help students improve.";

/// Build the user prompt asking a judge for a JSON verdict.
pub fn build_judge_prompt(request: &JudgeRequest) -> String {
    format!(
        "Evaluate this student answer against the model answer for a {subject} question.\n\n\
         Question: {question}\n\n\
         Model Answer: {reference}\n\n\
         Student Answer: {candidate}\n\n\
         Provide:\n\
         1. Score out of 100\n\
         2. Personalized feedback\n\
         3. What the student did well (strengths)\n\
         4. Areas for improvement\n\
         5. Any grammar/spelling issues\n\n\
         Respond with JSON in this format:\n\
         {{\"score\": 78, \"feedback\": \"...\", \"strengths\": [\"...\"], \
         \"improvements\": [\"...\"], \"grammarIssues\": [\"...\"]}}",
        subject = request.subject,
        question = request.question,
        reference = request.reference_answer,
        candidate = request.candidate_answer,
    )
}

// ---------------------------------------------------------------------------
// History provider trait
// ---------------------------------------------------------------------------

/// Read-only feed of a student's graded answers.
pub trait HistoryProvider: Send + Sync {
    /// All answers by `student_id`, each joined with its subject and topic.
    /// May be empty.
    fn answers_for(&self, student_id: &str) -> anyhow::Result<Vec<HistoryEntry>>;
}
