//! Answer evaluation: local heuristic scoring fused with an external judgment.
//!
//! The local composite (lexical, semantic, grammar) and the external judge's
//! score are two independent sources. Both must be present to produce a
//! grade: if the judge fails, `evaluate` fails and no score is reported.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::EvalError;
use crate::grammar::{self, GrammarReport};
use crate::model::{join_feedback, EvaluationBreakdown, EvaluationRequest, EvaluationResult};
use crate::similarity::{self, SimilarityResult};
use crate::traits::{Judge, JudgeRequest, Verdict, DEFAULT_JUDGE_TEMPERATURE};

/// How many keywords to quote in the strong-points and coverage remarks.
const KEYWORDS_QUOTED: usize = 3;

/// Weights used to blend sub-scores into a final grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight of the lexical score in the local composite.
    #[serde(default = "default_lexical")]
    pub lexical: f64,
    /// Weight of the semantic score in the local composite.
    #[serde(default = "default_semantic")]
    pub semantic: f64,
    /// Weight of the grammar score in the local composite.
    #[serde(default = "default_grammar")]
    pub grammar: f64,
    /// Share of the local composite in the final score; the external
    /// score gets the rest.
    #[serde(default = "default_local_share")]
    pub local_share: f64,
}

fn default_lexical() -> f64 {
    0.4
}
fn default_semantic() -> f64 {
    0.4
}
fn default_grammar() -> f64 {
    0.2
}
fn default_local_share() -> f64 {
    0.5
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            lexical: default_lexical(),
            semantic: default_semantic(),
            grammar: default_grammar(),
            local_share: default_local_share(),
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), EvalError> {
        let all = [self.lexical, self.semantic, self.grammar, self.local_share];
        if all.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(EvalError::Validation {
                field: "scoring",
                reason: "every weight must be between 0.0 and 1.0".into(),
            });
        }
        let sum = self.lexical + self.semantic + self.grammar;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EvalError::Validation {
                field: "scoring",
                reason: format!("lexical + semantic + grammar must equal 1.0, got {sum}"),
            });
        }
        Ok(())
    }

    /// Weighted composite of the local breakdown, rounded.
    pub fn local_composite(&self, breakdown: &EvaluationBreakdown) -> u32 {
        (breakdown.lexical as f64 * self.lexical
            + breakdown.semantic as f64 * self.semantic
            + breakdown.grammar as f64 * self.grammar)
            .round() as u32
    }

    /// Fuse the local composite with the external score, rounded.
    pub fn fuse(&self, local: u32, external: u32) -> u32 {
        (local as f64 * self.local_share + external as f64 * (1.0 - self.local_share)).round()
            as u32
    }
}

/// Configuration for the evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Model the judge should use.
    pub model: String,
    /// Sampling temperature for the judge.
    pub temperature: f64,
    pub weights: ScoringWeights,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: DEFAULT_JUDGE_TEMPERATURE,
            weights: ScoringWeights::default(),
        }
    }
}

/// Grades answers. Holds no mutable state; share it freely across tasks.
#[derive(Clone)]
pub struct Evaluator {
    judge: Arc<dyn Judge>,
    config: EvaluatorConfig,
}

/// Everything the local scorers contribute to one evaluation.
#[derive(Debug, Clone)]
pub struct LocalAssessment {
    pub breakdown: EvaluationBreakdown,
    pub composite: u32,
    pub observations: Vec<String>,
}

impl Evaluator {
    pub fn new(judge: Arc<dyn Judge>, config: EvaluatorConfig) -> Result<Self, EvalError> {
        config.weights.validate()?;
        Ok(Self { judge, config })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Run the local scorers only. Never used as a grade on its own.
    pub fn assess_locally(&self, candidate: &str, reference: &str) -> LocalAssessment {
        let similarity = similarity::score(candidate, reference);
        let semantic = similarity::semantic_overlap(candidate, reference);
        let grammar = grammar::check(candidate);

        let breakdown = EvaluationBreakdown {
            lexical: (similarity.similarity * 100.0).round() as u32,
            semantic,
            grammar: grammar.score,
        };
        let composite = self.config.weights.local_composite(&breakdown);
        let observations = local_observations(breakdown.lexical, &similarity, &grammar);

        LocalAssessment {
            breakdown,
            composite,
            observations,
        }
    }

    /// Grade one answer.
    ///
    /// Fails if the request is invalid, if the judge call fails, or if the
    /// judge's verdict is outside its contract.
    #[instrument(skip(self, request), fields(subject = %request.subject, judge = %self.judge.name()))]
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvalError> {
        request.validate()?;

        let local = self.assess_locally(&request.candidate_answer, &request.reference_answer);
        tracing::debug!(
            lexical = local.breakdown.lexical,
            semantic = local.breakdown.semantic,
            grammar = local.breakdown.grammar,
            composite = local.composite,
            "local assessment complete"
        );

        let judge_request = JudgeRequest {
            model: self.config.model.clone(),
            question: request.question.clone(),
            candidate_answer: request.candidate_answer.clone(),
            reference_answer: request.reference_answer.clone(),
            subject: request.subject.clone(),
            temperature: self.config.temperature,
        };
        let verdict = self
            .judge
            .judge(&judge_request)
            .await
            .map_err(EvalError::Judge)?;
        check_verdict(&verdict)?;

        let score = self.config.weights.fuse(local.composite, verdict.score);
        tracing::debug!(
            local = local.composite,
            external = verdict.score,
            score,
            "scores fused"
        );

        let mut feedback_items = local.observations;
        if !verdict.feedback.trim().is_empty() {
            feedback_items.push(verdict.feedback.clone());
        }
        feedback_items.extend(verdict.improvements.iter().cloned());

        Ok(EvaluationResult {
            score,
            local_score: local.composite,
            external_score: verdict.score,
            feedback: join_feedback(&feedback_items),
            feedback_items,
            breakdown: local.breakdown,
            strengths: verdict.strengths,
            improvements: verdict.improvements,
            grammar_issues: verdict.grammar_issues,
        })
    }
}

fn check_verdict(verdict: &Verdict) -> Result<(), EvalError> {
    if verdict.score > 100 {
        return Err(EvalError::MalformedVerdict(format!(
            "score {} is outside 0..=100",
            verdict.score
        )));
    }
    Ok(())
}

/// Threshold remarks derived from the local scorers.
fn local_observations(
    lexical: u32,
    similarity: &SimilarityResult,
    grammar: &GrammarReport,
) -> Vec<String> {
    let mut observations = Vec::new();

    let coverage = match lexical {
        80.. => "Excellent keyword coverage and terminology usage!",
        60..=79 => "Good use of key terms, but consider including more specific concepts.",
        _ => "Try to include more relevant technical terminology in your answer.",
    };
    observations.push(coverage.to_string());

    if grammar.issues.is_empty() {
        observations.push("Well-written with clear grammar and spelling.".to_string());
    } else {
        observations.extend(grammar.issues.iter().cloned());
    }

    if !similarity.matched_keywords.is_empty() {
        observations.push(format!(
            "Strong points: You mentioned {}",
            quote_keywords(&similarity.matched_keywords)
        ));
    }
    if !similarity.missing_keywords.is_empty() {
        observations.push(format!(
            "Consider covering: {}",
            quote_keywords(&similarity.missing_keywords)
        ));
    }

    observations
}

fn quote_keywords(keywords: &[String]) -> String {
    keywords
        .iter()
        .take(KEYWORDS_QUOTED)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
