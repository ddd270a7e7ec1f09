//! Mock judge for testing evaluation without real API calls.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use markwise_core::traits::{Judge, JudgeRequest, Verdict};

use crate::JudgeError;

/// A judge that returns a fixed verdict, or fails every call.
pub struct MockJudge {
    verdict: Option<Verdict>,
    call_count: AtomicU32,
    last_request: Mutex<Option<JudgeRequest>>,
}

impl MockJudge {
    /// Create a mock that always returns `verdict`.
    pub fn with_verdict(verdict: Verdict) -> Self {
        Self {
            verdict: Some(verdict),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that returns `score` with the given feedback and no lists.
    pub fn with_score(score: u32, feedback: &str) -> Self {
        Self::with_verdict(Verdict {
            score,
            feedback: feedback.to_string(),
            strengths: Vec::new(),
            improvements: Vec::new(),
            grammar_issues: Vec::new(),
        })
    }

    /// Create a mock whose every call fails with a network error.
    pub fn failing() -> Self {
        Self {
            verdict: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this judge.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this judge.
    pub fn last_request(&self) -> Option<JudgeRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Judge for MockJudge {
    fn name(&self) -> &str {
        "mock"
    }

    async fn judge(&self, request: &JudgeRequest) -> anyhow::Result<Verdict> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        match &self.verdict {
            Some(verdict) => Ok(verdict.clone()),
            None => Err(JudgeError::NetworkError("mock judge is unavailable".into()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> JudgeRequest {
        JudgeRequest {
            model: "mock".into(),
            question: "q".into(),
            candidate_answer: "a".into(),
            reference_answer: "r".into(),
            subject: "s".into(),
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn fixed_verdict() {
        let judge = MockJudge::with_score(77, "Fine");
        let verdict = judge.judge(&request()).await.unwrap();
        assert_eq!(verdict.score, 77);
        assert_eq!(verdict.feedback, "Fine");
        assert_eq!(judge.call_count(), 1);
        assert_eq!(judge.last_request().unwrap().subject, "s");
    }

    #[tokio::test]
    async fn failing_judge_is_retryable() {
        let judge = MockJudge::failing();
        let err = judge.judge(&request()).await.unwrap_err();
        let judge_err = err.downcast_ref::<JudgeError>().unwrap();
        assert!(!judge_err.is_permanent());
        assert_eq!(judge.call_count(), 1);
    }
}
