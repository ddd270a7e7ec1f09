//! OpenAI-compatible chat completions judge.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use markwise_core::traits::{build_judge_prompt, Judge, JudgeRequest, Verdict, JUDGE_SYSTEM_PROMPT};

use crate::verdict::parse_verdict;
use crate::JudgeError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Judge backed by an OpenAI-compatible API in JSON mode.
pub struct OpenAiJudge {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiJudge {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            client,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

#[async_trait]
impl Judge for OpenAiJudge {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model, subject = %request.subject))]
    async fn judge(&self, request: &JudgeRequest) -> anyhow::Result<Verdict> {
        let body = ChatRequest {
            model: request.model.clone(),
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: JUDGE_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_judge_prompt(request),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                JudgeError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                JudgeError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(JudgeError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(JudgeError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(JudgeError::ModelNotFound(request.model.clone()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(JudgeError::ApiError { status, message }.into());
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::MalformedVerdict(format!("failed to parse response: {e}")))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| JudgeError::MalformedVerdict("response has no content".into()))?;

        let verdict = parse_verdict(&content)?;
        tracing::debug!(score = verdict.score, "judge verdict received");
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markwise_core::traits::DEFAULT_JUDGE_TEMPERATURE;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> JudgeRequest {
        JudgeRequest {
            model: "gpt-4o".into(),
            question: "What is a primary key?".into(),
            candidate_answer: "A column that identifies rows.".into(),
            reference_answer: "A primary key uniquely identifies each row in a table.".into(),
            subject: "Databases".into(),
            temperature: DEFAULT_JUDGE_TEMPERATURE,
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn successful_judgment() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"score": 72, "feedback": "Mostly right", "strengths": ["Concise"], "improvements": ["Say uniquely"]}"#,
            )))
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("test-key", Some(server.uri()), None).unwrap();
        let verdict = judge.judge(&request()).await.unwrap();
        assert_eq!(verdict.score, 72);
        assert_eq!(verdict.feedback, "Mostly right");
        assert_eq!(verdict.improvements, vec!["Say uniquely"]);
    }

    #[tokio::test]
    async fn organization_header_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("OpenAI-Organization", "org-123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(r#"{"score": 50}"#)),
            )
            .mount(&server)
            .await;

        let judge =
            OpenAiJudge::new("test-key", Some(server.uri()), Some("org-123".into())).unwrap();
        assert_eq!(judge.judge(&request()).await.unwrap().score, 50);
    }

    #[tokio::test]
    async fn malformed_content_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("I cannot grade this.")),
            )
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("test-key", Some(server.uri()), None).unwrap();
        let err = judge.judge(&request()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JudgeError>(),
            Some(JudgeError::MalformedVerdict(_))
        ));
    }

    #[tokio::test]
    async fn server_error_message_is_extracted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": {"message": "The server had an error"}
            })))
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("test-key", Some(server.uri()), None).unwrap();
        let err = judge.judge(&request()).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("The server had an error"));
    }

    #[tokio::test]
    async fn rate_limiting() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let judge = OpenAiJudge::new("test-key", Some(server.uri()), None).unwrap();
        let err = judge.judge(&request()).await.unwrap_err();
        let judge_err = err.downcast_ref::<JudgeError>().unwrap();
        assert_eq!(judge_err.retry_after_ms(), Some(3000));
    }
}
