//! Anthropic messages API judge.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use markwise_core::traits::{build_judge_prompt, Judge, JudgeRequest, Verdict, JUDGE_SYSTEM_PROMPT};

use crate::verdict::parse_verdict;
use crate::JudgeError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Judge backed by the Anthropic messages API.
///
/// When `model` is set it replaces the model named in the request, so a
/// workspace whose default model is an OpenAI one can still route to Claude.
pub struct AnthropicJudge {
    api_key: String,
    base_url: String,
    model: Option<String>,
    client: reqwest::Client,
}

impl AnthropicJudge {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model,
            client,
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

#[async_trait]
impl Judge for AnthropicJudge {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(subject = %request.subject))]
    async fn judge(&self, request: &JudgeRequest) -> anyhow::Result<Verdict> {
        let model = self.model.clone().unwrap_or_else(|| request.model.clone());

        let body = MessagesRequest {
            model: model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: request.temperature,
            system: JUDGE_SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: build_judge_prompt(request),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
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
            return Err(JudgeError::ModelNotFound(model).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(JudgeError::ApiError { status, message }.into());
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::MalformedVerdict(format!("failed to parse response: {e}")))?;

        let content: String = api_response
            .content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        let verdict = parse_verdict(&content)?;
        tracing::debug!(score = verdict.score, "judge verdict received");
        Ok(verdict)
    }
}
