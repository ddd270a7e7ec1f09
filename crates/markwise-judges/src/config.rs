//! Judge configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use markwise_core::batch::BatchConfig;
use markwise_core::evaluator::{EvaluatorConfig, ScoringWeights};
use markwise_core::traits::{Judge, DEFAULT_JUDGE_TEMPERATURE};

use crate::anthropic::AnthropicJudge;
use crate::mock::MockJudge;
use crate::openai::OpenAiJudge;

/// Configuration for a single judge.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JudgeConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        /// Overrides the workspace default model for this judge.
        #[serde(default)]
        model: Option<String>,
    },
    /// Offline judge returning a fixed verdict.
    Mock {
        #[serde(default = "default_mock_score")]
        score: u32,
        #[serde(default)]
        feedback: String,
    },
}

impl std::fmt::Debug for JudgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JudgeConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            JudgeConfig::Anthropic {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            JudgeConfig::Mock { score, feedback } => f
                .debug_struct("Mock")
                .field("score", score)
                .field("feedback", feedback)
                .finish(),
        }
    }
}

fn default_mock_score() -> u32 {
    75
}

/// Top-level markwise configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkwiseConfig {
    /// Judge configurations keyed by name.
    #[serde(default)]
    pub judges: HashMap<String, JudgeConfig>,
    /// Judge used when none is named.
    #[serde(default = "default_judge")]
    pub default_judge: String,
    /// Model passed to the judge.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Judge sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Max retries on transient judge errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max concurrent evaluations in a batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Where graded answers are recorded.
    #[serde(default)]
    pub history_path: Option<PathBuf>,
    #[serde(default)]
    pub scoring: ScoringWeights,
}

fn default_judge() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f64 {
    DEFAULT_JUDGE_TEMPERATURE
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_parallelism() -> usize {
    4
}

impl Default for MarkwiseConfig {
    fn default() -> Self {
        Self {
            judges: HashMap::new(),
            default_judge: default_judge(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            parallelism: default_parallelism(),
            history_path: None,
            scoring: ScoringWeights::default(),
        }
    }
}

impl MarkwiseConfig {
    /// Evaluator settings derived from this configuration.
    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            model: self.default_model.clone(),
            temperature: self.temperature,
            weights: self.scoring,
        }
    }

    /// Retry and concurrency settings derived from this configuration.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            parallelism: self.parallelism,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// History file to use: `explicit` if given, else the configured one.
    pub fn history_file(&self, explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| self.history_path.clone())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_judge_config(config: &JudgeConfig) -> JudgeConfig {
    match config {
        JudgeConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => JudgeConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        JudgeConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => JudgeConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            model: model.clone(),
        },
        JudgeConfig::Mock { .. } => config.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `markwise.toml` in the current directory
/// 2. `~/.config/markwise/config.toml`
///
/// Environment variable overrides: `MARKWISE_OPENAI_KEY`, `MARKWISE_ANTHROPIC_KEY`.
pub fn load_config() -> Result<MarkwiseConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MarkwiseConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("markwise.toml");
        if local.exists() {
            Some(local)
        } else {
            config_dir()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MarkwiseConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MarkwiseConfig::default(),
    };

    if let Ok(key) = std::env::var("MARKWISE_OPENAI_KEY") {
        let entry = config
            .judges
            .entry("openai".into())
            .or_insert(JudgeConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let JudgeConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("MARKWISE_ANTHROPIC_KEY") {
        let entry = config
            .judges
            .entry("anthropic".into())
            .or_insert(JudgeConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
                model: None,
            });
        if let JudgeConfig::Anthropic { api_key, .. } = entry {
            *api_key = key;
        }
    }

    config.judges = config
        .judges
        .iter()
        .map(|(k, v)| (k.clone(), resolve_judge_config(v)))
        .collect();

    config
        .scoring
        .validate()
        .context("invalid [scoring] weights")?;

    Ok(config)
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("markwise"))
}

/// Create a judge instance from its configuration.
pub fn create_judge(name: &str, config: &JudgeConfig) -> Result<Box<dyn Judge>> {
    let judge: Box<dyn Judge> = match config {
        JudgeConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Box::new(OpenAiJudge::new(api_key, base_url.clone(), org_id.clone())?),
        JudgeConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => Box::new(AnthropicJudge::new(
            api_key,
            base_url.clone(),
            model.clone(),
        )?),
        JudgeConfig::Mock { score, feedback } => {
            if *score > 100 {
                anyhow::bail!("judge '{name}': mock score {score} is above 100");
            }
            Box::new(MockJudge::with_score(*score, feedback))
        }
    };
    tracing::debug!(judge = name, "judge created");
    Ok(judge)
}
