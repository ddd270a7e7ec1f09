//! markwise-judges — External answer-judgment integrations.
//!
//! Implements the `Judge` trait for OpenAI-compatible and Anthropic APIs,
//! plus a deterministic mock, so the evaluator can obtain a holistic score
//! from a language model.

pub mod anthropic;
pub mod config;
pub mod mock;
pub mod openai;
pub mod verdict;

pub use config::{create_judge, load_config, JudgeConfig, MarkwiseConfig};
pub use markwise_core::error::JudgeError;
pub use verdict::parse_verdict;
