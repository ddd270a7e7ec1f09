//! markwise-core — Answer scoring, evaluation fusion, and performance analytics.
//!
//! This crate defines the data model, the local scorers, the evaluator that
//! fuses local and external judgments, and the analytics computed over a
//! student's graded-answer history.

pub mod analytics;
pub mod batch;
pub mod dashboard;
pub mod error;
pub mod evaluator;
pub mod grammar;
pub mod history;
pub mod model;
pub mod similarity;
pub mod traits;

pub use error::{EvalError, JudgeError};
pub use evaluator::Evaluator;
