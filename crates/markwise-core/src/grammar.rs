//! Heuristic grammar and spelling checks.

use serde::{Deserialize, Serialize};

use crate::similarity::tokenize;

/// Misspelling → correction. Matched as whole tokens, case-insensitively.
pub const COMMON_MISSPELLINGS: &[(&str, &str)] = &[
    ("teh", "the"),
    ("databse", "database"),
    ("algoritm", "algorithm"),
    ("funciton", "function"),
    ("recieve", "receive"),
    ("seperate", "separate"),
    ("occured", "occurred"),
    ("definately", "definitely"),
    ("enviroment", "environment"),
    ("paramter", "parameter"),
];

pub const MISSPELLING_PENALTY: u32 = 5;
pub const LONG_SENTENCE_PENALTY: u32 = 2;
pub const CAPITALIZATION_PENALTY: u32 = 3;
/// Sentences longer than this many characters are flagged.
pub const LONG_SENTENCE_CHARS: usize = 200;

pub const LONG_SENTENCE_ISSUE: &str = "Consider breaking up very long sentences for clarity";
pub const CAPITALIZATION_ISSUE: &str = "Sentences should start with capital letters";

/// Outcome of a grammar check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarReport {
    /// 100 minus accumulated penalties, floored at 0.
    pub score: u32,
    /// One entry per triggering occurrence, in discovery order.
    pub issues: Vec<String>,
}

/// Score `text` against the misspelling dictionary and basic sentence rules.
pub fn check(text: &str) -> GrammarReport {
    let mut penalty = 0u32;
    let mut issues = Vec::new();

    for token in tokenize(text) {
        if let Some((wrong, right)) = COMMON_MISSPELLINGS
            .iter()
            .find(|(wrong, _)| *wrong == token)
        {
            issues.push(format!("Spelling: '{wrong}' should be '{right}'"));
            penalty += MISSPELLING_PENALTY;
        }
    }

    for sentence in sentences(text) {
        if sentence.chars().count() > LONG_SENTENCE_CHARS {
            issues.push(LONG_SENTENCE_ISSUE.to_string());
            penalty += LONG_SENTENCE_PENALTY;
        }
        let starts_upper = sentence.chars().next().is_some_and(char::is_uppercase);
        if !starts_upper {
            issues.push(CAPITALIZATION_ISSUE.to_string());
            penalty += CAPITALIZATION_PENALTY;
        }
    }

    GrammarReport {
        score: 100u32.saturating_sub(penalty),
        issues,
    }
}

/// Split on sentence terminators, trimming and dropping empty pieces.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
