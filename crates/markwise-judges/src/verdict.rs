//! Parsing of the JSON verdicts returned by language-model judges.

use serde::Deserialize;

use markwise_core::traits::Verdict;

use crate::JudgeError;

/// The verdict as the model writes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVerdict {
    score: f64,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default, alias = "grammar_issues")]
    grammar_issues: Vec<String>,
}

/// Locate the JSON object in a model response.
///
/// Handles:
/// - A bare JSON object
/// - A ```json (or generic ```) fenced block
/// - An object surrounded by prose
fn extract_json_object(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let body = match trimmed.find("```") {
        Some(fence) => {
            let after = &trimmed[fence + 3..];
            let after = after.strip_prefix("json").unwrap_or(after);
            match after.find("```") {
                Some(end) => &after[..end],
                None => after,
            }
        }
        None => trimmed,
    };
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

/// Parse a model response into a [`Verdict`].
///
/// The score must be a finite number in [0, 100]; it is rounded to an
/// integer. Missing list fields default to empty.
pub fn parse_verdict(content: &str) -> Result<Verdict, JudgeError> {
    let json = extract_json_object(content)
        .ok_or_else(|| JudgeError::MalformedVerdict("no JSON object in response".into()))?;
    let wire: WireVerdict = serde_json::from_str(json)
        .map_err(|e| JudgeError::MalformedVerdict(format!("invalid verdict JSON: {e}")))?;

    if !wire.score.is_finite() || !(0.0..=100.0).contains(&wire.score) {
        return Err(JudgeError::MalformedVerdict(format!(
            "score {} is outside 0..=100",
            wire.score
        )));
    }

    Ok(Verdict {
        score: wire.score.round() as u32,
        feedback: wire.feedback,
        strengths: wire.strengths,
        improvements: wire.improvements,
        grammar_issues: wire.grammar_issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_object() {
        let content = r#"{
            "score": 78,
            "feedback": "Good understanding of concepts but missing key details.",
            "strengths": ["Clear explanation"],
            "improvements": ["Elaborate on joins"],
            "grammarIssues": ["Spelling: 'databse' should be 'database'"]
        }"#;
        let verdict = parse_verdict(content).unwrap();
        assert_eq!(verdict.score, 78);
        assert_eq!(verdict.strengths, vec!["Clear explanation"]);
        assert_eq!(verdict.improvements, vec!["Elaborate on joins"]);
        assert_eq!(verdict.grammar_issues.len(), 1);
    }

    #[test]
    fn parse_fenced_block_with_prose() {
        let content = "Here is my evaluation:\n\n```json\n{\"score\": 64.6, \"feedback\": \"Fair\"}\n```\nHope it helps!";
        let verdict = parse_verdict(content).unwrap();
        assert_eq!(verdict.score, 65);
        assert_eq!(verdict.feedback, "Fair");
        assert!(verdict.strengths.is_empty());
    }

    #[test]
    fn missing_score_is_malformed() {
        let err = parse_verdict(r#"{"feedback": "no score here"}"#).unwrap_err();
        assert!(matches!(err, JudgeError::MalformedVerdict(_)));
    }

    #[test]
    fn out_of_range_score_is_malformed() {
        let err = parse_verdict(r#"{"score": 120, "feedback": "too generous"}"#).unwrap_err();
        assert!(err.to_string().contains("outside 0..=100"));

        assert!(parse_verdict(r#"{"score": -1}"#).is_err());
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_verdict("I think this answer deserves a B+.").unwrap_err();
        assert!(err.to_string().contains("no JSON object"));
    }
}
