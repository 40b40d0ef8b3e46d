use crate::domain::contract::{self, Extraction};
use crate::llm::error::ExtractionError;
use crate::llm::Provider;
use serde_json::Value;

const FENCE: &str = "```";

/// Removes Markdown code-fence markup around a model reply.
///
/// A leading fence is recognized only at the very start of the trimmed text. If the
/// rest of that line is empty or a language tag (```` ```json ````), the whole line is
/// dropped; otherwise only the backticks are. A trailing fence is recognized only at
/// the very end. Backticks anywhere else are left alone. A tag followed by a space
/// on a one-line fence is dropped too.
pub fn strip_code_fence(text: &str) -> &str {
    let mut inner = text.trim();

    if let Some(after_open) = inner.strip_prefix(FENCE) {
        let (first_line, rest) = after_open.split_once('\n').unwrap_or((after_open, ""));
        inner = if is_language_tag(first_line.trim()) {
            rest
        } else {
            // One-line form with a tag: ```json [...]```
            match after_open.split_once(char::is_whitespace) {
                Some((tag, body)) if is_language_tag(tag) => body,
                _ => after_open,
            }
        };
    }

    let inner = inner.trim();
    inner.strip_suffix(FENCE).unwrap_or(inner).trim()
}

fn is_language_tag(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.'))
}

/// Parses a raw reply into validated subscription records.
pub fn parse_subscriptions(text: &str, provider: Provider) -> Result<Extraction, ExtractionError> {
    let json_str = strip_code_fence(text);
    let malformed = |detail: String| ExtractionError::MalformedResponse {
        provider,
        detail,
        raw_output: Some(text.to_string()),
    };

    let value = serde_json::from_str::<Value>(json_str).map_err(|e| malformed(e.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(malformed(format!("expected a JSON array, got {}", type_name(&value))));
    };

    Ok(contract::validate_entries(entries))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::BillingPeriod;

    const BODY: &str = r#"[{"name": "Netflix", "price": 15.99, "period": "monthly"}]"#;

    #[test]
    fn strip_code_fence_handles_language_tag() {
        let fenced = format!("```json\n{BODY}\n```\n");
        assert_eq!(strip_code_fence(&fenced), BODY);
    }

    #[test]
    fn strip_code_fence_handles_bare_fence() {
        let fenced = format!("```\n{BODY}\n```");
        assert_eq!(strip_code_fence(&fenced), BODY);
    }

    #[test]
    fn strip_code_fence_handles_single_line_fence() {
        let fenced = format!("```{BODY}```");
        assert_eq!(strip_code_fence(&fenced), BODY);
    }

    #[test]
    fn strip_code_fence_handles_single_line_fence_with_tag() {
        let fenced = format!("```json {BODY}```");
        assert_eq!(strip_code_fence(&fenced), BODY);
        assert_eq!(
            parse_subscriptions(&fenced, Provider::Fixture).unwrap().records.len(),
            1
        );
    }

    #[test]
    fn strip_code_fence_leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fence(&format!("  {BODY}\n")), BODY);
    }

    #[test]
    fn strip_code_fence_ignores_mid_content_backticks() {
        let text = r#"[{"name": "```weird```", "price": 1, "period": "monthly"}]"#;
        assert_eq!(strip_code_fence(text), text);
    }

    #[test]
    fn fenced_reply_parses_like_unwrapped_reply() {
        let fenced = format!("```json\n{BODY}\n```");
        let a = parse_subscriptions(&fenced, Provider::Fixture).unwrap();
        let b = parse_subscriptions(BODY, Provider::Fixture).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.records[0].period, BillingPeriod::Monthly);
    }

    #[test]
    fn empty_array_is_a_valid_empty_result() {
        let out = parse_subscriptions("[]", Provider::Fixture).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.dropped, 0);
    }

    #[test]
    fn prose_is_malformed() {
        let err = parse_subscriptions("I could not find any subscriptions.", Provider::Fixture)
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn non_array_json_is_malformed() {
        let err = parse_subscriptions(r#"{"name": "Netflix"}"#, Provider::Fixture).unwrap_err();
        match err {
            ExtractionError::MalformedResponse { detail, raw_output, .. } => {
                assert!(detail.contains("an object"));
                assert!(raw_output.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
