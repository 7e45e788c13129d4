//! Strict parsing of JSON emitted by a text generator.

use serde::de::DeserializeOwned;

/// Remove a surrounding Markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Strip fences, then parse the whole remaining text as `T`.
pub fn parse_fenced<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fences(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1, 2]\n```\n"), "[1, 2]");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json {\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_fenced_is_strict() {
        let ok: Value = parse_fenced("```json\n{\"type\": \"CHAT\"}\n```").unwrap();
        assert_eq!(ok["type"], "CHAT");
        assert!(parse_fenced::<Value>("Sure! {\"type\": \"CHAT\"}").is_err());
        assert!(parse_fenced::<Value>("not json").is_err());
    }
}
