//! CHAT vs RESEARCH routing.

use super::json::parse_fenced;
use crate::error::{FerretError, Result};
use crate::providers::TextGenerator;
use crate::types::{Classification, QueryKind, Turn};
use serde::Deserialize;
use tracing::{debug, warn};

pub const CLASSIFY_SYSTEM_PROMPT: &str = "You are a helpful assistant. Output only JSON.";

#[derive(Deserialize)]
struct RawClassification {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    response: Option<String>,
}

pub fn classify_prompt(query: &str) -> String {
    format!(
        r#"You are a helpful assistant. Determine if the following user query requires a web search (RESEARCH) or if it's a casual conversation/greeting (CHAT).

User Query: {query}

Return a JSON object with:
- "type": "CHAT" or "RESEARCH"
- "response": string (if CHAT, provide a friendly response here, else null)"#
    )
}

/// Parse a classifier reply. Anything that is not a well-formed CHAT verdict is research.
pub fn parse_classification(response: &str) -> Classification {
    match parse_fenced::<RawClassification>(response) {
        Ok(raw) if raw.kind.trim().eq_ignore_ascii_case("chat") => Classification {
            kind: QueryKind::Chat,
            response: raw.response,
        },
        Ok(raw) => {
            if !raw.kind.trim().eq_ignore_ascii_case("research") {
                warn!(kind = %raw.kind, "Unknown classification type; treating as research");
            }
            Classification::research()
        }
        Err(e) => {
            warn!(error = %e, "Could not parse classification; treating as research");
            Classification::research()
        }
    }
}

/// Ask the generator whether `query` needs research.
///
/// Generation failures route to research, except configuration errors such
/// as a missing credential, which no later stage could recover from.
pub async fn classify(
    generator: &dyn TextGenerator,
    query: &str,
    history: &[Turn],
) -> Result<Classification> {
    match generator
        .generate(&classify_prompt(query), history, Some(CLASSIFY_SYSTEM_PROMPT))
        .await
    {
        Ok(response) => {
            let classification = parse_classification(&response);
            debug!(kind = %classification.kind, "Query classified");
            Ok(classification)
        }
        Err(e @ FerretError::Config(_)) => Err(e),
        Err(e) => {
            warn!(error = %e, "Classification call failed; treating as research");
            Ok(Classification::research())
        }
    }
}
