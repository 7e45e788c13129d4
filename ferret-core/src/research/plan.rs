//! Research planning: turn a query into a set of search queries.

use super::json::parse_fenced;
use crate::types::ResearchPlan;
use serde_json::Value;
use tracing::warn;

pub const PLAN_SYSTEM_PROMPT: &str = "You are a helpful assistant. Output only JSON.";

pub fn plan_prompt(query: &str) -> String {
    format!(
        r#"You are an expert Information Collector. Your goal is to gather comprehensive information about the user's query.
Analyze the query and generate 3-5 distinct search queries to cover different aspects of the topic.
Also, identify if we should specifically look for documents (PDF, DOCX, XLSX).

User Query: {query}

Return a JSON object with:
- "search_queries": list of strings
- "look_for_documents": boolean (true if the query implies need for papers, reports, data sheets)"#
    )
}

/// Parse the planner's reply, falling back to the single-query plan.
///
/// The two fields are read independently, so a malformed
/// `look_for_documents` does not cost the queries. Blank, repeated and
/// non-string queries are dropped. An unparseable reply or an empty query
/// list yields [`ResearchPlan::fallback`].
pub fn parse_plan(response: &str, query: &str) -> ResearchPlan {
    let value: Value = match parse_fenced(response) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Could not parse research plan; using the query itself");
            return ResearchPlan::fallback(query);
        }
    };

    let mut search_queries: Vec<String> = Vec::new();
    let listed = value
        .get("search_queries")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for q in listed.iter().filter_map(Value::as_str) {
        let q = q.trim();
        if !q.is_empty() && !search_queries.iter().any(|seen| seen == q) {
            search_queries.push(q.to_string());
        }
    }

    let look_for_documents = match value.get("look_for_documents") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            warn!(value = %other, "Ignoring non-boolean look_for_documents");
            false
        }
    };

    if search_queries.is_empty() {
        warn!("Research plan has no search queries; using the query itself");
        return ResearchPlan::fallback(query);
    }
    ResearchPlan {
        search_queries,
        look_for_documents,
    }
}
