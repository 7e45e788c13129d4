//! DuckDuckGo instant-answer backend. Needs no API key.

use super::{SearchService, json_or_warn, str_field};
use crate::config::SearchConfig;
use crate::error::ConfigError;
use crate::providers::http_client;
use crate::types::SearchResult;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(config: &SearchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            max_results: config.max_results,
        })
    }

    /// Topic text reads "Title - description"; the title is the part before the dash.
    fn topic_result(topic: &Value) -> Option<SearchResult> {
        let text = topic.get("Text")?.as_str()?;
        let url = topic.get("FirstURL")?.as_str()?;
        let title = text.split(" - ").next().unwrap_or(text);
        Some(SearchResult::new(title, url, text))
    }

    fn parse_results(body: &Value, max_results: usize) -> Vec<SearchResult> {
        let mut results = Vec::new();

        let abstract_text = str_field(body, "AbstractText");
        if !abstract_text.is_empty() {
            let heading = str_field(body, "Heading");
            let title = if heading.is_empty() {
                str_field(body, "AbstractSource")
            } else {
                heading
            };
            results.push(SearchResult::new(
                title,
                str_field(body, "AbstractURL"),
                abstract_text,
            ));
        }

        for section in ["Results", "RelatedTopics"] {
            let Some(topics) = body.get(section).and_then(|v| v.as_array()) else {
                continue;
            };
            // Disambiguation groups nest their entries under "Topics".
            for topic in topics {
                match topic.get("Topics").and_then(|t| t.as_array()) {
                    Some(nested) => results.extend(nested.iter().filter_map(Self::topic_result)),
                    None => results.extend(Self::topic_result(topic)),
                }
            }
        }

        results.truncate(max_results);
        results
    }
}

#[async_trait]
impl SearchService for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ConfigError> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );
        debug!(query, "DuckDuckGo search");

        let sent = self.client.get(&url).send().await;
        Ok(json_or_warn("duckduckgo", query, sent)
            .await
            .map(|body| Self::parse_results(&body, self.max_results))
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}
