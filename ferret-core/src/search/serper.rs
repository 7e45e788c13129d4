//! Serper.dev (Google results) search backend.

use super::{SearchService, json_or_warn, str_field};
use crate::config::{SearchConfig, resolve_credential};
use crate::error::ConfigError;
use crate::providers::http_client;
use crate::types::SearchResult;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

const SERPER_URL: &str = "https://google.serper.dev/search";
const DEFAULT_KEY_ENV: &str = "SERPER_API_KEY";

pub struct SerperSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    api_key_env: String,
    max_results: usize,
}

impl SerperSearch {
    pub fn new(config: &SearchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: config.api_key.clone(),
            api_key_env: config
                .api_key_env
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_ENV.to_string()),
            max_results: config.max_results,
        })
    }

    /// Map the `organic` section to results: title, link, snippet.
    fn parse_results(body: &Value) -> Vec<SearchResult> {
        body.get("organic")
            .and_then(|o| o.as_array())
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        SearchResult::new(
                            str_field(item, "title"),
                            str_field(item, "link"),
                            str_field(item, "snippet"),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchService for SerperSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ConfigError> {
        let api_key = resolve_credential("serper", self.api_key.as_deref(), &self.api_key_env)?;
        debug!(query, "Serper search");

        let sent = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", api_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "q": query, "num": self.max_results }))
            .send()
            .await;

        Ok(json_or_warn("serper", query, sent)
            .await
            .map(|body| Self::parse_results(&body))
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "serper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_organic_results() {
        let body = json!({
            "searchParameters": {"q": "fusion"},
            "organic": [
                {"title": "ITER", "link": "https://iter.org", "snippet": "Tokamak", "position": 1},
                {"title": "No snippet", "link": "https://example.com/a.pdf"}
            ]
        });
        let results = SerperSearch::parse_results(&body);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            SearchResult::new("ITER", "https://iter.org", "Tokamak")
        );
        assert_eq!(results[1].content, "");
    }

    #[test]
    fn test_parse_without_organic_is_empty() {
        assert!(SerperSearch::parse_results(&json!({"knowledgeGraph": {}})).is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var("FERRET_TEST_SERPER_KEY") };
        let config = SearchConfig {
            api_key_env: Some("FERRET_TEST_SERPER_KEY".to_string()),
            ..SearchConfig::default()
        };
        let search = SerperSearch::new(&config).unwrap();
        assert!(matches!(
            search.search("fusion").await,
            Err(ConfigError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_default_key_env() {
        let search = SerperSearch::new(&SearchConfig::default()).unwrap();
        assert_eq!(search.api_key_env, "SERPER_API_KEY");
    }
}
