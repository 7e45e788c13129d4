//! Tavily search backend.

use super::{SearchService, json_or_warn, str_field};
use crate::config::{SearchConfig, resolve_credential};
use crate::error::ConfigError;
use crate::providers::http_client;
use crate::types::SearchResult;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

const TAVILY_URL: &str = "https://api.tavily.com/search";
const DEFAULT_KEY_ENV: &str = "TAVILY_API_KEY";

pub struct TavilySearch {
    client: reqwest::Client,
    api_key: Option<String>,
    api_key_env: String,
    max_results: usize,
}

impl TavilySearch {
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

    fn request_body(&self, api_key: &str, query: &str) -> Value {
        json!({
            "api_key": api_key,
            "query": query,
            "search_depth": "advanced",
            "max_results": self.max_results,
        })
    }

    fn parse_results(body: &Value) -> Vec<SearchResult> {
        body.get("results")
            .and_then(|r| r.as_array())
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        SearchResult::new(
                            str_field(item, "title"),
                            str_field(item, "url"),
                            str_field(item, "content"),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchService for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ConfigError> {
        let api_key = resolve_credential("tavily", self.api_key.as_deref(), &self.api_key_env)?;
        debug!(query, "Tavily search");

        let sent = self
            .client
            .post(TAVILY_URL)
            .bearer_auth(&api_key)
            .json(&self.request_body(&api_key, query))
            .send()
            .await;

        Ok(json_or_warn("tavily", query, sent)
            .await
            .map(|body| Self::parse_results(&body))
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
