//! Web search backends.
//!
//! A search never fails for transport reasons: HTTP, network and decode
//! problems are logged and produce an empty result list. Only a missing
//! credential is reported, since no retry can fix it.

pub mod duckduckgo;
pub mod mock;
pub mod serper;
pub mod tavily;

use crate::config::SearchConfig;
use crate::error::{ConfigError, Result};
use crate::types::SearchResult;
use async_trait::async_trait;
use std::sync::Arc;

pub use duckduckgo::DuckDuckGoSearch;
pub use mock::MockSearchService;
pub use serper::SerperSearch;
pub use tavily::TavilySearch;

/// Capability interface for web search backends.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run one query. Zero results is a normal outcome.
    async fn search(&self, query: &str) -> std::result::Result<Vec<SearchResult>, ConfigError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Bind the search backend named by `config.provider`.
pub fn create_search_service(config: &SearchConfig) -> Result<Arc<dyn SearchService>> {
    let service: Arc<dyn SearchService> = match config.provider.to_lowercase().as_str() {
        "serper" => Arc::new(SerperSearch::new(config)?),
        "tavily" => Arc::new(TavilySearch::new(config)?),
        "duckduckgo" | "ddg" => Arc::new(DuckDuckGoSearch::new(config)?),
        "mock" => Arc::new(MockSearchService::new()),
        other => {
            return Err(ConfigError::UnknownProvider {
                capability: "search".to_string(),
                name: other.to_string(),
            }
            .into());
        }
    };
    tracing::debug!(provider = service.name(), "Search backend selected");
    Ok(service)
}

/// Read a JSON body from a search response, logging and swallowing any failure.
pub(crate) async fn json_or_warn(
    backend: &str,
    query: &str,
    sent: std::result::Result<reqwest::Response, reqwest::Error>,
) -> Option<serde_json::Value> {
    let response = match sent {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(backend, query, error = %e, "Search request failed");
            return None;
        }
    };
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(backend, query, %status, body = %body, "Search backend returned an error");
        return None;
    }
    match response.json().await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(backend, query, error = %e, "Failed to decode search response");
            None
        }
    }
}

/// Read a string field, treating absence as empty.
pub(crate) fn str_field(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_search_service_selection() {
        let mut config = SearchConfig::default();
        for (name, expected) in [
            ("serper", "serper"),
            ("Tavily", "tavily"),
            ("duckduckgo", "duckduckgo"),
            ("mock", "mock"),
        ] {
            config.provider = name.to_string();
            assert_eq!(create_search_service(&config).unwrap().name(), expected);
        }
    }

    #[test]
    fn test_create_search_service_unknown() {
        let config = SearchConfig {
            provider: "altavista".to_string(),
            ..SearchConfig::default()
        };
        let err = create_search_service(&config).err().unwrap();
        assert!(matches!(
            err,
            crate::error::FerretError::Config(ConfigError::UnknownProvider { ref name, .. })
                if name == "altavista"
        ));
    }

    #[test]
    fn test_str_field() {
        let value = serde_json::json!({"title": "Fusion", "n": 3});
        assert_eq!(str_field(&value, "title"), "Fusion");
        assert_eq!(str_field(&value, "n"), "");
        assert_eq!(str_field(&value, "missing"), "");
    }
}
