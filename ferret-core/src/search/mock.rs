//! Mock search backend for tests and offline runs.

use super::SearchService;
use crate::error::ConfigError;
use crate::types::SearchResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock search service.
///
/// Scripted queries return their scripted results. Other queries return two
/// canned results, or nothing when built with [`MockSearchService::empty`].
pub struct MockSearchService {
    scripted: HashMap<String, Vec<SearchResult>>,
    canned: bool,
    queries: Mutex<Vec<String>>,
}

impl MockSearchService {
    pub fn new() -> Self {
        Self {
            scripted: HashMap::new(),
            canned: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A mock whose unscripted queries return no results.
    pub fn empty() -> Self {
        Self {
            canned: false,
            ..Self::new()
        }
    }

    /// Script the results for one exact query string.
    pub fn with_results(mut self, query: impl Into<String>, results: Vec<SearchResult>) -> Self {
        self.scripted.insert(query.into(), results);
        self
    }

    /// Queries received so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn canned_results(query: &str) -> Vec<SearchResult> {
        vec![
            SearchResult::new(
                "Mock Search Result 1",
                "http://mock.url/1",
                format!("This is a mock search result content for query: {query}"),
            ),
            SearchResult::new(
                "Mock Search Result 2",
                "http://mock.url/2",
                "Another mock result with some interesting information.",
            ),
        ]
    }
}

impl Default for MockSearchService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchService for MockSearchService {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ConfigError> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(query.to_string());

        if let Some(results) = self.scripted.get(query) {
            return Ok(results.clone());
        }
        Ok(if self.canned {
            Self::canned_results(query)
        } else {
            Vec::new()
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_results() {
        let search = MockSearchService::new();
        let results = search.search("fusion").await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.ends_with("fusion"));
        assert_eq!(search.queries(), vec!["fusion"]);
    }

    #[tokio::test]
    async fn test_scripted_and_empty() {
        let hit = SearchResult::new("Report", "https://x.org/r.pdf", "pdf body");
        let search = MockSearchService::empty().with_results("q filetype:pdf", vec![hit.clone()]);
        assert_eq!(search.search("q filetype:pdf").await.unwrap(), vec![hit]);
        assert!(search.search("q").await.unwrap().is_empty());
        assert_eq!(search.queries().len(), 2);
    }
}
