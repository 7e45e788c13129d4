//! Information collection: plan, search, and document discovery.

use super::plan::{PLAN_SYSTEM_PROMPT, parse_plan, plan_prompt};
use crate::error::{ConfigError, Result};
use crate::providers::TextGenerator;
use crate::search::SearchService;
use crate::types::{
    CollectedData, DocumentRef, DocumentType, ResearchPlan, SearchResult, Source, Turn,
};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Documents collected so far, unique by url.
#[derive(Default)]
struct DocumentSet {
    documents: Vec<DocumentRef>,
    urls: HashSet<String>,
}

impl DocumentSet {
    /// Add the result's document if it is one and its url is new.
    fn insert(&mut self, result: &SearchResult) -> bool {
        match DocumentRef::from_result(result) {
            Some(doc) if self.urls.insert(doc.url.clone()) => {
                self.documents.push(doc);
                true
            }
            _ => false,
        }
    }
}

/// Gathers context, sources and documents for a research query.
pub struct Collector {
    generator: Arc<dyn TextGenerator>,
    search: Arc<dyn SearchService>,
}

impl Collector {
    pub fn new(generator: Arc<dyn TextGenerator>, search: Arc<dyn SearchService>) -> Self {
        Self { generator, search }
    }

    /// Ask the generator for a research plan.
    ///
    /// A failed generation call is an error; an unusable reply is not.
    pub async fn plan(&self, query: &str, history: &[Turn]) -> Result<ResearchPlan> {
        let response = self
            .generator
            .generate(&plan_prompt(query), history, Some(PLAN_SYSTEM_PROMPT))
            .await?;
        Ok(parse_plan(&response, query))
    }

    /// Run `queries` concurrently, returning each query's results in input order.
    async fn search_all(
        &self,
        queries: &[String],
    ) -> std::result::Result<Vec<Vec<SearchResult>>, ConfigError> {
        join_all(queries.iter().map(|q| self.search.search(q)))
            .await
            .into_iter()
            .collect()
    }

    /// Collect material for `query`.
    ///
    /// Every planned search contributes its results to the context and to the
    /// sources. A second pass always searches for `pdf`, `docx` and `xlsx`
    /// files about the query and adds any document not already found.
    pub async fn collect(&self, query: &str, history: &[Turn]) -> Result<CollectedData> {
        let plan = self.plan(query, history).await?;
        info!(
            queries = plan.search_queries.len(),
            look_for_documents = plan.look_for_documents,
            "Research plan ready"
        );

        let mut context: Vec<String> = Vec::new();
        let mut sources: Vec<Source> = Vec::new();
        let mut documents = DocumentSet::default();

        let planned = self.search_all(&plan.search_queries).await?;
        for (q, results) in plan.search_queries.iter().zip(&planned) {
            debug!(query = %q, results = results.len(), "Planned search finished");
            for result in results {
                context.push(format!(
                    "Source: {} ({})\nContent: {}",
                    result.title, result.url, result.content
                ));
                sources.push(Source::from(result));
                documents.insert(result);
            }
        }

        let document_queries: Vec<String> = DocumentType::ALL
            .iter()
            .map(|t| format!("{query} filetype:{}", t.extension()))
            .collect();
        let discovered = self.search_all(&document_queries).await?;
        let before = documents.documents.len();
        for result in discovered.iter().flatten() {
            if documents.insert(result) {
                context.push(format!(
                    "Document Found: {} ({})\nContent: {}",
                    result.title, result.url, result.content
                ));
            }
        }
        debug!(
            new_documents = documents.documents.len() - before,
            "Document search finished"
        );

        Ok(CollectedData {
            context: context.join("\n\n"),
            sources,
            documents: documents.documents,
        })
    }
}
