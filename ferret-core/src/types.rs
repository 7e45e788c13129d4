//! Core data types shared across the pipeline.
//!
//! Every record here is created fresh per query and passed forward by value
//! or shared reference; no stage mutates another stage's output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Whether turns with this role are forwarded to text generators.
    pub fn is_conversational(self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A single role-tagged turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Iterate the turns of a history that may be forwarded to a generator.
pub fn conversational_turns(history: &[Turn]) -> impl Iterator<Item = &Turn> {
    history.iter().filter(|t| t.role.is_conversational())
}

/// Structured plan guiding which searches the collector runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub look_for_documents: bool,
}

impl ResearchPlan {
    /// The single-query plan used when the planner output is unusable.
    pub fn fallback(query: &str) -> Self {
        Self {
            search_queries: vec![query.to_string()],
            look_for_documents: false,
        }
    }
}

/// One hit returned by a search backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

/// A web result surfaced to the user as supporting evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

impl From<&SearchResult> for Source {
    fn from(result: &SearchResult) -> Self {
        Self {
            title: result.title.clone(),
            url: result.url.clone(),
        }
    }
}

/// Kind of downloadable document a url points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Xlsx,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [DocumentType::Pdf, DocumentType::Docx, DocumentType::Xlsx];

    pub fn extension(self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::Xlsx => "xlsx",
        }
    }

    /// Derive the document type from a url's file extension.
    ///
    /// Matching is case-insensitive and ignores any query string or fragment,
    /// so `https://x.org/Paper.PDF?dl=1` is a pdf.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = last_segment.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentType::Pdf),
            "docx" => Some(DocumentType::Docx),
            "xlsx" => Some(DocumentType::Xlsx),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A discovered downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
}

impl DocumentRef {
    /// Build a reference from a search hit if its url names a document.
    pub fn from_result(result: &SearchResult) -> Option<Self> {
        DocumentType::from_url(&result.url).map(|doc_type| Self {
            title: result.title.clone(),
            url: result.url.clone(),
            doc_type,
        })
    }
}

/// Everything the collector gathered for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedData {
    pub context: String,
    pub sources: Vec<Source>,
    pub documents: Vec<DocumentRef>,
}

/// Output file format produced by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// The `{kind}` part of `{title}_{kind}.{ext}` file names.
    pub fn file_kind(self) -> &'static str {
        match self {
            ExportFormat::Pdf | ExportFormat::Docx => "report",
            ExportFormat::Xlsx => "data",
        }
    }

    /// Formats requested by keywords in a query. PDF is always included.
    pub fn requested_by(query: &str) -> Vec<ExportFormat> {
        let lower = query.to_lowercase();
        let mut formats = vec![ExportFormat::Pdf];
        if lower.contains("word") || lower.contains("docx") {
            formats.push(ExportFormat::Docx);
        }
        if ["excel", "spreadsheet", "csv"]
            .iter()
            .any(|kw| lower.contains(kw))
        {
            formats.push(ExportFormat::Xlsx);
        }
        formats
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Result of synthesizing and exporting a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub report_content: String,
    pub output_paths: BTreeMap<ExportFormat, PathBuf>,
    /// Formats that were requested but failed to render or write.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failed_exports: BTreeMap<ExportFormat, String>,
    pub sources: Vec<Source>,
    pub documents: Vec<DocumentRef>,
}

/// The routing decision made once per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Chat,
    Research,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::Chat => write!(f, "chat"),
            QueryKind::Research => write!(f, "research"),
        }
    }
}

/// Classifier output: the route plus an optional ready-made chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: QueryKind,
    pub response: Option<String>,
}

impl Classification {
    pub fn research() -> Self {
        Self {
            kind: QueryKind::Research,
            response: None,
        }
    }
}

/// Final output of one `process_query` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub kind: QueryKind,
    pub answer: String,
    /// Spoken rendition of the answer (mp3). Empty when synthesis is unavailable.
    #[serde(skip)]
    pub audio: Vec<u8>,
    pub sources: Vec<Source>,
    pub documents: Vec<DocumentRef>,
    pub output_paths: BTreeMap<ExportFormat, PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failed_exports: BTreeMap<ExportFormat, String>,
}

impl AgentResponse {
    /// A direct conversational answer with no research artifacts.
    pub fn chat(answer: impl Into<String>, audio: Vec<u8>) -> Self {
        Self {
            kind: QueryKind::Chat,
            answer: answer.into(),
            audio,
            sources: Vec::new(),
            documents: Vec::new(),
            output_paths: BTreeMap::new(),
            failed_exports: BTreeMap::new(),
        }
    }

    /// A research answer assembled from an analysis and its spoken summary.
    pub fn research(analysis: AnalysisResult, audio: Vec<u8>) -> Self {
        Self {
            kind: QueryKind::Research,
            answer: analysis.report_content,
            audio,
            sources: analysis.sources,
            documents: analysis.documents,
            output_paths: analysis.output_paths,
            failed_exports: analysis.failed_exports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_url() {
        assert_eq!(
            DocumentType::from_url("https://iter.org/report.pdf"),
            Some(DocumentType::Pdf)
        );
        assert_eq!(
            DocumentType::from_url("https://x.org/Data.XLSX"),
            Some(DocumentType::Xlsx)
        );
        assert_eq!(
            DocumentType::from_url("https://x.org/brief.docx?download=1#top"),
            Some(DocumentType::Docx)
        );
        assert_eq!(DocumentType::from_url("https://x.org/page.html"), None);
        assert_eq!(DocumentType::from_url("https://x.org/pdf"), None);
        assert_eq!(DocumentType::from_url("https://example.com"), None);
    }

    #[test]
    fn test_requested_formats() {
        assert_eq!(
            ExportFormat::requested_by("Latest advancements in nuclear fusion energy 2024"),
            vec![ExportFormat::Pdf]
        );
        assert_eq!(
            ExportFormat::requested_by("Research quantum computing and give me a word doc"),
            vec![ExportFormat::Pdf, ExportFormat::Docx]
        );
        assert_eq!(
            ExportFormat::requested_by("GDP by country as a Spreadsheet"),
            vec![ExportFormat::Pdf, ExportFormat::Xlsx]
        );
        assert_eq!(
            ExportFormat::requested_by("docx and csv please"),
            vec![ExportFormat::Pdf, ExportFormat::Docx, ExportFormat::Xlsx]
        );
    }

    #[test]
    fn test_conversational_turns_filters_roles() {
        let history = vec![
            Turn::new(Role::System, "be terse"),
            Turn::user("hi"),
            Turn::new(Role::Tool, "{}"),
            Turn::assistant("hello"),
        ];
        let kept: Vec<_> = conversational_turns(&history).collect();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].content, "hi");
        assert_eq!(kept[1].role, Role::Assistant);
    }

    #[test]
    fn test_chat_response_is_empty_of_artifacts() {
        let resp = AgentResponse::chat("Hi!", Vec::new());
        assert_eq!(resp.kind, QueryKind::Chat);
        assert!(resp.sources.is_empty());
        assert!(resp.documents.is_empty());
        assert!(resp.output_paths.is_empty());
    }

    #[test]
    fn test_role_serde_lowercase() {
        let turn: Turn = serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
