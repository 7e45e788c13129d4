//! Report synthesis and export.

use crate::error::{ExportError, Result};
use crate::export::{ReportSink, export_file_name, render_docx, render_pdf, render_xlsx};
use crate::providers::TextGenerator;
use crate::types::{AnalysisResult, CollectedData, DocumentRef, ExportFormat, Source, Turn};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const REPORT_SYSTEM_PROMPT: &str = "You are a helpful analyst. Write detailed reports.";

fn document_list(documents: &[DocumentRef]) -> String {
    if documents.is_empty() {
        return "None found.".to_string();
    }
    documents
        .iter()
        .map(|d| format!("- {} [{}]: {}", d.title, d.doc_type, d.url))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn report_prompt(query: &str, collected: &CollectedData) -> String {
    format!(
        r#"You are an expert Analyst. Your goal is to synthesize the collected information into a detailed, real-time report.

User Query: {query}

Collected Information:
{context}

Please generate a comprehensive report in Markdown format.
Structure the report with:
- Executive Summary
- Detailed Analysis (broken down by key topics)
- Key Findings
- Conclusion
- Relevant Documents (list the documents found below)

Documents found:
{documents}

Do not hallucinate. Base your report strictly on the collected information."#,
        context = collected.context,
        documents = document_list(&collected.documents),
    )
}

/// Append a `## References` section linking every source, in order.
pub fn append_references(report: &mut String, sources: &[Source]) {
    if sources.is_empty() {
        return;
    }
    report.push_str("\n\n## References\n");
    for source in sources {
        report.push_str(&format!("- [{}]({})\n", source.title, source.url));
    }
}

/// Writes the report and renders it into the requested formats.
pub struct Analyzer {
    generator: Arc<dyn TextGenerator>,
    sink: Arc<dyn ReportSink>,
}

impl Analyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, sink: Arc<dyn ReportSink>) -> Self {
        Self { generator, sink }
    }

    /// Synthesize a report from `collected` and export it.
    ///
    /// PDF is always exported; DOCX and XLSX only when listed in `formats`.
    /// Each export succeeds or fails on its own: a failure is logged and
    /// recorded in `failed_exports`.
    pub async fn analyze(
        &self,
        query: &str,
        collected: CollectedData,
        history: &[Turn],
        formats: &[ExportFormat],
    ) -> Result<AnalysisResult> {
        let mut report = self
            .generator
            .generate(
                &report_prompt(query, &collected),
                history,
                Some(REPORT_SYSTEM_PROMPT),
            )
            .await?;
        append_references(&mut report, &collected.sources);

        let mut wanted: BTreeSet<ExportFormat> = formats.iter().copied().collect();
        wanted.insert(ExportFormat::Pdf);

        let mut result = AnalysisResult {
            report_content: report,
            sources: collected.sources,
            documents: collected.documents,
            ..AnalysisResult::default()
        };

        for format in wanted {
            match self.export(format, query, &result).await {
                Ok(path) => {
                    info!(%format, path = %path.display(), "Report exported");
                    result.output_paths.insert(format, path);
                }
                Err(e) => {
                    warn!(%format, error = %e, "Export failed");
                    result.failed_exports.insert(format, e.to_string());
                }
            }
        }
        Ok(result)
    }

    async fn export(
        &self,
        format: ExportFormat,
        query: &str,
        result: &AnalysisResult,
    ) -> std::result::Result<PathBuf, ExportError> {
        let bytes = match format {
            ExportFormat::Pdf => render_pdf(query, &result.report_content)?,
            ExportFormat::Docx => render_docx(query, &result.report_content)?,
            ExportFormat::Xlsx => render_xlsx(&result.sources, &result.documents)?,
        };
        self.sink
            .write(&export_file_name(query, format), &bytes)
            .await
    }
}
