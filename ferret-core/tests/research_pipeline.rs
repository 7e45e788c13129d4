//! End-to-end tests for the research pipeline.
//!
//! These drive `ResearchAgent::process_query` with the mock generator, search
//! and speech backends, checking routing, collection, report assembly and export.

use async_trait::async_trait;
use ferret_core::agent::{AgentPhase, ResearchAgent, ResearchCallback};
use ferret_core::error::ExportError;
use ferret_core::export::sanitize_filename;
use ferret_core::export::sink::{FsSink, MemorySink, ReportSink};
use ferret_core::providers::MockTextGenerator;
use ferret_core::search::MockSearchService;
use ferret_core::speech::{FallbackSynthesizer, MockSpeechSynthesizer};
use ferret_core::types::{DocumentType, ExportFormat, QueryKind, SearchResult, Turn};
use pretty_assertions::assert_eq;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const RESEARCH: &str = r#"{"type": "RESEARCH", "response": null}"#;
const REPORT: &str = "# Executive Summary\nFusion is progressing.\n\n## Key Findings\n- Net energy gain";

struct Harness {
    generator: Arc<MockTextGenerator>,
    search: Arc<MockSearchService>,
    sink: Arc<MemorySink>,
    agent: ResearchAgent,
}

fn harness(replies: &[&str], search: MockSearchService) -> Harness {
    let generator = Arc::new(MockTextGenerator::with_responses(replies.iter().copied()));
    let search = Arc::new(search);
    let sink = Arc::new(MemorySink::new());
    let agent = ResearchAgent::new(
        generator.clone(),
        search.clone(),
        Arc::new(MockSpeechSynthesizer::new()),
        sink.clone(),
    );
    Harness {
        generator,
        search,
        sink,
        agent,
    }
}

#[tokio::test]
async fn test_greeting_is_answered_without_research() {
    let h = harness(
        &[r#"```json
{"type": "CHAT", "response": "I'm a research assistant. Ask me anything."}
```"#],
        MockSearchService::new(),
    );

    let response = h.agent.process_query("Hello, who are you?", &[]).await.unwrap();

    assert_eq!(response.kind, QueryKind::Chat);
    assert_eq!(response.answer, "I'm a research assistant. Ask me anything.");
    assert!(response.sources.is_empty());
    assert!(response.documents.is_empty());
    assert!(response.output_paths.is_empty());
    assert!(h.search.queries().is_empty());
    assert!(h.sink.file_names().is_empty());
}

#[tokio::test]
async fn test_plain_research_exports_pdf_only() {
    let h = harness(
        &[RESEARCH, r#"{"search_queries": ["fusion 2024"]}"#, REPORT, "Fusion is close."],
        MockSearchService::new(),
    );

    let response = h
        .agent
        .process_query("Latest advancements in nuclear fusion energy 2024", &[])
        .await
        .unwrap();

    assert_eq!(response.kind, QueryKind::Research);
    assert_eq!(
        response.output_paths.keys().copied().collect::<Vec<_>>(),
        vec![ExportFormat::Pdf]
    );
    assert_eq!(
        h.sink.file_names(),
        vec!["Latestadvancementsinnuclearfusionenergy2024_report.pdf"]
    );
    assert!(!response.audio.is_empty());
}

#[tokio::test]
async fn test_word_doc_request_adds_docx() {
    let h = harness(
        &[RESEARCH, r#"{"search_queries": ["quantum computing"]}"#, REPORT, "Summary."],
        MockSearchService::new(),
    );

    let response = h
        .agent
        .process_query("Research quantum computing and give me a word doc", &[])
        .await
        .unwrap();

    assert_eq!(
        response.output_paths.keys().copied().collect::<Vec<_>>(),
        vec![ExportFormat::Pdf, ExportFormat::Docx]
    );
}

#[tokio::test]
async fn test_spreadsheet_request_adds_xlsx() {
    let h = harness(
        &[RESEARCH, r#"{"search_queries": ["battery prices"]}"#, REPORT, "Summary."],
        MockSearchService::new(),
    );

    let response = h
        .agent
        .process_query("Battery prices as an Excel spreadsheet", &[])
        .await
        .unwrap();

    assert!(response.output_paths.contains_key(&ExportFormat::Xlsx));
    assert!(
        h.sink
            .file_names()
            .contains(&"BatterypricesasanExcelspreadsheet_data.xlsx".to_string())
    );
}

#[tokio::test]
async fn test_malformed_plan_searches_original_query() {
    let h = harness(
        &[RESEARCH, "I think you should search for several things.", REPORT, "Summary."],
        MockSearchService::new(),
    );

    let response = h.agent.process_query("solid state batteries", &[]).await.unwrap();

    let queries = h.search.queries();
    assert_eq!(queries[0], "solid state batteries");
    assert_eq!(queries.len(), 4);
    // The report prompt carries the collected context.
    let report_prompt = &h.generator.prompts()[2];
    assert!(report_prompt.contains("Source: Mock Search Result 1 (http://mock.url/1)"));
    assert!(!response.sources.is_empty());
}

#[tokio::test]
async fn test_document_pass_finds_single_pdf() {
    let search = MockSearchService::empty().with_results(
        "fusion filetype:pdf",
        vec![SearchResult::new(
            "ITER annual report",
            "https://iter.org/annual-report.pdf",
            "Annual report",
        )],
    );
    let h = harness(
        &[RESEARCH, r#"{"search_queries": ["fusion news"]}"#, REPORT, "Summary."],
        search,
    );

    let response = h.agent.process_query("fusion", &[]).await.unwrap();

    assert_eq!(response.documents.len(), 1);
    assert_eq!(response.documents[0].doc_type, DocumentType::Pdf);
    assert_eq!(response.documents[0].url, "https://iter.org/annual-report.pdf");
    assert!(response.sources.is_empty());
    assert!(
        h.generator.prompts()[2]
            .contains("- ITER annual report [pdf]: https://iter.org/annual-report.pdf")
    );
}

#[tokio::test]
async fn test_document_urls_unique_across_passes() {
    let paper = SearchResult::new("Paper", "https://x.org/paper.pdf", "text");
    let search = MockSearchService::empty()
        .with_results("a", vec![paper.clone()])
        .with_results("q filetype:pdf", vec![paper.clone()])
        .with_results("q filetype:docx", vec![paper]);
    let h = harness(&[RESEARCH, r#"{"search_queries": ["a"]}"#, REPORT, "S."], search);

    let response = h.agent.process_query("q", &[]).await.unwrap();
    assert_eq!(response.documents.len(), 1);
}

#[tokio::test]
async fn test_report_ends_with_references_in_source_order() {
    let search = MockSearchService::empty().with_results(
        "a",
        vec![
            SearchResult::new("First", "https://one.example", "1"),
            SearchResult::new("Second", "https://two.example", "2"),
        ],
    );
    let h = harness(&[RESEARCH, r#"{"search_queries": ["a"]}"#, REPORT, "S."], search);

    let response = h.agent.process_query("q", &[]).await.unwrap();
    assert!(response.answer.ends_with(
        "## References\n- [First](https://one.example)\n- [Second](https://two.example)\n"
    ));
}

#[tokio::test]
async fn test_history_reaches_every_generation_call() {
    let h = harness(
        &[RESEARCH, r#"{"search_queries": ["a"]}"#, REPORT, "S."],
        MockSearchService::new(),
    );
    let history = vec![Turn::user("Tell me about fusion"), Turn::assistant("Sure.")];

    h.agent.process_query("and the costs?", &history).await.unwrap();
    let calls = h.generator.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.history == history));
}

#[test]
fn test_sanitizer_is_idempotent() {
    let long = "x y ".repeat(80);
    for name in [
        "Latest advancements in nuclear fusion energy 2024",
        "../../etc/passwd",
        "...",
        "核融合 エネルギー",
        "",
        long.as_str(),
    ] {
        let once = sanitize_filename(name);
        assert_eq!(sanitize_filename(&once), once, "{name:?}");
        assert!(!once.is_empty());
        assert!(once.chars().count() <= 100);
    }
}

#[tokio::test]
async fn test_long_cjk_query_exports_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let query = "核融合エネルギーの最新動向をワードで".repeat(10);
    let generator = Arc::new(MockTextGenerator::with_responses([
        RESEARCH,
        r#"{"search_queries": ["fusion"]}"#,
        REPORT,
        "S.",
    ]));
    let agent = ResearchAgent::new(
        generator,
        Arc::new(MockSearchService::new()),
        Arc::new(MockSpeechSynthesizer::new()),
        Arc::new(FsSink::new(dir.path())),
    );

    let stem = sanitize_filename(&query);
    assert_eq!(sanitize_filename(&stem), stem);

    let response = agent.process_query(&query, &[]).await.unwrap();
    assert!(response.failed_exports.is_empty(), "{:?}", response.failed_exports);
    let pdf = &response.output_paths[&ExportFormat::Pdf];
    assert!(pdf.exists());
    assert_eq!(
        pdf.file_name().unwrap().to_str().unwrap(),
        format!("{stem}_report.pdf")
    );
}

#[tokio::test]
async fn test_docx_heading_uses_heading1_style() {
    let h = harness(
        &[RESEARCH, r#"{"search_queries": ["a"]}"#, REPORT, "S."],
        MockSearchService::new(),
    );
    h.agent.process_query("fusion word report", &[]).await.unwrap();

    let bytes = h.sink.get("fusionwordreport_report.docx").unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut document = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut document)
        .unwrap();
    assert!(document.contains(
        r#"<w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t xml:space="preserve">Executive Summary</w:t>"#
    ));
}

#[tokio::test]
async fn test_pdf_heading_is_bold_14pt() {
    let h = harness(
        &[RESEARCH, r#"{"search_queries": ["a"]}"#, REPORT, "S."],
        MockSearchService::new(),
    );
    h.agent.process_query("fusion", &[]).await.unwrap();

    let bytes = h.sink.get("fusion_report.pdf").unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let ops = lopdf::content::Content::decode(&doc.get_page_content(page_id).unwrap())
        .unwrap()
        .operations;

    let heading = ops
        .iter()
        .position(|op| {
            op.operator == "Tj"
                && matches!(op.operands.first(),
                    Some(lopdf::Object::String(s, _)) if s == b"Executive Summary")
        })
        .unwrap();
    let font = ops[..heading]
        .iter()
        .rev()
        .find(|op| op.operator == "Tf")
        .unwrap();
    assert!(matches!(&font.operands[0], lopdf::Object::Name(n) if n == b"F2"));
    assert_eq!(font.operands[1].as_float().unwrap(), 14.0);
}

#[tokio::test]
async fn test_repeated_query_does_not_overwrite_reports() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reports");
    let generator = Arc::new(MockTextGenerator::with_responses([
        RESEARCH,
        r#"{"search_queries": ["a"]}"#,
        REPORT,
        "S.",
        RESEARCH,
        r#"{"search_queries": ["a"]}"#,
        REPORT,
        "S.",
    ]));
    let agent = ResearchAgent::new(
        generator,
        Arc::new(MockSearchService::new()),
        Arc::new(MockSpeechSynthesizer::new()),
        Arc::new(FsSink::new(&out)),
    );

    let first = agent.process_query("fusion", &[]).await.unwrap();
    let second = agent.process_query("fusion", &[]).await.unwrap();

    assert_eq!(first.output_paths[&ExportFormat::Pdf], out.join("fusion_report.pdf"));
    assert_eq!(second.output_paths[&ExportFormat::Pdf], out.join("fusion_report_2.pdf"));
    assert!(out.join("fusion_report.pdf").exists());
    assert!(out.join("fusion_report_2.pdf").exists());
}

/// Rejects DOCX writes, accepts everything else.
struct NoDocxSink(MemorySink);

#[async_trait]
impl ReportSink for NoDocxSink {
    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        if file_name.ends_with(".docx") {
            return Err(ExportError::Write {
                path: PathBuf::from(file_name),
                message: "disk full".to_string(),
            });
        }
        self.0.write(file_name, bytes).await
    }
}

#[tokio::test]
async fn test_export_failure_is_isolated_per_format() {
    let generator = Arc::new(MockTextGenerator::with_responses([
        RESEARCH,
        r#"{"search_queries": ["a"]}"#,
        REPORT,
        "S.",
    ]));
    let agent = ResearchAgent::new(
        generator,
        Arc::new(MockSearchService::new()),
        Arc::new(MockSpeechSynthesizer::new()),
        Arc::new(NoDocxSink(MemorySink::new())),
    );

    let response = agent
        .process_query("fusion in a docx and a spreadsheet", &[])
        .await
        .unwrap();

    assert_eq!(
        response.output_paths.keys().copied().collect::<Vec<_>>(),
        vec![ExportFormat::Pdf, ExportFormat::Xlsx]
    );
    assert!(response.failed_exports[&ExportFormat::Docx].contains("disk full"));
}

#[tokio::test]
async fn test_speech_failures_leave_empty_audio() {
    let generator = Arc::new(MockTextGenerator::with_responses([
        RESEARCH,
        r#"{"search_queries": ["a"]}"#,
        REPORT,
        "S.",
    ]));
    let speech = FallbackSynthesizer::new(
        Arc::new(MockSpeechSynthesizer::failing()),
        Some(Arc::new(MockSpeechSynthesizer::failing())),
        3000,
    );
    let agent = ResearchAgent::new(
        generator,
        Arc::new(MockSearchService::new()),
        Arc::new(speech),
        Arc::new(MemorySink::new()),
    );

    let response = agent.process_query("fusion", &[]).await.unwrap();
    assert!(response.audio.is_empty());
    assert!(response.answer.starts_with("# Executive Summary"));
}

#[tokio::test]
async fn test_bare_failing_synthesizer_still_returns_report() {
    let generator = Arc::new(MockTextGenerator::with_responses([
        RESEARCH,
        r#"{"search_queries": ["a"]}"#,
        REPORT,
        "S.",
    ]));
    let sink = Arc::new(MemorySink::new());
    let agent = ResearchAgent::new(
        generator,
        Arc::new(MockSearchService::new()),
        Arc::new(MockSpeechSynthesizer::failing()),
        sink.clone(),
    );

    let response = agent.process_query("fusion", &[]).await.unwrap();
    assert!(response.audio.is_empty());
    assert!(response.output_paths.contains_key(&ExportFormat::Pdf));
    assert_eq!(sink.file_names(), vec!["fusion_report.pdf"]);
}

#[derive(Default)]
struct PhaseLog(Mutex<Vec<AgentPhase>>);

#[async_trait]
impl ResearchCallback for PhaseLog {
    async fn on_phase_change(&self, phase: AgentPhase) {
        self.0.lock().unwrap().push(phase);
    }
}

#[tokio::test]
async fn test_failed_plan_generation_stops_before_analysis() {
    let generator = Arc::new(MockTextGenerator::with_responses([RESEARCH]));
    generator.queue_error(ferret_core::error::LlmError::AuthFailed {
        provider: "gemini".to_string(),
    });
    let log = Arc::new(PhaseLog::default());
    let sink = Arc::new(MemorySink::new());
    let agent = ResearchAgent::new(
        generator,
        Arc::new(MockSearchService::new()),
        Arc::new(MockSpeechSynthesizer::new()),
        sink.clone(),
    )
    .with_callback(log.clone());

    assert!(agent.process_query("fusion", &[]).await.is_err());
    assert_eq!(
        *log.0.lock().unwrap(),
        vec![AgentPhase::Classifying, AgentPhase::Collecting]
    );
    assert!(sink.file_names().is_empty());
}
