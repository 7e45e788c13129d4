//! Query orchestrator.
//!
//! The `ResearchAgent` ties together the text generator, search, speech and
//! report sink. Each query is classified once, then either answered directly
//! or sent through Collect → Analyze → Summarize.

use crate::config::FerretConfig;
use crate::error::Result;
use crate::export::markdown::{Block, parse_blocks};
use crate::export::{FsSink, ReportSink};
use crate::providers::{TextGenerator, create_text_generator};
use crate::research::{Analyzer, Collector, classify};
use crate::search::{SearchService, create_search_service};
use crate::speech::fallback::truncate_for_speech;
use crate::speech::{SpeechSynthesizer, create_speech_synthesizer};
use crate::types::{AgentResponse, ExportFormat, QueryKind, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Reply used when a CHAT classification carries no response text.
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant. Be concise.";

/// Longest fallback summary, in characters.
const FALLBACK_SUMMARY_CHARS: usize = 300;

/// Where a query is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Classifying,
    ChatAnswering,
    Collecting,
    Analyzing,
    Summarizing,
    Done,
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentPhase::Classifying => "classifying",
            AgentPhase::ChatAnswering => "answering",
            AgentPhase::Collecting => "collecting",
            AgentPhase::Analyzing => "analyzing",
            AgentPhase::Summarizing => "summarizing",
            AgentPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Observer for pipeline progress.
#[async_trait::async_trait]
pub trait ResearchCallback: Send + Sync {
    /// Called on entry to each phase.
    async fn on_phase_change(&self, phase: AgentPhase);
}

/// Spoken stand-in for a failed summary: the report's first paragraph, shortened.
pub fn fallback_summary(report: &str) -> String {
    let blocks = parse_blocks(report);
    let text = blocks
        .iter()
        .find(|b| matches!(b, Block::Paragraph(_)))
        .or_else(|| blocks.first())
        .map(Block::plain_text)
        .unwrap_or_else(|| "Your research report is ready.".to_string());
    truncate_for_speech(&text, FALLBACK_SUMMARY_CHARS)
}

fn summary_prompt(report: &str) -> String {
    format!(
        "Based on the following report, generate a concise, conversational summary suitable for speech (1-2 sentences).\n\nReport:\n{report}"
    )
}

/// The query orchestrator.
pub struct ResearchAgent {
    generator: Arc<dyn TextGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    collector: Collector,
    analyzer: Analyzer,
    callback: Option<Arc<dyn ResearchCallback>>,
}

impl ResearchAgent {
    /// Build an agent from already-bound collaborators.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        search: Arc<dyn SearchService>,
        speech: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            collector: Collector::new(generator.clone(), search),
            analyzer: Analyzer::new(generator.clone(), sink),
            generator,
            speech,
            callback: None,
        }
    }

    /// Bind every backend named in `config`, writing exports to `config.report.output_dir`.
    pub fn from_config(config: &FerretConfig) -> Result<Self> {
        Ok(Self::new(
            create_text_generator(&config.llm)?,
            create_search_service(&config.search)?,
            create_speech_synthesizer(&config.speech)?,
            Arc::new(FsSink::new(config.report.output_dir.clone())),
        ))
    }

    pub fn with_callback(mut self, callback: Arc<dyn ResearchCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// The generator shared by every stage.
    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    async fn enter(&self, phase: AgentPhase) {
        info!(%phase, "Agent phase");
        if let Some(callback) = &self.callback {
            callback.on_phase_change(phase).await;
        }
    }

    /// Answer one query, given the conversation so far.
    ///
    /// Research failures from plan or report generation and missing
    /// credentials are errors. Speech and summary failures are not: the
    /// response then carries empty audio or a shortened summary.
    pub async fn process_query(&self, query: &str, history: &[Turn]) -> Result<AgentResponse> {
        self.enter(AgentPhase::Classifying).await;
        let classification = classify(self.generator.as_ref(), query, history).await?;

        if classification.kind == QueryKind::Chat {
            self.enter(AgentPhase::ChatAnswering).await;
            let answer = classification
                .response
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GREETING.to_string());
            let audio = self.speak(&answer).await;
            self.enter(AgentPhase::Done).await;
            return Ok(AgentResponse::chat(answer, audio));
        }

        self.enter(AgentPhase::Collecting).await;
        let collected = self.collector.collect(query, history).await?;

        let formats = ExportFormat::requested_by(query);
        self.enter(AgentPhase::Analyzing).await;
        info!(?formats, "Starting analysis");
        let analysis = self
            .analyzer
            .analyze(query, collected, history, &formats)
            .await?;

        self.enter(AgentPhase::Summarizing).await;
        let summary = self.summarize(&analysis.report_content, history).await;
        let audio = self.speak(&summary).await;

        self.enter(AgentPhase::Done).await;
        Ok(AgentResponse::research(analysis, audio))
    }

    /// Synthesize `text`, or return empty audio if the backend fails.
    async fn speak(&self, text: &str) -> Vec<u8> {
        match self.speech.speak(text).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(backend = self.speech.name(), error = %e, "Speech failed; answering without audio");
                Vec::new()
            }
        }
    }

    async fn summarize(&self, report: &str, history: &[Turn]) -> String {
        match self
            .generator
            .generate(&summary_prompt(report), history, Some(SUMMARY_SYSTEM_PROMPT))
            .await
        {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => {
                warn!("Summary was empty; speaking the report opening instead");
                fallback_summary(report)
            }
            Err(e) => {
                warn!(error = %e, "Summary generation failed; speaking the report opening instead");
                fallback_summary(report)
            }
        }
    }
}
