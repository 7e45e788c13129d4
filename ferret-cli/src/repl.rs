//! REPL (Read-Eval-Print Loop) for interactive and single-query modes.

use ferret_core::types::{AgentResponse, QueryKind, Turn};
use ferret_core::{AgentPhase, FerretConfig, ResearchAgent, ResearchCallback};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// How responses are presented.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub audio_out: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Prints pipeline progress to stderr.
pub(crate) struct CliCallback;

#[async_trait::async_trait]
impl ResearchCallback for CliCallback {
    async fn on_phase_change(&self, phase: AgentPhase) {
        if phase != AgentPhase::Done {
            eprintln!("\x1b[90m  [{}...]\x1b[0m", phase);
        }
    }
}

fn build_agent(config: &FerretConfig, options: &OutputOptions) -> anyhow::Result<ResearchAgent> {
    let agent = ResearchAgent::from_config(config)?;
    Ok(if options.quiet || options.json {
        agent
    } else {
        agent.with_callback(Arc::new(CliCallback))
    })
}

/// Human-readable rendering of a response.
pub(crate) fn format_response(response: &AgentResponse) -> String {
    let mut out = response.answer.trim_end().to_string();
    if response.kind == QueryKind::Chat {
        return out;
    }

    if !response.documents.is_empty() {
        out.push_str("\n\nDocuments:\n");
        for doc in &response.documents {
            out.push_str(&format!("  [{}] {} - {}\n", doc.doc_type, doc.title, doc.url));
        }
    }
    if !response.output_paths.is_empty() {
        out.push_str("\nSaved:\n");
        for (format, path) in &response.output_paths {
            out.push_str(&format!("  {}: {}\n", format, path.display()));
        }
    }
    for (format, reason) in &response.failed_exports {
        out.push_str(&format!("  {format} export failed: {reason}\n"));
    }
    out.trim_end().to_string()
}

fn present(response: &AgentResponse, options: &OutputOptions) -> anyhow::Result<()> {
    if options.json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        println!("\n\x1b[32mFerret:\x1b[0m {}\n", format_response(response));
    }

    if let Some(path) = &options.audio_out {
        if response.audio.is_empty() {
            tracing::warn!("No audio was produced for this answer");
        } else {
            std::fs::write(path, &response.audio)?;
            tracing::info!(path = %path.display(), bytes = response.audio.len(), "Audio written");
        }
    }
    Ok(())
}

/// Append a completed exchange to the conversation history.
pub(crate) fn record_turn(history: &mut Vec<Turn>, query: &str, response: &AgentResponse) {
    history.push(Turn::user(query));
    history.push(Turn::assistant(response.answer.clone()));
}

/// Start the interactive loop.
pub async fn run_interactive(config: &FerretConfig, options: &OutputOptions) -> anyhow::Result<()> {
    let agent = build_agent(config, options)?;

    if !options.quiet {
        println!("\x1b[1;32m  Ferret research agent\x1b[0m");
        println!(
            "  Model: {} ({}) | Search: {} | Speech: {} | Reports: {}",
            config.llm.model,
            config.llm.provider,
            config.search.provider,
            config.speech.provider,
            config.report.output_dir.display()
        );
        println!("  Type /help for commands, /quit to exit\n");
    }

    let mut history: Vec<Turn> = Vec::new();
    let stdin = io::stdin();
    loop {
        print!("\x1b[1;34m> \x1b[0m");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" | "/q" => {
                println!("Goodbye!");
                break;
            }
            "/help" | "/?" => {
                println!("  /clear    forget the conversation so far");
                println!("  /history  show how many turns are remembered");
                println!("  /quit     exit");
                continue;
            }
            "/clear" => {
                history.clear();
                println!("Conversation cleared.");
                continue;
            }
            "/history" => {
                println!("{} turns in history.", history.len());
                continue;
            }
            _ => {}
        }

        match agent.process_query(input, &history).await {
            Ok(response) => {
                present(&response, options)?;
                record_turn(&mut history, input, &response);
            }
            Err(e) => {
                println!("\x1b[31mError: {}\x1b[0m", e);
            }
        }
    }

    Ok(())
}

/// Run a single query and exit.
pub async fn run_single_query(
    query: &str,
    config: &FerretConfig,
    options: &OutputOptions,
) -> anyhow::Result<()> {
    let agent = build_agent(config, options)?;

    match agent.process_query(query, &[]).await {
        Ok(response) => present(&response, options),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferret_core::types::{AnalysisResult, DocumentRef, DocumentType, ExportFormat};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_chat_response_is_answer_only() {
        let response = AgentResponse::chat("Hello! ", Vec::new());
        assert_eq!(format_response(&response), "Hello!");
    }

    #[test]
    fn test_format_research_response_lists_artifacts() {
        let mut analysis = AnalysisResult {
            report_content: "# Report\nBody".to_string(),
            documents: vec![DocumentRef {
                title: "Roadmap".to_string(),
                url: "https://x.org/r.pdf".to_string(),
                doc_type: DocumentType::Pdf,
            }],
            ..AnalysisResult::default()
        };
        analysis
            .output_paths
            .insert(ExportFormat::Pdf, PathBuf::from("reports/q_report.pdf"));
        analysis
            .failed_exports
            .insert(ExportFormat::Docx, "disk full".to_string());

        let text = format_response(&AgentResponse::research(analysis, Vec::new()));
        assert_eq!(
            text,
            "# Report\nBody\n\nDocuments:\n  [pdf] Roadmap - https://x.org/r.pdf\n\nSaved:\n  pdf: reports/q_report.pdf\n  docx export failed: disk full"
        );
    }

    #[test]
    fn test_record_turn_appends_user_then_assistant() {
        let mut history = Vec::new();
        record_turn(&mut history, "hi", &AgentResponse::chat("hello", Vec::new()));
        assert_eq!(history, vec![Turn::user("hi"), Turn::assistant("hello")]);
    }

    #[tokio::test]
    async fn test_mock_agent_answers_from_config() {
        let mut config = FerretConfig::default();
        config.llm.provider = "mock".to_string();
        config.search.provider = "mock".to_string();
        let dir = tempfile::tempdir().unwrap();
        config.report.output_dir = dir.path().to_path_buf();
        let agent = build_agent(&config, &OutputOptions::default()).unwrap();

        // The mock classifier reply is not JSON, so the query is researched.
        let response = agent.process_query("fusion", &[]).await.unwrap();
        assert_eq!(response.kind, QueryKind::Research);
        assert!(response.output_paths.contains_key(&ExportFormat::Pdf));
        assert!(dir.path().join("fusion_report.pdf").exists());
    }
}
