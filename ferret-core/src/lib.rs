//! # Ferret Core
//!
//! Core library for the Ferret research agent.
//! Provides the query orchestrator, text generation, search and speech
//! backends, report export, configuration, and fundamental types.

pub mod agent;
pub mod config;
pub mod error;
pub mod export;
pub mod providers;
pub mod research;
pub mod search;
pub mod speech;
pub mod types;

// Re-export commonly used types at the crate root.
pub use agent::{AgentPhase, ResearchAgent, ResearchCallback};
pub use config::{FerretConfig, load_config, to_masked_toml};
pub use error::{ConfigError, ExportError, FerretError, LlmError, Result, SpeechError};
pub use export::{FsSink, MemorySink, ReportSink};
pub use providers::{MockTextGenerator, TextGenerator, create_text_generator};
pub use search::{MockSearchService, SearchService, create_search_service};
pub use speech::{MockSpeechSynthesizer, SpeechSynthesizer, create_speech_synthesizer};
pub use types::{
    AgentResponse, AnalysisResult, CollectedData, DocumentRef, DocumentType, ExportFormat,
    QueryKind, Role, SearchResult, Source, Turn,
};
