//! Research pipeline stages.
//!
//! 1. **Classify**: decide whether a query needs research at all
//! 2. **Collect**: plan searches, run them, discover documents
//! 3. **Analyze**: synthesize a Markdown report and export it
//!
//! The orchestrator in [`crate::agent`] runs the stages in order.

pub mod analyzer;
pub mod classify;
pub mod collector;
pub mod json;
pub mod plan;

pub use analyzer::{Analyzer, append_references};
pub use classify::{classify, parse_classification};
pub use collector::Collector;
pub use json::strip_code_fences;
pub use plan::parse_plan;
