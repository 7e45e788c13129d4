//! Report export: Markdown and tables to PDF, DOCX and XLSX bytes.
//!
//! Rendering is pure; persisting the bytes is the job of a [`ReportSink`].

pub mod docx;
pub mod markdown;
mod package;
pub mod pdf;
pub mod sink;
pub mod xlsx;

use crate::types::ExportFormat;

pub use docx::render_docx;
pub use pdf::render_pdf;
pub use sink::{FsSink, MemorySink, ReportSink};
pub use xlsx::render_xlsx;

/// Longest file stem produced by [`sanitize_filename`], in characters.
pub const MAX_STEM_CHARS: usize = 100;

/// Longest file stem in UTF-8 bytes. Leaves room for the longest
/// `_{kind}.{ext}` suffix and a collision counter under the 255-byte limit
/// most filesystems place on a name.
pub const MAX_STEM_BYTES: usize = 200 - "_report.docx".len();

/// Reduce a query to a safe file stem.
///
/// Keeps Unicode letters and digits, `_` and `.`; drops everything else.
/// The stem is cut on a character boundary once it reaches
/// [`MAX_STEM_CHARS`] characters or [`MAX_STEM_BYTES`] bytes.
/// An empty result becomes `report`. Applying it twice changes nothing.
pub fn sanitize_filename(name: &str) -> String {
    let mut stem = String::new();
    for c in name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
        .take(MAX_STEM_CHARS)
    {
        if stem.len() + c.len_utf8() > MAX_STEM_BYTES {
            break;
        }
        stem.push(c);
    }
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "report".to_string()
    } else {
        stem
    }
}

/// File name for one export of a query: `{stem}_{kind}.{ext}`.
pub fn export_file_name(query: &str, format: ExportFormat) -> String {
    format!(
        "{}_{}.{}",
        sanitize_filename(query),
        format.file_kind(),
        format.extension()
    )
}
