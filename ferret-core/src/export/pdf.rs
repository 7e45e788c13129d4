//! PDF renderer built on `lopdf` with the standard Type1 Helvetica fonts.
//!
//! Standard fonts need no embedding, so text is limited to the WinAnsi
//! (Latin-1) range; anything outside it is replaced with `?`.

use super::markdown::{Block, parse_blocks};
use crate::error::ExportError;
use crate::types::ExportFormat;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const BULLET_INDENT: f32 = 15.0;
/// WinAnsi code point of the bullet glyph.
const BULLET: u8 = 0x95;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

/// One positioned run of text.
#[derive(Debug, Clone)]
struct Line {
    font: &'static str,
    size: f32,
    x: f32,
    text: Vec<u8>,
}

/// WinAnsi codes in 0x80-0x9F for characters outside Latin-1.
fn win_ansi_punctuation(c: char) -> Option<u8> {
    let code = match c {
        '\u{20AC}' => 0x80, // euro
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85, // ellipsis
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => BULLET,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99, // trademark
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(code)
}

/// Encode text as WinAnsi bytes, replacing unsupported characters with `?`.
///
/// C0 controls become spaces. DEL and the C1 controls have no glyph and become `?`.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            if let Some(code) = win_ansi_punctuation(c) {
                return code;
            }
            match c as u32 {
                0x00..=0x1F => b' ',
                0x7F..=0x9F => b'?',
                code @ 0x20..=0xFF => code as u8,
                _ => b'?',
            }
        })
        .collect()
}

/// Lays out lines top to bottom, starting a new page when the current one fills.
struct Layout {
    pages: Vec<Vec<(f32, Line)>>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn space(&mut self, points: f32) {
        self.y -= points;
    }

    fn push(&mut self, line: Line) {
        let leading = line.size * 1.4;
        if self.y - leading < MARGIN {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.y -= leading;
        if let Some(page) = self.pages.last_mut() {
            page.push((self.y, line));
        }
    }

    /// Wrap `text` to the width left after `indent` and push each piece.
    fn push_wrapped(&mut self, font: &'static str, size: f32, indent: f32, text: &str) {
        let usable = PAGE_WIDTH - 2.0 * MARGIN - indent;
        let width = ((usable / (size * AVG_GLYPH_WIDTH)) as usize).max(10);
        for piece in textwrap::wrap(text, width) {
            self.push(Line {
                font,
                size,
                x: MARGIN + indent,
                text: to_win_ansi(&piece),
            });
        }
    }
}

fn layout(title: &str, markdown: &str) -> Layout {
    let mut layout = Layout::new();

    let heading = format!("Research Report: {title}");
    let approx_width = heading.chars().count() as f32 * 16.0 * AVG_GLYPH_WIDTH;
    if approx_width < PAGE_WIDTH - 2.0 * MARGIN {
        layout.push(Line {
            font: FONT_BOLD,
            size: 16.0,
            x: (PAGE_WIDTH - approx_width) / 2.0,
            text: to_win_ansi(&heading),
        });
    } else {
        layout.push_wrapped(FONT_BOLD, 16.0, 0.0, &heading);
    }
    layout.space(10.0);

    for block in parse_blocks(markdown) {
        let text = block.plain_text();
        match block {
            Block::Heading { level, .. } => {
                let (size, gap) = match level {
                    1 => (14.0, 5.0),
                    2 => (12.0, 3.0),
                    _ => (11.0, 2.0),
                };
                layout.space(gap);
                layout.push_wrapped(FONT_BOLD, size, 0.0, &text);
            }
            Block::Bullet(_) => {
                layout.push_wrapped(FONT_REGULAR, 11.0, BULLET_INDENT, &format!("\u{2022} {text}"));
            }
            Block::Paragraph(_) => layout.push_wrapped(FONT_REGULAR, 11.0, 0.0, &text),
        }
    }
    layout
}

fn page_content(lines: &[(f32, Line)]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    for (y, line) in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![line.font.into(), Object::Real(line.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(line.x), Object::Real(*y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(line.text.clone(), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

fn render_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Render {
        format: ExportFormat::Pdf,
        message: e.to_string(),
    }
}

/// Render a Markdown report as a PDF titled `Research Report: {title}`.
///
/// Level-1 headings are set in 14pt Helvetica-Bold, level-2 in 12pt and
/// level-3 in 11pt; body text and bullets use 11pt Helvetica.
pub fn render_pdf(title: &str, markdown: &str) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_REGULAR => regular_id,
            FONT_BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in layout(title, markdown).pages {
        let content = page_content(&lines).encode().map_err(render_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(to_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal("ferret"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(render_error)?;
    Ok(bytes)
}
