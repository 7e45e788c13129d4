//! Line-oriented Markdown classification shared by the document renderers.

/// One renderable line of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block<'a> {
    /// `#`, `##` or `###` heading, level 1 to 3.
    Heading { level: u8, text: &'a str },
    /// A `- ` or `* ` list item.
    Bullet(&'a str),
    Paragraph(&'a str),
}

impl<'a> Block<'a> {
    /// Classify a single line. Blank lines yield `None`.
    pub fn classify(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        for (prefix, level) in [("### ", 3), ("## ", 2), ("# ", 1)] {
            if let Some(text) = line.strip_prefix(prefix) {
                return Some(Block::Heading {
                    level,
                    text: text.trim(),
                });
            }
        }
        if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            return Some(Block::Bullet(text.trim()));
        }
        Some(Block::Paragraph(line))
    }

    /// The line's text with inline emphasis markers removed.
    pub fn plain_text(&self) -> String {
        let raw = match self {
            Block::Heading { text, .. } | Block::Bullet(text) | Block::Paragraph(text) => *text,
        };
        raw.replace("**", "").replace('`', "")
    }
}

/// Split a report into renderable blocks, skipping blank lines.
pub fn parse_blocks(markdown: &str) -> Vec<Block<'_>> {
    markdown.lines().filter_map(Block::classify).collect()
}
