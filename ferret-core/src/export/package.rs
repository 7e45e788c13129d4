//! Zip packaging and XML text helpers for the OOXML formats.

use std::io::{Cursor, Write};

/// Write `(path, contents)` entries into an in-memory zip archive.
pub(crate) fn zip_package(entries: &[(&str, String)]) -> Result<Vec<u8>, String> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for (path, contents) in entries {
        zip.start_file(*path, options)
            .map_err(|e| format!("Failed to start {path}: {e}"))?;
        zip.write_all(contents.as_bytes())
            .map_err(|e| format!("Failed to write {path}: {e}"))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| format!("Failed to finish archive: {e}"))?;
    Ok(cursor.into_inner())
}

/// Escape text for an XML text node, dropping characters XML 1.0 forbids.
pub(crate) fn xml_text(text: &str) -> String {
    let allowed: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    quick_xml::escape::escape(allowed.as_str()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_xml_text() {
        assert_eq!(xml_text("R&D <2024> \"x\""), "R&amp;D &lt;2024&gt; &quot;x&quot;");
        assert_eq!(xml_text("bell\u{7}less"), "bellless");
    }

    #[test]
    fn test_zip_package_roundtrip_entries() {
        let bytes = zip_package(&[
            ("a.xml", "<a/>".to_string()),
            ("dir/b.xml", "<b/>".to_string()),
        ])
        .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut contents = String::new();
        archive
            .by_name("dir/b.xml")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "<b/>");
    }
}
