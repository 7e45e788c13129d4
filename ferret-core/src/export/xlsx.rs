//! Minimal SpreadsheetML (XLSX) renderer for sources and documents.

use super::package::{xml_text, zip_package};
use crate::error::ExportError;
use crate::types::{DocumentRef, ExportFormat, Source};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sources" sheetId="1" r:id="rId1"/><sheet name="Documents" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#;

/// Column letter for a zero-based index. Sheets here never exceed 26 columns.
fn column(idx: usize) -> char {
    (b'A' + idx as u8) as char
}

/// Build a worksheet of inline-string cells. Row 1 is the header.
fn sheet_xml(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut data = String::new();
    let header_row: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    for (r, row) in std::iter::once(&header_row).chain(rows).enumerate() {
        data.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            data.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column(c),
                r + 1,
                xml_text(value)
            ));
        }
        data.push_str("</row>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
    )
}

/// Tabulate sources (`Sources`: Title, URL) and documents (`Documents`: Title, Type, URL).
pub fn render_xlsx(sources: &[Source], documents: &[DocumentRef]) -> Result<Vec<u8>, ExportError> {
    let source_rows: Vec<Vec<String>> = sources
        .iter()
        .map(|s| vec![s.title.clone(), s.url.clone()])
        .collect();
    let document_rows: Vec<Vec<String>> = documents
        .iter()
        .map(|d| vec![d.title.clone(), d.doc_type.to_string(), d.url.clone()])
        .collect();

    zip_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", WORKBOOK.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(&["Title", "URL"], &source_rows)),
        (
            "xl/worksheets/sheet2.xml",
            sheet_xml(&["Title", "Type", "URL"], &document_rows),
        ),
    ])
    .map_err(|message| ExportError::Render {
        format: ExportFormat::Xlsx,
        message,
    })
}
