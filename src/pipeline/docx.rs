//! Word (.docx) paragraph extraction.
//!
//! A .docx file is a zip archive; the body lives in `word/document.xml` as
//! WordprocessingML. We stream that part with quick-xml and collect the text
//! of every `<w:p>` in document order, including paragraphs inside table
//! cells. Run-level `<w:tab/>` and `<w:br/>` become `\t` and `\n`; all
//! formatting is dropped.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use thiserror::Error;

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("not a valid .docx archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to read {DOCUMENT_PART}: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed WordprocessingML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Extract paragraph texts from .docx bytes, in document order.
pub fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<String>, DocxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;
    parse_document_xml(&xml)
}

/// Collect paragraph texts from a `word/document.xml` string.
pub fn parse_document_xml(xml: &str) -> Result<Vec<String>, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    // text boxes can nest paragraphs inside paragraphs
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"r" => run_depth += 1,
                b"t" if run_depth > 0 => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if run_depth > 0 => push_char(&mut open, '\t'),
                b"br" | b"cr" if run_depth > 0 => push_char(&mut open, '\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape()?;
                if let Some(p) = open.last_mut() {
                    p.push_str(&text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"p" => {
                    if let Some(p) = open.pop() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_char(open: &mut [String], c: char) {
    if let Some(p) = open.last_mut() {
        p.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn document(body: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:document {NS}><w:body>{body}</w:body></w:document>"#)
    }

    #[test]
    fn paragraphs_in_order_with_runs_joined() {
        let xml = document(
            "<w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Second</w:t></w:r></w:p>",
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["Hello world", "Second"]);
    }

    #[test]
    fn empty_paragraphs_are_kept() {
        let xml = document("<w:p/><w:p><w:pPr/></w:p><w:p><w:r><w:t>x</w:t></w:r></w:p>");
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["", "", "x"]);
    }

    #[test]
    fn tabs_breaks_and_entities() {
        let xml = document(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t xml:space="preserve">b &amp; c</w:t><w:br/><w:t>d</w:t></w:r></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["a\tb & c\nd"]);
    }

    #[test]
    fn table_cell_paragraphs_are_included() {
        let xml = document(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
             <w:p><w:r><w:t>after</w:t></w:r></w:p>",
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["cell", "after"]);
    }

    #[test]
    fn extract_from_archive() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(DOCUMENT_PART, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(document("<w:p><w:r><w:t>Packed</w:t></w:r></w:p>").as_bytes())
            .unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert_eq!(extract_paragraphs(&bytes).unwrap(), vec!["Packed"]);
    }

    #[test]
    fn not_a_zip_is_an_archive_error() {
        let err = extract_paragraphs(b"plain text, not a zip").unwrap_err();
        assert!(matches!(err, DocxError::Archive(_)));
    }
}
