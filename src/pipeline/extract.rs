//! Per-format content extraction.
//!
//! The extension of each [`InputItem`] selects one handler from a closed
//! table. A handler turns the raw bytes into one of three shapes:
//! plain text to be laid out, a parsed PDF whose pages pass through
//! untouched, or a decoded image. Failures are per-item [`ItemError`]s; the
//! caller records them and moves on to the next item.

use crate::error::ItemError;
use crate::pipeline::docx;
use crate::pipeline::input::InputItem;
use crate::pipeline::layout::TextBlock;
use crate::pipeline::sheet;
use image::DynamicImage;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    PlainText,
    WordDocument,
    Spreadsheet,
    Pdf,
    Image,
    Unsupported,
}

/// Extension → format. Anything not listed is unsupported.
const DISPATCH: &[(&str, FormatKind)] = &[
    ("txt", FormatKind::PlainText),
    ("docx", FormatKind::WordDocument),
    ("xlsx", FormatKind::Spreadsheet),
    ("xlsm", FormatKind::Spreadsheet),
    ("xls", FormatKind::Spreadsheet),
    ("ods", FormatKind::Spreadsheet),
    ("pdf", FormatKind::Pdf),
    ("jpg", FormatKind::Image),
    ("jpeg", FormatKind::Image),
    ("png", FormatKind::Image),
];

impl FormatKind {
    /// Look up a lower-case extension (without the dot).
    pub fn from_extension(extension: &str) -> Self {
        DISPATCH
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map_or(FormatKind::Unsupported, |(_, kind)| *kind)
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FormatKind::PlainText => "text",
            FormatKind::WordDocument => "docx",
            FormatKind::Spreadsheet => "spreadsheet",
            FormatKind::Pdf => "pdf",
            FormatKind::Image => "image",
            FormatKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// What an item turned into.
#[derive(Debug)]
pub enum ExtractedContent {
    /// Text destined for a rendered page.
    PlainText(TextBlock),
    /// An existing PDF; its pages are copied as-is.
    PassthroughDocument(Document),
    /// A raster image, placed on its own page.
    Image(DynamicImage),
}

/// Extract the content of one item.
pub fn extract(item: &InputItem) -> Result<(FormatKind, ExtractedContent), ItemError> {
    let kind = FormatKind::from_extension(item.extension());
    let content = match kind {
        FormatKind::PlainText => extract_plain_text(item)?,
        FormatKind::WordDocument => extract_docx(item)?,
        FormatKind::Spreadsheet => extract_spreadsheet(item)?,
        FormatKind::Pdf => extract_pdf(item)?,
        FormatKind::Image => extract_image(item)?,
        FormatKind::Unsupported => {
            return Err(ItemError::UnsupportedFormat {
                name: item.name().to_string(),
                extension: item.extension().to_string(),
            })
        }
    };

    debug!(name = item.name(), format = %kind, "extracted");
    Ok((kind, content))
}

fn extract_plain_text(item: &InputItem) -> Result<ExtractedContent, ItemError> {
    let bytes = item.content();
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| ItemError::DecodeFailed {
        name: item.name().to_string(),
        format: FormatKind::PlainText.to_string(),
        detail: format!("not valid UTF-8: {e}"),
    })?;
    Ok(ExtractedContent::PlainText(TextBlock::prose(text)))
}

fn extract_docx(item: &InputItem) -> Result<ExtractedContent, ItemError> {
    let paragraphs = docx::extract_paragraphs(item.content()).map_err(|e| ItemError::ParseFailed {
        name: item.name().to_string(),
        format: FormatKind::WordDocument.to_string(),
        detail: e.to_string(),
    })?;
    Ok(ExtractedContent::PlainText(TextBlock::prose(paragraphs.join("\n"))))
}

fn extract_spreadsheet(item: &InputItem) -> Result<ExtractedContent, ItemError> {
    let sheets = sheet::extract_sheets(item.content()).map_err(|e| ItemError::ParseFailed {
        name: item.name().to_string(),
        format: FormatKind::Spreadsheet.to_string(),
        detail: e.to_string(),
    })?;
    Ok(ExtractedContent::PlainText(TextBlock::table(sheet::format_workbook(&sheets))))
}

fn extract_pdf(item: &InputItem) -> Result<ExtractedContent, ItemError> {
    let fail = |detail: String| ItemError::ParseFailed {
        name: item.name().to_string(),
        format: FormatKind::Pdf.to_string(),
        detail,
    };

    let doc = Document::load_mem(item.content()).map_err(|e| fail(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(fail("encrypted documents are not supported".into()));
    }
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(fail("document has no pages".into()));
    }
    if let Some((no, _)) = pages.iter().find(|(_, id)| doc.get_dictionary(**id).is_err()) {
        return Err(fail(format!("page {no} is not a dictionary")));
    }
    Ok(ExtractedContent::PassthroughDocument(doc))
}

fn extract_image(item: &InputItem) -> Result<ExtractedContent, ItemError> {
    let img = image::load_from_memory(item.content()).map_err(|e| ItemError::DecodeFailed {
        name: item.name().to_string(),
        format: FormatKind::Image.to_string(),
        detail: e.to_string(),
    })?;
    Ok(ExtractedContent::Image(img))
}
