//! Result types for a merge request.
//!
//! [`MergeOutput`] carries the merged PDF bytes together with a per-item
//! report, the non-fatal warnings collected along the way and timing stats.
//! Everything except the PDF bytes serialises to JSON for `--json` output.

use crate::error::{ItemError, MergeError};
use crate::pipeline::extract::FormatKind;
use serde::{Deserialize, Serialize};

/// The merged document and everything learned while producing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutput {
    /// Output base name, e.g. `Merged_Document`.
    pub name: String,

    /// `<name>.pdf`.
    pub file_name: String,

    /// The serialised PDF.
    #[serde(skip)]
    pub pdf: Vec<u8>,

    /// Pages in the merged document.
    pub page_count: usize,

    /// One entry per resolved order position, in output order.
    pub items: Vec<ItemReport>,

    /// Everything that was left out, order problems first.
    pub warnings: Vec<ItemError>,

    pub stats: MergeStats,
}

impl MergeOutput {
    /// User-facing status line.
    ///
    /// `PDF 'Merged_Document.pdf' is ready for download!`, followed by a
    /// warning count when anything was skipped.
    pub fn status(&self) -> String {
        let mut status = format!("PDF '{}' is ready for download!", self.file_name);
        match self.warnings.len() {
            0 => {}
            1 => status.push_str(" (1 warning)"),
            n => status.push_str(&format!(" ({n} warnings)")),
        }
        status
    }

    /// Whether any order entry or item was skipped.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Status line for either outcome of a merge: the success message, or
/// `Warning: <reason>` when nothing could be produced.
pub fn status_line(result: &Result<MergeOutput, MergeError>) -> String {
    match result {
        Ok(output) => output.status(),
        Err(e) => format!("Warning: {e}"),
    }
}

/// What happened to one resolved item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    /// 1-indexed position in the resolved order.
    pub position: usize,
    /// Zero-based upload index.
    pub index: usize,
    pub name: String,
    pub format: FormatKind,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The item contributed `pages` pages at its own position.
    Included { pages: usize },
    /// The item's text was folded into the combined front page.
    CombinedText,
    /// The item was left out.
    Skipped { error: ItemError },
}

impl ItemOutcome {
    pub fn is_included(&self) -> bool {
        !matches!(self, ItemOutcome::Skipped { .. })
    }
}

/// Counters and timings for a merge request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Files supplied with the request.
    pub uploaded_items: usize,
    /// Positions that survived order resolution.
    pub ordered_items: usize,
    /// Positions that made it into the output.
    pub included_items: usize,
    /// Positions dropped during extraction or rendering.
    pub skipped_items: usize,
    /// Order entries that could not be resolved.
    pub order_errors: usize,
    /// Pages rendered from text (combined page or in place).
    pub text_pages: usize,
    /// Text lines that did not fit on their page.
    pub truncated_lines: usize,
    pub page_count: usize,
    pub output_bytes: usize,
    pub total_duration_ms: u64,
    pub assemble_duration_ms: u64,
}
