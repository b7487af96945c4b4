//! Error types for the edgequake-pdfmerge library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MergeError`]: **fatal**, the merge request cannot produce a document
//!   at all (no inputs, every item was skipped, the output could not be
//!   written). Returned as `Err(MergeError)` from the top-level `merge*`
//!   functions.
//!
//! * [`ItemError`]: **non-fatal**, a single input item could not be used
//!   (bad order entry, unsupported extension, corrupt file) but the other
//!   items are fine. Collected in [`crate::output::MergeOutput::warnings`]
//!   so callers see exactly what was left out of the packet.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfmerge library.
///
/// Item-level failures use [`ItemError`] and are stored in
/// [`crate::output::MergeOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum MergeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request carried no files at all.
    #[error("Nothing to merge: no files were supplied")]
    NoInputs,

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading an input file failed for a reason other than the two above.
    #[error("Failed to read input file '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Every requested item was skipped; there are no pages to assemble.
    #[error("Nothing to merge: all {skipped} requested item(s) were skipped.\nFirst error: {first_error}")]
    NothingToMerge { skipped: usize, first_error: String },

    /// The assembled document could not be serialised to PDF bytes.
    #[error("Failed to serialise merged PDF: {detail}")]
    SerializeFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single order entry or input item.
///
/// `position` is the 1-indexed position of the entry in the resolved order
/// (or, for rank errors, the 1-indexed upload position). The merge continues
/// unless every item fails.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The order entry is not an integer index.
    #[error("Order entry {position}: '{entry}' is not a valid index")]
    MalformedOrderEntry { position: usize, entry: String },

    /// The order entry points past the uploaded files.
    #[error("Order entry {position}: index {index} is out of range ({count} file(s) uploaded)")]
    IndexOutOfRange {
        position: usize,
        index: i64,
        count: usize,
    },

    /// The index was already used and duplicates are rejected.
    #[error("Order entry {position}: index {index} was already used")]
    DuplicateIndex { position: usize, index: usize },

    /// A file has no usable "order" value in rank mode.
    #[error("File {position} '{name}': missing or invalid order value '{value}'")]
    InvalidRank {
        position: usize,
        name: String,
        value: String,
    },

    /// The extension has no handler.
    #[error("'{name}': unsupported format '.{extension}'")]
    UnsupportedFormat { name: String, extension: String },

    /// Bytes could not be decoded (text encoding, image codec).
    #[error("'{name}': could not decode {format}: {detail}")]
    DecodeFailed {
        name: String,
        format: String,
        detail: String,
    },

    /// Container or document structure could not be parsed.
    #[error("'{name}': could not parse {format}: {detail}")]
    ParseFailed {
        name: String,
        format: String,
        detail: String,
    },

    /// Text did not fit its page; the trailing lines were left out.
    #[error("'{name}': {lines} line(s) of text did not fit on the page and were left out")]
    TextTruncated { name: String, lines: usize },

    /// Extracted content could not be turned into a page.
    #[error("'{name}': page rendering failed: {detail}")]
    RenderFailed { name: String, detail: String },
}

impl ItemError {
    /// Name of the input item this error refers to, when one is known.
    pub fn item_name(&self) -> Option<&str> {
        match self {
            ItemError::InvalidRank { name, .. }
            | ItemError::UnsupportedFormat { name, .. }
            | ItemError::DecodeFailed { name, .. }
            | ItemError::ParseFailed { name, .. }
            | ItemError::TextTruncated { name, .. }
            | ItemError::RenderFailed { name, .. } => Some(name),
            ItemError::MalformedOrderEntry { .. }
            | ItemError::IndexOutOfRange { .. }
            | ItemError::DuplicateIndex { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_merge_display() {
        let e = MergeError::NothingToMerge {
            skipped: 3,
            first_error: "'x.bmp': unsupported format '.bmp'".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("all 3"), "got: {msg}");
        assert!(msg.contains("x.bmp"));
    }

    #[test]
    fn no_inputs_display() {
        assert!(MergeError::NoInputs.to_string().starts_with("Nothing to merge"));
    }

    #[test]
    fn out_of_range_display() {
        let e = ItemError::IndexOutOfRange {
            position: 2,
            index: 7,
            count: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("index 7"));
        assert!(msg.contains("3 file(s)"));
    }

    #[test]
    fn item_name_only_for_item_errors() {
        let e = ItemError::UnsupportedFormat {
            name: "notes.rtf".into(),
            extension: "rtf".into(),
        };
        assert_eq!(e.item_name(), Some("notes.rtf"));

        let e = ItemError::TextTruncated {
            name: "long.txt".into(),
            lines: 12,
        };
        assert_eq!(e.item_name(), Some("long.txt"));
        assert!(e.to_string().contains("12 line(s)"));

        let e = ItemError::MalformedOrderEntry {
            position: 1,
            entry: "abc".into(),
        };
        assert_eq!(e.item_name(), None);
    }

    #[test]
    fn item_error_serialises() {
        let e = ItemError::DecodeFailed {
            name: "a.txt".into(),
            format: "UTF-8 text".into(),
            detail: "invalid utf-8 sequence".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("DecodeFailed"));
        let back: ItemError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
