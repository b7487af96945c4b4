//! # edgequake-pdfmerge
//!
//! Merge text files, Word documents, spreadsheets, PDFs and images into a
//! single PDF, in the order the caller asks for.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files + order
//!  │
//!  ├─ 1. Resolve   order list / picker labels / per-file ranks → items
//!  ├─ 2. Extract   txt · docx · xlsx/xls/ods · pdf · jpg/png
//!  ├─ 3. Render    text → A4 text pages, images → fitted A4 pages
//!  ├─ 4. Assemble  one page tree, optional stream compression
//!  └─ 5. Output    PDF bytes + per-item report + warnings
//! ```
//!
//! Prose items (plain text, Word) are by default gathered onto a single page
//! at the front of the output; set [`TextPlacement::InPlace`] to give each
//! its own page at its position. Spreadsheets become monospaced grids that
//! continue over as many pages as they need, at their own position. PDF
//! pages are copied unchanged, and every image gets a page of its own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfmerge::{load_inputs, merge_into_dir, IndexBase, MergeConfig, MergeRequest, OrderSpec};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let items = load_inputs(&["notes.txt", "scan.png", "report.pdf"])?;
//!     let request = MergeRequest::new(items)
//!         .with_order(OrderSpec::from_csv("2,0,1", IndexBase::Zero));
//!
//!     let (output, path) = merge_into_dir(&request, &MergeConfig::default(), ".")?;
//!     println!("{}", output.status());
//!     for warning in &output.warnings {
//!         eprintln!("skipped: {warning}");
//!     }
//!     eprintln!("wrote {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfmerge` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfmerge = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DuplicatePolicy, MergeConfig, MergeConfigBuilder, TextPlacement};
pub use error::{ItemError, MergeError};
pub use merge::{merge, merge_into_dir, merge_to_file};
pub use output::{status_line, ItemOutcome, ItemReport, MergeOutput, MergeStats};
pub use pipeline::extract::FormatKind;
pub use pipeline::input::{load_inputs, IndexBase, InputItem, MergeRequest, OrderSpec};
pub use progress::{MergeProgressCallback, MergeStage, NoopProgressCallback, ProgressCallback};
