//! Progress-callback trait for per-item merge events.
//!
//! Inject an [`Arc<dyn MergeProgressCallback>`] via
//! [`crate::config::MergeConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages and handles each item.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfmerge::{MergeProgressCallback, MergeConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl MergeProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, position: usize, total: usize, name: &str, pages: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{position}/{total} {name}: {pages} page(s)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = MergeConfig::builder()
//!     .progress_callback(counter as Arc<dyn MergeProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a single merge request.
///
/// ```text
/// Idle → Resolving → Extracting → Rendering → Assembling → Done
///                                                        ↘ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStage {
    Idle,
    Resolving,
    Extracting,
    Rendering,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeStage::Idle => "idle",
            MergeStage::Resolving => "resolving",
            MergeStage::Extracting => "extracting",
            MergeStage::Rendering => "rendering",
            MergeStage::Assembling => "assembling",
            MergeStage::Done => "done",
            MergeStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the merge pipeline as it processes a request.
///
/// Implementations must be `Send + Sync` so a single callback can be shared
/// between requests. All methods have default no-op implementations so
/// callers only override what they care about.
pub trait MergeProgressCallback: Send + Sync {
    /// Called once the order is resolved, before any item is extracted.
    ///
    /// # Arguments
    /// * `total_items`: number of items that will be extracted
    fn on_merge_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called on every stage transition.
    fn on_stage(&self, stage: MergeStage) {
        let _ = stage;
    }

    /// Called just before an item is extracted.
    ///
    /// # Arguments
    /// * `position`: 1-indexed position in the resolved order
    /// * `total`   : number of resolved items
    /// * `name`    : original file name
    fn on_item_start(&self, position: usize, total: usize, name: &str) {
        let _ = (position, total, name);
    }

    /// Called when an item produced content.
    ///
    /// `pages` is the number of pages the item contributes on its own; text
    /// items folded into the combined front page report 0.
    fn on_item_complete(&self, position: usize, total: usize, name: &str, pages: usize) {
        let _ = (position, total, name, pages);
    }

    /// Called when an item is skipped.
    fn on_item_error(&self, position: usize, total: usize, error: &str) {
        let _ = (position, total, error);
    }

    /// Called once after assembly (or after the request failed).
    ///
    /// # Arguments
    /// * `total_items`  : number of resolved items
    /// * `success_count`: items that made it into the output
    fn on_merge_complete(&self, total_items: usize, success_count: usize) {
        let _ = (total_items, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl MergeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::MergeConfig`].
pub type ProgressCallback = Arc<dyn MergeProgressCallback>;
