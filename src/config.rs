//! Configuration types for merging a packet of files into one PDF.
//!
//! All merge behaviour is controlled through [`MergeConfig`], built via its
//! [`MergeConfigBuilder`]. Layout knobs (font sizes, margins) live here too,
//! so the renderer is the only place that reads them and the rest of the
//! pipeline never makes a layout decision of its own.

use crate::error::MergeError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base name used when the caller does not supply one.
pub const DEFAULT_OUTPUT_NAME: &str = "Merged_Document";

/// Configuration for a merge request.
///
/// Built via [`MergeConfig::builder()`] or using [`MergeConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfmerge::{MergeConfig, TextPlacement};
///
/// let config = MergeConfig::builder()
///     .text_placement(TextPlacement::InPlace)
///     .output_name("Quarterly_Packet")
///     .build()
///     .unwrap();
/// assert_eq!(config.output_file_name(), "Quarterly_Packet.pdf");
/// ```
#[derive(Clone)]
pub struct MergeConfig {
    /// Where text-bearing items land in the output. Default: [`TextPlacement::Front`].
    pub text_placement: TextPlacement,

    /// What to do when the order names the same file twice. Default: [`DuplicatePolicy::Allow`].
    pub duplicates: DuplicatePolicy,

    /// Output base name, without the `.pdf` suffix. Default: `Merged_Document`.
    pub output_name: String,

    /// Font size for prose text pages, in points. Range: 6–72. Default: 12.
    pub text_font_size: f32,

    /// Margin around prose text, in points, on all four sides. Default: 50.
    ///
    /// On A4 this yields the text rectangle (50,50)–(545,792).
    pub text_margin: f32,

    /// Starting font size for spreadsheet grids. Default: 8.
    ///
    /// The renderer shrinks it until the widest row fits, down to
    /// `min_table_font_size`.
    pub table_font_size: f32,

    /// Smallest font size the table renderer may shrink to. Default: 6.
    pub min_table_font_size: f32,

    /// Margin around spreadsheet grids on their own pages. Default: 10.
    pub table_margin: f32,

    /// Baseline-to-baseline distance as a multiple of the font size. Default: 1.2.
    pub line_spacing: f32,

    /// JPEG quality used when re-encoding images for embedding. Range: 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Compress content streams in the merged output. Default: true.
    pub compress: bool,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            text_placement: TextPlacement::default(),
            duplicates: DuplicatePolicy::default(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            text_font_size: 12.0,
            text_margin: 50.0,
            table_font_size: 8.0,
            min_table_font_size: 6.0,
            table_margin: 10.0,
            line_spacing: 1.2,
            jpeg_quality: 90,
            compress: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for MergeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeConfig")
            .field("text_placement", &self.text_placement)
            .field("duplicates", &self.duplicates)
            .field("output_name", &self.output_name)
            .field("text_font_size", &self.text_font_size)
            .field("text_margin", &self.text_margin)
            .field("table_font_size", &self.table_font_size)
            .field("min_table_font_size", &self.min_table_font_size)
            .field("table_margin", &self.table_margin)
            .field("line_spacing", &self.line_spacing)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("compress", &self.compress)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn MergeProgressCallback>"),
            )
            .finish()
    }
}

impl MergeConfig {
    /// Create a new builder for `MergeConfig`.
    pub fn builder() -> MergeConfigBuilder {
        MergeConfigBuilder {
            config: Self::default(),
        }
    }

    /// File name of the merged document, e.g. `Merged_Document.pdf`.
    pub fn output_file_name(&self) -> String {
        format!("{}.pdf", self.output_name)
    }
}

/// Builder for [`MergeConfig`].
#[derive(Debug)]
pub struct MergeConfigBuilder {
    config: MergeConfig,
}

impl MergeConfigBuilder {
    pub fn text_placement(mut self, placement: TextPlacement) -> Self {
        self.config.text_placement = placement;
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicates = policy;
        self
    }

    /// Set the output base name. Blank names fall back to `Merged_Document`.
    pub fn output_name(mut self, name: impl AsRef<str>) -> Self {
        self.config.output_name = sanitize_output_name(name.as_ref());
        self
    }

    pub fn text_font_size(mut self, size: f32) -> Self {
        self.config.text_font_size = size.clamp(6.0, 72.0);
        self
    }

    pub fn text_margin(mut self, margin: f32) -> Self {
        self.config.text_margin = margin.max(0.0);
        self
    }

    pub fn table_font_size(mut self, size: f32) -> Self {
        self.config.table_font_size = size.clamp(6.0, 72.0);
        self
    }

    pub fn min_table_font_size(mut self, size: f32) -> Self {
        self.config.min_table_font_size = size.clamp(1.0, 72.0);
        self
    }

    pub fn table_margin(mut self, margin: f32) -> Self {
        self.config.table_margin = margin.max(0.0);
        self
    }

    pub fn line_spacing(mut self, factor: f32) -> Self {
        self.config.line_spacing = factor.clamp(0.8, 3.0);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn compress(mut self, v: bool) -> Self {
        self.config.compress = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MergeConfig, MergeError> {
        let c = &self.config;
        if c.min_table_font_size > c.table_font_size {
            return Err(MergeError::InvalidConfig(format!(
                "min_table_font_size ({}) must not exceed table_font_size ({})",
                c.min_table_font_size, c.table_font_size
            )));
        }
        // Both margins must leave a usable box on an A4 page.
        let narrowest = crate::pipeline::layout::PageGeometry::A4.width / 2.0;
        if c.text_margin >= narrowest || c.table_margin >= narrowest {
            return Err(MergeError::InvalidConfig(format!(
                "margins must be below {narrowest}pt, got text={} table={}",
                c.text_margin, c.table_margin
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where pages rendered from text-bearing items are placed.
///
/// | Placement | Behaviour |
/// |-----------|-----------|
/// | `Front`   | All text and Word content is concatenated onto one page placed first, regardless of the order (default) |
/// | `InPlace` | Every text and Word item gets its own page at its position in the order |
///
/// Spreadsheet grids are not affected: they always paginate at their own
/// position so no row is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPlacement {
    #[default]
    Front,
    InPlace,
}

/// Handling of an order that references the same upload more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every occurrence contributes its pages again. (default)
    #[default]
    Allow,
    /// Second and later occurrences are reported and skipped.
    Reject,
}

static RE_RESERVED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).unwrap());

/// Normalise a user-supplied output name into a safe base name.
///
/// Path separators and characters reserved on common file systems become
/// `_`, a trailing `.pdf` (any case) is removed, and blank input falls back
/// to [`DEFAULT_OUTPUT_NAME`].
pub fn sanitize_output_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let base = if trimmed.to_ascii_lowercase().ends_with(".pdf") {
        &trimmed[..trimmed.len() - 4]
    } else {
        trimmed
    };
    let cleaned = RE_RESERVED.replace_all(base.trim(), "_");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        DEFAULT_OUTPUT_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_layout() {
        let c = MergeConfig::default();
        assert_eq!(c.text_placement, TextPlacement::Front);
        assert_eq!(c.duplicates, DuplicatePolicy::Allow);
        assert_eq!(c.output_name, "Merged_Document");
        assert_eq!(c.text_font_size, 12.0);
        assert_eq!(c.text_margin, 50.0);
        assert_eq!(c.output_file_name(), "Merged_Document.pdf");
    }

    #[test]
    fn builder_clamps_values() {
        let c = MergeConfig::builder()
            .text_font_size(200.0)
            .jpeg_quality(0)
            .build()
            .unwrap();
        assert_eq!(c.text_font_size, 72.0);
        assert_eq!(c.jpeg_quality, 1);
    }

    #[test]
    fn builder_rejects_inverted_table_sizes() {
        let err = MergeConfig::builder()
            .table_font_size(6.0)
            .min_table_font_size(10.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_huge_margins() {
        let err = MergeConfig::builder().text_margin(400.0).build().unwrap_err();
        assert!(err.to_string().contains("margins"));
    }

    #[test]
    fn sanitize_output_name_cases() {
        assert_eq!(sanitize_output_name("Report"), "Report");
        assert_eq!(sanitize_output_name("  Report.PDF "), "Report");
        assert_eq!(sanitize_output_name("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_output_name("a:b*c"), "a_b_c");
        assert_eq!(sanitize_output_name(""), DEFAULT_OUTPUT_NAME);
        assert_eq!(sanitize_output_name("   .pdf"), DEFAULT_OUTPUT_NAME);
    }

    #[test]
    fn placement_serde_names() {
        let json = serde_json::to_string(&TextPlacement::InPlace).unwrap();
        assert_eq!(json, "\"in_place\"");
    }
}
