//! Merge entry points.
//!
//! [`merge`] runs one request through every stage and returns the merged
//! PDF in memory; [`merge_to_file`] and [`merge_into_dir`] additionally
//! write it to disk. Requests are independent: nothing is cached between
//! calls.

use crate::config::{sanitize_output_name, MergeConfig, TextPlacement};
use crate::error::{ItemError, MergeError};
use crate::output::{ItemOutcome, ItemReport, MergeOutput, MergeStats};
use crate::pipeline::assemble::{self, Fragment, FragmentKind};
use crate::pipeline::extract::{self, ExtractedContent, FormatKind};
use crate::pipeline::input::{resolve_order, MergeRequest, ResolvedItem};
use crate::pipeline::layout::{PageGeometry, TextBlock, TextLayoutOptions, TextStyle};
use crate::pipeline::render;
use crate::progress::{MergeProgressCallback, MergeStage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Merge the request's items, in the requested order, into one PDF.
///
/// # Returns
/// `Ok(MergeOutput)` whenever at least one page was produced, even if some
/// order entries or items were skipped (see `output.warnings`).
///
/// # Errors
/// Returns `Err(MergeError)` only for fatal errors:
/// - the request has no items
/// - every item was skipped, leaving nothing to assemble
/// - the merged document could not be serialised
pub fn merge(request: &MergeRequest, config: &MergeConfig) -> Result<MergeOutput, MergeError> {
    let mut run = Run::new(config);
    let result = run.execute(request);
    match &result {
        Ok(output) => {
            run.enter(MergeStage::Done);
            info!(
                "Merge complete: {} page(s) from {}/{} item(s) in {}ms",
                output.page_count,
                output.stats.included_items,
                output.stats.ordered_items,
                output.stats.total_duration_ms
            );
        }
        Err(e) => {
            run.enter(MergeStage::Failed);
            warn!("Merge failed: {}", e);
        }
    }
    if let Some(cb) = run.callback {
        let included = result.as_ref().map_or(0, |o| o.stats.included_items);
        cb.on_merge_complete(run.total, included);
    }
    result
}

/// Merge and write the PDF to `output_path`.
///
/// The file is written through a temporary file in the same directory and
/// renamed into place, so a failed merge never leaves a partial PDF behind.
pub fn merge_to_file(
    request: &MergeRequest,
    config: &MergeConfig,
    output_path: impl AsRef<Path>,
) -> Result<MergeOutput, MergeError> {
    let output = merge(request, config)?;
    write_atomically(output_path.as_ref(), &output.pdf)?;
    Ok(output)
}

/// Merge and write `<name>.pdf` into `dir`. Returns the output and the path written.
pub fn merge_into_dir(
    request: &MergeRequest,
    config: &MergeConfig,
    dir: impl AsRef<Path>,
) -> Result<(MergeOutput, PathBuf), MergeError> {
    let output = merge(request, config)?;
    let path = dir.as_ref().join(&output.file_name);
    write_atomically(&path, &output.pdf)?;
    Ok((output, path))
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), MergeError> {
    let write_err = |source: std::io::Error| MergeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// An item that survived extraction, waiting for rendering.
struct Extracted<'a> {
    resolved: ResolvedItem<'a>,
    format: FormatKind,
    content: ExtractedContent,
}

/// State for one request: current stage, callback, and running totals.
struct Run<'c> {
    config: &'c MergeConfig,
    callback: Option<&'c dyn MergeProgressCallback>,
    stage: MergeStage,
    total: usize,
}

impl<'c> Run<'c> {
    fn new(config: &'c MergeConfig) -> Self {
        Self {
            config,
            callback: config.progress_callback.as_deref(),
            stage: MergeStage::Idle,
            total: 0,
        }
    }

    fn enter(&mut self, stage: MergeStage) {
        debug!("Stage {} → {}", self.stage, stage);
        self.stage = stage;
        if let Some(cb) = self.callback {
            cb.on_stage(stage);
        }
    }

    fn execute(&mut self, request: &MergeRequest) -> Result<MergeOutput, MergeError> {
        let start = Instant::now();
        let config = self.config;
        let name = match &request.output_name {
            Some(raw) => sanitize_output_name(raw),
            None => config.output_name.clone(),
        };
        info!("Starting merge '{}': {} file(s)", name, request.items.len());

        // ── Step 1: Resolve order ────────────────────────────────────────
        self.enter(MergeStage::Resolving);
        let resolution = resolve_order(&request.items, &request.order, config.duplicates)?;
        let mut warnings = resolution.errors;
        let order_errors = warnings.len();
        self.total = resolution.items.len();
        if let Some(cb) = self.callback {
            cb.on_merge_start(self.total);
        }

        // ── Step 2: Extract content ──────────────────────────────────────
        self.enter(MergeStage::Extracting);
        let mut reports: Vec<ItemReport> = Vec::with_capacity(self.total);
        let mut extracted: Vec<Extracted<'_>> = Vec::with_capacity(self.total);
        for resolved in resolution.items {
            let item = resolved.item;
            if let Some(cb) = self.callback {
                cb.on_item_start(resolved.position, self.total, item.name());
            }
            match extract::extract(item) {
                Ok((format, content)) => extracted.push(Extracted {
                    resolved,
                    format,
                    content,
                }),
                Err(e) => {
                    let format = FormatKind::from_extension(item.extension());
                    self.skip(&resolved, format, e, &mut reports, &mut warnings);
                }
            }
        }

        // ── Step 3: Render pages ─────────────────────────────────────────
        self.enter(MergeStage::Rendering);
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut front: Vec<(ResolvedItem<'_>, FormatKind, TextBlock)> = Vec::new();
        let mut text_pages = 0;
        let mut truncated_lines = 0;

        for Extracted {
            resolved,
            format,
            content,
        } in extracted
        {
            let item_name = resolved.item.name();
            let rendered: Result<Fragment, ItemError> = match content {
                ExtractedContent::PlainText(block) => {
                    // Grids always paginate at their own position.
                    let table = block.style == TextStyle::Table;
                    if config.text_placement == TextPlacement::Front && !table {
                        front.push((resolved, format, block));
                        continue;
                    }
                    self.render_text(std::slice::from_ref(&block), table)
                        .map(|r| {
                            text_pages += r.page_count;
                            truncated_lines += r.truncated_lines;
                            if r.truncated_lines > 0 {
                                warnings.push(text_truncated(item_name, r.truncated_lines));
                            }
                            Fragment::new(FragmentKind::Text, item_name, r.document)
                        })
                        .map_err(|e| render_failed(item_name, e))
                }
                ExtractedContent::PassthroughDocument(doc) => {
                    Ok(Fragment::new(FragmentKind::Passthrough, item_name, doc))
                }
                ExtractedContent::Image(img) => {
                    render::render_image(&img, PageGeometry::A4, config.jpeg_quality)
                        .map(|doc| Fragment::new(FragmentKind::Image, item_name, doc))
                        .map_err(|e| render_failed(item_name, e))
                }
            };

            match rendered {
                Ok(fragment) => {
                    let pages = fragment.page_count();
                    self.include(&resolved, format, ItemOutcome::Included { pages }, &mut reports);
                    fragments.push(fragment);
                }
                Err(e) => self.skip(&resolved, format, e, &mut reports, &mut warnings),
            }
        }

        if !front.is_empty() {
            let blocks: Vec<TextBlock> = front.iter().map(|(_, _, b)| b.clone()).collect();
            let label = front
                .iter()
                .map(|(r, _, _)| r.item.name())
                .collect::<Vec<_>>()
                .join(", ");
            match self.render_text(&blocks, false) {
                Ok(r) => {
                    text_pages += r.page_count;
                    truncated_lines += r.truncated_lines;
                    fragments.insert(0, Fragment::new(FragmentKind::CombinedText, label, r.document));
                    for ((resolved, format, _), &dropped) in front.iter().zip(&r.truncated_per_block) {
                        if dropped > 0 {
                            warnings.push(text_truncated(resolved.item.name(), dropped));
                        }
                        self.include(resolved, *format, ItemOutcome::CombinedText, &mut reports);
                    }
                }
                Err(e) => {
                    for (resolved, format, _) in &front {
                        let err = render_failed(resolved.item.name(), &e);
                        self.skip(resolved, *format, err, &mut reports, &mut warnings);
                    }
                }
            }
        }
        reports.sort_by_key(|r| r.position);

        if fragments.is_empty() {
            let first_error = warnings
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no items were selected".to_string());
            return Err(MergeError::NothingToMerge {
                skipped: order_errors + reports.len(),
                first_error,
            });
        }

        // ── Step 4: Assemble ─────────────────────────────────────────────
        self.enter(MergeStage::Assembling);
        let assemble_start = Instant::now();
        let merged = assemble::assemble(fragments, config.compress)?;
        let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

        let included = reports.iter().filter(|r| r.outcome.is_included()).count();
        let stats = MergeStats {
            uploaded_items: request.items.len(),
            ordered_items: self.total,
            included_items: included,
            skipped_items: self.total - included,
            order_errors,
            text_pages,
            truncated_lines,
            page_count: merged.page_count,
            output_bytes: merged.bytes.len(),
            total_duration_ms: start.elapsed().as_millis() as u64,
            assemble_duration_ms,
        };

        Ok(MergeOutput {
            file_name: format!("{name}.pdf"),
            name,
            pdf: merged.bytes,
            page_count: merged.page_count,
            items: reports,
            warnings,
            stats,
        })
    }

    /// Render text blocks with the configured layout.
    ///
    /// `table_page` selects the table margin and lets the grid continue
    /// onto further pages; otherwise everything goes on one prose page.
    fn render_text(
        &self,
        blocks: &[TextBlock],
        table_page: bool,
    ) -> Result<render::RenderedText, render::RenderError> {
        let c = self.config;
        let margin = if table_page { c.table_margin } else { c.text_margin };
        let opts = TextLayoutOptions {
            prose_size: c.text_font_size,
            table_size: c.table_font_size,
            min_table_size: c.min_table_font_size,
            line_spacing: c.line_spacing,
            paginate: table_page,
        };
        render::render_text(blocks, PageGeometry::A4, PageGeometry::A4.inset(margin), &opts)
    }

    fn include(
        &self,
        resolved: &ResolvedItem<'_>,
        format: FormatKind,
        outcome: ItemOutcome,
        reports: &mut Vec<ItemReport>,
    ) {
        let pages = match outcome {
            ItemOutcome::Included { pages } => pages,
            _ => 0,
        };
        debug!(
            "Item {}/{} '{}' ({}): {} page(s)",
            resolved.position,
            self.total,
            resolved.item.name(),
            format,
            pages
        );
        if let Some(cb) = self.callback {
            cb.on_item_complete(resolved.position, self.total, resolved.item.name(), pages);
        }
        reports.push(report(resolved, format, outcome));
    }

    fn skip(
        &self,
        resolved: &ResolvedItem<'_>,
        format: FormatKind,
        error: ItemError,
        reports: &mut Vec<ItemReport>,
        warnings: &mut Vec<ItemError>,
    ) {
        warn!("Skipping item {}: {}", resolved.position, error);
        if let Some(cb) = self.callback {
            cb.on_item_error(resolved.position, self.total, &error.to_string());
        }
        reports.push(report(
            resolved,
            format,
            ItemOutcome::Skipped {
                error: error.clone(),
            },
        ));
        warnings.push(error);
    }
}

fn report(resolved: &ResolvedItem<'_>, format: FormatKind, outcome: ItemOutcome) -> ItemReport {
    ItemReport {
        position: resolved.position,
        index: resolved.index,
        name: resolved.item.name().to_string(),
        format,
        outcome,
    }
}

fn text_truncated(name: &str, lines: usize) -> ItemError {
    let e = ItemError::TextTruncated {
        name: name.to_string(),
        lines,
    };
    warn!("{}", e);
    e
}

fn render_failed(name: &str, e: impl std::fmt::Display) -> ItemError {
    ItemError::RenderFailed {
        name: name.to_string(),
        detail: e.to_string(),
    }
}
