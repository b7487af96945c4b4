//! Input resolution: turn uploaded files plus an order specification into
//! the ordered list of items the rest of the pipeline consumes.
//!
//! The request is an immutable snapshot. Resolution borrows the items rather
//! than copying them, so an order that names the same upload twice costs
//! nothing until extraction. Bad order entries never abort the request; they
//! are returned next to the resolved list as [`ItemError`]s.

use crate::config::DuplicatePolicy;
use crate::error::{ItemError, MergeError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    name: String,
    extension: String,
    content: Vec<u8>,
}

impl InputItem {
    /// Create an item from a file name and its bytes.
    ///
    /// Only the final path component of `name` is kept. The extension is
    /// its lower-cased suffix without the dot (empty when there is none).
    pub fn new(name: impl AsRef<str>, content: impl Into<Vec<u8>>) -> Self {
        let raw = name.as_ref();
        let name = Path::new(raw)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw.to_string());
        let extension = Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            name,
            extension,
            content: content.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Whether explicit indices count from 0 or from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBase {
    #[default]
    Zero,
    One,
}

/// How the caller describes the output order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum OrderSpec {
    /// Upload order, `0..N`. (default)
    #[default]
    Natural,
    /// Textual entries such as `"2"` or the picker label `"2: scan.png"`.
    List { entries: Vec<String>, base: IndexBase },
    /// Zero-based indices built programmatically.
    Indices(Vec<usize>),
    /// One "order" value per upload; files are sorted ascending by it.
    Ranks(Vec<String>),
}

impl OrderSpec {
    /// Parse a comma-separated index list like `"2,0,1"`.
    ///
    /// Blank tokens (`"1,,2"`, a trailing comma) are ignored.
    pub fn from_csv(list: &str, base: IndexBase) -> Self {
        Self::from_entries(list.split(','), base)
    }

    /// Build a list spec from individual entries.
    pub fn from_entries<I, S>(entries: I, base: IndexBase) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        OrderSpec::List { entries, base }
    }

    /// Parse a comma-separated list of per-file order values like `"3,1,2"`.
    pub fn ranks_from_csv(list: &str) -> Self {
        OrderSpec::Ranks(list.split(',').map(|r| r.trim().to_string()).collect())
    }

    /// True when the spec carries no ordering information at all.
    pub fn is_empty(&self) -> bool {
        match self {
            OrderSpec::Natural => true,
            OrderSpec::List { entries, .. } => entries.is_empty(),
            OrderSpec::Indices(v) => v.is_empty(),
            OrderSpec::Ranks(v) => v.iter().all(|r| r.trim().is_empty()),
        }
    }
}

/// Everything a merge request needs, captured once.
#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    pub items: Vec<InputItem>,
    pub order: OrderSpec,
    /// Overrides [`crate::config::MergeConfig::output_name`] when set.
    pub output_name: Option<String>,
}

impl MergeRequest {
    pub fn new(items: Vec<InputItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order = order;
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }
}

/// An item at its place in the output order.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedItem<'a> {
    /// 1-indexed position in the resolved order.
    pub position: usize,
    /// Zero-based upload index.
    pub index: usize,
    pub item: &'a InputItem,
}

/// Result of order resolution: the usable items plus what was dropped.
#[derive(Debug, Default)]
pub struct Resolution<'a> {
    pub items: Vec<ResolvedItem<'a>>,
    pub errors: Vec<ItemError>,
}

/// Resolve `order` against `items`.
///
/// # Errors
/// Returns [`MergeError::NoInputs`] when `items` is empty. Every other
/// problem is per-entry and lands in [`Resolution::errors`].
pub fn resolve_order<'a>(
    items: &'a [InputItem],
    order: &OrderSpec,
    duplicates: DuplicatePolicy,
) -> Result<Resolution<'a>, MergeError> {
    if items.is_empty() {
        return Err(MergeError::NoInputs);
    }

    let mut errors = Vec::new();
    // (order position, zero-based index) pairs before duplicate filtering
    let candidates: Vec<(usize, usize)> = match order {
        OrderSpec::List { entries, base } if !order.is_empty() => {
            resolve_list(entries, *base, items.len(), &mut errors)
        }
        OrderSpec::Indices(indices) if !indices.is_empty() => indices
            .iter()
            .enumerate()
            .filter_map(|(i, &idx)| {
                if idx < items.len() {
                    Some((i + 1, idx))
                } else {
                    errors.push(ItemError::IndexOutOfRange {
                        position: i + 1,
                        index: i64::try_from(idx).unwrap_or(i64::MAX),
                        count: items.len(),
                    });
                    None
                }
            })
            .collect(),
        OrderSpec::Ranks(ranks) if !order.is_empty() => resolve_ranks(items, ranks, &mut errors),
        _ => {
            debug!("No order given; using upload order for {} files", items.len());
            (0..items.len()).map(|i| (i + 1, i)).collect()
        }
    };

    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(candidates.len());
    for (entry_pos, index) in candidates {
        if !seen.insert(index) && duplicates == DuplicatePolicy::Reject {
            errors.push(ItemError::DuplicateIndex {
                position: entry_pos,
                index,
            });
            continue;
        }
        resolved.push(ResolvedItem {
            position: resolved.len() + 1,
            index,
            item: &items[index],
        });
    }

    for e in &errors {
        warn!("{}", e);
    }
    debug!(
        "Resolved {} of {} files ({} order problems)",
        resolved.len(),
        items.len(),
        errors.len()
    );

    Ok(Resolution {
        items: resolved,
        errors,
    })
}

/// Accepts `"3"`, `" 3 "` and picker labels like `"3: report.pdf"`.
static RE_ORDER_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)\s*(?::.*)?$").unwrap());

/// Parse one textual order entry to a signed integer.
pub fn parse_order_entry(entry: &str) -> Option<i64> {
    RE_ORDER_ENTRY
        .captures(entry)
        .and_then(|caps| caps[1].parse::<i64>().ok())
}

fn resolve_list(
    entries: &[String],
    base: IndexBase,
    count: usize,
    errors: &mut Vec<ItemError>,
) -> Vec<(usize, usize)> {
    let offset = match base {
        IndexBase::Zero => 0,
        IndexBase::One => 1,
    };

    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let position = i + 1;
        let Some(raw) = parse_order_entry(entry) else {
            errors.push(ItemError::MalformedOrderEntry {
                position,
                entry: entry.clone(),
            });
            continue;
        };
        let in_range = raw
            .checked_sub(offset)
            .and_then(|z| usize::try_from(z).ok())
            .filter(|&z| z < count);
        let Some(zero_based) = in_range else {
            errors.push(ItemError::IndexOutOfRange {
                position,
                index: raw,
                count,
            });
            continue;
        };
        out.push((position, zero_based));
    }
    out
}

fn resolve_ranks(
    items: &[InputItem],
    ranks: &[String],
    errors: &mut Vec<ItemError>,
) -> Vec<(usize, usize)> {
    let mut ranked: Vec<(f64, usize)> = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let value = ranks.get(idx).map(|r| r.trim()).unwrap_or("");
        match value.parse::<f64>() {
            Ok(rank) if !rank.is_nan() => ranked.push((rank, idx)),
            _ => errors.push(ItemError::InvalidRank {
                position: idx + 1,
                name: item.name().to_string(),
                value: value.to_string(),
            }),
        }
    }
    for extra in items.len()..ranks.len() {
        if !ranks[extra].trim().is_empty() {
            errors.push(ItemError::IndexOutOfRange {
                position: extra + 1,
                index: i64::try_from(extra).unwrap_or(i64::MAX),
                count: items.len(),
            });
        }
    }
    // stable: equal ranks keep upload order
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (_, idx))| (i + 1, idx))
        .collect()
}

/// Read files from disk into [`InputItem`]s, preserving argument order.
///
/// Unlike per-item extraction failures, an unreadable path is fatal: the
/// caller asked for a file that is not there.
pub fn load_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<InputItem>, MergeError> {
    paths.iter().map(|p| load_input(p.as_ref())).collect()
}

fn load_input(path: &Path) -> Result<InputItem, MergeError> {
    let path_buf = PathBuf::from(path);
    if !path.exists() {
        return Err(MergeError::FileNotFound { path: path_buf });
    }
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => MergeError::PermissionDenied {
            path: path_buf.clone(),
        },
        std::io::ErrorKind::NotFound => MergeError::FileNotFound {
            path: path_buf.clone(),
        },
        _ => MergeError::InputReadFailed {
            path: path_buf.clone(),
            source: e,
        },
    })?;
    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(InputItem::new(path.to_string_lossy(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> Vec<InputItem> {
        names.iter().map(|n| InputItem::new(*n, b"x".to_vec())).collect()
    }

    fn indices(r: &Resolution<'_>) -> Vec<usize> {
        r.items.iter().map(|i| i.index).collect()
    }

    #[test]
    fn extension_is_lowercased_suffix() {
        assert_eq!(InputItem::new("Scan.JPG", vec![]).extension(), "jpg");
        assert_eq!(InputItem::new("dir/notes.txt", vec![]).name(), "notes.txt");
        assert_eq!(InputItem::new("README", vec![]).extension(), "");
        assert_eq!(InputItem::new("a.tar.GZ", vec![]).extension(), "gz");
    }

    #[test]
    fn empty_items_is_fatal() {
        let err = resolve_order(&[], &OrderSpec::Natural, DuplicatePolicy::Allow).unwrap_err();
        assert!(matches!(err, MergeError::NoInputs));
    }

    #[test]
    fn natural_and_empty_orders_use_upload_order() {
        let files = items(&["a.txt", "b.pdf", "c.png"]);
        let r = resolve_order(&files, &OrderSpec::Natural, DuplicatePolicy::Allow).unwrap();
        assert_eq!(indices(&r), vec![0, 1, 2]);

        let r = resolve_order(
            &files,
            &OrderSpec::from_csv("", IndexBase::Zero),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![0, 1, 2]);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn csv_zero_and_one_based() {
        let files = items(&["a.txt", "b.pdf", "c.png"]);
        let r = resolve_order(
            &files,
            &OrderSpec::from_csv("2,0,1", IndexBase::Zero),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![2, 0, 1]);
        assert_eq!(
            r.items.iter().map(|i| i.position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let r = resolve_order(
            &files,
            &OrderSpec::from_csv("3, 1", IndexBase::One),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![2, 0]);
    }

    #[test]
    fn picker_labels_are_accepted() {
        let files = items(&["a.txt", "b.pdf"]);
        let order = OrderSpec::from_entries(["1: b.pdf", "0: a.txt"], IndexBase::Zero);
        let r = resolve_order(&files, &order, DuplicatePolicy::Allow).unwrap();
        assert_eq!(indices(&r), vec![1, 0]);
    }

    #[test]
    fn bad_entries_are_reported_not_fatal() {
        let files = items(&["a.txt", "b.pdf"]);
        let order = OrderSpec::from_csv("1,x,5,-1,0", IndexBase::Zero);
        let r = resolve_order(&files, &order, DuplicatePolicy::Allow).unwrap();
        assert_eq!(indices(&r), vec![1, 0]);
        assert_eq!(r.errors.len(), 3);
        assert!(matches!(
            r.errors[0],
            ItemError::MalformedOrderEntry { position: 2, .. }
        ));
        assert!(matches!(
            r.errors[1],
            ItemError::IndexOutOfRange {
                position: 3,
                index: 5,
                count: 2
            }
        ));
        assert!(matches!(
            r.errors[2],
            ItemError::IndexOutOfRange { index: -1, .. }
        ));
    }

    #[test]
    fn one_based_zero_is_out_of_range() {
        let files = items(&["a.txt"]);
        let r = resolve_order(
            &files,
            &OrderSpec::from_csv("0,1", IndexBase::One),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![0]);
        assert!(matches!(
            r.errors[0],
            ItemError::IndexOutOfRange { index: 0, .. }
        ));
    }

    #[test]
    fn duplicates_follow_policy() {
        let files = items(&["a.pdf", "b.pdf"]);
        let order = OrderSpec::Indices(vec![0, 1, 0]);

        let r = resolve_order(&files, &order, DuplicatePolicy::Allow).unwrap();
        assert_eq!(indices(&r), vec![0, 1, 0]);

        let r = resolve_order(&files, &order, DuplicatePolicy::Reject).unwrap();
        assert_eq!(indices(&r), vec![0, 1]);
        assert_eq!(
            r.errors,
            vec![ItemError::DuplicateIndex {
                position: 3,
                index: 0
            }]
        );
    }

    #[test]
    fn omitted_items_are_excluded() {
        let files = items(&["a.pdf", "b.pdf", "c.pdf"]);
        let r = resolve_order(&files, &OrderSpec::Indices(vec![2]), DuplicatePolicy::Allow)
            .unwrap();
        assert_eq!(indices(&r), vec![2]);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn ranks_sort_ascending_and_stably() {
        let files = items(&["a.pdf", "b.pdf", "c.pdf", "d.pdf"]);
        let r = resolve_order(
            &files,
            &OrderSpec::ranks_from_csv("3,1,3,2"),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![1, 3, 0, 2]);

        let r = resolve_order(
            &files,
            &OrderSpec::ranks_from_csv("2.0,1.5,-0.5,1.5"),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![2, 1, 3, 0]);
    }

    #[test]
    fn nan_rank_is_invalid() {
        let files = items(&["a.pdf", "b.pdf"]);
        let r = resolve_order(
            &files,
            &OrderSpec::ranks_from_csv("NaN,1"),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![1]);
        assert!(matches!(&r.errors[0], ItemError::InvalidRank { position: 1, .. }));
    }

    #[test]
    fn extreme_entries_are_out_of_range() {
        let files = items(&["a.pdf", "b.pdf"]);
        let r = resolve_order(
            &files,
            &OrderSpec::from_csv("-9223372036854775808,1", IndexBase::One),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![0]);
        assert_eq!(
            r.errors,
            vec![ItemError::IndexOutOfRange {
                position: 1,
                index: i64::MIN,
                count: 2
            }]
        );

        let r = resolve_order(
            &files,
            &OrderSpec::Indices(vec![usize::MAX, 1]),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![1]);
        assert!(matches!(
            r.errors[0],
            ItemError::IndexOutOfRange { index: i64::MAX, .. }
        ));
    }

    #[test]
    fn ranks_missing_or_invalid_are_skipped() {
        let files = items(&["a.pdf", "b.pdf", "c.pdf"]);
        let r = resolve_order(
            &files,
            &OrderSpec::Ranks(vec!["2".into(), "first".into()]),
            DuplicatePolicy::Allow,
        )
        .unwrap();
        assert_eq!(indices(&r), vec![0]);
        assert_eq!(r.errors.len(), 2);
        assert!(matches!(
            &r.errors[1],
            ItemError::InvalidRank { position: 3, value, .. } if value.is_empty()
        ));
    }

    #[test]
    fn parse_order_entry_forms() {
        assert_eq!(parse_order_entry("4"), Some(4));
        assert_eq!(parse_order_entry(" 12 : my file.pdf"), Some(12));
        assert_eq!(parse_order_entry("-2"), Some(-2));
        assert_eq!(parse_order_entry("two"), None);
        assert_eq!(parse_order_entry("1.5"), None);
    }

    #[test]
    fn load_inputs_reads_files_and_reports_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Notes.TXT");
        std::fs::write(&path, "hello").unwrap();

        let loaded = load_inputs(&[&path]).unwrap();
        assert_eq!(loaded[0].name(), "Notes.TXT");
        assert_eq!(loaded[0].extension(), "txt");
        assert_eq!(loaded[0].content(), b"hello");

        let missing = dir.path().join("missing.pdf");
        let err = load_inputs(&[&missing]).unwrap_err();
        assert!(matches!(err, MergeError::FileNotFound { .. }));
    }
}
