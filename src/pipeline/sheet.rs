//! Spreadsheet extraction and grid formatting.
//!
//! Every non-empty worksheet is read with calamine and printed as a
//! monospace grid: the first row is the header, data rows are numbered from
//! 0 in a leading index column, and every cell is right-aligned to its
//! column width. When a workbook has more than one non-empty sheet, each
//! grid is preceded by a `[Sheet name]` line.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;

/// One worksheet as rows of displayed cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Read every non-empty worksheet of an xlsx/xlsm/xls/ods workbook.
pub fn extract_sheets(bytes: &[u8]) -> Result<Vec<SheetGrid>, calamine::Error> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let rows = range_to_rows(&range);
        if !rows.is_empty() {
            sheets.push(SheetGrid { name, rows });
        }
    }
    Ok(sheets)
}

fn range_to_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(display_cell).collect())
        .collect();
    if rows.iter().all(|r| r.iter().all(String::is_empty)) {
        return Vec::new();
    }
    rows
}

fn display_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Render a workbook's sheets as one text block.
pub fn format_workbook(sheets: &[SheetGrid]) -> String {
    match sheets {
        [only] => format_grid(&only.rows),
        _ => sheets
            .iter()
            .map(|s| format!("[{}]\n{}", s.name, format_grid(&s.rows)))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Format rows as a header-plus-index grid.
///
/// Blank header cells are shown as `Unnamed: <col>`. Short rows are padded
/// with empty cells.
pub fn format_grid(rows: &[Vec<String>]) -> String {
    let Some((header, data)) = rows.split_first() else {
        return String::new();
    };
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);

    let header: Vec<String> = (0..columns)
        .map(|c| match header.get(c) {
            Some(h) if !h.is_empty() => h.clone(),
            _ => format!("Unnamed: {c}"),
        })
        .collect();

    let index_width = data.len().saturating_sub(1).to_string().len();
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            data.iter()
                .filter_map(|r| r.get(c))
                .map(|s| s.chars().count())
                .chain(std::iter::once(header[c].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(data.len() + 1);
    lines.push(format_row(&" ".repeat(index_width), &header, &widths));
    for (i, row) in data.iter().enumerate() {
        let index = format!("{i:<index_width$}");
        lines.push(format_row(&index, row, &widths));
    }
    lines.join("\n")
}

fn format_row(index: &str, cells: &[String], widths: &[usize]) -> String {
    let mut line = index.to_string();
    for (c, width) in widths.iter().enumerate() {
        let cell = cells.get(c).map(String::as_str).unwrap_or("");
        line.push_str("  ");
        line.push_str(&format!("{cell:>width$}"));
    }
    line.trim_end().to_string()
}
