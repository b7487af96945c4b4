//! Text layout: page geometry, standard-font metrics and line breaking.
//!
//! Everything here works in *layout coordinates*: points, origin at the
//! top-left corner of the page, y growing downwards. The renderer converts
//! to PDF user space (origin bottom-left) when it writes content streams.
//!
//! Only the two PDF standard fonts we emit are measured. Helvetica is used
//! for prose and carries real advance widths (from the Adobe core-font
//! metrics) so word wrapping matches what viewers draw; Courier is fixed
//! pitch and used for spreadsheet grids so columns line up.

use serde::{Deserialize, Serialize};

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    /// ISO A4 portrait.
    pub const A4: PageGeometry = PageGeometry {
        width: 595.0,
        height: 842.0,
    };

    /// The rectangle left after removing `margin` from every side.
    pub fn inset(&self, margin: f32) -> Rect {
        Rect {
            x0: margin,
            y0: margin,
            x1: self.width - margin,
            y1: self.height - margin,
        }
    }
}

/// Axis-aligned rectangle in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// The standard Type1 fonts the renderer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    Courier,
}

/// Helvetica advance widths for WinAnsi codes 32..=126, in 1/1000 em.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

impl StandardFont {
    /// `/BaseFont` name.
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::Courier => "Courier",
        }
    }

    /// Key under `/Resources /Font` used by content streams.
    pub fn resource_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "F1",
            StandardFont::Courier => "F2",
        }
    }

    /// Advance width of `c` in 1/1000 em.
    pub fn char_width(&self, c: char) -> u16 {
        match self {
            StandardFont::Courier => 600,
            StandardFont::Helvetica => match c as u32 {
                code @ 32..=126 => HELVETICA_ASCII[(code - 32) as usize],
                _ => 556,
            },
        }
    }

    /// Width of `s` in points at `size`.
    pub fn string_width(&self, s: &str, size: f32) -> f32 {
        let units: u32 = s.chars().map(|c| u32::from(self.char_width(c))).sum();
        units as f32 * size / 1000.0
    }
}

/// How a block of text is typeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    /// Proportional font, word-wrapped.
    Prose,
    /// Fixed-pitch grid; shrinks to fit, hard-wraps as a last resort.
    Table,
}

/// Extracted text together with how it should be typeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub text: String,
    pub style: TextStyle,
}

impl TextBlock {
    pub fn prose(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::Prose,
        }
    }

    pub fn table(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::Table,
        }
    }
}

/// Font sizes and spacing used by [`layout_blocks`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayoutOptions {
    pub prose_size: f32,
    pub table_size: f32,
    pub min_table_size: f32,
    pub line_spacing: f32,
    /// Continue onto new pages instead of truncating at the rectangle's bottom.
    pub paginate: bool,
}

impl Default for TextLayoutOptions {
    fn default() -> Self {
        Self {
            prose_size: 12.0,
            table_size: 8.0,
            min_table_size: 6.0,
            line_spacing: 1.2,
            paginate: false,
        }
    }
}

/// A single positioned line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub font: StandardFont,
    pub size: f32,
    pub x: f32,
    /// Baseline, in layout coordinates.
    pub baseline: f32,
    pub text: String,
}

/// Lines for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

/// Result of laying out a sequence of blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    /// Always at least one page, possibly empty.
    pub pages: Vec<PageLayout>,
    /// Lines dropped because they did not fit and pagination was off.
    pub truncated_lines: usize,
    /// `truncated_lines` split by input block, same order as the blocks.
    pub truncated_per_block: Vec<usize>,
}

/// Flow `blocks` into `rect`, one after another, separated by a blank line.
pub fn layout_blocks(blocks: &[TextBlock], rect: Rect, opts: &TextLayoutOptions) -> TextLayout {
    let mut out = TextLayout {
        pages: vec![PageLayout::default()],
        truncated_lines: 0,
        truncated_per_block: vec![0; blocks.len()],
    };
    let mut cursor = rect.y0;
    let mut full = false;

    for (i, block) in blocks.iter().enumerate() {
        let (font, size, lines) = break_block(block, rect.width(), opts);
        let line_height = size * opts.line_spacing;

        // Separator between blocks; never carried onto a fresh page.
        if i > 0 && cursor > rect.y0 {
            cursor += line_height;
        }

        for text in lines {
            if full {
                out.truncated_lines += 1;
                out.truncated_per_block[i] += 1;
                continue;
            }
            if cursor + line_height > rect.y1 + 0.01 {
                if opts.paginate && cursor > rect.y0 {
                    out.pages.push(PageLayout::default());
                    cursor = rect.y0;
                } else {
                    full = true;
                    out.truncated_lines += 1;
                    out.truncated_per_block[i] += 1;
                    continue;
                }
            }
            if !text.is_empty() {
                if let Some(page) = out.pages.last_mut() {
                    page.lines.push(PlacedLine {
                        font,
                        size,
                        x: rect.x0,
                        baseline: cursor + size,
                        text,
                    });
                }
            }
            cursor += line_height;
        }
    }

    out
}

/// Choose a font and size for `block` and break it into lines of at most `width`.
fn break_block(
    block: &TextBlock,
    width: f32,
    opts: &TextLayoutOptions,
) -> (StandardFont, f32, Vec<String>) {
    let text = normalise_text(&block.text);
    match block.style {
        TextStyle::Prose => {
            let font = StandardFont::Helvetica;
            let size = opts.prose_size;
            let lines = text
                .split('\n')
                .flat_map(|para| word_wrap(para, width, font, size))
                .collect();
            (font, size, lines)
        }
        TextStyle::Table => {
            let font = StandardFont::Courier;
            let widest = text.split('\n').map(|l| l.chars().count()).max().unwrap_or(0);
            let size = fit_table_size(widest, width, opts.table_size, opts.min_table_size);
            let per_line = ((width * 1000.0) / (600.0 * size)).floor().max(1.0) as usize;
            let lines = text
                .split('\n')
                .flat_map(|row| hard_wrap(row.trim_end(), per_line))
                .collect();
            (font, size, lines)
        }
    }
}

/// Largest size in `[min, max]` at which `columns` Courier cells fit `width`.
pub fn fit_table_size(columns: usize, width: f32, max: f32, min: f32) -> f32 {
    if columns == 0 {
        return max;
    }
    let fit = width * 1000.0 / (600.0 * columns as f32);
    fit.clamp(min, max)
}

/// Normalise line endings, expand tabs and drop other control characters.
fn normalise_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .flat_map(|c| match c {
            '\t' => vec![' '; 4],
            '\n' => vec!['\n'],
            c if c.is_control() => vec![],
            c => vec![c],
        })
        .collect()
}

/// Greedy word wrap measured with `font` at `size`.
///
/// Leading indentation and runs of spaces between words are kept; the gap
/// at a wrap point is dropped. Words wider than the line are broken between
/// characters. An empty paragraph yields one empty line so blank lines
/// survive.
pub fn word_wrap(text: &str, max_width: f32, font: StandardFont, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for (gap, word) in words_with_gaps(text) {
        // indentation only counts at the start of the paragraph
        let mut gap = if current.is_empty() && !lines.is_empty() { "" } else { gap };
        let mut gap_width = font.string_width(gap, size);
        let word_width = font.string_width(word, size);

        if !current.is_empty() && current_width + gap_width + word_width > max_width {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
            gap = "";
            gap_width = 0.0;
        }

        if gap_width + word_width > max_width {
            for c in gap.chars().chain(word.chars()) {
                let w = font.string_width(c.encode_utf8(&mut [0; 4]), size);
                if current_width + w > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                current.push(c);
                current_width += w;
            }
            continue;
        }

        current.push_str(gap);
        current.push_str(word);
        current_width += gap_width + word_width;
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Pair every word with the whitespace in front of it. Trailing
/// whitespace is dropped.
fn words_with_gaps(text: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(|c: char| !c.is_whitespace()) {
        let (gap, tail) = rest.split_at(start);
        let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
        let (word, tail) = tail.split_at(end);
        out.push((gap, word));
        rest = tail;
    }
    out
}

/// Split `row` into chunks of at most `per_line` characters.
fn hard_wrap(row: &str, per_line: usize) -> Vec<String> {
    let chars: Vec<char> = row.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(per_line).map(|c| c.iter().collect()).collect()
}

/// Encode `s` for a standard font using `/WinAnsiEncoding`.
///
/// Latin-1 maps directly; the common typographic punctuation in the
/// 0x80–0x9F block is mapped explicitly; everything else becomes `?`.
pub fn encode_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            ' '..='~' | '\u{a0}'..='\u{ff}' => c as u8,
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_inset_gives_classic_text_box() {
        let r = PageGeometry::A4.inset(50.0);
        assert_eq!((r.x0, r.y0, r.x1, r.y1), (50.0, 50.0, 545.0, 792.0));
        assert_eq!(r.width(), 495.0);
    }

    #[test]
    fn helvetica_widths() {
        let f = StandardFont::Helvetica;
        assert_eq!(f.char_width(' '), 278);
        assert_eq!(f.char_width('W'), 944);
        assert_eq!(f.char_width('i'), 222);
        assert_eq!(f.char_width('~'), 584);
        assert!((f.string_width("Hello", 10.0) - 22.78).abs() < 0.01);
        assert_eq!(StandardFont::Courier.string_width("abc", 10.0), 18.0);
    }

    #[test]
    fn word_wrap_basic() {
        let font = StandardFont::Helvetica;
        let width = font.string_width("Hello world this", 12.0);
        let lines = word_wrap("Hello world this is a test", width, font, 12.0);
        assert!(lines.len() >= 2, "text should wrap into multiple lines");
        assert_eq!(lines.join(" "), "Hello world this is a test");
    }

    #[test]
    fn word_wrap_keeps_indentation_and_spacing() {
        let font = StandardFont::Helvetica;
        let lines = word_wrap("    indented  two  gaps", 500.0, font, 12.0);
        assert_eq!(lines, vec!["    indented  two  gaps"]);

        let lines = word_wrap("  a   b   ", 500.0, font, 12.0);
        assert_eq!(lines, vec!["  a   b"]);
    }

    #[test]
    fn word_wrap_drops_gap_at_wrap_point() {
        let font = StandardFont::Helvetica;
        let width = font.string_width("  alpha", 12.0) + 1.0;
        let lines = word_wrap("  alpha   beta", width, font, 12.0);
        assert_eq!(lines, vec!["  alpha", "beta"]);
    }

    #[test]
    fn whitespace_only_paragraph_is_blank_line() {
        assert_eq!(word_wrap("   ", 100.0, StandardFont::Helvetica, 12.0), vec![""]);
    }

    #[test]
    fn word_wrap_empty_keeps_blank_line() {
        let lines = word_wrap("", 200.0, StandardFont::Helvetica, 12.0);
        assert_eq!(lines, vec![String::new()]);
    }

    #[test]
    fn word_wrap_long_word() {
        let lines = word_wrap("Superlongword", 40.0, StandardFont::Helvetica, 13.0);
        assert!(lines.len() >= 2);
        assert_eq!(lines.concat(), "Superlongword");
    }

    #[test]
    fn layout_places_first_baseline_inside_rect() {
        let rect = PageGeometry::A4.inset(50.0);
        let out = layout_blocks(&[TextBlock::prose("Hello")], rect, &TextLayoutOptions::default());
        assert_eq!(out.pages.len(), 1);
        let line = &out.pages[0].lines[0];
        assert_eq!(line.text, "Hello");
        assert_eq!(line.font, StandardFont::Helvetica);
        assert_eq!(line.x, 50.0);
        assert_eq!(line.baseline, 62.0);
        assert_eq!(out.truncated_lines, 0);
    }

    #[test]
    fn overflow_is_truncated_without_pagination() {
        let rect = PageGeometry::A4.inset(50.0);
        let text = (0..100).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let out = layout_blocks(&[TextBlock::prose(text)], rect, &TextLayoutOptions::default());
        assert_eq!(out.pages.len(), 1);
        // 742pt of height / 14.4pt per line
        assert_eq!(out.pages[0].lines.len(), 51);
        assert_eq!(out.truncated_lines, 49);
    }

    #[test]
    fn truncation_is_attributed_to_blocks() {
        let rect = PageGeometry::A4.inset(50.0);
        let long = (0..60).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let blocks = [TextBlock::prose("intro"), TextBlock::prose(long), TextBlock::prose("tail")];
        let out = layout_blocks(&blocks, rect, &TextLayoutOptions::default());
        // intro + separator leave 49 lines for the long block
        assert_eq!(out.truncated_per_block, vec![0, 11, 1]);
        assert_eq!(out.truncated_lines, 12);
    }

    #[test]
    fn overflow_paginates_when_enabled() {
        let rect = PageGeometry::A4.inset(10.0);
        let text = (0..300).map(|i| format!("{i}")).collect::<Vec<_>>().join("\n");
        let opts = TextLayoutOptions {
            paginate: true,
            ..TextLayoutOptions::default()
        };
        let out = layout_blocks(&[TextBlock::table(text)], rect, &opts);
        assert!(out.pages.len() >= 2);
        assert_eq!(out.truncated_lines, 0);
        let total: usize = out.pages.iter().map(|p| p.lines.len()).sum();
        assert_eq!(total, 300);
    }

    #[test]
    fn table_shrinks_to_fit_then_wraps() {
        assert_eq!(fit_table_size(10, 575.0, 8.0, 6.0), 8.0);
        // 130 columns need 575/(0.6*130) ≈ 7.37pt
        let s = fit_table_size(130, 575.0, 8.0, 6.0);
        assert!(s < 8.0 && s > 7.0);
        assert_eq!(fit_table_size(1000, 575.0, 8.0, 6.0), 6.0);

        let rect = PageGeometry::A4.inset(10.0);
        let row = "x".repeat(300);
        let out = layout_blocks(&[TextBlock::table(row)], rect, &TextLayoutOptions::default());
        let lines = &out.pages[0].lines;
        assert!(lines.len() >= 2);
        assert!(lines.iter().all(|l| l.font == StandardFont::Courier && l.size == 6.0));
        assert_eq!(lines.iter().map(|l| l.text.len()).sum::<usize>(), 300);
    }

    #[test]
    fn blocks_are_separated_by_blank_line() {
        let rect = PageGeometry::A4.inset(50.0);
        let out = layout_blocks(
            &[TextBlock::prose("one"), TextBlock::prose("two")],
            rect,
            &TextLayoutOptions::default(),
        );
        let lines = &out.pages[0].lines;
        assert_eq!(lines.len(), 2);
        assert!((lines[1].baseline - lines[0].baseline - 28.8).abs() < 0.001);
    }

    #[test]
    fn win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Hi"), b"Hi".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(encode_win_ansi("\u{2019}"), vec![0x92]);
        assert_eq!(encode_win_ansi("日"), vec![b'?']);
    }

    #[test]
    fn tabs_expand_and_controls_drop() {
        assert_eq!(normalise_text("a\tb\r\nc\u{7}"), "a    b\nc");
    }
}
