//! CLI binary for edgequake-pdfmerge.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `MergeConfig` / `MergeRequest` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfmerge::{
    load_inputs, merge_to_file, status_line, DuplicatePolicy, IndexBase, MergeConfig,
    MergeOutput, MergeProgressCallback, MergeRequest, MergeStage, OrderSpec, ProgressCallback,
    TextPlacement,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar over the resolved items plus one log line per item.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_merge_start` tells us how many items there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving order…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Merging");
    }
}

impl MergeProgressCallback for CliProgressCallback {
    fn on_merge_start(&self, total_items: usize) {
        self.activate_bar(total_items);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Merging {total_items} item(s)…"))
        ));
    }

    fn on_stage(&self, stage: MergeStage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_item_start(&self, _position: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_item_complete(&self, position: usize, total: usize, name: &str, pages: usize) {
        let pages = if pages == 0 {
            "front page".to_string()
        } else {
            format!("{pages:>3} page(s)")
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            position,
            total,
            name,
            dim(&pages),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, position: usize, total: usize, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            red("✗"),
            position,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_merge_complete(&self, total_items: usize, success_count: usize) {
        let failed = total_items.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} item(s) merged",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} item(s) merged  ({} skipped)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_items,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge in upload order into ./Merged_Document.pdf
  pdfmerge notes.txt scan.png report.pdf

  # Custom order (zero-based) and name
  pdfmerge notes.txt scan.png report.pdf --order 2,0,1 --name Packet

  # One-based order, or picker labels
  pdfmerge a.pdf b.pdf --order 2,1 --one-based
  pdfmerge a.pdf b.pdf --order "1: b.pdf,0: a.pdf"
  pdfmerge "a,1.pdf" b.pdf --order "1: b.pdf" --order "0: a,1.pdf"

  # Per-file rank values (sorted ascending)
  pdfmerge a.pdf b.docx c.xlsx --ranks 3,1,2

  # Give text files their own pages at their positions
  pdfmerge intro.txt figures.pdf --text-placement in-place

SUPPORTED FORMATS:
  txt, docx, xlsx/xlsm/xls/ods, pdf, jpg/jpeg, png

ENVIRONMENT VARIABLES:
  PDFMERGE_NAME             Output base name
  PDFMERGE_OUTPUT_DIR       Directory for <name>.pdf
  PDFMERGE_TEXT_PLACEMENT   front | in-place
  RUST_LOG                  Override log filter (e.g. edgequake_pdfmerge=debug)
"#;

/// Merge text, Word, spreadsheet, image and PDF files into one PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdfmerge",
    version,
    about = "Merge text, Word, spreadsheet, image and PDF files into one PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files, in upload order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output order as comma-separated indices (or "i: name" labels).
    ///
    /// Repeat the flag to give one entry per occurrence; entries are then
    /// not split on commas, so labels like "1: a,b.pdf" survive.
    #[arg(long, env = "PDFMERGE_ORDER", conflicts_with = "ranks", action = clap::ArgAction::Append)]
    order: Vec<String>,

    /// Interpret --order indices as 1-based.
    #[arg(long, env = "PDFMERGE_ONE_BASED")]
    one_based: bool,

    /// One order value per file; files are sorted ascending by it.
    #[arg(long, env = "PDFMERGE_RANKS")]
    ranks: Option<String>,

    /// Output base name (".pdf" is appended).
    #[arg(long, env = "PDFMERGE_NAME")]
    name: Option<String>,

    /// Write the PDF to this exact path.
    #[arg(short, long, env = "PDFMERGE_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for <name>.pdf when --output is not given.
    #[arg(long, env = "PDFMERGE_OUTPUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Where text and Word content goes (spreadsheets stay in order).
    #[arg(long, env = "PDFMERGE_TEXT_PLACEMENT", value_enum, default_value = "front")]
    text_placement: PlacementArg,

    /// Report and skip repeated indices instead of repeating pages.
    #[arg(long, env = "PDFMERGE_REJECT_DUPLICATES")]
    reject_duplicates: bool,

    /// Font size for text pages (6–72).
    #[arg(long, env = "PDFMERGE_FONT_SIZE", default_value_t = 12.0)]
    font_size: f32,

    /// Starting font size for spreadsheet grids.
    #[arg(long, env = "PDFMERGE_TABLE_FONT_SIZE", default_value_t = 8.0)]
    table_font_size: f32,

    /// JPEG quality for embedded images (1–100).
    #[arg(long, env = "PDFMERGE_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Leave content streams uncompressed.
    #[arg(long, env = "PDFMERGE_NO_COMPRESS")]
    no_compress: bool,

    /// Print the merge report as JSON on stdout.
    #[arg(long, env = "PDFMERGE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFMERGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFMERGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFMERGE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PlacementArg {
    Front,
    InPlace,
}

impl From<PlacementArg> for TextPlacement {
    fn from(v: PlacementArg) -> Self {
        match v {
            PlacementArg::Front => TextPlacement::Front,
            PlacementArg::InPlace => TextPlacement::InPlace,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build request and config ─────────────────────────────────────────
    let items = load_inputs(cli.files.as_slice()).context("Failed to read input files")?;
    let request = build_request(&cli, items);

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn MergeProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let output_path = match &cli.output {
        Some(path) => path.clone(),
        None => cli.out_dir.join(config.output_file_name()),
    };

    // ── Run merge ────────────────────────────────────────────────────────
    let result = merge_to_file(&request, &config, &output_path);
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            let line = status_line(&Err(e));
            eprintln!("{}", red(&line));
            std::process::exit(1);
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, &output_path);
    }

    Ok(())
}

fn build_request(cli: &Cli, items: Vec<edgequake_pdfmerge::InputItem>) -> MergeRequest {
    let base = if cli.one_based {
        IndexBase::One
    } else {
        IndexBase::Zero
    };
    let order = match (cli.order.as_slice(), &cli.ranks) {
        ([list], _) => OrderSpec::from_csv(list, base),
        ([], Some(ranks)) => OrderSpec::ranks_from_csv(ranks),
        ([], None) => OrderSpec::Natural,
        (entries, _) => OrderSpec::from_entries(entries, base),
    };
    MergeRequest::new(items).with_order(order)
}

/// Map CLI args to `MergeConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<MergeConfig> {
    let mut builder = MergeConfig::builder()
        .text_placement(cli.text_placement.into())
        .duplicates(if cli.reject_duplicates {
            DuplicatePolicy::Reject
        } else {
            DuplicatePolicy::Allow
        })
        .text_font_size(cli.font_size)
        .table_font_size(cli.table_font_size)
        .min_table_font_size(cli.table_font_size.min(6.0))
        .jpeg_quality(cli.jpeg_quality)
        .compress(!cli.no_compress);

    if let Some(ref name) = cli.name {
        builder = builder.output_name(name);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &MergeOutput, path: &std::path::Path) {
    println!("{}", output.status());
    eprintln!(
        "{}  {} page(s)  {} bytes  {}ms  →  {}",
        if output.has_warnings() { cyan("⚠") } else { green("✔") },
        output.page_count,
        output.stats.output_bytes,
        output.stats.total_duration_ms,
        bold(&path.display().to_string()),
    );
    for warning in &output.warnings {
        eprintln!("   {} {}", red("•"), warning);
    }
    if output.stats.truncated_lines > 0 {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} text line(s) did not fit on their page",
                output.stats.truncated_lines
            ))
        );
    }
}
