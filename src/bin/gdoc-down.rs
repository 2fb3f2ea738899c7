//! CLI binary for gdoc-down.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExportConfig` / `ExportRequest` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use gdoc_down::pipeline::formats::formats_for;
use gdoc_down::{
    execute, inspect, plan, resolve_token, write_output, DocumentKind, DriveClient, ExportConfig,
    ExportProgressCallback, ExportRequest, GDocDownError, ProgressCallback, Rendering,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while Drive prepares the export,
/// plus one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading pointer file…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, document_id: &str, mime_type: &str) {
        self.bar.set_prefix("Exporting");
        self.bar.set_message(format!("{} as {}", dim(document_id), mime_type));
    }

    fn on_export_complete(&self, _document_id: &str, bytes: usize) {
        self.bar
            .println(format!("  {} Export received  {}", green("✓"), dim(&format!("{bytes} bytes"))));
        self.bar.set_prefix("Rendering");
        self.bar.set_message("");
    }

    fn on_render_complete(&self, annotations: usize) {
        self.bar.println(format!(
            "  {} Typeset  {}",
            green("✓"),
            dim(&format!("{annotations} comments inlined"))
        ));
    }

    fn on_write_complete(&self, _path: &Path, _bytes: usize) {
        self.finish();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Export as Word next to the pointer file (Report.docx)
  gdoc-down Report.gdoc

  # Export as PDF into another directory
  gdoc-down -f pdf -o ~/exports Report.gdoc

  # LaTeX-ready text with reviewer comments as \pdfcomment{...}.
  # Strict: a named HTML entity outside the built-in table (e.g. &eacute;)
  # or an unclosed tag fails the export with a markup parse error.
  gdoc-down -f tex Thesis.gdoc

  # Format inferred from the output file name
  gdoc-down -o budget.xlsx Budget.gsheet

  # Plain text with a custom extension
  gdoc-down -f txt -e text Notes.gdoc

  # What can this file be exported as?
  gdoc-down --list-formats Slides.gslides

CREDENTIALS (first match wins):
  --access-token / GDOC_DOWN_ACCESS_TOKEN   OAuth bearer token
  --token-file / GDOC_DOWN_TOKEN_FILE       JSON file with "access_token" or "token"

  A short-lived token for your own account:
    export GDOC_DOWN_ACCESS_TOKEN="$(gcloud auth print-access-token)"

ENVIRONMENT VARIABLES:
  GDOC_DOWN_FORMAT        Default for --format
  GDOC_DOWN_OUT_PATH      Default for --out-path
  GDOC_DOWN_API_BASE_URL  Drive API root (for proxies and tests)
  RUST_LOG                Overrides the log filter
"#;

/// Download Google Drive documents from their local pointer files.
#[derive(Parser, Debug)]
#[command(
    name = "gdoc-down",
    version,
    about = "Download Google Drive documents from their local .gdoc/.gsheet/.gslides pointer files",
    long_about = "Download the Google document named by a Drive for desktop pointer file \
(.gdoc, .gsheet, .gslides) in a chosen export format. The `tex` format turns the HTML export \
into LaTeX-ready text with reviewer comments inlined as \\pdfcomment{...}.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Pointer file (.gdoc, .gsheet or .gslides).
    input: Option<PathBuf>,

    /// Output format, e.g. docx, pdf, tex, xlsx (see --list-formats).
    #[arg(short, long, env = "GDOC_DOWN_FORMAT")]
    format: Option<String>,

    /// Output file, or directory to write `<name>.<ext>` into.
    #[arg(short, long, env = "GDOC_DOWN_OUT_PATH")]
    out_path: Option<PathBuf>,

    /// Extension for the output file name instead of the format.
    #[arg(short, long)]
    extension: Option<String>,

    /// OAuth access token.
    #[arg(long, env = "GDOC_DOWN_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// JSON token file with an `access_token` or `token` field.
    #[arg(long, env = "GDOC_DOWN_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Drive API root.
    #[arg(long, env = "GDOC_DOWN_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Export request timeout in seconds.
    #[arg(long, env = "GDOC_DOWN_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Highest comment number to inline (tex only).
    #[arg(long, env = "GDOC_DOWN_MAX_ANNOTATIONS", default_value_t = 1000)]
    max_annotations: u32,

    /// List the formats available for INPUT (or for every kind) and exit.
    #[arg(long)]
    list_formats: bool,

    /// Print what the pointer file refers to, no export.
    #[arg(long)]
    inspect_only: bool,

    /// Print a JSON summary on stdout.
    #[arg(long, env = "GDOC_DOWN_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "GDOC_DOWN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GDOC_DOWN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "GDOC_DOWN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; INFO logs would
    // only tear through it.
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

    // ── List formats ─────────────────────────────────────────────────────
    if cli.list_formats {
        let kinds = match cli.input {
            Some(ref input) => vec![inspect(input).context("Failed to read pointer file")?.kind],
            None => DocumentKind::ALL.to_vec(),
        };
        print_formats(&kinds, cli.json)?;
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("No pointer file given (see --help)")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let pointer = inspect(&input).context("Failed to read pointer file")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&pointer).context("Failed to serialise pointer")?
            );
        } else {
            println!("File:     {}", pointer.source.display());
            println!("Kind:     {}", pointer.kind);
            println!("Id:       {}", pointer.id);
            if let Some(ref email) = pointer.email {
                println!("Account:  {}", email);
            }
            let formats: Vec<&str> = formats_for(pointer.kind).map(|f| f.extension).collect();
            println!("Formats:  {}", formats.join(", "));
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ExportProgressCallback>),
    )?;
    let request = ExportRequest {
        format: cli.format.clone(),
        extension: cli.extension.clone(),
        out_path: cli.out_path.clone(),
    };

    // ── Plan (pointer + format, before any credentials) ──────────────────
    let export_plan = plan(&input, &request, &config).map_err(export_error)?;

    let token = resolve_token(cli.access_token.as_deref(), cli.token_file.as_deref())
        .context("No Drive credentials")?;
    let client = DriveClient::new(token, &config).context("Failed to create Drive client")?;

    // ── Run export ───────────────────────────────────────────────────────
    let result = async {
        let mut output = execute(&client, export_plan, &config).await?;
        write_output(&mut output, &config).await?;
        Ok::<_, GDocDownError>(output)
    }
    .await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let output = result.map_err(export_error)?;

    if cli.json {
        let summary = serde_json::json!({
            "pointer": output.pointer,
            "format": output.format,
            "mime_type": output.mime_type,
            "target_path": output.target_path,
            "annotations": output.annotations,
            "stats": output.stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{} File saved → {}  {}",
            green("✔"),
            bold(&output.target_path.display().to_string()),
            dim(&format!(
                "{} bytes, {}ms",
                output.stats.bytes_written, output.stats.total_duration_ms
            )),
        );
    }

    Ok(())
}

/// Bad flags or an unsupported format exit 2 like clap does; anything else
/// goes back to `main` to be reported.
fn export_error(e: GDocDownError) -> anyhow::Error {
    if e.is_usage_error() {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }
    anyhow::Error::new(e).context("Export failed")
}

/// Map CLI args to `ExportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExportConfig> {
    let mut builder = ExportConfig::builder()
        .request_timeout_secs(cli.timeout)
        .max_annotations(cli.max_annotations);

    if let Some(ref url) = cli.api_base_url {
        builder = builder.api_base_url(url.as_str());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print the registry for `kinds`, as a table or as JSON.
fn print_formats(kinds: &[DocumentKind], json: bool) -> Result<()> {
    if json {
        let listing: Vec<_> = kinds
            .iter()
            .map(|&kind| {
                serde_json::json!({
                    "kind": kind,
                    "formats": formats_for(kind).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&listing).context("Failed to serialise formats")?
        );
        return Ok(());
    }

    for &kind in kinds {
        println!("{} {}", cyan("◆"), bold(&format!("{kind} ({})", kind.pointer_extension())));
        for spec in formats_for(kind) {
            let typeset = if spec.rendering == Rendering::Typeset {
                " [typeset]"
            } else {
                ""
            };
            println!(
                "  {:<9} {:<72} {}{}",
                spec.extension,
                dim(spec.mime_type),
                spec.description,
                typeset
            );
        }
    }
    Ok(())
}
