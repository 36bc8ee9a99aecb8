//! CLI binary for beamsched.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints per-document results.

use anyhow::{Context, Result};
use beamsched::{
    classify_batch, discover_pdfs, run_batch, DocumentOutcome, ExtractionConfig,
    ExtractionProgressCallback, LayoutPattern, ParsePolicy, ProgressCallback,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the batch's documents plus a log
/// line per finished document. With `--jobs > 1` documents finish out of
/// order, so start times are keyed by path.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<PathBuf, Instant>>,
}

impl CliProgressCallback {
    fn new(total_documents: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} PDFs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total_documents as u64);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, pdf: &Path) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(pdf))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, pdf: &Path, total_pages: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.entry(pdf.to_path_buf()).or_insert_with(Instant::now);
        }
        self.bar
            .set_message(format!("{} ({total_pages} pages)", short_name(pdf)));
    }

    fn on_pattern_detected(&self, pdf: &Path, pattern: LayoutPattern) {
        self.bar.println(format!(
            "  {} {}  {}",
            cyan("◆"),
            short_name(pdf),
            dim(&pattern.to_string())
        ));
    }

    fn on_image_start(&self, pdf: &Path, _image: &Path, index: usize) {
        self.bar
            .set_message(format!("{}  image {index}", short_name(pdf)));
    }

    fn on_image_skipped(&self, pdf: &Path, image: &Path, reason: &str) {
        self.bar.println(format!(
            "  {} {} {}  {}",
            yellow("⚠"),
            short_name(pdf),
            short_name(image),
            dim(reason)
        ));
    }

    fn on_document_complete(&self, pdf: &Path, output: &Path, beams: usize) {
        let secs = self.elapsed_secs(pdf);
        self.bar.println(format!(
            "  {} {}  {:>4} beams  {}  →  {}",
            green("✓"),
            short_name(pdf),
            beams,
            dim(&format!("{secs:.1}s")),
            output.display()
        ));
        self.bar.inc(1);
    }

    fn on_document_failed(&self, pdf: &Path, error: &str) {
        let secs = self.elapsed_secs(pdf);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 100 {
            format!("{}\u{2026}", error.chars().take(99).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            short_name(pdf),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every PDF in the input directory
  beamsched

  # Extract specific files into another output folder
  beamsched --output-dir out drawings/GF-beams.pdf drawings/FF-beams.pdf

  # Skip classification and force layout 2
  beamsched --pattern 2 GF-beams.pdf

  # Only report the detected layout of each PDF
  beamsched --classify-only

  # Fail a document on any unusable model reply
  beamsched --strict

  # Use your own prompts (prompt_<n>.txt, classify.txt)
  beamsched --prompt-dir prompts/

LAYOUTS:
  1  simple BEAM / SIZE / TOP / BOTTOM / STIRRUPS table (pages sliced into 6 bands)
  2  "B x D/d" schedule
  3  "B x D" schedule with bar callouts
  4  elevation/type table with A, B, C, D1, G, E, D2, S1
  5  elevation/type table with A, B, S1
  6  layered support table without GRID ID
  7  layered support table with GRID ID
  8  strip beam drawing (not a table)

OUTPUT:
  <output-dir>/<name>/<name>.json       the beam schedule
  <output-dir>/<name>/page_<n>.png      rendered pages (unless --discard-images)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID (with EDGEQUAKE_LLM_PROVIDER)
  BEAMSCHED_HOME          Base of the default input/ and output/ directories
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)

  A .env file in the working directory is loaded first.
"#;

/// Extract reinforcement beam schedules from structural drawing PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "beamsched",
    version,
    about = "Extract reinforcement beam schedules from structural drawing PDFs using Vision LLMs",
    long_about = "Render each PDF, detect which of eight beam-schedule layouts it uses, and \
extract every beam (id, size, reinforcement, stirrups) into a JSON file per document. Supports \
OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDFs to process. When empty, every *.pdf in --input-dir is used.
    pdfs: Vec<PathBuf>,

    /// Directory scanned for PDFs. Default: <BEAMSCHED_HOME or exe dir>/input.
    #[arg(long, env = "BEAMSCHED_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Root of the per-document output folders. Default: <base>/output.
    #[arg(long, env = "BEAMSCHED_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Force a layout (1–8) instead of classifying page 1.
    #[arg(long, env = "BEAMSCHED_PATTERN",
          value_parser = clap::value_parser!(u8).range(1..=8))]
    pattern: Option<u8>,

    /// LLM model ID (default: gpt-4.1-mini).
    #[arg(long, env = "BEAMSCHED_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "BEAMSCHED_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "BEAMSCHED_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Max LLM output tokens per image.
    #[arg(long, env = "BEAMSCHED_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "BEAMSCHED_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Retries per image on LLM failure.
    #[arg(long, env = "BEAMSCHED_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-image LLM call timeout in seconds.
    #[arg(long, env = "BEAMSCHED_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "BEAMSCHED_PASSWORD")]
    password: Option<String>,

    /// Directory with prompt_<n>.txt / classify.txt overrides.
    #[arg(long, env = "BEAMSCHED_PROMPT_DIR")]
    prompt_dir: Option<PathBuf>,

    /// Skip unusable model replies in every layout.
    #[arg(long, env = "BEAMSCHED_LENIENT", conflicts_with = "strict")]
    lenient: bool,

    /// Fail the document on any unusable model reply.
    #[arg(long, env = "BEAMSCHED_STRICT")]
    strict: bool,

    /// Do not keep rendered page images next to the JSON.
    #[arg(long, env = "BEAMSCHED_DISCARD_IMAGES")]
    discard_images: bool,

    /// Documents processed concurrently.
    #[arg(short, long, env = "BEAMSCHED_JOBS", default_value_t = 1)]
    jobs: usize,

    /// Print the detected layout of each PDF; write nothing.
    #[arg(long)]
    classify_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "BEAMSCHED_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BEAMSCHED_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BEAMSCHED_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; flags and the real environment still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.classify_only;
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

    // ── Collect inputs ───────────────────────────────────────────────────
    let mut config = build_config(&cli)?;

    let pdfs = if cli.pdfs.is_empty() {
        discover_pdfs(&config.input_dir)
            .with_context(|| format!("Cannot list {}", config.input_dir.display()))?
    } else {
        cli.pdfs.clone()
    };

    if pdfs.is_empty() {
        if !cli.quiet {
            eprintln!(
                "{} No PDF files found in {}",
                yellow("⚠"),
                config.input_dir.display()
            );
        }
        return Ok(());
    }

    // ── Classify-only mode ───────────────────────────────────────────────
    if cli.classify_only {
        let report = classify_batch(&pdfs, &config)
            .await
            .context("Classification failed")?;
        for outcome in &report.outcomes {
            match outcome {
                DocumentOutcome::Classified { pdf, pattern } => {
                    println!("{}\t{}", pdf.display(), pattern.number());
                }
                DocumentOutcome::Failed { pdf, error } => {
                    eprintln!("{} {}  {}", red("✗"), pdf.display(), red(error));
                }
                DocumentOutcome::Written { .. } => {}
            }
        }
        if report.has_failures() {
            anyhow::bail!(
                "{} of {} documents could not be classified",
                report.failed(),
                report.outcomes.len()
            );
        }
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let progress = show_progress.then(|| CliProgressCallback::new(pdfs.len()));
    if let Some(ref cb) = progress {
        config.progress_callback = Some(Arc::clone(cb) as ProgressCallback);
    }

    let start = Instant::now();
    let report = run_batch(&pdfs, &config)
        .await
        .context("Extraction failed")?;
    if let Some(ref cb) = progress {
        cb.finish();
    }

    if !cli.quiet {
        for outcome in &report.outcomes {
            match outcome {
                DocumentOutcome::Failed { pdf, error } if !show_progress => {
                    eprintln!("{} {}  {}", red("✗"), pdf.display(), red(error));
                }
                DocumentOutcome::Written { path, beams, .. } if !show_progress => {
                    eprintln!("{} {} beams  →  {}", green("✓"), beams, path.display());
                }
                _ => {}
            }
        }
        eprintln!(
            "{}  {}/{} documents  {:.1}s  →  {}",
            if report.has_failures() {
                cyan("⚠")
            } else {
                green("✔")
            },
            bold(&report.succeeded().to_string()),
            report.outcomes.len(),
            start.elapsed().as_secs_f64(),
            bold(&config.output_dir.display().to_string()),
        );
    }

    if report.has_failures() {
        anyhow::bail!(
            "{} of {} documents failed",
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .keep_page_images(!cli.discard_images)
        .document_concurrency(cli.jobs);

    if let Some(ref dir) = cli.input_dir {
        builder = builder.input_dir(dir);
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(n) = cli.pattern {
        let pattern = LayoutPattern::from_number(n)
            .with_context(|| format!("Unknown layout pattern {n}"))?;
        builder = builder.pattern(pattern);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref dir) = cli.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    if cli.lenient {
        builder = builder.parse_policy(ParsePolicy::Skip);
    } else if cli.strict {
        builder = builder.parse_policy(ParsePolicy::Abort);
    }
    builder.build().context("Invalid configuration")
}
