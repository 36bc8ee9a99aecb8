//! # beamsched
//!
//! Extract reinforcement beam schedules from scanned structural drawings
//! using Vision Language Models (VLMs).
//!
//! Beam schedules come in many drawing styles. This crate rasterises each
//! PDF, asks a VLM which of eight known layouts the first page shows, then
//! runs that layout's pipeline: optional horizontal slicing, one extraction
//! call per image, tolerant JSON parsing, merging of partial rows, and
//! rule-table normalisation of bar callouts and stirrups.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate magic bytes
//!  ├─ 2. Render    page_<n>.png via pdfium (spawn_blocking)
//!  ├─ 3. Classify  page 1 → layout 1..8 (or forced)
//!  ├─ 4. Gather    page/slice → VLM → JSON fragments
//!  ├─ 5. Merge     by beam id or per fragment, normalise, drop null rows
//!  └─ 6. Output    <output_dir>/<name>/<name>.json (atomic write)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beamsched::{extract_to_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::builder().output_dir("out").build()?;
//!     let output = extract_to_file("drawings/GF-beams.pdf", &config).await?;
//!     println!("{}: {} beams", output.pattern, output.schedule.beams.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a model
//!
//! Every `*_with` entry point takes an [`ImageExtractor`]; implement it with
//! canned replies to drive the whole pipeline offline.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `beamsched` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! beamsched = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schedule;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{ResponseError, ScheduleError};
pub use extract::{
    classify_batch, classify_batch_with, classify_document_with, extract_from_pages,
    extract_schedule_with, extract_sync, extract_to_file, extract_to_file_with, resolve_provider,
    run_batch, run_batch_with, write_schedule,
};
pub use layout::{LayoutPattern, LayoutProfile, ParsePolicy};
pub use output::{BatchReport, DocumentOutcome, ExtractionStats, ScheduleOutput};
pub use pipeline::input::discover_pdfs;
pub use pipeline::llm::{ImageExtractor, VisionExtractor};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schedule::{BeamRecord, BeamSchedule, BeamSize, Stirrups};
