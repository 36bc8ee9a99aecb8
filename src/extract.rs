//! Document and batch extraction entry points.
//!
//! One document goes through:
//!
//! ```text
//! validate ─▶ render pages ─▶ classify page 1 ─▶ gather fragments ─▶ merge ─▶ write
//!                              (or forced)        (per page/slice)
//! ```
//!
//! Every `*_with` function takes the [`ImageExtractor`] explicitly, which is
//! how tests run the full pipeline without a network. The plain variants
//! build a [`VisionExtractor`] from the configured provider.

use crate::config::ExtractionConfig;
use crate::error::ScheduleError;
use crate::layout::LayoutPattern;
use crate::output::{BatchReport, DocumentOutcome, ExtractionStats, ScheduleOutput};
use crate::pipeline::classify::classify_page;
use crate::pipeline::gather::gather_fragments;
use crate::pipeline::llm::{ImageExtractor, VisionExtractor};
use crate::pipeline::{input, merge, render};
use crate::prompts;
use crate::schedule::BeamSchedule;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Extract one PDF and write `<output_dir>/<name>/<name>.json`.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Any [`ScheduleError`] is fatal for the document and nothing is written:
/// bad input file, pdfium unavailable, classification failure, extractor
/// failure, or an unusable reply under the strict parse policy.
pub async fn extract_to_file(
    pdf: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ScheduleOutput, ScheduleError> {
    let extractor = vision_extractor(config)?;
    extract_to_file_with(&extractor, pdf.as_ref(), config).await
}

/// [`extract_to_file`] with an explicit extractor.
pub async fn extract_to_file_with<E: ImageExtractor + ?Sized>(
    extractor: &E,
    pdf: &Path,
    config: &ExtractionConfig,
) -> Result<ScheduleOutput, ScheduleError> {
    let result = async {
        let output = extract_schedule_with(extractor, pdf, config).await?;
        let path = config.output_path(pdf);
        write_schedule(&path, &output.schedule).await?;
        Ok::<_, ScheduleError>((output, path))
    }
    .await;

    match result {
        Ok((output, path)) => {
            info!("Output saved to {}", path.display());
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_complete(pdf, &path, output.schedule.beams.len());
            }
            Ok(output)
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_failed(pdf, &e.to_string());
            }
            Err(e)
        }
    }
}

/// Render, classify and extract one PDF without writing the JSON.
///
/// Pages are rendered into a temp directory. They are copied into the
/// document's output folder only after extraction succeeds and
/// `keep_page_images` is set, so a failed document leaves no folder behind.
pub async fn extract_schedule_with<E: ImageExtractor + ?Sized>(
    extractor: &E,
    pdf: &Path,
    config: &ExtractionConfig,
) -> Result<ScheduleOutput, ScheduleError> {
    let total_start = Instant::now();
    info!("Starting extraction: {}", pdf.display());

    // ── Step 1: Validate input ───────────────────────────────────────────
    input::validate_pdf(pdf)?;

    // ── Step 2: Rasterise pages ──────────────────────────────────────────
    let scratch =
        tempfile::tempdir().map_err(|e| ScheduleError::Internal(format!("tempdir: {e}")))?;

    let render_start = Instant::now();
    let pages = render::render_pages(pdf, scratch.path(), config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", pages.len(), render_duration_ms);

    // ── Step 3: Classify, gather, merge ──────────────────────────────────
    let mut output = extract_from_pages(extractor, pdf, &pages, config).await?;

    // ── Step 4: Keep page images ─────────────────────────────────────────
    if config.keep_page_images {
        keep_pages(&pages, &config.document_dir(pdf)).await?;
    }

    output.stats.render_duration_ms = render_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Run the layout pipeline over already-rendered page images.
///
/// Page 1 is classified unless `config.pattern` forces a layout.
pub async fn extract_from_pages<E: ImageExtractor + ?Sized>(
    extractor: &E,
    pdf: &Path,
    pages: &[PathBuf],
    config: &ExtractionConfig,
) -> Result<ScheduleOutput, ScheduleError> {
    let start = Instant::now();
    let first_page = pages.first().ok_or_else(|| ScheduleError::NoPages {
        path: pdf.to_path_buf(),
    })?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(pdf, pages.len());
    }

    // ── Step 1: Layout ───────────────────────────────────────────────────
    let pattern = match config.pattern {
        Some(forced) => {
            info!("{}: using {} (forced)", pdf.display(), forced);
            forced
        }
        None => {
            let rubric = prompts::load_classification_prompt(config.prompt_dir.as_deref()).await?;
            classify_page(extractor, first_page, &rubric).await?
        }
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_pattern_detected(pdf, pattern);
    }

    let mut profile = pattern.profile();
    if let Some(policy) = config.parse_policy {
        profile.on_parse_failure = policy;
    }

    // ── Step 2: Gather fragments ─────────────────────────────────────────
    let prompt = prompts::load_extraction_prompt(pattern, config.prompt_dir.as_deref()).await?;
    let gathered = gather_fragments(
        extractor,
        pdf,
        pages,
        &prompt,
        &profile,
        config.progress_callback.as_ref(),
    )
    .await?;
    let llm_duration_ms = start.elapsed().as_millis() as u64;

    // ── Step 3: Merge and normalise ──────────────────────────────────────
    let fragments = gathered.fragments.len();
    let beams = merge::assemble(gathered.fragments, &profile);
    info!(
        "{}: {} beams from {} fragments ({})",
        pdf.display(),
        beams.len(),
        fragments,
        pattern
    );

    let stats = ExtractionStats {
        pages: pages.len(),
        model_calls: gathered.model_calls,
        fragments,
        rejected_beams: gathered.rejected_beams,
        skipped_responses: gathered.skipped_responses,
        beams: beams.len(),
        render_duration_ms: 0,
        llm_duration_ms,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    Ok(ScheduleOutput {
        pdf: pdf.to_path_buf(),
        pattern,
        schedule: BeamSchedule { beams },
        stats,
    })
}

/// Detect a PDF's layout without extracting it.
pub async fn classify_document_with<E: ImageExtractor + ?Sized>(
    extractor: &E,
    pdf: &Path,
    config: &ExtractionConfig,
) -> Result<LayoutPattern, ScheduleError> {
    input::validate_pdf(pdf)?;
    let scratch =
        tempfile::tempdir().map_err(|e| ScheduleError::Internal(format!("tempdir: {e}")))?;
    let first_page = render::render_first_page(pdf, scratch.path(), config).await?;
    let rubric = prompts::load_classification_prompt(config.prompt_dir.as_deref()).await?;
    classify_page(extractor, &first_page, &rubric).await
}

/// Extract every PDF in `pdfs`, writing one JSON per document.
///
/// Fails only when no provider can be resolved; per-document failures are
/// reported in the [`BatchReport`].
pub async fn run_batch(
    pdfs: &[PathBuf],
    config: &ExtractionConfig,
) -> Result<BatchReport, ScheduleError> {
    let extractor = vision_extractor(config)?;
    Ok(run_batch_with(&extractor, pdfs, config).await)
}

/// [`run_batch`] with an explicit extractor.
///
/// Up to `document_concurrency` documents run at once; outcomes keep the
/// input order. Documents that would write the same output path run one at
/// a time.
pub async fn run_batch_with<E: ImageExtractor + ?Sized>(
    extractor: &E,
    pdfs: &[PathBuf],
    config: &ExtractionConfig,
) -> BatchReport {
    let concurrency = batch_concurrency(pdfs, config);
    let outcomes = stream::iter(pdfs.iter().map(|pdf| async move {
        match extract_to_file_with(extractor, pdf, config).await {
            Ok(output) => DocumentOutcome::Written {
                pdf: pdf.clone(),
                path: config.output_path(pdf),
                pattern: output.pattern,
                beams: output.schedule.beams.len(),
            },
            Err(e) => {
                error!("{}: {}", pdf.display(), e);
                DocumentOutcome::Failed {
                    pdf: pdf.clone(),
                    error: e.to_string(),
                }
            }
        }
    }))
    .buffered(concurrency)
    .collect()
    .await;

    BatchReport { outcomes }
}

/// Classify every PDF in `pdfs` with the configured provider.
pub async fn classify_batch(
    pdfs: &[PathBuf],
    config: &ExtractionConfig,
) -> Result<BatchReport, ScheduleError> {
    let extractor = vision_extractor(config)?;
    Ok(classify_batch_with(&extractor, pdfs, config).await)
}

/// Classify every PDF in `pdfs`; nothing is written.
pub async fn classify_batch_with<E: ImageExtractor + ?Sized>(
    extractor: &E,
    pdfs: &[PathBuf],
    config: &ExtractionConfig,
) -> BatchReport {
    let outcomes = stream::iter(pdfs.iter().map(|pdf| async move {
        match classify_document_with(extractor, pdf, config).await {
            Ok(pattern) => DocumentOutcome::Classified {
                pdf: pdf.clone(),
                pattern,
            },
            Err(e) => {
                error!("{}: {}", pdf.display(), e);
                DocumentOutcome::Failed {
                    pdf: pdf.clone(),
                    error: e.to_string(),
                }
            }
        }
    }))
    .buffered(config.document_concurrency.max(1))
    .collect()
    .await;

    BatchReport { outcomes }
}

/// Synchronous wrapper around [`extract_to_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    pdf: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ScheduleOutput, ScheduleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScheduleError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_to_file(pdf, config))
}

/// Write a schedule as pretty JSON.
///
/// Uses atomic write (temp file + rename) so a reader sees either the
/// complete file or none.
pub async fn write_schedule(path: &Path, schedule: &BeamSchedule) -> Result<(), ScheduleError> {
    let write_err = |source| ScheduleError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        create_dir(parent).await?;
    }

    let mut json = serde_json::to_string_pretty(schedule)
        .map_err(|e| ScheduleError::Internal(format!("JSON encoding failed: {e}")))?;
    json.push('\n');

    let tmp_path = path.with_extension("json.tmp");
    let written = match tokio::fs::write(&tmp_path, json).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Copy rendered pages into `dest`, keeping their file names.
async fn keep_pages(pages: &[PathBuf], dest: &Path) -> Result<(), ScheduleError> {
    create_dir(dest).await?;
    for page in pages {
        let Some(name) = page.file_name() else {
            continue;
        };
        let target = dest.join(name);
        tokio::fs::copy(page, &target)
            .await
            .map_err(|source| ScheduleError::OutputWriteFailed {
                path: target.clone(),
                source,
            })?;
    }
    Ok(())
}

async fn create_dir(dir: &Path) -> Result<(), ScheduleError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ScheduleError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source,
        })
}

fn batch_concurrency(pdfs: &[PathBuf], config: &ExtractionConfig) -> usize {
    let mut seen = HashSet::new();
    let collides = pdfs.iter().any(|p| !seen.insert(config.output_path(p)));
    if collides && config.document_concurrency > 1 {
        warn!("Several PDFs share an output path; processing documents one at a time");
        return 1;
    }
    config.document_concurrency.max(1)
}

fn vision_extractor(config: &ExtractionConfig) -> Result<VisionExtractor, ScheduleError> {
    let provider = resolve_provider(config)?;
    Ok(VisionExtractor::new(provider, config))
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ScheduleError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ScheduleError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured even when several API keys are present.
/// 4. **`OPENAI_API_KEY`** with the configured model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ScheduleError> {
    let model = config.model.as_deref().unwrap_or(crate::config::DEFAULT_MODEL);

    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    // 3) EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL when both set
    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    // 4) OpenAI when its key is present
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ScheduleError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY (a .env file works too), or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{BeamRecord, BeamSize, Stirrups};

    #[tokio::test]
    async fn write_is_atomic_and_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc").join("doc.json");
        let schedule = BeamSchedule {
            beams: vec![BeamRecord {
                beam_id: "B1".into(),
                size: BeamSize::default(),
                reinforcement: vec!["2-T12".into()],
                stirrups: Stirrups::default(),
            }],
        };
        write_schedule(&path, &schedule).await.unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"beams\""));
        let back: BeamSchedule = serde_json::from_str(&text).unwrap();
        assert_eq!(back, schedule);
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let err = write_schedule(&path, &BeamSchedule::default()).await.unwrap_err();

        assert!(matches!(err, ScheduleError::OutputWriteFailed { .. }), "{err:?}");
        assert!(!path.with_extension("json.tmp").exists());
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn kept_pages_are_copied_into_the_document_folder() {
        let scratch = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pages: Vec<PathBuf> = (1..=2)
            .map(|n| {
                let p = scratch.path().join(format!("page_{n}.png"));
                std::fs::write(&p, format!("page {n}")).unwrap();
                p
            })
            .collect();
        let dest = out.path().join("doc");

        keep_pages(&pages, &dest).await.unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("page_1.png")).unwrap(), "page 1");
        assert_eq!(std::fs::read_to_string(dest.join("page_2.png")).unwrap(), "page 2");
    }

    /// One blank A4 page; pdfium rebuilds the cross-reference table.
    const BLANK_PDF: &[u8] = b"%PDF-1.4\n\
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n\
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] >> endobj\n\
trailer << /Root 1 0 R >>\n%%EOF\n";

    #[tokio::test]
    async fn unrecognised_layout_leaves_no_document_folder() {
        if render::bind_pdfium().is_err() {
            println!("SKIP: pdfium library not available");
            return;
        }
        struct Unsure;
        #[async_trait::async_trait]
        impl ImageExtractor for Unsure {
            async fn extract(&self, _: &Path, _: &str) -> Result<String, ScheduleError> {
                Ok("It looks like a table.".into())
            }
        }
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pdf = input.path().join("plan.pdf");
        std::fs::write(&pdf, BLANK_PDF).unwrap();
        let config = ExtractionConfig::builder()
            .output_dir(out.path())
            .dpi(72)
            .build()
            .unwrap();
        assert!(config.keep_page_images);

        let err = extract_to_file_with(&Unsure, &pdf, &config).await.unwrap_err();

        assert!(matches!(err, ScheduleError::ClassificationFailed { .. }), "{err:?}");
        assert!(!config.document_dir(&pdf).exists());
    }

    #[test]
    fn colliding_outputs_force_sequential_batches() {
        let config = ExtractionConfig::builder()
            .document_concurrency(4)
            .build()
            .unwrap();
        let distinct = vec![PathBuf::from("a/x.pdf"), PathBuf::from("a/y.pdf")];
        let clash = vec![PathBuf::from("a/x.pdf"), PathBuf::from("b/x.pdf")];
        assert_eq!(batch_concurrency(&distinct, &config), 4);
        assert_eq!(batch_concurrency(&clash, &config), 1);
    }

    #[tokio::test]
    async fn empty_page_list_is_no_pages() {
        struct Never;
        #[async_trait::async_trait]
        impl ImageExtractor for Never {
            async fn extract(&self, _: &Path, _: &str) -> Result<String, ScheduleError> {
                unreachable!("no pages, no calls")
            }
        }
        let err = extract_from_pages(&Never, Path::new("x.pdf"), &[], &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::NoPages { .. }));
    }
}
