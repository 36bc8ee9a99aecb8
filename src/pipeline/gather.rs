//! Fragment gathering: page images → model replies → beam fragments.
//!
//! Pages are visited strictly in order, and within a sliced page the bands
//! top to bottom, so fragments come out in encounter order for the merge.
//! Each reply is parsed on its own; what happens to an unusable reply is
//! decided by the profile's [`ParsePolicy`].

use crate::error::ScheduleError;
use crate::layout::{LayoutProfile, ParsePolicy};
use crate::pipeline::llm::ImageExtractor;
use crate::pipeline::response::parse_response;
use crate::pipeline::slice::slice_image;
use crate::progress::ProgressCallback;
use crate::schedule::BeamFragment;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Everything one document's images yielded.
#[derive(Debug, Default)]
pub struct Gathered {
    pub fragments: Vec<BeamFragment>,
    /// Extraction calls made (pages or slices).
    pub model_calls: usize,
    /// Replies skipped under [`ParsePolicy::Skip`].
    pub skipped_responses: usize,
    /// Individual `beams` entries that failed validation.
    pub rejected_beams: usize,
}

struct Gatherer<'a, E: ?Sized> {
    extractor: &'a E,
    pdf: &'a Path,
    prompt: &'a str,
    profile: &'a LayoutProfile,
    progress: Option<&'a ProgressCallback>,
    out: Gathered,
}

/// Run the extraction prompt over every page (or slice) of a document.
///
/// Extractor errors are fatal and returned as-is. Slice files are deleted
/// after each page whether or not its calls succeeded.
pub async fn gather_fragments<E: ImageExtractor + ?Sized>(
    extractor: &E,
    pdf: &Path,
    pages: &[PathBuf],
    prompt: &str,
    profile: &LayoutProfile,
    progress: Option<&ProgressCallback>,
) -> Result<Gathered, ScheduleError> {
    let mut g = Gatherer {
        extractor,
        pdf,
        prompt,
        profile,
        progress,
        out: Gathered::default(),
    };

    for page in pages {
        match profile.slices {
            None => g.extract_image(page).await?,
            Some(n) => {
                let page_path = page.clone();
                let slices = tokio::task::spawn_blocking(move || slice_image(&page_path, n))
                    .await
                    .map_err(|e| ScheduleError::Internal(format!("Slice task panicked: {}", e)))??;

                let mut result = Ok(());
                for slice in slices.paths() {
                    result = g.extract_image(slice).await;
                    if result.is_err() {
                        break;
                    }
                }
                slices.cleanup();
                result?;
            }
        }
    }

    debug!(
        "{}: {} fragments from {} calls ({} skipped)",
        pdf.display(),
        g.out.fragments.len(),
        g.out.model_calls,
        g.out.skipped_responses
    );
    Ok(g.out)
}

impl<E: ImageExtractor + ?Sized> Gatherer<'_, E> {
    async fn extract_image(&mut self, image: &Path) -> Result<(), ScheduleError> {
        self.out.model_calls += 1;
        if let Some(cb) = self.progress {
            cb.on_image_start(self.pdf, image, self.out.model_calls);
        }

        let reply = self.extractor.extract(image, self.prompt).await?;

        match parse_response(&reply, self.profile.response) {
            Ok(parsed) => {
                self.out.rejected_beams += parsed.rejected.len();
                if let Some(cb) = self.progress {
                    cb.on_image_complete(self.pdf, image, parsed.fragments.len());
                }
                self.out.fragments.extend(parsed.fragments);
                Ok(())
            }
            Err(e) => match self.profile.on_parse_failure {
                ParsePolicy::Skip => {
                    warn!("JSON parse failed for {}: {}", image.display(), e);
                    debug!("Model returned: {}", reply);
                    self.out.skipped_responses += 1;
                    if let Some(cb) = self.progress {
                        cb.on_image_skipped(self.pdf, image, &e.to_string());
                    }
                    Ok(())
                }
                ParsePolicy::Abort => {
                    warn!("Model returned: {}", reply);
                    Err(ScheduleError::UnparseableResponse {
                        image: image.to_path_buf(),
                        source: e,
                    })
                }
            },
        }
    }
}
