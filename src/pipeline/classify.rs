//! Layout classification from the first page.

use crate::error::ScheduleError;
use crate::layout::LayoutPattern;
use crate::pipeline::llm::ImageExtractor;
use std::path::Path;
use tracing::info;

/// Ask the model which of the eight layouts `first_page` shows.
///
/// One call, no retry at this level: a reply that is not a bare number 1–8
/// fails the document with [`ScheduleError::ClassificationFailed`].
pub async fn classify_page<E: ImageExtractor + ?Sized>(
    extractor: &E,
    first_page: &Path,
    rubric: &str,
) -> Result<LayoutPattern, ScheduleError> {
    let reply = extractor.extract(first_page, rubric).await?;
    let pattern = LayoutPattern::from_response(&reply)?;
    info!("{} classified as {}", first_page.display(), pattern);
    Ok(pattern)
}
