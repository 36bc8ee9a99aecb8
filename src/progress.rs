//! Progress-callback trait for per-document and per-image extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline renders, classifies and extracts each document.
//! The CLI uses this to drive its progress bars; library callers can forward
//! events anywhere they like.
//!
//! # Example
//!
//! ```rust
//! use beamsched::{ExtractionConfig, ExtractionProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SkipCounter {
//!     skipped: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for SkipCounter {
//!     fn on_image_skipped(&self, _pdf: &Path, image: &Path, reason: &str) {
//!         self.skipped.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("skipped {}: {}", image.display(), reason);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(SkipCounter { skipped: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::layout::LayoutPattern;
use std::path::Path;
use std::sync::Arc;

/// Called by the extraction pipeline as it processes each document.
///
/// Implementations must be `Send + Sync`: with `document_concurrency > 1`
/// events for different documents arrive from different tasks. Events for
/// one document always arrive in order. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Pages have been rendered; extraction is about to start.
    fn on_document_start(&self, pdf: &Path, total_pages: usize) {
        let _ = (pdf, total_pages);
    }

    /// The layout was classified, or forced by configuration.
    fn on_pattern_detected(&self, pdf: &Path, pattern: LayoutPattern) {
        let _ = (pdf, pattern);
    }

    /// About to send one page or slice to the model.
    ///
    /// `index` is 1-based over every image of the document, slices included.
    fn on_image_start(&self, pdf: &Path, image: &Path, index: usize) {
        let _ = (pdf, image, index);
    }

    /// A reply was parsed into `fragments` beam fragments.
    fn on_image_complete(&self, pdf: &Path, image: &Path, fragments: usize) {
        let _ = (pdf, image, fragments);
    }

    /// A reply had no usable JSON and was skipped.
    fn on_image_skipped(&self, pdf: &Path, image: &Path, reason: &str) {
        let _ = (pdf, image, reason);
    }

    /// The schedule was written.
    fn on_document_complete(&self, pdf: &Path, output: &Path, beams: usize) {
        let _ = (pdf, output, beams);
    }

    /// The document failed; nothing was written for it.
    fn on_document_failed(&self, pdf: &Path, error: &str) {
        let _ = (pdf, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        images: AtomicUsize,
        skipped: AtomicUsize,
        beams: AtomicUsize,
    }

    impl ExtractionProgressCallback for Tracking {
        fn on_image_start(&self, _pdf: &Path, _image: &Path, _index: usize) {
            self.images.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_skipped(&self, _pdf: &Path, _image: &Path, _reason: &str) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _pdf: &Path, _output: &Path, beams: usize) {
            self.beams.store(beams, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let pdf = Path::new("a.pdf");
        cb.on_document_start(pdf, 2);
        cb.on_pattern_detected(pdf, LayoutPattern::Pattern1);
        cb.on_image_start(pdf, Path::new("page_1.png"), 1);
        cb.on_image_complete(pdf, Path::new("page_1.png"), 3);
        cb.on_image_skipped(pdf, Path::new("page_2.png"), "no JSON");
        cb.on_document_complete(pdf, Path::new("a/a.json"), 3);
        cb.on_document_failed(pdf, "boom");
    }

    #[test]
    fn overridden_events_are_received() {
        let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(Tracking::default());
        let pdf = Path::new("a.pdf");
        cb.on_image_start(pdf, Path::new("page_1.png"), 1);
        cb.on_image_start(pdf, Path::new("page_2.png"), 2);
        cb.on_image_skipped(pdf, Path::new("page_2.png"), "invalid JSON");
        cb.on_document_complete(pdf, Path::new("a/a.json"), 7);
        cb.on_document_failed(pdf, "ignored by default");
    }

    #[test]
    fn tracking_counts() {
        let t = Tracking::default();
        let pdf = Path::new("a.pdf");
        t.on_image_start(pdf, Path::new("page_1.png"), 1);
        t.on_image_skipped(pdf, Path::new("page_1.png"), "empty response");
        t.on_document_complete(pdf, Path::new("a/a.json"), 4);
        assert_eq!(t.images.load(Ordering::SeqCst), 1);
        assert_eq!(t.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(t.beams.load(Ordering::SeqCst), 4);
    }
}
