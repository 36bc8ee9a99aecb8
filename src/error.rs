//! Error types for the beamsched library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ScheduleError`]: **Fatal** for one document. The schedule cannot be
//!   produced at all (bad input file, pdfium unavailable, classifier gave a
//!   non-numeric answer, provider not configured). No JSON is written for a
//!   document that fails this way.
//!
//! * [`ResponseError`]: **Recoverable**. One image or slice came back from
//!   the model without a usable JSON payload. Layouts with the lenient parse
//!   policy log it and move on to the next image; the strict policy wraps it
//!   in [`ScheduleError::UnparseableResponse`] and stops the document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the beamsched library.
#[derive(Debug, Error)]
pub enum ScheduleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The input directory could not be listed.
    #[error("Cannot read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The document rendered to zero page images.
    #[error("No page images were produced for '{path}'")]
    NoPages { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium for your platform, or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Image errors ──────────────────────────────────────────────────────
    /// A page or slice image could not be read or written.
    #[error("Image I/O failed for '{path}': {detail}")]
    ImageIo { path: PathBuf, detail: String },

    /// Cutting a page into horizontal slices failed.
    #[error("Slicing '{path}' into {slices} bands failed: {detail}")]
    SliceFailed {
        path: PathBuf,
        slices: u32,
        detail: String,
    },

    // ── Classification errors ─────────────────────────────────────────────
    /// The classifier did not answer with a bare layout number 1–8.
    #[error("Pattern detection failed. Model returned: {response:?}")]
    ClassificationFailed { response: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API failed after every retry.
    #[error("LLM API error on '{image}': {message}")]
    LlmApiError { image: PathBuf, message: String },

    /// A single extraction call exceeded the configured timeout.
    #[error("Extraction call for '{image}' timed out after {secs}s")]
    ApiTimeout { image: PathBuf, secs: u64 },

    /// Strict layouts stop at the first reply without a usable JSON payload.
    #[error("Unusable model response for '{image}': {source}")]
    UnparseableResponse {
        image: PathBuf,
        #[source]
        source: ResponseError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A prompt override file exists but could not be read.
    #[error("Failed to read prompt file '{path}': {source}")]
    PromptUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a model reply yielded no beam fragments.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ResponseError {
    /// The reply was empty or whitespace.
    #[error("empty response")]
    Empty,

    /// No `{ … }` span could be located in the reply.
    #[error("no JSON object found in response")]
    NoJsonFound,

    /// A `{ … }` span was found but is not valid JSON.
    #[error("invalid JSON: {detail}")]
    InvalidJson { detail: String },

    /// Valid JSON that does not have the beam-schedule shape.
    #[error("unexpected JSON shape: {detail}")]
    Schema { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_failure_quotes_the_reply() {
        let e = ScheduleError::ClassificationFailed {
            response: "abc".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("\"abc\""), "got: {msg}");
    }

    #[test]
    fn unparseable_response_chains_source() {
        let e = ScheduleError::UnparseableResponse {
            image: PathBuf::from("page_2.png"),
            source: ResponseError::NoJsonFound,
        };
        assert!(e.to_string().contains("page_2.png"));
        assert!(e.to_string().contains("no JSON object"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn api_timeout_display() {
        let e = ScheduleError::ApiTimeout {
            image: PathBuf::from("page_1.png"),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn invalid_json_display() {
        let e = ResponseError::InvalidJson {
            detail: "EOF while parsing".into(),
        };
        assert_eq!(e.to_string(), "invalid JSON: EOF while parsing");
    }
}
