//! Configuration types for beam-schedule extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The config is passed explicitly down
//! the call chain; nothing in the library reads process-wide state except
//! [`default_base_dir`] and provider auto-detection in
//! [`crate::extract::resolve_provider`], both only when the caller did not
//! say otherwise.

use crate::error::ScheduleError;
use crate::layout::{LayoutPattern, ParsePolicy};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding the base directory for `input/` and `output/`.
pub const HOME_ENV: &str = "BEAMSCHED_HOME";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Configuration for beam-schedule extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use beamsched::{ExtractionConfig, LayoutPattern};
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .pattern(LayoutPattern::Pattern3)
///     .output_dir("/tmp/schedules")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// Bar marks and spacing suffixes are small print; below ~200 DPI the
    /// model starts confusing `T8` with `T6` and dropping `C/C`.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// LLM model identifier. Default: `gpt-4.1-mini`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 4096.
    pub max_tokens: usize,

    /// Retries on a failed or timed-out vision call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Directory of `prompt_<n>.txt` / `classify.txt` files overriding the
    /// built-in prompts.
    pub prompt_dir: Option<PathBuf>,

    /// Skip classification and run this layout's pipeline.
    pub pattern: Option<LayoutPattern>,

    /// Override every layout's parse-failure policy.
    pub parse_policy: Option<ParsePolicy>,

    /// Keep `page_<n>.png` next to the JSON output. Default: true.
    pub keep_page_images: bool,

    /// Documents processed at once by [`crate::extract::run_batch`]. Default: 1.
    ///
    /// Pages within one document are always processed in order.
    pub document_concurrency: usize,

    /// Directory scanned for `*.pdf`. Default: `<base>/input`.
    pub input_dir: PathBuf,

    /// Root of the per-document output folders. Default: `<base>/output`.
    pub output_dir: PathBuf,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let base = default_base_dir();
        Self {
            dpi: 300,
            max_rendered_pixels: 4000,
            model: Some(DEFAULT_MODEL.to_string()),
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            password: None,
            prompt_dir: None,
            pattern: None,
            parse_policy: None,
            keep_page_images: true,
            document_concurrency: 1,
            input_dir: base.join("input"),
            output_dir: base.join("output"),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt_dir", &self.prompt_dir)
            .field("pattern", &self.pattern)
            .field("parse_policy", &self.parse_policy)
            .field("keep_page_images", &self.keep_page_images)
            .field("document_concurrency", &self.document_concurrency)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The folder a document's JSON and page images go into:
    /// `<output_dir>/<basename>`.
    pub fn document_dir(&self, pdf: &Path) -> PathBuf {
        self.output_dir.join(document_name(pdf))
    }

    /// The JSON output path: `<output_dir>/<basename>/<basename>.json`.
    pub fn output_path(&self, pdf: &Path) -> PathBuf {
        let name = document_name(pdf);
        self.output_dir.join(&name).join(format!("{}.json", name))
    }
}

/// A PDF's base name without extension.
pub fn document_name(pdf: &Path) -> String {
    pdf.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Base directory for the default `input/` and `output/` folders.
///
/// `$BEAMSCHED_HOME` if set, else the directory holding the running
/// executable, else the current directory.
pub fn default_base_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.prompt_dir = Some(dir.into());
        self
    }

    pub fn pattern(mut self, pattern: LayoutPattern) -> Self {
        self.config.pattern = Some(pattern);
        self
    }

    pub fn parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.config.parse_policy = Some(policy);
        self
    }

    pub fn keep_page_images(mut self, v: bool) -> Self {
        self.config.keep_page_images = v;
        self
    }

    pub fn document_concurrency(mut self, n: usize) -> Self {
        self.config.document_concurrency = n.max(1);
        self
    }

    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ScheduleError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ScheduleError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_tokens == 0 {
            return Err(ScheduleError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ScheduleError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(dir) = &c.prompt_dir {
            if !dir.is_dir() {
                return Err(ScheduleError::InvalidConfig(format!(
                    "prompt directory '{}' does not exist",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(c.temperature, 0.0);
        assert!(c.keep_page_images);
        assert_eq!(c.document_concurrency, 1);
        assert!(c.input_dir.ends_with("input"));
        assert!(c.output_dir.ends_with("output"));
    }

    #[test]
    fn setters_clamp() {
        let c = ExtractionConfig::builder()
            .dpi(5000)
            .temperature(9.0)
            .document_concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 600);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.document_concurrency, 1);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ExtractionConfig::builder()
            .api_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidConfig(_)));
    }

    #[test]
    fn missing_prompt_dir_is_rejected() {
        assert!(ExtractionConfig::builder()
            .prompt_dir("/nonexistent/prompts")
            .build()
            .is_err());
    }

    #[test]
    fn output_layout() {
        let c = ExtractionConfig::builder()
            .output_dir("/data/out")
            .build()
            .unwrap();
        let pdf = Path::new("/data/in/Level 3 Beams.PDF");
        assert_eq!(c.document_dir(pdf), PathBuf::from("/data/out/Level 3 Beams"));
        assert_eq!(
            c.output_path(pdf),
            PathBuf::from("/data/out/Level 3 Beams/Level 3 Beams.json")
        );
    }

    #[test]
    fn debug_hides_provider() {
        let c = ExtractionConfig::default();
        let s = format!("{:?}", c);
        assert!(s.contains("ExtractionConfig"));
        assert!(s.contains("provider: None"));
    }
}
