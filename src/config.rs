//! Configuration types for note generation.
//!
//! Everything the pipeline and the HTTP boundary need is carried by
//! [`ScribbleConfig`], built through [`ScribbleConfigBuilder`]. The host
//! resolves it once at startup (CLI flags, environment) and hands a shared
//! reference to every request.

use crate::error::ScribbleError;
use crate::notes::NoteGenerator;
use crate::progress::ProgressCallback;
use crate::render::LayoutStyle;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default Gemini REST endpoint (without the model path).
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Configuration for the upload → notes pipeline.
///
/// # Example
/// ```rust
/// use scribblepdf::ScribbleConfig;
///
/// let config = ScribbleConfig::builder()
///     .dpi(120)
///     .font_path("fonts/handwriting.ttf")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ScribbleConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 150.
    ///
    /// Also fixes the note canvas size when pages are not rasterised, so note
    /// pages always match the pixel size a rendered page would have had.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Rasterise each page and send the bitmap alongside the text. Default: true.
    pub rasterize_pages: bool,

    /// Handwriting-style TrueType font. `None` uses the bundled DejaVu Sans Oblique.
    pub font_path: Option<PathBuf>,

    /// Path to a pdfium shared library. `None` looks next to the binary,
    /// then in the system library path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Base URL of the Gemini REST API.
    pub gemini_endpoint: String,

    /// Gemini API key. Falls back to `GEMINI_API_KEY` when unset.
    pub gemini_api_key: Option<String>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Route requests through an `edgequake_llm` provider (e.g. "openai",
    /// "anthropic", "ollama") instead of the Gemini REST client.
    pub provider_name: Option<String>,

    /// Pre-constructed note generator. Takes precedence over everything else.
    pub generator: Option<Arc<dyn NoteGenerator>>,

    /// Custom annotation prompt. If None, uses the built-in default.
    pub prompt: Option<String>,

    /// Sampling temperature for the note request. Range: 0.0–2.0. Default: 0.4.
    pub temperature: f32,

    /// Upper bound on generated tokens per page. Default: 1024.
    pub max_tokens: usize,

    /// Per-request timeout for the remote model, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Where uploaded PDFs are stored. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Where generated note images are stored. Default: `generated`.
    pub generated_dir: PathBuf,

    /// Largest accepted upload in bytes. Default: 16 MiB.
    pub max_upload_bytes: usize,

    /// Strip fences and invisible characters from the model output before
    /// parsing. Default: true.
    pub clean_response: bool,

    /// Fixed seed for the pencil jitter. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Layout constants for the note renderer.
    pub layout: LayoutStyle,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ScribbleConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            rasterize_pages: true,
            font_path: None,
            pdfium_lib_path: None,
            gemini_endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            gemini_api_key: None,
            model: None,
            provider_name: None,
            generator: None,
            prompt: None,
            temperature: 0.4,
            max_tokens: 1024,
            api_timeout_secs: 60,
            upload_dir: PathBuf::from("uploads"),
            generated_dir: PathBuf::from("generated"),
            max_upload_bytes: 16 * 1024 * 1024,
            clean_response: true,
            seed: None,
            layout: LayoutStyle::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ScribbleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScribbleConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("rasterize_pages", &self.rasterize_pages)
            .field("font_path", &self.font_path)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("gemini_endpoint", &self.gemini_endpoint)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("upload_dir", &self.upload_dir)
            .field("generated_dir", &self.generated_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("clean_response", &self.clean_response)
            .field("seed", &self.seed)
            .field("layout", &self.layout)
            .finish()
    }
}

impl ScribbleConfig {
    /// Create a new builder for `ScribbleConfig`.
    pub fn builder() -> ScribbleConfigBuilder {
        ScribbleConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model identifier with the default applied.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ScribbleConfig`].
pub struct ScribbleConfigBuilder {
    config: ScribbleConfig,
}

impl ScribbleConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn rasterize_pages(mut self, v: bool) -> Self {
        self.config.rasterize_pages = v;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn gemini_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.gemini_endpoint = url.into();
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.gemini_api_key = Some(key.into());
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

    pub fn generator(mut self, generator: Arc<dyn NoteGenerator>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn generated_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.generated_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn clean_response(mut self, v: bool) -> Self {
        self.config.clean_response = v;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn layout(mut self, layout: LayoutStyle) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScribbleConfig, ScribbleError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(ScribbleError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(ScribbleError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(ScribbleError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.upload_dir == c.generated_dir {
            return Err(ScribbleError::InvalidConfig(format!(
                "Upload and generated directories must differ (both '{}')",
                c.upload_dir.display()
            )));
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}
