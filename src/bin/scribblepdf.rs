//! CLI binary for scribblepdf.
//!
//! Maps flags to `ScribbleConfig` and either runs the HTTP service or
//! annotates a local PDF directly.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scribblepdf::{
    annotate_pdf, inspect, serve, AnnotationProgressCallback, ProgressCallback, ScribbleConfig,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Progress bar ─────────────────────────────────────────────────────────────

/// One bar for the document plus a log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Extracting");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnnotationProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Scribbling");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, note_count: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{note_count:>3} notes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} note pages written", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} pages annotated  ({} with error page)",
                if failed == total_pages { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the upload / generate_notes / pages API on port 5000
  scribblepdf serve

  # Annotate a lecture locally, one PNG per page in ./notes
  scribblepdf annotate lecture.pdf -o notes

  # Also write a PDF with each note page after its source page
  scribblepdf annotate lecture.pdf -o notes --pdf lecture_notes.pdf

  # Reproducible pencil jitter
  scribblepdf --seed 7 annotate lecture.pdf

  # Use another chat provider instead of Gemini
  scribblepdf --provider openai --model gpt-4.1-mini annotate lecture.pdf

  # Page count and sizes (no API key needed)
  scribblepdf inspect lecture.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default backend)
  EDGEQUAKE_LLM_PROVIDER  Use another provider (openai, anthropic, ollama, ...)
  EDGEQUAKE_MODEL         Model for that provider
  SCRIBBLE_FONT           Handwriting TrueType font
  PDFIUM_LIB_PATH         Directory or file of an existing libpdfium
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Turn PDF pages into pencil-style handwritten note pages.
#[derive(Parser, Debug)]
#[command(
    name = "scribblepdf",
    version,
    about = "Turn PDF pages into pencil-style handwritten note pages",
    long_about = "Send each page of a PDF to a generative model, then draw the returned notes \
on a blank page with a handwriting font, pencil grain and ink jitter. Runs as a small HTTP \
service or directly on a local file.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    opts: GlobalOpts,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "SCRIBBLE_BIND", default_value = "127.0.0.1:5000")]
        bind: String,
    },
    /// Annotate a local PDF.
    Annotate {
        /// PDF file to annotate.
        input: PathBuf,

        /// Directory for the note PNGs.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Also write an interleaved PDF to this path.
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Print page count and page sizes.
    Inspect {
        input: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Gemini model ID, or the model for --provider.
    #[arg(long, global = true, env = "SCRIBBLE_MODEL")]
    model: Option<String>,

    /// Chat provider instead of Gemini: openai, anthropic, ollama, ...
    #[arg(long, global = true, env = "SCRIBBLE_PROVIDER")]
    provider: Option<String>,

    /// Gemini API key.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini REST base URL.
    #[arg(long, global = true, env = "SCRIBBLE_GEMINI_ENDPOINT")]
    gemini_endpoint: Option<String>,

    /// Text file with a custom notes prompt.
    #[arg(long, global = true, env = "SCRIBBLE_PROMPT")]
    prompt: Option<PathBuf>,

    /// Handwriting TrueType font.
    #[arg(long, global = true, env = "SCRIBBLE_FONT")]
    font: Option<PathBuf>,

    /// Path to libpdfium.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Rasterisation DPI (72–400).
    #[arg(long, global = true, env = "SCRIBBLE_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Send only page text, not the page image.
    #[arg(long, global = true, env = "SCRIBBLE_NO_RASTERIZE")]
    no_rasterize: bool,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, env = "SCRIBBLE_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Max output tokens per page.
    #[arg(long, global = true, env = "SCRIBBLE_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Per-page request timeout in seconds.
    #[arg(long, global = true, env = "SCRIBBLE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Where uploads are stored (serve).
    #[arg(long, global = true, env = "SCRIBBLE_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Where note pages are written (serve).
    #[arg(long, global = true, env = "SCRIBBLE_GENERATED_DIR", default_value = "generated")]
    generated_dir: PathBuf,

    /// Seed for the pencil jitter.
    #[arg(long, global = true, env = "SCRIBBLE_SEED")]
    seed: Option<u64>,

    /// Keep model output exactly as returned.
    #[arg(long, global = true)]
    raw_response: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "SCRIBBLE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SCRIBBLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SCRIBBLE_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let opts = &cli.opts;

    // The bar carries the per-page feedback during `annotate`; library INFO
    // logs would tear it.
    let show_progress =
        matches!(cli.command, Command::Annotate { .. }) && !opts.quiet && !opts.no_progress;
    let filter = if opts.verbose {
        "debug"
    } else if opts.quiet || show_progress {
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

    match &cli.command {
        Command::Serve { bind } => {
            let config = build_config(opts, None)?;
            // The server owns its runtime, so this stays outside any async context.
            serve(bind, config).with_context(|| format!("Server on {bind} failed"))?;
        }
        Command::Inspect { input, json } => {
            let config = build_config(opts, None)?;
            let info = runtime()?
                .block_on(inspect(input, &config))
                .context("Failed to inspect PDF")?;
            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialise page info")?
                );
            } else {
                println!("File:   {}", input.display());
                println!("Pages:  {}", info.page_count);
                for p in &info.pages {
                    println!(
                        "  {:>3}  {:>7.1} × {:<7.1} pt  {}",
                        p.page_num,
                        p.width_points,
                        p.height_points,
                        dim(&format!("{} chars", p.text_chars)),
                    );
                }
            }
        }
        Command::Annotate { input, output, pdf } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn AnnotationProgressCallback>)
            } else {
                None
            };
            let config = build_config(opts, progress)?;
            let rt = runtime()?;

            let doc = rt
                .block_on(annotate_pdf(input, &config))
                .context("Annotation failed")?;
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            std::fs::create_dir_all(output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let written = doc.save_pngs(output, &stem).context("Failed to write note pages")?;

            if let Some(pdf_out) = pdf {
                rt.block_on(doc.finalize_pdf(pdf_out, &config))
                    .context("Failed to write interleaved PDF")?;
            }

            if !opts.quiet {
                eprintln!(
                    "{}  {}/{} pages  {} notes  {}ms  →  {}",
                    if doc.stats.failed_pages == 0 { green("✔") } else { cyan("⚠") },
                    doc.stats.annotated_pages,
                    doc.stats.total_pages,
                    doc.stats.total_notes,
                    doc.stats.total_duration_ms,
                    bold(&output.display().to_string()),
                );
                if let Some(pdf_out) = pdf {
                    eprintln!("   interleaved PDF  →  {}", bold(&pdf_out.display().to_string()));
                }
                if !show_progress {
                    for path in &written {
                        eprintln!("   {}", dim(&path.display().to_string()));
                    }
                }
            }
        }
    }
    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start tokio runtime")
}

/// Map CLI flags to `ScribbleConfig`.
fn build_config(opts: &GlobalOpts, progress: Option<ProgressCallback>) -> Result<ScribbleConfig> {
    let mut builder = ScribbleConfig::builder()
        .dpi(opts.dpi)
        .rasterize_pages(!opts.no_rasterize)
        .temperature(opts.temperature)
        .max_tokens(opts.max_tokens)
        .api_timeout_secs(opts.api_timeout)
        .upload_dir(&opts.upload_dir)
        .generated_dir(&opts.generated_dir)
        .clean_response(!opts.raw_response);

    if let Some(ref path) = opts.prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt from {}", path.display()))?;
        builder = builder.prompt(prompt);
    }
    if let Some(ref v) = opts.model {
        builder = builder.model(v);
    }
    if let Some(ref v) = opts.provider {
        builder = builder.provider_name(v);
    }
    if let Some(ref v) = opts.gemini_api_key {
        builder = builder.gemini_api_key(v);
    }
    if let Some(ref v) = opts.gemini_endpoint {
        builder = builder.gemini_endpoint(v);
    }
    if let Some(ref v) = opts.font {
        builder = builder.font_path(v);
    }
    if let Some(ref v) = opts.pdfium_lib {
        builder = builder.pdfium_lib_path(v);
    }
    if let Some(seed) = opts.seed {
        builder = builder.seed(seed);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
