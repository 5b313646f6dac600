//! CLI binary for invoice2xlsx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, picks a model client and reports the result.

use anyhow::{Context, Result};
use clap::Parser;
use invoice2xlsx::pipeline::input::resolve_input;
use invoice2xlsx::{
    count_pages, extract_to_dir, ApiConfig, ExtractionClient, ExtractionConfig, ExtractionProgressCallback,
    MediaType, PageError, ProgressCallback, ProviderClient, ResponsesClient,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Prints the per-page log lines, through a progress bar when one is shown.
struct CliProgressCallback {
    bar: Option<ProgressBar>,
}

impl CliProgressCallback {
    fn new(show_bar: bool) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(spinner_style);
            bar.set_prefix("Preparing");
            bar.set_message("Reading document…");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Arc::new(Self { bar })
    }

    fn println(&self, line: String) {
        match self.bar {
            Some(ref bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_loaded(&self, total_pages: usize) {
        if let Some(ref bar) = self.bar {
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");
            bar.set_length(total_pages as u64);
            bar.set_style(style);
            bar.set_prefix("Extracting");
        }
        self.println(bold(&format!("Detected {total_pages} page(s)")));
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.println(format!("Processing page {page_num}..."));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, item_count: usize) {
        self.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{item_count} item(s)")),
        ));
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_page_invalid(&self, page_num: usize, total_pages: usize, diagnostic: &PageError) {
        self.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("⚠"),
            page_num,
            total_pages,
            yellow("model output was not a JSON array of line items"),
        ));
        self.println(format!("Raw output for page {page_num}:\n{}", diagnostic.raw()));
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_extraction_complete(&self, _total_pages: usize, _item_count: usize, _failed_pages: usize) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a PDF invoice into ./invoice_output.xlsx
  invoice2xlsx invoice.pdf

  # Scanned receipt, output into another directory
  invoice2xlsx receipt.jpg -o out/

  # File without a useful extension
  invoice2xlsx --content-type application/pdf upload.bin

  # Download from URL
  invoice2xlsx https://example.com/invoice.pdf

  # Count pages only (no API key needed)
  invoice2xlsx --count-only invoice.pdf

  # Another edgequake-llm provider
  invoice2xlsx --provider anthropic --model claude-sonnet-4-20250514 invoice.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (required by the default client)
  OPENAI_BASE_URL         Override the Responses API base URL
  INVOICE2XLSX_MODEL      Override model ID (default gpt-4.1)
  PDFIUM_LIB_PATH         Path to an existing libpdfium

  HTTP(S)_PROXY / ALL_PROXY are ignored by the default client: model calls
  always connect directly.
"#;

/// Extract invoice line items from a PDF or image into a spreadsheet.
#[derive(Parser, Debug)]
#[command(
    name = "invoice2xlsx",
    version,
    about = "Extract invoice line items from a PDF or image into invoice_output.xlsx",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF/PNG/JPEG file path or HTTP/HTTPS URL.
    input: String,

    /// Directory to write invoice_output.xlsx into.
    #[arg(short, long, env = "INVOICE2XLSX_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Declared media type: application/pdf, image/png or image/jpeg.
    #[arg(long, env = "INVOICE2XLSX_CONTENT_TYPE")]
    content_type: Option<String>,

    /// Model ID.
    #[arg(long, env = "INVOICE2XLSX_MODEL")]
    model: Option<String>,

    /// Use an edgequake-llm provider (anthropic, gemini, ollama, …) instead of
    /// the direct OpenAI Responses client.
    #[arg(long, env = "INVOICE2XLSX_PROVIDER")]
    provider: Option<String>,

    /// Responses API base URL (default client only).
    #[arg(long, env = "INVOICE2XLSX_BASE_URL")]
    base_url: Option<String>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "INVOICE2XLSX_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "INVOICE2XLSX_PASSWORD")]
    password: Option<String>,

    /// Path to a text file replacing the line-item instruction.
    #[arg(long, env = "INVOICE2XLSX_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max model output tokens per page.
    #[arg(long, env = "INVOICE2XLSX_MAX_TOKENS", default_value_t = 1500)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "INVOICE2XLSX_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "INVOICE2XLSX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to an existing libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the ExtractionOutput as JSON on stdout.
    #[arg(long, env = "INVOICE2XLSX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "INVOICE2XLSX_NO_PROGRESS")]
    no_progress: bool,

    /// Print the page count only, no model calls.
    #[arg(long)]
    count_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INVOICE2XLSX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INVOICE2XLSX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if cli.quiet {
        None
    } else {
        let cb = CliProgressCallback::new(show_progress);
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    };
    let config = build_config(&cli, progress_cb).await?;

    let media_type = cli
        .content_type
        .as_deref()
        .map(MediaType::from_mime)
        .transpose()
        .context("Invalid --content-type")?;

    let document = resolve_input(&cli.input, media_type, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to read {}", cli.input))?;

    // ── Count-only mode ──────────────────────────────────────────────────
    if cli.count_only {
        let pages = count_pages(&document, &config)
            .await
            .context("Failed to count pages")?;
        println!("{pages}");
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let client = build_client(&cli)?;
    let saved = extract_to_dir(document, client.as_ref(), &config, &cli.output_dir)
        .await
        .context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&saved.output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &saved.output.stats;
        match saved.path {
            Some(ref path) => {
                eprintln!(
                    "{} Extraction complete: {} item(s) from {}/{} page(s)  →  {}",
                    green("✔"),
                    stats.total_items,
                    stats.parsed_pages,
                    stats.total_pages,
                    bold(&path.display().to_string()),
                );
            }
            None => {
                eprintln!("{} No line items were extracted", yellow("⚠"));
            }
        }
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
            stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `--provider` selects an edgequake-llm backend; otherwise the direct
/// Responses client configured from the environment.
fn build_client(cli: &Cli) -> Result<Box<dyn ExtractionClient>> {
    if let Some(ref provider) = cli.provider {
        let model = cli.model.as_deref().unwrap_or(invoice2xlsx::config::DEFAULT_MODEL);
        let client = ProviderClient::from_name(provider, model).context("Failed to create provider")?;
        return Ok(Box::new(client));
    }

    let mut api = ApiConfig::from_env().context("OpenAI API is not configured")?;
    if let Some(ref model) = cli.model {
        api = api.with_model(model.clone());
    }
    if let Some(ref url) = cli.base_url {
        api = api.with_base_url(url.clone());
    }
    if !api.ignored_proxy_vars.is_empty() && !cli.quiet {
        eprintln!(
            "{}",
            dim(&format!("Ignoring proxy settings: {}", api.ignored_proxy_vars.join(", ")))
        );
    }
    let client = ResponsesClient::new(&api).context("Failed to create OpenAI client")?;
    Ok(Box::new(client))
}
