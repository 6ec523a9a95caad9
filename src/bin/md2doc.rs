//! CLI binary for edgequake-md2doc.
//!
//! A thin shim over the library crate: flags map to `ConversionConfig`, files
//! go through the upload filter into a `DocumentQueue`, and every completed
//! document is exported as DOCX.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_md2doc::pipeline::{export, input};
use edgequake_md2doc::{
    create_provider, ConversionConfig, ConversionProgressCallback, Credential, CredentialStore,
    DocumentQueue, DocxOptions, ProcessingStatus, ProgressCallback, DEFAULT_MODEL,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-document wall-clock start times, keyed by batch index.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Preparing");

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} document(s)…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, name: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, name: &str, html_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{html_len:>6} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let secs = self.elapsed_secs(index);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} document(s) converted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} document(s) converted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Save your Gemini API key once
  md2doc --save-key AIzaSy...

  # Convert a batch; writes notes.docx and todo.docx into ./out
  md2doc notes.md todo.md -o out

  # Convert text from stdin and put the HTML on the clipboard
  pbpaste | md2doc --paste --copy

  # Landscape pages, keep the cleaned HTML next to the DOCX
  md2doc --landscape --html report.markdown

  # Use an edgequake-llm provider instead of Gemini
  md2doc --provider openai --model gpt-4.1-mini notes.md

ACCEPTED INPUT:
  Files ending in .md, .markdown or .txt. Other files are skipped.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          API key (overrides the saved key)
  MD2DOC_MODEL            Model ID (default: gemini-2.5-flash)
  MD2DOC_PROVIDER         edgequake-llm provider name
  MD2DOC_OUTPUT_DIR       Output directory
  MD2DOC_CREDENTIALS      Path of the credential store
  RUST_LOG                Log filter, e.g. edgequake_md2doc=debug
"#;

/// Convert Markdown files to formatted DOCX documents using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "md2doc",
    version,
    about = "Convert Markdown files to formatted DOCX documents using an LLM",
    long_about = "Convert Markdown files to word-processor friendly HTML and DOCX. \
Each document is sent to Gemini (or any edgequake-llm provider) with fixed formatting \
rules: bordered tables, normal-weight headings, no horizontal rules.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown files (.md, .markdown, .txt).
    files: Vec<PathBuf>,

    /// Read one document from stdin and convert it immediately.
    #[arg(long, env = "MD2DOC_PASTE")]
    paste: bool,

    /// Directory for the generated files.
    #[arg(short, long = "output-dir", env = "MD2DOC_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Copy the selected (first) document's HTML to the clipboard.
    #[arg(long, env = "MD2DOC_COPY")]
    copy: bool,

    /// Also write the cleaned HTML next to each DOCX.
    #[arg(long, env = "MD2DOC_HTML")]
    html: bool,

    /// Print the document list as JSON on stdout.
    #[arg(long, env = "MD2DOC_JSON")]
    json: bool,

    /// Model ID.
    #[arg(long, env = "MD2DOC_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// edgequake-llm provider (openai, anthropic, ollama, …). Default: Gemini REST.
    #[arg(long, env = "MD2DOC_PROVIDER")]
    provider: Option<String>,

    /// API key for this run. Overrides the saved key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Validate and save an API key, then continue (or exit if no input).
    #[arg(long, value_name = "KEY")]
    save_key: Option<String>,

    /// Path of the credential store.
    #[arg(long, env = "MD2DOC_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Landscape page orientation.
    #[arg(long, env = "MD2DOC_LANDSCAPE")]
    landscape: bool,

    /// LLM temperature (0.0–2.0). Default: the service default.
    #[arg(long, env = "MD2DOC_TEMPERATURE")]
    temperature: Option<f32>,

    /// Per-document timeout in seconds. Default: none.
    #[arg(long, env = "MD2DOC_TIMEOUT")]
    timeout: Option<u64>,

    /// Treat an empty model response as a failure.
    #[arg(long, env = "MD2DOC_STRICT_EMPTY")]
    strict_empty: bool,

    /// Disable progress bar.
    #[arg(long, env = "MD2DOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2DOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2DOC_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the progress bar active, library INFO lines would tear the bar.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Credential ───────────────────────────────────────────────────────
    let store = match cli.credentials {
        Some(ref path) => CredentialStore::at(path),
        None => CredentialStore::default_location().context("Cannot locate credential store")?,
    };

    if let Some(ref key) = cli.save_key {
        let credential = Credential::parse(key)?;
        store.save(&credential).await.context("Failed to save API key")?;
        if !cli.quiet {
            eprintln!(
                "{} API key saved to {}",
                green("✔"),
                bold(&store.path().display().to_string())
            );
        }
        if cli.files.is_empty() && !cli.paste {
            return Ok(());
        }
    }

    if cli.files.is_empty() && !cli.paste {
        bail!("No input. Pass Markdown files or --paste (see --help).");
    }

    let credential = match cli.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Some(Credential::new(key)),
        // providers authenticate themselves
        _ if cli.provider.is_some() => None,
        _ => store.load().await.context("Failed to read saved API key")?,
    };

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, credential, progress_cb)?;
    let mut queue = DocumentQueue::new(&config).context("Failed to set up conversion")?;

    // ── Intake + conversion ──────────────────────────────────────────────
    if cli.paste {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        if text.trim().is_empty() {
            bail!("Nothing to convert: stdin was empty");
        }
        queue.add_pasted(text).await.context("Conversion could not start")?;
    } else {
        let supported = input::require_supported(&cli.files)?;
        if !cli.quiet {
            for skipped in cli.files.iter().filter(|p| !supported.contains(*p)) {
                eprintln!("{} skipping {}", cyan("⚠"), skipped.display());
            }
        }
        let docs = input::read_batch(&supported).await?;
        queue.add_batch(docs);
        queue
            .process_pending(None)
            .await
            .context("Conversion could not start")?;
    }

    // ── Export ───────────────────────────────────────────────────────────
    let mut export_failures = 0;
    let mut taken_names = HashSet::new();
    for doc in queue.documents() {
        if doc.status() != ProcessingStatus::Completed {
            continue;
        }
        let written = async {
            let mut artifact = export::export_document(doc, &config.docx)?;
            artifact.file_name = export::unique_file_name(&artifact.file_name, &mut taken_names);
            let path = export::write_artifact(&artifact, &cli.output_dir).await?;
            if cli.html {
                if let Some(html) = doc.converted_html() {
                    let html_artifact = export::ExportArtifact {
                        file_name: html_file_name(&artifact.file_name),
                        bytes: html.as_bytes().to_vec(),
                    };
                    export::write_artifact(&html_artifact, &cli.output_dir).await?;
                }
            }
            Ok::<_, edgequake_md2doc::Md2DocError>(path)
        }
        .await;

        match written {
            Ok(path) if !cli.quiet => {
                eprintln!("  {} {}", green("→"), path.display());
            }
            Ok(_) => {}
            Err(e) => {
                export_failures += 1;
                eprintln!("  {} {}: {}", red("✗"), doc.name(), e);
            }
        }
    }

    if cli.copy {
        copy_selected(&queue)?;
        if !cli.quiet {
            eprintln!("{} HTML copied to clipboard", green("✔"));
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(queue.documents())
            .context("Failed to serialise documents")?;
        println!("{json}");
    }

    // ── Summary / exit status ────────────────────────────────────────────
    let failed = queue.count_with(ProcessingStatus::Error);
    if !cli.quiet {
        for doc in queue.documents() {
            if let Some(msg) = doc.error_message() {
                eprintln!("  {} {}: {}", red("✗"), doc.name(), dim(msg));
            }
        }
    }
    if failed > 0 || export_failures > 0 {
        bail!(
            "{} of {} document(s) failed to convert, {} export(s) failed",
            failed,
            queue.len(),
            export_failures
        );
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    credential: Option<Credential>,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .model(&cli.model)
        .maybe_credential(credential)
        .strict_empty_response(cli.strict_empty)
        .docx(if cli.landscape {
            DocxOptions::landscape()
        } else {
            DocxOptions::default()
        });

    if let Some(ref name) = cli.provider {
        builder = builder.provider(create_provider(name, &cli.model)?);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}

fn html_file_name(docx_name: &str) -> String {
    Path::new(docx_name)
        .with_extension("html")
        .to_string_lossy()
        .into_owned()
}

#[cfg(feature = "clipboard")]
fn copy_selected(queue: &DocumentQueue) -> Result<()> {
    let doc = queue.selected().context("No document to copy")?;
    edgequake_md2doc::pipeline::clipboard::copy_document(doc)?;
    Ok(())
}

#[cfg(not(feature = "clipboard"))]
fn copy_selected(_queue: &DocumentQueue) -> Result<()> {
    bail!("This build has no clipboard support (rebuild with --features clipboard)")
}
