//! CLI binary for edgequake-pdf-translate.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TranslationConfig`, renders progress, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_translate::{
    check_status, download_file, fetch_credit_balance, resume, translate, Backoff,
    ProgressCallback, TaskStatus, TranslationConfig, TranslationOutput,
    TranslationProgressCallback, TranslationResult,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while uploading, then a percentage bar while the provider works.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_prefix("Translating");
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, file_name: &str, size: u64) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!(
            "{file_name} ({:.1} MB)",
            size as f64 / (1024.0 * 1024.0)
        ));
    }

    fn on_submitted(&self, task_id: &str) {
        self.activate_bar();
        self.bar
            .println(format!("  {} Task {}", green("✓"), bold(task_id)));
        self.bar.set_message("waiting for provider");
    }

    fn on_status_check(&self, check: u32, progress: u8) {
        self.bar.set_position(progress as u64);
        self.bar.set_message(format!("check #{check}"));
    }

    fn on_interval_changed(&self, _from: Duration, to: Duration) {
        self.bar.println(format!(
            "  {} polling every {}s",
            dim("·"),
            to.as_secs()
        ));
    }

    fn on_check_failed(&self, consecutive: u32, error: &str) {
        let msg: String = error.chars().take(80).collect();
        self.bar.println(format!(
            "  {} status check failed ({consecutive} in a row): {}",
            yellow("⚠"),
            msg
        ));
    }

    fn on_completed(&self, _result: &TranslationResult) {
        self.bar.set_position(100);
        self.bar.finish_and_clear();
    }

    fn on_failed(&self, _error: &str) {
        self.bar.abandon();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate to Lithuanian (default), print the download link
  pdf-translate document.pdf

  # English → German, save the translated PDF
  pdf-translate --source-lang en --target-lang de document.pdf -o document_de.pdf

  # Resume polling a task started earlier
  pdf-translate --task-id abc-123 -o out.pdf

  # One status query, JSON output
  pdf-translate --task-id abc-123 --status-only --json

  # Offline demo, nothing is uploaded
  pdf-translate --sandbox document.pdf

POLLING:
  Checks run 3s apart for the first 3, 10s apart up to check 12, then every
  20s. Each check retries up to --max-retries times on network errors. Six
  failed checks in a row, or --max-wait minutes without a result, end the job.

ENVIRONMENT VARIABLES:
  OTRANSLATOR_API_KEY           Provider API key
  PDF_TRANSLATE_BASE_URL        Override the API endpoint root
  PDF_TRANSLATE_TARGET_LANG     Default target language
  PDF_TRANSLATE_CREDITS_WEBHOOK Credit balance webhook URL
  RUST_LOG                      Override log filtering
"#;

/// Translate PDF documents with a hosted translation API.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-translate",
    version,
    about = "Translate PDF documents with a hosted translation API",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to translate.
    #[arg(required_unless_present_any = ["task_id", "balance"])]
    input: Option<PathBuf>,

    /// Download the translated PDF to this path.
    #[arg(short, long, env = "PDF_TRANSLATE_OUTPUT")]
    output: Option<PathBuf>,

    /// Source language code, or "auto".
    #[arg(long, env = "PDF_TRANSLATE_SOURCE_LANG", default_value = "auto")]
    source_lang: String,

    /// Target language code.
    #[arg(long, env = "PDF_TRANSLATE_TARGET_LANG", default_value = "lt")]
    target_lang: String,

    /// Provider model ID.
    #[arg(long, env = "PDF_TRANSLATE_MODEL", default_value = "grok-3-mini")]
    model: String,

    /// Glossary file forwarded to the provider.
    #[arg(long, env = "PDF_TRANSLATE_GLOSSARY")]
    glossary: Option<PathBuf>,

    /// Ask the provider to translate text inside images.
    #[arg(long, env = "PDF_TRANSLATE_IMAGES")]
    translate_images: bool,

    /// Request a preview (partial) translation.
    #[arg(long, env = "PDF_TRANSLATE_PREVIEW")]
    preview: bool,

    /// Provider API key.
    #[arg(long, env = "OTRANSLATOR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API endpoint root.
    #[arg(long, env = "PDF_TRANSLATE_BASE_URL")]
    base_url: Option<String>,

    /// Track an existing task instead of uploading a file.
    #[arg(long, env = "PDF_TRANSLATE_TASK_ID")]
    task_id: Option<String>,

    /// With --task-id: query once and print the status.
    #[arg(long, requires = "task_id")]
    status_only: bool,

    /// Give up after this many minutes without a result.
    #[arg(long, env = "PDF_TRANSLATE_MAX_WAIT", default_value_t = 20,
          value_parser = clap::value_parser!(u64).range(1..=240))]
    max_wait: u64,

    /// Attempts per status query.
    #[arg(long, env = "PDF_TRANSLATE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Grow retry delays by ×1.5 (capped at 10 s) instead of linearly.
    #[arg(long, env = "PDF_TRANSLATE_MULTIPLICATIVE_BACKOFF")]
    multiplicative_backoff: bool,

    /// Simulate the provider locally; nothing is uploaded.
    #[arg(long, env = "PDF_TRANSLATE_SANDBOX")]
    sandbox: bool,

    /// Webhook returning {"credits": n}; queried after a completed job.
    #[arg(long, env = "PDF_TRANSLATE_CREDITS_WEBHOOK")]
    credits_webhook: Option<String>,

    /// Print the credit balance from --credits-webhook and exit.
    #[arg(long, requires = "credits_webhook")]
    balance: bool,

    /// Output structured JSON instead of text.
    #[arg(long, env = "PDF_TRANSLATE_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF_TRANSLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_TRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_TRANSLATE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && !cli.status_only && !cli.balance;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn TranslationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    if cli.sandbox && !cli.quiet {
        eprintln!(
            "{} sandbox mode: results are simulated and point at example.com",
            yellow("⚠")
        );
    }

    // ── Balance mode ─────────────────────────────────────────────────────
    if cli.balance {
        let url = cli
            .credits_webhook
            .as_deref()
            .context("--balance needs --credits-webhook")?;
        return print_balance(url, cli.json).await;
    }

    // ── Status-only mode ─────────────────────────────────────────────────
    if cli.status_only {
        let task_id = cli.task_id.as_deref().context("--status-only needs --task-id")?;
        let task = check_status(task_id, &config)
            .await
            .context("Status query failed")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&task).context("Failed to serialise task")?);
        } else {
            println!("Task:      {}", task.task_id);
            println!("Status:    {}", task.status.as_str());
            println!("Progress:  {}%", task.progress);
            if let Some(ref m) = task.message {
                println!("Message:   {}", m);
            }
            if let Some(ref r) = task.result {
                print_result(r);
            }
            if let Some(ref e) = task.error {
                println!("Error:     {}", e.message);
            }
        }
        if task.status == TaskStatus::Error {
            std::process::exit(1);
        }
        return Ok(());
    }

    // ── Run translation ──────────────────────────────────────────────────
    let output = match (&cli.task_id, &cli.input) {
        (Some(task_id), _) => resume(task_id, &config)
            .await
            .with_context(|| format!("Translation task {task_id} failed"))?,
        (None, Some(input)) => translate(input, &config)
            .await
            .with_context(|| format!("Failed to translate {}", input.display()))?,
        (None, None) => anyhow::bail!("Provide a PDF file or --task-id"),
    };

    let downloaded = match cli.output {
        Some(ref path) => Some(save(&output.result, path).await?),
        None => None,
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        print_summary(&output, downloaded.as_deref());
    } else if let Some(url) = output.result.download_url() {
        println!("{url}");
    }

    Ok(())
}

/// Map CLI args to `TranslationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslationConfig> {
    let mut builder = TranslationConfig::builder()
        .source_lang(&cli.source_lang)
        .target_lang(&cli.target_lang)
        .model(&cli.model)
        .max_wait(Duration::from_secs(cli.max_wait * 60))
        .max_retries(cli.max_retries)
        .sandbox(cli.sandbox);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref path) = cli.glossary {
        let glossary = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read glossary from {:?}", path))?;
        builder = builder.glossary(glossary);
    }
    if cli.translate_images {
        builder = builder.translate_images(true);
    }
    if cli.preview {
        builder = builder.preview(true);
    }
    if cli.multiplicative_backoff {
        builder = builder.backoff(Backoff::multiplicative());
    }
    if let Some(ref url) = cli.credits_webhook {
        builder = builder.credits_webhook_url(url);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn save(result: &TranslationResult, path: &Path) -> Result<PathBuf> {
    let file = download_file(result, path)
        .await
        .with_context(|| format!("Failed to save translated PDF to {}", path.display()))?;
    Ok(file.path)
}

fn print_result(result: &TranslationResult) {
    println!("Download:  {}", result.download_label());
    if let Some(ref b) = result.bilingual_file_url {
        println!("Bilingual: {}", b);
    }
    if let Some(ref c) = result.used_credits {
        println!("Credits:   {}", c);
    }
    if let Some(ref t) = result.token_count {
        println!("Tokens:    {}", t);
    }
}

fn print_summary(output: &TranslationOutput, saved: Option<&Path>) {
    let task = &output.task;
    eprintln!(
        "{} {} translated {} → {}  {}",
        green("✔"),
        bold(&task.file_name),
        task.source_language,
        task.target_language,
        dim(&format!(
            "{} checks, {:.1}s",
            output.stats.status_checks,
            output.stats.total_duration_ms as f64 / 1000.0
        )),
    );
    if output.stats.failed_checks > 0 {
        eprintln!(
            "   {} {} status checks failed along the way",
            yellow("⚠"),
            output.stats.failed_checks
        );
    }
    if output.result.download_url().is_none() {
        eprintln!("   {} provider returned no download link", red("✘"));
    }
    print_result(&output.result);
    if let Some(path) = saved {
        eprintln!("   saved to {}", bold(&path.display().to_string()));
    }
    if let Some(credits) = output.credits_remaining {
        eprintln!("   {} credits remaining", credits);
    }
}

async fn print_balance(url: &str, json: bool) -> Result<()> {
    let balance = fetch_credit_balance(url)
        .await
        .context("Failed to fetch credit balance")?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&balance).context("Failed to serialise balance")?
        );
    } else {
        println!(
            "{}{}",
            balance.credits,
            if balance.from_cache { " (cached)" } else { "" }
        );
    }
    Ok(())
}
