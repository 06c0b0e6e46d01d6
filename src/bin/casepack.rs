//! CLI binary for casepack.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CasePackConfig` and prints results.

use anyhow::{Context, Result};
use casepack::{
    assemble_package, build_case_package, inspect_template, CaseIntake, CasePackConfig,
    CasePackage, FormSchema,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full package: model-drafted checklist, filled I-130, archive
  casepack intake.json

  # Write somewhere else, skip the archive
  casepack intake.json -o cases/2024-06 --no-archive

  # Checklist already written by hand: no API key needed
  casepack intake.json --checklist-text checklist.txt

  # Checklist only, no form
  casepack intake.json --no-form

  # Fetch the template from a URL
  casepack intake.json --form-template https://www.uscis.gov/sites/default/files/document/forms/i-130.pdf

  # Audit a new form revision against the built-in schema
  casepack --list-fields forms/i-130_form.pdf

  # Machine-readable result (CasePackage as JSON)
  casepack intake.json --json > package.json

INTAKE JSON:
  {
    "petitioner":  { "given_name": "John", "family_name": "Smith",
                     "date_of_birth": "1988-04-02" },
    "beneficiary": { "given_name": "Maria", "family_name": "Garcia",
                     "country_of_birth": "Mexico", "date_of_birth": "1990-09-15" },
    "relationship": "Spouse",
    "visa_type": "I-130 (Spouse)",
    "marriage_date": "2023-06-10"
  }

  relationship: Spouse | Fiancé | Parent | Child | Other
  visa_type:    I-130 (Spouse) | K-1 (Fiancé) | Other

OUTPUT FILES (in --output-dir):
  {slug}_checklist.txt          normalised checklist text
  {slug}_checklist.pdf          rendered checklist
  {slug}_filled_i-130.pdf       filled reference form
  {slug}_case_package.tar.gz    Checklist.pdf + Filled_I130.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Build an immigration case package from intake JSON.
#[derive(Parser, Debug)]
#[command(
    name = "casepack",
    version,
    about = "Build an immigration case package: checklist PDF, filled form, archive",
    long_about = "Draft a USCIS document checklist with a language model, render it to PDF, \
fill the reference petition form from the same intake, and bundle both into one archive.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Intake JSON file.
    #[arg(required_unless_present = "list_fields")]
    intake: Option<PathBuf>,

    /// Directory for every generated file.
    #[arg(short, long = "output-dir", env = "CASEPACK_OUTPUT_DIR", default_value = "generated")]
    output: PathBuf,

    /// Reference form: local path or HTTP/HTTPS URL.
    #[arg(long, env = "CASEPACK_FORM_TEMPLATE", default_value = "forms/i-130_form.pdf")]
    form_template: String,

    /// Form schema id.
    #[arg(long, env = "CASEPACK_FORM", default_value = "i-130")]
    form: String,

    /// Do not fill a form.
    #[arg(long)]
    no_form: bool,

    /// Do not build the .tar.gz archive.
    #[arg(long, env = "CASEPACK_NO_ARCHIVE")]
    no_archive: bool,

    /// Use this checklist text instead of calling the model.
    #[arg(long, value_name = "FILE")]
    checklist_text: Option<PathBuf>,

    /// List the widget fields of a form template and exit.
    #[arg(long, value_name = "TEMPLATE", conflicts_with = "intake")]
    list_fields: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "CASEPACK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "CASEPACK_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "CASEPACK_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Retries on LLM failure.
    #[arg(long, env = "CASEPACK_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Keep spaces between words (disables split-word repair).
    #[arg(long)]
    no_word_repair: bool,

    /// Output structured JSON instead of a summary.
    #[arg(long, env = "CASEPACK_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CASEPACK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CASEPACK_QUIET")]
    quiet: bool,

    /// HTTP download timeout for a template URL, in seconds.
    #[arg(long, env = "CASEPACK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, env = "CASEPACK_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner owns the terminal while it runs, so library INFO logs are
    // suppressed unless --verbose asks for everything.
    let show_progress = !cli.quiet && !cli.json;
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

    // ── List-fields mode ─────────────────────────────────────────────────
    if let Some(ref template) = cli.list_fields {
        return list_fields(&cli, template).await;
    }

    let intake_path = cli
        .intake
        .as_ref()
        .context("An intake JSON file is required")?;
    let json = tokio::fs::read_to_string(intake_path)
        .await
        .with_context(|| format!("Failed to read intake from {:?}", intake_path))?;
    let intake = CaseIntake::from_json(&json).context("Invalid intake")?;

    let config = build_config(&cli).await?;

    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(intake.case_slug());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    // ── Run ──────────────────────────────────────────────────────────────
    let result = if let Some(ref path) = cli.checklist_text {
        if let Some(ref bar) = spinner {
            bar.set_message("Rendering supplied checklist…");
        }
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read checklist from {:?}", path))?;
        assemble_package(&intake, &text, &config).await
    } else {
        if let Some(ref bar) = spinner {
            bar.set_message("Drafting checklist…");
        }
        build_case_package(&intake, &config).await
    };

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let package = result.context("Case package failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&package).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&package);
    }

    Ok(())
}

/// Map CLI args to `CasePackConfig`.
async fn build_config(cli: &Cli) -> Result<CasePackConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = CasePackConfig::builder()
        .output_dir(&cli.output)
        .form_id(&cli.form)
        .archive(!cli.no_archive)
        .repair_split_words(!cli.no_word_repair)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    builder = if cli.no_form {
        builder.no_form()
    } else {
        builder.form_template(&cli.form_template)
    };
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

async fn list_fields(cli: &Cli, template: &str) -> Result<()> {
    let fields = inspect_template(template, cli.download_timeout)
        .await
        .context("Failed to inspect form template")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&fields).context("Failed to serialise fields")?
        );
        return Ok(());
    }

    for f in &fields {
        println!(
            "p{:<3} {:<4} {}{}",
            f.page,
            f.field_type.as_deref().unwrap_or("-"),
            f.name,
            f.value
                .as_deref()
                .map(|v| dim(&format!("  = {v:?}")))
                .unwrap_or_default(),
        );
    }

    if let Some(schema) = FormSchema::lookup(&cli.form) {
        let missing = schema.missing_fields(fields.iter().map(|f| f.name.as_str()));
        if missing.is_empty() {
            eprintln!(
                "{} all {} {} schema fields present (revision {})",
                green("✔"),
                schema.fields.len(),
                schema.id,
                schema.revision
            );
        } else {
            eprintln!(
                "{} {} {} schema field(s) missing from this template:",
                yellow("⚠"),
                missing.len(),
                schema.id
            );
            for id in missing {
                eprintln!("    {id}");
            }
        }
    }
    Ok(())
}

fn print_summary(package: &CasePackage) {
    eprintln!(
        "{} {}  {} page(s), {} item(s)",
        green("✔"),
        bold(&package.checklist_pdf_path.display().to_string()),
        package.stats.checklist_pages,
        package.stats.checklist_items,
    );

    if let (Some(path), Some(report)) = (&package.filled_form_path, &package.fill_report) {
        let mark = if report.unmatched_keys.is_empty() {
            green("✔")
        } else {
            yellow("⚠")
        };
        eprintln!(
            "{} {}  {} field(s) filled",
            mark,
            bold(&path.display().to_string()),
            report.filled.len(),
        );
        for key in &report.unmatched_keys {
            eprintln!("    {} {}", yellow("not in template:"), key);
        }
    }

    if let Some(ref path) = package.archive_path {
        eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
    }

    if package.stats.output_tokens > 0 {
        eprintln!(
            "   {} tokens in  /  {} tokens out  |  {}ms total",
            dim(&package.stats.input_tokens.to_string()),
            dim(&package.stats.output_tokens.to_string()),
            package.stats.total_duration_ms,
        );
    }
}
