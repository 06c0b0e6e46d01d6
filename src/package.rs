//! Case package entry points.
//!
//! [`build_case_package`] runs the whole flow for one intake: draft the
//! checklist with the model, normalise and render it, fill the reference
//! form, bundle everything, and summarise the result as a [`CaseRecord`].
//! [`assemble_package`] is the same flow minus the model call, for callers
//! that already have checklist text (or tests that must run offline).
//!
//! Rendering, filling and archiving are blocking CPU/disk work and run in
//! `spawn_blocking` so the async caller's executor stays responsive.

use crate::checklist::ChecklistDocument;
use crate::config::CasePackConfig;
use crate::error::CasePackError;
use crate::forms::FormSchema;
use crate::intake::CaseIntake;
use crate::output::{CasePackage, CaseRecord, PackageStats};
use crate::pipeline::archive::{self, ArchiveEntry};
use crate::pipeline::fill::{self, FillReport, FormFieldInfo};
use crate::pipeline::{input, llm, normalize, render};
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Build the complete case package for `intake`.
///
/// # Errors
/// Fatal errors only: invalid intake, no usable provider, the model call
/// failing after all retries, an unreadable template, or an unwritable
/// output directory. Unmatched form fields are reported in
/// [`CasePackage::fill_report`], not raised.
pub async fn build_case_package(
    intake: &CaseIntake,
    config: &CasePackConfig,
) -> Result<CasePackage, CasePackError> {
    let total_start = Instant::now();
    intake.validate()?;
    info!("Building case package for {}", intake.case_slug());

    // ── Step 1: Get/create provider ──────────────────────────────────────
    let provider = resolve_provider(config)?;

    // ── Step 2: Draft the checklist ──────────────────────────────────────
    let prompt = prompts::checklist_prompt(intake);
    debug!("Checklist prompt is {} chars", prompt.len());
    let draft = llm::draft_checklist(&provider, &prompt, config).await?;
    info!(
        "Checklist drafted in {}ms ({} retries)",
        draft.duration_ms, draft.retries
    );

    // ── Step 3: Everything downstream of the model ───────────────────────
    let mut package = assemble_package(intake, &draft.text, config).await?;
    package.stats.input_tokens = draft.input_tokens;
    package.stats.output_tokens = draft.output_tokens;
    package.stats.llm_retries = draft.retries;
    package.stats.llm_duration_ms = draft.duration_ms;
    package.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    Ok(package)
}

/// Synchronous wrapper around [`build_case_package`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_case_package_sync(
    intake: &CaseIntake,
    config: &CasePackConfig,
) -> Result<CasePackage, CasePackError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CasePackError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_case_package(intake, config))
}

/// Build a package from checklist text that is already in hand.
///
/// Does not require an LLM provider or API key.
pub async fn assemble_package(
    intake: &CaseIntake,
    raw_checklist: &str,
    config: &CasePackConfig,
) -> Result<CasePackage, CasePackError> {
    let start = Instant::now();
    intake.validate()?;
    let slug = intake.case_slug();
    let out_dir = config.output_dir.clone();

    // ── Step 1: Normalise ────────────────────────────────────────────────
    let checklist = normalize::normalize_checklist(raw_checklist, &config.normalize);
    let checklist_items = ChecklistDocument::from_text(&checklist).item_count();
    debug!(
        "Normalised checklist: {} -> {} bytes, {} items",
        raw_checklist.len(),
        checklist.len(),
        checklist_items
    );

    let txt_path = out_dir.join(format!("{slug}_checklist.txt"));
    write_text(&txt_path, &checklist).await?;

    // ── Step 2: Render the checklist PDF ─────────────────────────────────
    let pdf_path = out_dir.join(format!("{slug}_checklist.pdf"));
    let (checklist_pages, checklist_bytes) = {
        let text = checklist.clone();
        let path = pdf_path.clone();
        let layout = config.layout;
        run_blocking(move || {
            layout.validate()?;
            let pages = render::layout_checklist(&text, &layout);
            let pdf = render::write_pdf(&pages, &layout)?;
            pdf.write_to(&path)?;
            Ok((pages.len(), pdf.len()))
        })
        .await?
    };
    info!(
        "Checklist PDF: {} page(s) -> {}",
        checklist_pages,
        pdf_path.display()
    );

    // ── Step 3: Fill the reference form ──────────────────────────────────
    let mut filled: Option<(PathBuf, FillReport, &'static FormSchema)> = None;
    if let Some(template) = config.form_template.as_deref() {
        let schema = FormSchema::lookup(&config.form_id).ok_or_else(|| {
            CasePackError::InvalidConfig(format!("unknown form id '{}'", config.form_id))
        })?;
        let fields = schema.field_map(intake);
        let resolved = input::resolve_template(template, config.download_timeout_secs).await?;
        let form_path = out_dir.join(format!("{slug}_filled_{}.pdf", schema.id));

        let reference = resolved.path().to_path_buf();
        let dest = form_path.clone();
        let report =
            run_blocking(move || fill::fill_form_file(&reference, &dest, &fields)).await?;
        // Keeps a downloaded template alive until the fill has finished.
        drop(resolved);

        filled = Some((form_path, report, schema));
    }

    // ── Step 4: Archive ──────────────────────────────────────────────────
    let archive_path = if config.archive {
        let mut entries = vec![ArchiveEntry::new(&pdf_path, archive::CHECKLIST_ENTRY)];
        if let Some((form_path, _, schema)) = &filled {
            entries.push(ArchiveEntry::new(
                form_path,
                archive::form_entry_name(&schema.display_id()),
            ));
        }
        let dest = out_dir.join(format!("{slug}_case_package.tar.gz"));
        let path = run_blocking(move || archive::write_archive(&dest, &entries)).await?;
        info!("Case archive: {}", path.display());
        Some(path)
    } else {
        None
    };

    // ── Step 5: Record ───────────────────────────────────────────────────
    let (filled_form_path, fill_report) = match filled {
        Some((path, report, _)) => (Some(path), Some(report)),
        None => (None, None),
    };
    let record = CaseRecord::new(
        intake,
        raw_checklist,
        &pdf_path,
        filled_form_path.as_deref(),
    );

    let stats = PackageStats {
        checklist_pages,
        checklist_items,
        checklist_bytes,
        form_fields_filled: fill_report.as_ref().map_or(0, |r| r.filled.len()),
        total_duration_ms: start.elapsed().as_millis() as u64,
        ..Default::default()
    };

    Ok(CasePackage {
        slug,
        raw_checklist: raw_checklist.to_string(),
        checklist,
        checklist_txt_path: txt_path,
        checklist_pdf_path: pdf_path,
        filled_form_path,
        fill_report,
        archive_path,
        record,
        stats,
    })
}

/// List the widget fields of a template (path or URL).
///
/// Does not require an LLM provider or API key.
pub async fn inspect_template(
    template: &str,
    download_timeout_secs: u64,
) -> Result<Vec<FormFieldInfo>, CasePackError> {
    let resolved = input::resolve_template(template, download_timeout_secs).await?;
    let bytes = tokio::fs::read(resolved.path())
        .await
        .map_err(|e| CasePackError::InvalidTemplate {
            detail: format!("{}: {e}", resolved.path().display()),
        })?;
    fill::list_form_fields(&bytes)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_blocking<T, F>(f: F) -> Result<T, CasePackError>
where
    F: FnOnce() -> Result<T, CasePackError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CasePackError::Internal(format!("blocking task failed: {e}")))?
}

/// Atomic write: temp file, then rename.
async fn write_text(path: &Path, text: &str) -> Result<(), CasePackError> {
    let write_err = |source| CasePackError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, text).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, CasePackError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        CasePackError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Explicit provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`DEFAULT_MODEL`].
/// 3. **`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`** when both are set.
/// 4. **`OPENAI_API_KEY`**: OpenAI wins when its key is present, even if
///    other provider keys are set too.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &CasePackConfig) -> Result<Arc<dyn LLMProvider>, CasePackError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| CasePackError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
