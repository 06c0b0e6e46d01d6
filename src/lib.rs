//! # casepack
//!
//! Build an immigration case package from intake data: a model-drafted
//! document checklist rendered to PDF, the petition form filled from the
//! same intake, and a bundle of both with a serialisable case record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! CaseIntake
//!  │
//!  ├─ 1. Prompt     case facts → user prompt
//!  ├─ 2. Draft      model call with timeout + retry/backoff
//!  ├─ 3. Normalise  fold to printable ASCII, repair split words
//!  ├─ 4. Render     headings / checkbox items / prose → checklist PDF
//!  ├─ 5. Fill       FormSchema field map → reference form widgets
//!  ├─ 6. Archive    checklist + filled form → .tar.gz
//!  └─ 7. Record     CaseRecord for the intake database
//! ```
//!
//! The three document transforms (normalise, render, fill) are synchronous
//! and usable on their own; only the draft step needs a provider.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use casepack::{build_case_package, CaseIntake, CasePackConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let intake = CaseIntake::from_json(&std::fs::read_to_string("intake.json")?)?;
//!     let config = CasePackConfig::default();
//!     let package = build_case_package(&intake, &config).await?;
//!     println!("{}", package.checklist_pdf_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `casepack` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! casepack = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod checklist;
pub mod config;
pub mod error;
pub mod fonts;
pub mod forms;
pub mod intake;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use checklist::{ChecklistDocument, ChecklistLine};
pub use config::{CasePackConfig, CasePackConfigBuilder};
pub use error::CasePackError;
pub use forms::{FieldMap, FormSchema, IntakeField};
pub use intake::{CaseIntake, Person, Relationship, VisaType};
pub use output::{CasePackage, CaseRecord, PackageStats, RenderedPdf};
pub use package::{assemble_package, build_case_package, build_case_package_sync, inspect_template};
pub use pipeline::fill::{fill_form, fill_form_file, list_form_fields, FillReport, FilledForm, FormFieldInfo};
pub use pipeline::normalize::{normalize, normalize_checklist, NormalizeOptions};
pub use pipeline::render::{layout_checklist, render_checklist, render_checklist_to_file, PageLayout};
