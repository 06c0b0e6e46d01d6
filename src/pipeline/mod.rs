//! Pipeline stages for building a case package.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! llm ──▶ normalize ──▶ render ──▶ checklist PDF
//! (draft)  (ASCII fold)  (lopdf)
//!
//! input ──▶ fill ──▶ filled form PDF ──▶ archive
//! (template) (lopdf)                     (tar.gz)
//! ```
//!
//! 1. [`llm`]: the model call with timeout and retry/backoff; the only
//!    stage with network I/O besides template download
//! 2. [`normalize`]: fold the completion into text the standard fonts can show
//! 3. [`render`]: classify lines, lay them out and write the checklist PDF;
//!    CPU-bound, so the orchestrator runs it in `spawn_blocking`
//! 4. [`input`]: resolve the form template path or URL to a local file
//! 5. [`fill`]: write field values into the template's widgets
//! 6. [`archive`]: bundle the PDFs into one compressed tarball

pub mod archive;
pub mod fill;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod render;
