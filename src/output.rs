//! Output types: rendered documents, the case package and its record.

use crate::error::CasePackError;
use crate::intake::CaseIntake;
use crate::pipeline::fill::FillReport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest checklist excerpt stored in a [`CaseRecord`], in characters.
pub const RECORD_CHECKLIST_CHARS: usize = 900;

/// Storage bucket the case files are destined for.
pub const CASE_BUCKET_ID: &str = "casefiles";

/// A fully serialised PDF held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedPdf(Vec<u8>);

impl RenderedPdf {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write the document to `path`, creating parent directories.
    ///
    /// Writes to a sibling temp file first and renames it into place, so a
    /// reader never sees a half-written PDF.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), CasePackError> {
        let path = path.as_ref();
        let write_err = |source| CasePackError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = path.with_extension("pdf.tmp");
        std::fs::write(&tmp, &self.0).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            write_err(source)
        })
    }
}

impl std::fmt::Debug for RenderedPdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RenderedPdf({} bytes)", self.0.len())
    }
}

/// Summary statistics for one package build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageStats {
    /// Tokens sent to the model (0 when the checklist was supplied).
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub llm_retries: u32,
    pub llm_duration_ms: u64,
    pub checklist_pages: usize,
    pub checklist_items: usize,
    pub checklist_bytes: usize,
    pub form_fields_filled: usize,
    pub total_duration_ms: u64,
}

/// The row an intake database keeps for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub petitioner_name: String,
    pub beneficiary_name: String,
    pub relationship: String,
    pub visa_type: String,
    /// First 900 characters of the raw checklist on a single line.
    pub checklist_text: String,
    pub pdf_path: String,
    pub form_path: String,
    /// Filled in by whatever uploads the checklist text; empty here.
    pub checklist_txt_url: String,
    pub bucket_id: String,
}

impl CaseRecord {
    pub fn new(
        intake: &CaseIntake,
        raw_checklist: &str,
        pdf_path: &Path,
        form_path: Option<&Path>,
    ) -> Self {
        Self {
            petitioner_name: intake.petitioner.full_name(),
            beneficiary_name: intake.beneficiary.full_name(),
            relationship: intake.relationship.to_string(),
            visa_type: intake.visa_type.to_string(),
            checklist_text: record_excerpt(raw_checklist),
            pdf_path: forward_slashes(pdf_path),
            form_path: form_path.map(forward_slashes).unwrap_or_default(),
            checklist_txt_url: String::new(),
            bucket_id: CASE_BUCKET_ID.to_string(),
        }
    }
}

/// Flatten line breaks and non-breaking spaces, trim, and keep the first
/// [`RECORD_CHECKLIST_CHARS`] characters.
fn record_excerpt(raw: &str) -> String {
    raw.replace('\n', " ")
        .replace('\u{a0}', " ")
        .trim()
        .chars()
        .take(RECORD_CHECKLIST_CHARS)
        .collect()
}

fn forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").trim().to_string()
}

/// Everything produced for one case.
#[derive(Debug, Clone, Serialize)]
pub struct CasePackage {
    pub slug: String,
    /// Completion exactly as the model returned it.
    pub raw_checklist: String,
    /// Text the PDF was rendered from.
    pub checklist: String,
    pub checklist_txt_path: PathBuf,
    pub checklist_pdf_path: PathBuf,
    /// `None` when no form template was configured.
    pub filled_form_path: Option<PathBuf>,
    pub fill_report: Option<FillReport>,
    /// `None` when archiving is disabled.
    pub archive_path: Option<PathBuf>,
    pub record: CaseRecord,
    pub stats: PackageStats,
}
