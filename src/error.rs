//! Error types for the casepack library.
//!
//! A single fatal error type, [`CasePackError`], covers every stage. The
//! core transforms are deliberately forgiving about *content*: the
//! normaliser never fails, and the form filler treats unmatched field names
//! as a report entry ([`crate::pipeline::fill::FillReport`]) rather than an
//! error. What remains here are structural and environmental failures that
//! leave no sensible output to return.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the casepack library.
#[derive(Debug, Error)]
pub enum CasePackError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Reference form template was not found at the given path.
    #[error("Form template not found: '{path}'\nPass --form-template or --no-form.")]
    TemplateNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The configured template string is blank.
    #[error("Form template is empty\nPass a PDF path or an HTTP/HTTPS URL, or use --no-form.")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Intake data failed validation.
    #[error("Invalid intake: {0}")]
    InvalidIntake(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The reference document could not be parsed.
    #[error("Reference form is unreadable: {detail}")]
    InvalidTemplate { detail: String },

    /// The reference document has no page tree to walk.
    #[error("Reference form has no page tree: {detail}")]
    MissingPageTree { detail: String },

    /// lopdf failed to encode or serialise a document.
    #[error("Failed to serialise PDF: {detail}")]
    PdfWriteFailed { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API kept failing after all retries.
    #[error("LLM API error after {retries} retries: {message}")]
    LlmApiError { retries: u32, message: String },

    /// The model answered, but with nothing to render.
    #[error("LLM returned an empty checklist")]
    EmptyCompletion,

    /// A single model call exceeded the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not build the case package archive.
    #[error("Failed to build archive '{path}': {source}")]
    ArchiveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_api_error_display() {
        let e = CasePackError::LlmApiError {
            retries: 2,
            message: "503 Service Unavailable".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("2 retries"), "got: {msg}");
        assert!(msg.contains("503"), "got: {msg}");
    }

    #[test]
    fn template_not_found_mentions_escape_hatch() {
        let e = CasePackError::TemplateNotFound {
            path: PathBuf::from("forms/i-130_form.pdf"),
        };
        let msg = e.to_string();
        assert!(msg.contains("i-130_form.pdf"));
        assert!(msg.contains("--no-form"));
    }

    #[test]
    fn api_timeout_display() {
        let e = CasePackError::ApiTimeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = CasePackError::OutputWriteFailed {
            path: PathBuf::from("/readonly/out.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/readonly/out.pdf"));
    }
}
