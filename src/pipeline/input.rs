//! Template resolution: turn a configured form template path or URL into a
//! local file.
//!
//! A URL is downloaded into a `TempDir` that lives as long as the returned
//! [`ResolvedTemplate`], so the file is cleaned up automatically once the
//! fill is done. The `%PDF` magic is checked up front so a mistyped path
//! or an HTML error page fails with a clear message instead of a parser error.

use crate::error::CasePackError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A template ready to be read from disk.
#[derive(Debug)]
pub enum ResolvedTemplate {
    /// Template was already a local file.
    Local(PathBuf),
    /// Template was a URL; the `TempDir` keeps the download alive.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedTemplate {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedTemplate::Local(p) => p,
            ResolvedTemplate::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a template path or URL to a local PDF file.
pub async fn resolve_template(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedTemplate, CasePackError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CasePackError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedTemplate, CasePackError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(CasePackError::TemplateNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(CasePackError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CasePackError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(CasePackError::TemplateNotFound { path });
        }
    }

    debug!("Resolved local template: {}", path.display());
    Ok(ResolvedTemplate::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedTemplate, CasePackError> {
    info!("Downloading form template from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CasePackError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CasePackError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CasePackError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(CasePackError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CasePackError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let temp_dir = TempDir::new().map_err(|e| CasePackError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(extract_filename(url));

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(CasePackError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| CasePackError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedTemplate::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn extract_filename(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let last = parsed.path_segments()?.next_back()?.to_string();
            Some(last)
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "template.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://www.uscis.gov/sites/default/files/document/forms/i-130.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("forms/i-130_form.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(
            extract_filename("https://www.uscis.gov/forms/i-130.pdf"),
            "i-130.pdf"
        );
        assert_eq!(extract_filename("https://example.com/forms/"), "template.pdf");
        assert_eq!(extract_filename("https://example.com/download"), "template.pdf");
    }

    #[tokio::test]
    async fn test_missing_local_template() {
        let err = resolve_template("no/such/i-130.pdf", 5).await.unwrap_err();
        assert!(matches!(err, CasePackError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_template(dir.path().to_str().unwrap(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CasePackError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_non_pdf_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.pdf");
        std::fs::write(&path, b"<html>not found</html>").unwrap();
        let err = resolve_template(path.to_str().unwrap(), 5).await.unwrap_err();
        match err {
            CasePackError::NotAPdf { magic, .. } => assert_eq!(&magic, b"<htm"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_pdf_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%%EOF\n").unwrap();
        let resolved = resolve_template(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), path.as_path());
        assert!(format!("{resolved:?}").starts_with("Local("));
    }

    #[tokio::test]
    async fn test_blank_input_is_invalid() {
        let err = resolve_template("   ", 5).await.unwrap_err();
        assert!(matches!(err, CasePackError::InvalidInput { .. }));
        assert!(err.to_string().starts_with("Form template is empty"));
    }
}
