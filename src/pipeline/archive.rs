//! Case archive: bundle the generated PDFs into one `.tar.gz`.
//!
//! Entries are added under fixed display names (e.g. `Checklist.pdf`), not
//! their on-disk slug names, so every package unpacks to the same layout.

use crate::error::CasePackError;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the checklist inside the archive.
pub const CHECKLIST_ENTRY: &str = "Checklist.pdf";

/// Name of the filled form inside the archive, e.g. `Filled_I130.pdf`.
pub fn form_entry_name(display_id: &str) -> String {
    format!("Filled_{display_id}.pdf")
}

/// One file to add: where it is now and what it is called in the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    pub name: String,
}

impl ArchiveEntry {
    pub fn new(source: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }
}

/// Write a gzip-compressed tarball at `dest` containing `entries`.
///
/// Written to a temp sibling and renamed, so `dest` is either complete or
/// absent.
pub fn write_archive(dest: &Path, entries: &[ArchiveEntry]) -> Result<PathBuf, CasePackError> {
    let fail = |source| CasePackError::ArchiveFailed {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }

    let tmp = dest.with_extension("gz.tmp");
    let result = (|| {
        let file = File::create(&tmp)?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for entry in entries {
            let mut src = File::open(&entry.source)?;
            builder.append_file(&entry.name, &mut src)?;
            debug!("Archived {} as {}", entry.source.display(), entry.name);
        }
        builder.into_inner()?.finish()?;
        std::fs::rename(&tmp, dest)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(fail(e));
    }
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tar::Archive;

    #[test]
    fn archive_contains_renamed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("john_smith_checklist.pdf");
        let b = dir.path().join("john_smith_filled_i-130.pdf");
        std::fs::write(&a, b"%PDF-checklist").unwrap();
        std::fs::write(&b, b"%PDF-form").unwrap();

        let dest = dir.path().join("pkg/case.tar.gz");
        write_archive(
            &dest,
            &[
                ArchiveEntry::new(&a, CHECKLIST_ENTRY),
                ArchiveEntry::new(&b, form_entry_name("I130")),
            ],
        )
        .unwrap();

        let mut archive = Archive::new(GzDecoder::new(File::open(&dest).unwrap()));
        let mut found = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut body = Vec::new();
            entry.read_to_end(&mut body).unwrap();
            found.push((name, body));
        }
        assert_eq!(
            found,
            vec![
                ("Checklist.pdf".to_string(), b"%PDF-checklist".to_vec()),
                ("Filled_I130.pdf".to_string(), b"%PDF-form".to_vec()),
            ]
        );
    }

    #[test]
    fn missing_source_fails_without_leaving_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("case.tar.gz");
        let err = write_archive(
            &dest,
            &[ArchiveEntry::new(dir.path().join("absent.pdf"), CHECKLIST_ENTRY)],
        )
        .unwrap_err();
        assert!(matches!(err, CasePackError::ArchiveFailed { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
