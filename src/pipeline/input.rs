//! Input discovery and validation.
//!
//! A batch is every `*.pdf` directly inside the input directory (no
//! recursion; the extension match ignores case), processed in file-name
//! order. Each file's magic bytes (`%PDF`) are checked before pdfium sees it,
//! so callers get a meaningful error rather than a pdfium crash.

use crate::error::ScheduleError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// List the PDFs directly inside `dir`, sorted by path.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, ScheduleError> {
    let unreadable = |source| ScheduleError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_file() && has_pdf_extension(&path) {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    debug!("Found {} PDF(s) in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// True for `.pdf` in any letter case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Check that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf(path: &Path) -> Result<(), ScheduleError> {
    if !path.exists() {
        return Err(ScheduleError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ScheduleError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ScheduleError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ScheduleError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Validated PDF: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_pdf_extension(Path::new("a.pdf")));
        assert!(has_pdf_extension(Path::new("B.PDF")));
        assert!(has_pdf_extension(Path::new("c.Pdf")));
        assert!(!has_pdf_extension(Path::new("d.pdf.txt")));
        assert!(!has_pdf_extension(Path::new("pdf")));
    }

    #[test]
    fn discovery_is_sorted_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("A.PDF"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.pdf"), b"%PDF-1.4").unwrap();

        let found = discover_pdfs(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }

    #[test]
    fn missing_directory_is_reported() {
        let err = discover_pdfs(Path::new("/nonexistent/input")).unwrap_err();
        assert!(matches!(err, ScheduleError::InputDirUnreadable { .. }));
    }

    #[test]
    fn validate_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake.pdf");
        std::fs::write(&fake, b"PK\x03\x04zip").unwrap();
        assert!(matches!(
            validate_pdf(&fake),
            Err(ScheduleError::NotAPdf { magic, .. }) if &magic == b"PK\x03\x04"
        ));
    }

    #[test]
    fn validate_accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok.pdf");
        std::fs::write(&ok, b"%PDF-1.7\n").unwrap();
        assert!(validate_pdf(&ok).is_ok());
    }

    #[test]
    fn validate_missing_file() {
        assert!(matches!(
            validate_pdf(Path::new("/nonexistent/x.pdf")),
            Err(ScheduleError::FileNotFound { .. })
        ));
    }
}
