//! Input resolution: normalise a user-supplied file or directory to one PDF.
//!
//! A directory is scanned in name order and the first `*.pdf` (case
//! insensitive) wins, so dropping a document into `input/` and running the
//! binary with no arguments works. The `%PDF` magic bytes are checked before
//! returning so callers get a meaningful error rather than a pdfium failure.

use crate::error::Pdf2TxtError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve `input` to the path of a readable PDF file.
pub fn resolve_input(input: &Path) -> Result<PathBuf, Pdf2TxtError> {
    if !input.exists() {
        return Err(Pdf2TxtError::FileNotFound {
            path: input.to_path_buf(),
        });
    }

    let path = if input.is_dir() {
        first_pdf_in(input)?
    } else {
        input.to_path_buf()
    };

    check_pdf_magic(&path)?;
    debug!("Resolved input PDF: {}", path.display());
    Ok(path)
}

/// Pick the first PDF in `dir`, sorted by file name.
fn first_pdf_in(dir: &Path) -> Result<PathBuf, Pdf2TxtError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2TxtError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => Pdf2TxtError::FileNotFound {
            path: dir.to_path_buf(),
        },
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && has_pdf_extension(p))
        .collect();
    pdfs.sort();

    pdfs.into_iter()
        .next()
        .ok_or_else(|| Pdf2TxtError::NoPdfInDirectory {
            dir: dir.to_path_buf(),
        })
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn check_pdf_magic(path: &Path) -> Result<(), Pdf2TxtError> {
    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2TxtError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Pdf2TxtError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(Pdf2TxtError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}
