//! Working-directory layout and per-page artifacts.
//!
//! ```text
//! <root>/
//!   pages/page_001.pdf   single-page PDFs written by the splitter
//!   raw/page_001.txt     extracted or OCR'd text
//!   clean/page_001.txt   LLM-cleaned text
//! ```
//!
//! Artifacts are plain UTF-8 files. With `resume` enabled, an artifact that
//! already exists is read back instead of recomputed.

use crate::error::{PageError, Pdf2TxtError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// One page of the source document, materialised as a single-page PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFile {
    /// 0-based position in the source document.
    pub index: usize,
    pub path: PathBuf,
}

impl PageFile {
    /// The page file for `index` inside `pages_dir`.
    pub fn new(index: usize, pages_dir: &Path) -> Self {
        Self {
            index,
            path: pages_dir.join(format!("{}.pdf", page_stem(index))),
        }
    }

    /// 1-indexed page number.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }

    pub fn stem(&self) -> String {
        page_stem(self.index)
    }
}

/// `page_001` for index 0.
pub fn page_stem(index: usize) -> String {
    format!("page_{:03}", index + 1)
}

/// Which artifact of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Raw,
    Clean,
}

/// Root of a run's working files.
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
    _temp: Option<TempDir>,
}

impl WorkDir {
    /// Use (and create) a persistent directory.
    pub fn persistent(root: impl Into<PathBuf>) -> Result<Self, Pdf2TxtError> {
        let dir = Self {
            root: root.into(),
            _temp: None,
        };
        dir.create_layout()?;
        Ok(dir)
    }

    /// Use a fresh temporary directory, removed when this value is dropped.
    pub fn temporary() -> Result<Self, Pdf2TxtError> {
        let temp = TempDir::new().map_err(|e| Pdf2TxtError::WorkDirFailed {
            path: std::env::temp_dir(),
            source: e,
        })?;
        let dir = Self {
            root: temp.path().to_path_buf(),
            _temp: Some(temp),
        };
        dir.create_layout()?;
        Ok(dir)
    }

    fn create_layout(&self) -> Result<(), Pdf2TxtError> {
        for dir in [self.pages_dir(), self.raw_dir(), self.clean_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| Pdf2TxtError::WorkDirFailed { path: dir, source: e })?;
        }
        debug!("Working directory ready: {}", self.root.display());
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join("pages")
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn clean_dir(&self) -> PathBuf {
        self.root.join("clean")
    }

    /// Path of a page's artifact.
    pub fn artifact_path(&self, page: &PageFile, kind: Artifact) -> PathBuf {
        let dir = match kind {
            Artifact::Raw => self.raw_dir(),
            Artifact::Clean => self.clean_dir(),
        };
        dir.join(format!("{}.txt", page.stem()))
    }

    /// Read an artifact back, or `None` when it does not exist.
    pub async fn read_artifact(
        &self,
        page: &PageFile,
        kind: Artifact,
    ) -> Result<Option<String>, PageError> {
        let path = self.artifact_path(page, kind);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PageError::ArtifactIo {
                page: page.page_num(),
                detail: format!("{}: {}", path.display(), e),
            }),
        }
    }

    /// Write an artifact, replacing any previous content.
    pub async fn write_artifact(
        &self,
        page: &PageFile,
        kind: Artifact,
        text: &str,
    ) -> Result<(), PageError> {
        let path = self.artifact_path(page, kind);
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| PageError::ArtifactIo {
                page: page.page_num(),
                detail: format!("{}: {}", path.display(), e),
            })
    }

    /// Single-page files from an earlier split, if exactly `count` are present.
    pub fn existing_pages(&self, count: usize) -> Option<Vec<PageFile>> {
        let pages_dir = self.pages_dir();
        let pages: Vec<PageFile> = (0..count).map(|i| PageFile::new(i, &pages_dir)).collect();
        let beyond = PageFile::new(count, &pages_dir);
        (count > 0 && pages.iter().all(|p| p.path.is_file()) && !beyond.path.exists())
            .then_some(pages)
    }
}
