//! Merger: per-page results → one text, and the atomic output write.

use crate::config::{FailedPagePolicy, PipelineConfig};
use crate::error::Pdf2TxtError;
use crate::output::PageResult;
use std::path::Path;
use tracing::{info, warn};

/// Join page results in page order.
///
/// `results` must hold exactly pages `1..=expected`, sorted. Failed pages
/// follow [`PipelineConfig::on_page_failure`]; under `Abort` a failed page
/// here is an error (the dispatcher normally stops earlier).
pub fn merge_pages(
    results: &[PageResult],
    expected: usize,
    config: &PipelineConfig,
) -> Result<String, Pdf2TxtError> {
    if results.len() != expected {
        return Err(Pdf2TxtError::MergeFailed {
            detail: format!("expected {} pages, got {}", expected, results.len()),
        });
    }
    for (i, r) in results.iter().enumerate() {
        if r.page_num != i + 1 {
            return Err(Pdf2TxtError::MergeFailed {
                detail: format!("slot {} holds page {}", i + 1, r.page_num),
            });
        }
    }

    if expected > 0 && results.iter().all(|r| !r.is_ok()) {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_default();
        return Err(Pdf2TxtError::AllPagesFailed {
            total: expected,
            first_error,
        });
    }

    let mut body = String::new();
    let mut written = 0usize;
    for r in results {
        let segment = match (&r.error, config.on_page_failure) {
            (None, _) => r.text.trim_end_matches('\n').to_string(),
            (Some(e), FailedPagePolicy::Placeholder) => {
                warn!("Page {}: writing placeholder", r.page_num);
                format!("[page {}: {}]", r.page_num, e.reason())
            }
            (Some(_), FailedPagePolicy::Skip) => {
                warn!("Page {}: omitted from output", r.page_num);
                continue;
            }
            (Some(e), FailedPagePolicy::Abort) => {
                return Err(Pdf2TxtError::PageAborted { source: e.clone() });
            }
        };
        if written > 0 {
            body.push_str(&config.page_separator.render(r.page_num));
        }
        body.push_str(&segment);
        written += 1;
    }

    // Segments carry no trailing newlines, so a blank last page keeps its separator.
    let mut text = body;
    text.push('\n');
    info!("Merged {} of {} pages", written, expected);
    Ok(text)
}

/// Write `text` to `path` via a temporary sibling and a rename.
///
/// Parent directories are created as needed.
pub async fn write_atomic(path: &Path, text: &str) -> Result<(), Pdf2TxtError> {
    let write_err = |source| Pdf2TxtError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    tokio::fs::write(&tmp, text).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(write_err(e));
    }
    Ok(())
}
