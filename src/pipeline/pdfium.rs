//! Binding to the pdfium shared library.
//!
//! pdfium is loaded once per process and shared behind an `Arc`.
//! `pdfium-render`'s `sync` feature makes `Pdfium` `Send + Sync`, which lets
//! the handle move into `spawn_blocking` closures and live inside
//! [`PdfiumSource`](super::source::PdfiumSource); `thread_safe` serialises
//! the calls into the library itself.

use crate::error::Pdf2TxtError;
use pdfium_render::prelude::Pdfium;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

static SHARED: OnceLock<Arc<Pdfium>> = OnceLock::new();

/// Return the process-wide pdfium handle, binding it on first use.
///
/// Resolution order for the first bind:
/// 1. `lib_path` when given (the CLI fills it from `PDFIUM_LIB_PATH`)
/// 2. a platform library in the current directory
/// 3. the system library search path
pub fn shared_pdfium(lib_path: Option<&Path>) -> Result<Arc<Pdfium>, Pdf2TxtError> {
    if let Some(pdfium) = SHARED.get() {
        return Ok(Arc::clone(pdfium));
    }

    let pdfium = Arc::new(bind(lib_path)?);
    // Lost races keep the first handle.
    let _ = SHARED.set(Arc::clone(&pdfium));
    Ok(SHARED.get().map(Arc::clone).unwrap_or(pdfium))
}

fn bind(lib_path: Option<&Path>) -> Result<Pdfium, Pdf2TxtError> {
    let bindings = match lib_path {
        Some(path) => {
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(path)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2TxtError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}
