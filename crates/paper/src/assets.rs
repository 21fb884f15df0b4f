//! Image files loaded once per run

use crate::{PaperError, Result};
use pdf_core::PdfError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only image bytes keyed by path
///
/// A file that cannot be read is remembered as missing, warned about once,
/// and every drawing step that needs it is skipped.
#[derive(Debug, Default)]
pub(crate) struct AssetCache {
    entries: HashMap<PathBuf, Option<Arc<Vec<u8>>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// File bytes, or `None` if the file is missing or unreadable
    pub fn get(&mut self, path: &Path) -> Option<Arc<Vec<u8>>> {
        self.entries
            .entry(path.to_path_buf())
            .or_insert_with(|| match std::fs::read(path) {
                Ok(data) => {
                    log::debug!("loaded image {} ({} bytes)", path.display(), data.len());
                    Some(Arc::new(data))
                }
                Err(e) => {
                    log::warn!("image {} not available, skipping it: {e}", path.display());
                    None
                }
            })
            .clone()
    }
}

/// Turn an image decoding failure into a warning
///
/// A logo that exists but cannot be decoded is treated like a missing one;
/// every other error is passed through.
pub(crate) fn skip_undecodable(result: Result<()>, path: &Path) -> Result<()> {
    match result {
        Err(PaperError::ImageError(e)) => {
            log::warn!("skipping image {}: {e}", path.display());
            Ok(())
        }
        Err(PaperError::PdfError(PdfError::ImageError(e))) => {
            log::warn!("skipping image {}: {e}", path.display());
            Ok(())
        }
        other => other,
    }
}
