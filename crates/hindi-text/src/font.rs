//! Font discovery
//!
//! Candidates are tried in order. A font that maps the Devanagari probe
//! characters wins; if none does, the first font that parses at all is used
//! so generation can continue (Devanagari may then show as empty boxes).

use crate::script::COVERAGE_PROBE;
use crate::{Result, TextError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A parsed font file held in memory
#[derive(Debug, Clone)]
pub struct LoadedFont {
    path: PathBuf,
    data: Arc<Vec<u8>>,
    covers_devanagari: bool,
}

impl LoadedFont {
    /// Load and validate a font file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        Self::from_bytes(data, path)
    }

    /// Validate font bytes; `path` is used for messages only
    pub fn from_bytes<P: AsRef<Path>>(data: Vec<u8>, path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| TextError::FontParseError(path.display().to_string(), e.to_string()))?;
        let covers_devanagari = COVERAGE_PROBE
            .iter()
            .all(|&c| face.glyph_index(c).is_some());

        Ok(Self {
            path,
            data: Arc::new(data),
            covers_devanagari,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw font bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the font maps the basic Devanagari letters and signs
    pub fn covers_devanagari(&self) -> bool {
        self.covers_devanagari
    }
}

/// Well-known locations of Unicode fonts with Devanagari coverage
///
/// Files next to the working directory come first, then Windows, Linux and
/// macOS install paths, then general-purpose fonts as a last resort.
pub fn default_font_candidates() -> Vec<PathBuf> {
    [
        "NotoSansDevanagari-Regular.ttf",
        "Nirmala.ttf",
        "mangal.ttf",
        "arialuni.ttf",
        r"C:\Windows\Fonts\Nirmala.ttf",
        r"C:\Windows\Fonts\mangal.ttf",
        r"C:\Windows\Fonts\arialuni.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansDevanagari-Regular.ttf",
        "/usr/share/fonts/opentype/noto/NotoSansDevanagari-Regular.ttf",
        "/usr/share/fonts/noto/NotoSansDevanagari-Regular.ttf",
        "/usr/share/fonts/google-noto/NotoSansDevanagari-Regular.ttf",
        "/usr/share/fonts/truetype/lohit-devanagari/Lohit-Devanagari.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
        "/System/Library/Fonts/Supplemental/Devanagari Sangam MN.ttc",
        "/Library/Fonts/Arial Unicode.ttf",
        r"C:\Windows\Fonts\arial.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

/// Pick the first usable font from an ordered candidate list
///
/// Returns `None` only when no candidate could be read and parsed.
pub fn discover_font(candidates: &[PathBuf]) -> Option<LoadedFont> {
    let mut fallback: Option<LoadedFont> = None;

    for path in candidates {
        if !path.is_file() {
            continue;
        }
        match LoadedFont::from_file(path) {
            Ok(font) if font.covers_devanagari() => {
                log::debug!("using font {}", path.display());
                return Some(font);
            }
            Ok(font) => {
                log::debug!("font {} has no Devanagari coverage", path.display());
                fallback.get_or_insert(font);
            }
            Err(e) => log::warn!("skipping font {}: {e}", path.display()),
        }
    }

    match &fallback {
        Some(font) => log::warn!(
            "no Devanagari font found; falling back to {} (Hindi may render as boxes)",
            font.path().display()
        ),
        None => log::warn!("no usable font found among {} candidates", candidates.len()),
    }
    fallback
}
