//! Hindi Text - Devanagari text handling for PDF output
//!
//! The built-in PDF fonts cannot show Devanagari, and a glyph-by-glyph text
//! operator cannot place matras or build conjuncts. This crate provides:
//! - Script detection helpers
//! - A short-i matra reorder transform for naive glyph-by-glyph drawing
//! - Font discovery over an ordered list of candidate files
//! - A shaping rasterizer that turns a glyph run into a transparent bitmap
//!
//! # Example
//!
//! ```ignore
//! use hindi_text::{default_font_candidates, discover_font, GlyphRun, TextRasterizer};
//!
//! let font = discover_font(&default_font_candidates()).expect("no usable font");
//! let rasterizer = TextRasterizer::new(font, 4)?;
//! let text = rasterizer.rasterize(&GlyphRun::new("गणित - भाग 2", 12.0))?;
//! println!("{} x {} pt", text.width_pt(), text.height_pt());
//! ```

mod font;
mod raster;
mod reorder;
mod script;

pub use font::{default_font_candidates, discover_font, LoadedFont};
pub use raster::{GlyphRun, RasterizedText, TextRasterizer, DEFAULT_SUPERSAMPLE};
pub use reorder::{reorder_short_i, ShortIText, VisualText};
pub use script::{is_devanagari_char, VOWEL_SIGN_I};

use thiserror::Error;

/// Errors that can occur during text processing
#[derive(Debug, Error)]
pub enum TextError {
    #[error("Failed to parse font {0}: {1}")]
    FontParseError(String, String),

    #[error("Invalid supersample factor: {0} (expected 1-8)")]
    InvalidSupersample(u32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for text operations
pub type Result<T> = std::result::Result<T, TextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_reexport() {
        assert_eq!(reorder_short_i("कि").to_string(), "\u{093F}क");
    }

    #[test]
    fn test_error_display() {
        let err = TextError::InvalidSupersample(0);
        assert_eq!(err.to_string(), "Invalid supersample factor: 0 (expected 1-8)");
    }
}
