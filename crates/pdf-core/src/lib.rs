//! PDF Core - page canvas over lopdf
//!
//! This crate provides functionality for:
//! - Opening existing PDF documents and creating blank A4 documents
//! - Drawing rectangles, rounded boxes, lines and circles
//! - Drawing text with the built-in Helvetica faces
//! - Inserting images (JPEG, PNG, raw RGBA) with transparency preserved
//! - Painting at reduced opacity, behind or above existing page content
//! - Saving to a new file (the source file is never written)
//!
//! All coordinates are in points with the origin at the top-left corner of the
//! page. Drawing calls are buffered per page in call order and flushed on save,
//! so paint order is exactly call order.
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, BuiltinFont, Color, PdfDocument};
//!
//! let mut doc = PdfDocument::open("paper.pdf")?;
//! doc.set_font(BuiltinFont::Helvetica, 9.0);
//! doc.set_text_color(Color::blue());
//! doc.insert_text("https://example.com", 1, 565.0, 811.0, Align::Right)?;
//! doc.save("BRANDED_paper.pdf")?;
//! ```

mod document;
mod font;
mod graphics;
mod image;
mod text;

pub use document::{Color, ImageOptions, Layer, PageSize, PdfDocument};
pub use font::{encode_win_ansi, is_win_ansi_encodable, BuiltinFont};
pub use graphics::{Corners, ShapeStyle};
pub use image::{place_in_box, ColorSpace, ImageFilter, ImageFit, ImageXObject, Placement};
pub use text::{generate_text_operators, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Refusing to overwrite the source document: {0}")]
    SourceOverwrite(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
///
/// For a horizontal anchor `x`, `Left` draws from `x`, `Center` shifts left by
/// half the measured width and `Right` by the full width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Offset to add to an anchor X so content of `width` lands aligned
    pub fn shift(self, width: f64) -> f64 {
        match self {
            Align::Left => 0.0,
            Align::Center => -width / 2.0,
            Align::Right => -width,
        }
    }
}

/// Format a number for a content stream (at most 3 decimals, no trailing zeros)
pub(crate) fn num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_default() {
        assert_eq!(Align::default(), Align::Left);
    }

    #[test]
    fn test_align_shift() {
        assert_eq!(Align::Left.shift(80.0), 0.0);
        assert_eq!(Align::Center.shift(80.0), -40.0);
        assert_eq!(Align::Right.shift(80.0), -80.0);
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(100.0), "100");
        assert_eq!(num(595.28), "595.28");
        assert_eq!(num(0.33333), "0.333");
        assert_eq!(num(-0.0), "0");
        assert_eq!(num(-12.5), "-12.5");
    }

    #[test]
    fn test_pdf_error_display() {
        let err = PdfError::InvalidPage(5, 2);
        assert_eq!(
            err.to_string(),
            "Invalid page number: 5 (document has 2 pages)"
        );
    }
}
