//! Paper - exam paper generation and PDF branding
//!
//! This crate provides:
//! - `PressConfig`, the single configuration value every run is driven by
//! - The watermark compositor (native opacity or baked alpha)
//! - The branding pass over existing PDFs (watermark, logos, footer)
//! - Exam paper generation from a JSON description of regions
//! - A static HTML rendition of the same paper for browser printing
//!
//! Text the built-in PDF font can encode is drawn as native text; anything
//! else (Devanagari) goes through the shaping rasterizer of `hindi-text`.
//!
//! # Example
//!
//! ```ignore
//! use paper::{brand_batch, render_paper, ExamPaper, PressConfig};
//!
//! let config = PressConfig::load("press.json")?;
//! let exam = ExamPaper::load("class1_maths.json")?;
//! render_paper(&exam, &config)?.save("Class_1_Exam.pdf")?;
//!
//! let report = brand_batch(&config, &["Maths Class 1.pdf".into()]);
//! println!("{} branded, {} skipped", report.branded.len(), report.skipped.len());
//! ```

mod assets;
pub mod branding;
pub mod config;
pub mod html;
pub mod layout;
mod painter;
mod renderer;
pub mod schema;
pub mod watermark;

pub use branding::{brand_batch, brand_file, output_path_for, BatchReport, Brander};
pub use config::{LogoPages, PressConfig, WatermarkMode};
pub use html::{render_html, write_html};
pub use layout::{draw_region, plan_paper, DrawOp};
pub use painter::{PlacedText, TextPainter};
pub use renderer::{render_paper, PaperRenderer};
pub use schema::{ExamPaper, Notes, PaperPage, Region, RegionContent, TextAlign};
pub use watermark::{scale_alpha, Watermark};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while generating or branding papers
#[derive(Debug, Error)]
pub enum PaperError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid paper: {0}")]
    InvalidPaper(String),

    #[error("Source document not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),

    #[error("Text error: {0}")]
    TextError(#[from] hindi_text::TextError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for paper operations
pub type Result<T> = std::result::Result<T, PaperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PaperError::MissingSource(PathBuf::from("Class 1.pdf"));
        assert_eq!(err.to_string(), "Source document not found: Class 1.pdf");

        let err = PaperError::from(pdf_core::PdfError::InvalidPage(3, 2));
        assert!(err.to_string().starts_with("PDF error: Invalid page number: 3"));
    }
}
