//! Text painting
//!
//! Text the built-in Helvetica can encode is drawn as native PDF text.
//! Anything else (Devanagari, mixed Hindi/English lines) is shaped and
//! rasterized by `hindi-text` and placed as a transparent bitmap, aligned on
//! its ink box and sitting on the requested baseline.
//!
//! The rasterizer font is only discovered the first time such text shows
//! up. If no usable font exists the text falls back to Helvetica with a
//! warning; generation never stops over fonts.

use crate::config::FontConfig;
use crate::Result;
use hindi_text::{discover_font, GlyphRun, TextRasterizer};
use pdf_core::{is_win_ansi_encodable, Align, BuiltinFont, Color, ImageOptions, PdfDocument};
use std::cell::OnceCell;

/// A line of text anchored on a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedText<'a> {
    pub text: &'a str,
    pub x: f64,
    /// Baseline, in points from the top of the page
    pub y: f64,
    pub size: f32,
    pub bold: bool,
    pub color: Color,
    pub align: Align,
}

/// Draws text natively or through the shaping rasterizer
pub struct TextPainter {
    fonts: FontConfig,
    rasterizer: OnceCell<Option<TextRasterizer>>,
}

impl TextPainter {
    /// Painter that discovers its font on first use
    pub fn new(fonts: &FontConfig) -> Self {
        Self {
            fonts: fonts.clone(),
            rasterizer: OnceCell::new(),
        }
    }

    /// Painter with a fixed rasterizer, or none to force native text
    pub fn with_rasterizer(rasterizer: Option<TextRasterizer>) -> Self {
        Self {
            fonts: FontConfig::default(),
            rasterizer: OnceCell::from(rasterizer),
        }
    }

    /// Whether `text` has to go through the rasterizer
    pub fn needs_bitmap(text: &str) -> bool {
        !is_win_ansi_encodable(text)
    }

    fn rasterizer(&self) -> Option<&TextRasterizer> {
        self.rasterizer
            .get_or_init(|| self.load_rasterizer())
            .as_ref()
    }

    fn load_rasterizer(&self) -> Option<TextRasterizer> {
        let font = discover_font(&self.fonts.candidates)?;
        match TextRasterizer::new(font, self.fonts.supersample) {
            Ok(rasterizer) => Some(rasterizer),
            Err(e) => {
                log::warn!("cannot rasterize text, using Helvetica instead: {e}");
                None
            }
        }
    }

    /// Draw one line of text
    pub fn draw(&self, doc: &mut PdfDocument, page: usize, placed: &PlacedText<'_>) -> Result<()> {
        if placed.text.trim().is_empty() {
            return Ok(());
        }
        if !Self::needs_bitmap(placed.text) {
            return self.draw_native(doc, page, placed);
        }

        let Some(rasterizer) = self.rasterizer() else {
            log::warn!("no font available for {:?}; drawing with Helvetica", placed.text);
            return self.draw_native(doc, page, placed);
        };

        let run = GlyphRun::new(placed.text, placed.size).with_color(placed.color.to_rgb8());
        let raster = match rasterizer.rasterize(&run) {
            Ok(raster) => raster,
            Err(e) => {
                log::warn!("rasterizing {:?} failed, using Helvetica: {e}", placed.text);
                return self.draw_native(doc, page, placed);
            }
        };

        let ink_width = raster.ink_width_px() as f64 * raster.point_scale;
        let padding = raster.padding as f64 * raster.point_scale;
        let left = placed.x + placed.align.shift(ink_width) - padding;
        let top = raster.top_for_baseline(placed.y);
        doc.insert_rgba_image(
            &raster.image,
            page,
            left,
            top,
            raster.width_pt(),
            raster.height_pt(),
            &ImageOptions::default(),
        )?;
        Ok(())
    }

    fn draw_native(&self, doc: &mut PdfDocument, page: usize, placed: &PlacedText<'_>) -> Result<()> {
        doc.set_font(BuiltinFont::with_weight(placed.bold), placed.size);
        doc.set_text_color(placed.color);
        doc.insert_text(placed.text, page, placed.x, placed.y, placed.align)?;
        Ok(())
    }
}
