//! Watermark compositor
//!
//! A watermark is a logo fitted (aspect kept) into a square box centered on
//! the page and faded one of two ways:
//! - native: the encoded image is embedded as is and painted through an
//!   ExtGState with `/ca` set to the opacity
//! - baked: every pixel's alpha is multiplied by the opacity before the
//!   bitmap is embedded, for viewers that ignore paint opacity
//!
//! In both modes the image's own transparency is kept as a soft mask, so a
//! logo on a transparent background never shows a box around it.

use crate::config::WatermarkMode;
use crate::Result;
use image::RgbaImage;
use pdf_core::{ImageOptions, Layer, PageSize, PdfDocument};
use std::sync::Arc;

/// Multiply every pixel's alpha by `factor`, truncating toward zero
///
/// Color channels are left alone and fully transparent pixels stay fully
/// transparent. `factor` is clamped to 0.0 - 1.0.
///
/// # Example
/// ```ignore
/// let mut img = RgbaImage::from_raw(3, 1, vec![9, 9, 9, 0, 9, 9, 9, 128, 9, 9, 9, 255]).unwrap();
/// scale_alpha(&mut img, 0.25);
/// // alphas are now 0, 32, 63
/// ```
pub fn scale_alpha(image: &mut RgbaImage, factor: f32) {
    let factor = factor.clamp(0.0, 1.0);
    for pixel in image.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * factor) as u8;
    }
}

/// Top-left corner of a `size` x `size` box centered on the page
pub fn centered_origin(page: PageSize, size: f64) -> (f64, f64) {
    ((page.width - size) / 2.0, (page.height - size) / 2.0)
}

#[derive(Debug, Clone)]
enum Source {
    Native { data: Arc<Vec<u8>>, opacity: f32 },
    Baked(RgbaImage),
}

/// A faded image ready to be stamped on pages
#[derive(Debug, Clone)]
pub struct Watermark {
    source: Source,
    size: f64,
    layer: Layer,
}

impl Watermark {
    /// Prepare a watermark from encoded image bytes (PNG or JPEG)
    ///
    /// Baked mode decodes the image here, once, so a watermark stamped on
    /// many pages is embedded once.
    pub fn new(data: Arc<Vec<u8>>, mode: WatermarkMode, opacity: f32, size: f64) -> Result<Self> {
        let source = match mode {
            WatermarkMode::Native => Source::Native { data, opacity },
            WatermarkMode::BakedAlpha => {
                let mut image = image::load_from_memory(&data)?.to_rgba8();
                scale_alpha(&mut image, opacity);
                Source::Baked(image)
            }
        };
        Ok(Self {
            source,
            size,
            layer: Layer::Foreground,
        })
    }

    /// Paint under (`true`) or over the existing page content
    pub fn behind(mut self, behind: bool) -> Self {
        self.layer = if behind {
            Layer::Background
        } else {
            Layer::Foreground
        };
        self
    }

    /// Side of the box the image is fitted into, in points
    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Stamp the watermark centered on a page
    pub fn apply(&self, doc: &mut PdfDocument, page: usize) -> Result<()> {
        let (x, y) = centered_origin(doc.page_size(page)?, self.size);
        self.draw(doc, page, x, y, self.size, self.size)
    }

    /// Draw the faded image fitted into an arbitrary box
    pub fn draw(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let options = ImageOptions::fit_box().with_layer(self.layer);
        match &self.source {
            Source::Native { data, opacity } => {
                let options = options.with_opacity(*opacity);
                doc.insert_image_with(data, page, x, y, width, height, &options)?;
            }
            Source::Baked(image) => {
                doc.insert_rgba_image(image, page, x, y, width, height, &options)?;
            }
        }
        Ok(())
    }
}
