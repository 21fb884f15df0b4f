//! Shaping rasterizer
//!
//! A glyph run is shaped with rustybuzz (which builds conjuncts and places
//! matras), the shaped glyph outlines are drawn with ab_glyph at a
//! supersampled pixel size, and the result is a transparent RGBA bitmap that
//! can be placed on a page as an image scaled back down to point size.

use crate::font::LoadedFont;
use crate::{Result, TextError};
use ab_glyph::{point, Font, FontRef, GlyphId, OutlinedGlyph, PxScale};
use image::{Rgba, RgbaImage};
use rustybuzz::UnicodeBuffer;

/// Pixels rendered per point
pub const DEFAULT_SUPERSAMPLE: u32 = 4;

/// Transparent margin around the ink, in points
const PADDING_PT: u32 = 2;

/// A string to draw at one size and color
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun<'a> {
    pub text: &'a str,
    /// Font size in points
    pub size: f32,
    pub color: [u8; 3],
    /// Shrink the bitmap to this width in points if it comes out wider
    pub max_width: Option<f64>,
}

impl<'a> GlyphRun<'a> {
    /// Black text with no width limit
    pub fn new(text: &'a str, size: f32) -> Self {
        Self {
            text,
            size,
            color: [0, 0, 0],
            max_width: None,
        }
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn with_max_width(mut self, max_width: f64) -> Self {
        self.max_width = Some(max_width);
        self
    }
}

/// A rendered glyph run
#[derive(Debug, Clone)]
pub struct RasterizedText {
    /// Transparent bitmap; pixels without ink have alpha 0
    pub image: RgbaImage,
    /// Transparent margin on every side, in pixels
    pub padding: u32,
    /// Points per pixel when placed on a page
    pub point_scale: f64,
    /// Distance from the top edge of the bitmap to the baseline, in pixels
    pub baseline_px: f64,
}

impl RasterizedText {
    /// Placed width in points
    pub fn width_pt(&self) -> f64 {
        self.image.width() as f64 * self.point_scale
    }

    /// Placed height in points
    pub fn height_pt(&self) -> f64 {
        self.image.height() as f64 * self.point_scale
    }

    /// Width of the ink bounding box in pixels (padding excluded)
    pub fn ink_width_px(&self) -> u32 {
        self.image.width().saturating_sub(2 * self.padding)
    }

    /// Distance from the top edge to the baseline, in points
    pub fn baseline_pt(&self) -> f64 {
        self.baseline_px * self.point_scale
    }

    /// Top edge Y for a bitmap whose baseline must sit at `baseline_y`
    pub fn top_for_baseline(&self, baseline_y: f64) -> f64 {
        baseline_y - self.baseline_pt()
    }
}

/// Renders glyph runs with one font
#[derive(Debug, Clone)]
pub struct TextRasterizer {
    font: LoadedFont,
    supersample: u32,
}

impl TextRasterizer {
    /// Create a rasterizer; the font must be usable by both shaper and renderer
    pub fn new(font: LoadedFont, supersample: u32) -> Result<Self> {
        if !(1..=8).contains(&supersample) {
            return Err(TextError::InvalidSupersample(supersample));
        }
        let rasterizer = Self { font, supersample };
        rasterizer.shaping_face()?;
        rasterizer.outline_font()?;
        Ok(rasterizer)
    }

    pub fn font(&self) -> &LoadedFont {
        &self.font
    }

    pub fn supersample(&self) -> u32 {
        self.supersample
    }

    fn parse_error(&self, detail: &str) -> TextError {
        TextError::FontParseError(self.font.path().display().to_string(), detail.to_string())
    }

    fn shaping_face(&self) -> Result<rustybuzz::Face<'_>> {
        rustybuzz::Face::from_slice(self.font.data(), 0)
            .ok_or_else(|| self.parse_error("not usable for shaping"))
    }

    fn outline_font(&self) -> Result<FontRef<'_>> {
        FontRef::try_from_slice(self.font.data()).map_err(|e| self.parse_error(&e.to_string()))
    }

    /// Shape and render a glyph run
    ///
    /// The bitmap is sized to the ink bounding box plus padding. A run with
    /// no ink (spaces only) yields a transparent bitmap one line high and one
    /// advance wide.
    pub fn rasterize(&self, run: &GlyphRun<'_>) -> Result<RasterizedText> {
        let face = self.shaping_face()?;
        let font = self.outline_font()?;

        let units_per_em = face.units_per_em() as f32;
        let px_per_em = run.size.max(0.0) * self.supersample as f32;
        let px_per_unit = px_per_em / units_per_em;
        // ab_glyph scales by font height (ascent - descent), not by em
        let scale = PxScale::from(px_per_em * font.height_unscaled() / units_per_em);

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(run.text);
        buffer.guess_segment_properties();
        let shaped = rustybuzz::shape(&face, &[], buffer);

        let mut outlines: Vec<OutlinedGlyph> = Vec::new();
        let mut missing = 0usize;
        let mut pen_x = 0.0f32;
        for (info, pos) in shaped.glyph_infos().iter().zip(shaped.glyph_positions()) {
            if info.glyph_id == 0 {
                missing += 1;
            }
            let x = pen_x + pos.x_offset as f32 * px_per_unit;
            let y = -(pos.y_offset as f32) * px_per_unit;
            let glyph = GlyphId(info.glyph_id as u16).with_scale_and_position(scale, point(x, y));
            if let Some(outlined) = font.outline_glyph(glyph) {
                outlines.push(outlined);
            }
            pen_x += pos.x_advance as f32 * px_per_unit;
        }
        if missing > 0 {
            log::warn!(
                "font {} has no glyph for {missing} character(s) of {:?}",
                self.font.path().display(),
                run.text
            );
        }

        let padding = PADDING_PT * self.supersample;
        let ascent = font.ascent_unscaled() * px_per_unit;
        let descent = font.descent_unscaled() * px_per_unit;
        let (min_x, min_y, max_x, max_y) = ink_bounds(&outlines)
            .unwrap_or((0.0, -ascent.ceil(), pen_x.ceil().max(1.0), -descent.floor()));

        let width = (max_x - min_x).max(1.0) as u32 + 2 * padding;
        let height = (max_y - min_y).max(1.0) as u32 + 2 * padding;
        let mut image = RgbaImage::new(width, height);

        let offset_x = padding as f32 - min_x;
        let offset_y = padding as f32 - min_y;
        for outlined in &outlines {
            let bounds = outlined.px_bounds();
            let left = bounds.min.x + offset_x;
            let top = bounds.min.y + offset_y;
            outlined.draw(|gx, gy, coverage| {
                let px = left as i64 + gx as i64;
                let py = top as i64 + gy as i64;
                if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                    let pixel = image.get_pixel_mut(px as u32, py as u32);
                    *pixel = blend_coverage(*pixel, run.color, coverage);
                }
            });
        }

        let mut point_scale = 1.0 / self.supersample as f64;
        if let Some(max_width) = run.max_width {
            let natural = width as f64 * point_scale;
            if max_width > 0.0 && natural > max_width {
                point_scale *= max_width / natural;
            }
        }

        Ok(RasterizedText {
            image,
            padding,
            point_scale,
            baseline_px: offset_y as f64,
        })
    }
}

/// Whole-pixel bounding box of all outlines, baseline at y = 0
fn ink_bounds(outlines: &[OutlinedGlyph]) -> Option<(f32, f32, f32, f32)> {
    outlines.iter().map(|o| o.px_bounds()).fold(None, |acc, b| {
        let (min_x, min_y, max_x, max_y) = acc.unwrap_or((b.min.x, b.min.y, b.max.x, b.max.y));
        Some((
            min_x.min(b.min.x).floor(),
            min_y.min(b.min.y).floor(),
            max_x.max(b.max.x).ceil(),
            max_y.max(b.max.y).ceil(),
        ))
    })
}

/// Composite glyph coverage over a pixel in the run color
///
/// Pixels that receive no coverage stay fully transparent.
fn blend_coverage(pixel: Rgba<u8>, color: [u8; 3], coverage: f32) -> Rgba<u8> {
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage == 0.0 {
        return pixel;
    }
    let existing = pixel[3] as f32 / 255.0;
    let alpha = ((existing + coverage * (1.0 - existing)) * 255.0).round() as u8;
    if alpha == 0 {
        return pixel;
    }
    Rgba([color[0], color[1], color[2], alpha])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_zero_coverage_keeps_transparent() {
        let pixel = blend_coverage(Rgba([0, 0, 0, 0]), [21, 76, 121], 0.0);
        assert_eq!(pixel, Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_blend_faint_coverage_keeps_transparent() {
        let pixel = blend_coverage(Rgba([0, 0, 0, 0]), [21, 76, 121], 0.001);
        assert_eq!(pixel, Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_blend_full_coverage() {
        let pixel = blend_coverage(Rgba([0, 0, 0, 0]), [21, 76, 121], 1.0);
        assert_eq!(pixel, Rgba([21, 76, 121, 255]));
    }

    #[test]
    fn test_blend_accumulates_overlap() {
        let half = blend_coverage(Rgba([0, 0, 0, 0]), [0, 0, 0], 0.5);
        assert_eq!(half[3], 128);
        let overlapped = blend_coverage(half, [0, 0, 0], 0.2);
        assert_eq!(overlapped[3], 153);
    }

    #[test]
    fn test_blend_clamps_coverage() {
        let pixel = blend_coverage(Rgba([0, 0, 0, 0]), [1, 2, 3], 1.7);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn test_ink_bounds_empty() {
        assert!(ink_bounds(&[]).is_none());
    }

    #[test]
    fn test_glyph_run_builder() {
        let run = GlyphRun::new("गणित", 12.0)
            .with_color([21, 76, 121])
            .with_max_width(100.0);
        assert_eq!(run.color, [21, 76, 121]);
        assert_eq!(run.max_width, Some(100.0));
    }

    #[test]
    fn test_rasterized_text_geometry() {
        let text = RasterizedText {
            image: RgbaImage::new(200, 80),
            padding: 8,
            point_scale: 0.25,
            baseline_px: 60.0,
        };
        assert_eq!(text.width_pt(), 50.0);
        assert_eq!(text.height_pt(), 20.0);
        assert_eq!(text.ink_width_px(), 184);
        assert_eq!(text.baseline_pt(), 15.0);
        assert_eq!(text.top_for_baseline(100.0), 85.0);
    }
}
