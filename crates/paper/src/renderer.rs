//! Paper rendering
//!
//! Plans the display list of a paper and paints it onto a fresh A4 document,
//! one operation at a time, in order.

use crate::assets::{skip_undecodable, AssetCache};
use crate::config::PressConfig;
use crate::layout::{plan_paper, DrawOp};
use crate::painter::{PlacedText, TextPainter};
use crate::schema::ExamPaper;
use crate::watermark::Watermark;
use crate::{PaperError, Result};
use pdf_core::{ImageOptions, PageSize, PdfDocument};

/// Paper renderer
pub struct PaperRenderer<'a> {
    config: &'a PressConfig,
    painter: TextPainter,
    assets: AssetCache,
}

impl<'a> PaperRenderer<'a> {
    /// Create a renderer; fonts and images are loaded on first use
    pub fn new(config: &'a PressConfig) -> Self {
        Self {
            config,
            painter: TextPainter::new(&config.fonts),
            assets: AssetCache::new(),
        }
    }

    /// Use a specific text painter
    pub fn with_painter(mut self, painter: TextPainter) -> Self {
        self.painter = painter;
        self
    }

    /// Render every page of a paper into a new A4 document
    pub fn render(&mut self, paper: &ExamPaper) -> Result<PdfDocument> {
        if paper.pages.is_empty() {
            return Err(PaperError::InvalidPaper("paper has no pages".to_string()));
        }

        let size = PageSize::A4;
        let mut doc = PdfDocument::create(paper.pages.len(), size)?;
        for (index, ops) in plan_paper(paper, self.config, size).iter().enumerate() {
            let page = index + 1;
            for op in ops {
                self.paint(&mut doc, page, op)?;
            }
            log::debug!("painted page {page} ({} operations)", ops.len());
        }

        log::info!("rendered {:?} ({} pages)", paper.title, paper.pages.len());
        Ok(doc)
    }

    /// Paint one display-list operation
    ///
    /// Images that are missing or cannot be decoded are skipped with a
    /// warning.
    pub fn paint(&mut self, doc: &mut PdfDocument, page: usize, op: &DrawOp) -> Result<()> {
        match op {
            DrawOp::Text {
                text,
                x,
                y,
                size,
                bold,
                color,
                align,
            } => self.painter.draw(
                doc,
                page,
                &PlacedText {
                    text,
                    x: *x,
                    y: *y,
                    size: *size,
                    bold: *bold,
                    color: *color,
                    align: *align,
                },
            ),

            DrawOp::Rect {
                x,
                y,
                width,
                height,
                radius,
                corners,
                style,
            } => {
                if *radius > 0.0 {
                    doc.draw_rounded_rect(page, *x, *y, *width, *height, *radius, *corners, style)?;
                } else {
                    doc.draw_rect(page, *x, *y, *width, *height, style)?;
                }
                Ok(())
            }

            DrawOp::Circle {
                cx,
                cy,
                radius,
                style,
            } => {
                doc.draw_circle(page, *cx, *cy, *radius, style)?;
                Ok(())
            }

            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                color,
                width,
            } => {
                doc.draw_line(page, *x1, *y1, *x2, *y2, *color, *width)?;
                Ok(())
            }

            DrawOp::Image {
                path,
                x,
                y,
                width,
                height,
                opacity,
            } => {
                let Some(data) = self.assets.get(path) else {
                    return Ok(());
                };
                let result = match opacity {
                    Some(opacity) => {
                        Watermark::new(data, self.config.watermark_mode, *opacity, *width)
                            .and_then(|wm| wm.draw(doc, page, *x, *y, *width, *height))
                    }
                    None => doc
                        .insert_image_with(
                            &data,
                            page,
                            *x,
                            *y,
                            *width,
                            *height,
                            &ImageOptions::fit_box(),
                        )
                        .map_err(PaperError::from),
                };
                skip_undecodable(result, path)
            }
        }
    }
}

/// Render a paper with a fresh renderer
///
/// # Example
/// ```ignore
/// let config = PressConfig::default();
/// let paper = ExamPaper::load("demos/class1_maths.json")?;
/// render_paper(&paper, &config)?.save("Class_1_Exam.pdf")?;
/// ```
pub fn render_paper(paper: &ExamPaper, config: &PressConfig) -> Result<PdfDocument> {
    PaperRenderer::new(config).render(paper)
}
