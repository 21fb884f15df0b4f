//! Branding pass over existing PDFs
//!
//! Every page of a source document gets, without touching what is already
//! there:
//! - the faded watermark centered on the page (under the content by default)
//! - the corner logos, on the first page or on every page
//! - a thin separator above the footer
//! - "Page N of M" on the left, the attribution centered, the URL on the
//!   right in the link color
//!
//! The result is always written to a new file. A missing logo or watermark
//! only drops that element; a missing source document is skipped and the
//! batch goes on.

use crate::assets::{skip_undecodable, AssetCache};
use crate::config::{LogoPages, PressConfig};
use crate::painter::{PlacedText, TextPainter};
use crate::watermark::Watermark;
use crate::{PaperError, Result};
use pdf_core::{Align, ImageOptions, PdfDocument};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Distance of the footer baseline from the bottom edge
const FOOTER_OFFSET: f64 = 30.0;
/// Gap between the separator line and the footer baseline
const SEPARATOR_GAP: f64 = 15.0;
/// Horizontal inset of the separator line
const SEPARATOR_INSET: f64 = 20.0;
/// Horizontal inset of the footer text
const FOOTER_INSET: f64 = 30.0;

/// Outcome of a branding batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    /// Output files written
    pub branded: Vec<PathBuf>,
    /// Sources that do not exist
    pub skipped: Vec<PathBuf>,
    /// Sources that could not be branded, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    /// True when every source was branded
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Where the branded copy of `input` is written
///
/// # Example
/// ```ignore
/// let out = output_path_for(&PressConfig::default(), Path::new("Maths Class 1.pdf"));
/// assert_eq!(out, PathBuf::from("branded_output/BRANDED_Maths Class 1.pdf"));
/// ```
pub fn output_path_for(config: &PressConfig, input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    config
        .branding
        .output_dir
        .join(format!("{}{name}", config.branding.output_prefix))
}

/// Logos and watermark of one branding run
struct BrandingAssets {
    left_logo: Option<Arc<Vec<u8>>>,
    right_logo: Option<Arc<Vec<u8>>>,
    watermark: Option<Watermark>,
}

impl BrandingAssets {
    fn load(config: &PressConfig) -> Self {
        let mut cache = AssetCache::new();
        let branding = &config.branding;
        let watermark = cache.get(&config.assets.watermark).and_then(|data| {
            Watermark::new(
                data,
                config.watermark_mode,
                branding.watermark_opacity,
                branding.watermark_size,
            )
            .map(|wm| wm.behind(branding.watermark_behind))
            .map_err(|e| {
                log::warn!(
                    "watermark {} unusable, skipping it: {e}",
                    config.assets.watermark.display()
                )
            })
            .ok()
        });

        Self {
            left_logo: cache.get(&config.assets.left_logo),
            right_logo: cache.get(&config.assets.right_logo),
            watermark,
        }
    }
}

/// Applies watermark, logos and footer to documents
pub struct Brander<'a> {
    config: &'a PressConfig,
    assets: BrandingAssets,
    painter: TextPainter,
}

impl<'a> Brander<'a> {
    /// Load the configured logos and watermark
    pub fn new(config: &'a PressConfig) -> Self {
        Self {
            config,
            assets: BrandingAssets::load(config),
            painter: TextPainter::new(&config.fonts),
        }
    }

    /// Use a specific text painter
    pub fn with_painter(mut self, painter: TextPainter) -> Self {
        self.painter = painter;
        self
    }

    /// Brand every page of a document in place (in memory)
    pub fn brand(&self, doc: &mut PdfDocument) -> Result<()> {
        let total = doc.page_count();
        for page in 1..=total {
            if let Some(watermark) = &self.assets.watermark {
                skip_undecodable(watermark.apply(doc, page), &self.config.assets.watermark)?;
            }

            let with_logos = match self.config.branding.logo_pages {
                LogoPages::FirstPage => page == 1,
                LogoPages::EveryPage => true,
            };
            if with_logos {
                self.draw_logos(doc, page)?;
            }

            self.draw_footer(doc, page, total)?;
        }
        Ok(())
    }

    fn draw_logos(&self, doc: &mut PdfDocument, page: usize) -> Result<()> {
        let branding = &self.config.branding;
        let width = doc.page_size(page)?.width;
        let size = branding.logo_size;

        let logos = [
            (
                &self.assets.left_logo,
                &self.config.assets.left_logo,
                branding.margin_side,
            ),
            (
                &self.assets.right_logo,
                &self.config.assets.right_logo,
                width - branding.margin_side - size,
            ),
        ];
        for (data, path, x) in logos {
            let Some(data) = data else {
                continue;
            };
            let result = doc
                .insert_image_with(
                    data,
                    page,
                    x,
                    branding.margin_top,
                    size,
                    size,
                    &ImageOptions::fit_box(),
                )
                .map_err(PaperError::from);
            skip_undecodable(result, path)?;
        }
        Ok(())
    }

    fn draw_footer(&self, doc: &mut PdfDocument, page: usize, total: usize) -> Result<()> {
        let size = doc.page_size(page)?;
        let palette = &self.config.palette;
        let footer = &self.config.footer;
        let baseline = size.height - FOOTER_OFFSET;
        let rule_y = baseline - SEPARATOR_GAP;

        doc.draw_line(
            page,
            SEPARATOR_INSET,
            rule_y,
            size.width - SEPARATOR_INSET,
            rule_y,
            palette.text,
            0.5,
        )?;

        let counter = format!("Page {page} of {total}");
        let fields = [
            (counter.as_str(), FOOTER_INSET, Align::Left, palette.text),
            (
                footer.attribution.as_str(),
                size.width / 2.0,
                Align::Center,
                palette.text,
            ),
            (
                footer.url.as_str(),
                size.width - FOOTER_INSET,
                Align::Right,
                palette.link,
            ),
        ];
        for (text, x, align, color) in fields {
            self.painter.draw(
                doc,
                page,
                &PlacedText {
                    text,
                    x,
                    y: baseline,
                    size: footer.font_size,
                    bold: false,
                    color,
                    align,
                },
            )?;
        }
        Ok(())
    }
}

/// Brand one document and write it to `output`
///
/// Logos and watermark are loaded for this document only. The output
/// directory is created when needed; the source file is never written.
pub fn brand_file(config: &PressConfig, input: &Path, output: &Path) -> Result<()> {
    if !input.is_file() {
        return Err(PaperError::MissingSource(input.to_path_buf()));
    }

    log::info!("processing {}", input.display());
    let mut doc = PdfDocument::open(input)?;
    Brander::new(config).brand(&mut doc)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    doc.save(output)?;
    log::info!("saved {}", output.display());
    Ok(())
}

/// Brand several documents one after another
///
/// Outputs go to [`output_path_for`]. Failures are logged and collected in
/// the report; they never stop the batch.
pub fn brand_batch(config: &PressConfig, inputs: &[PathBuf]) -> BatchReport {
    let mut report = BatchReport::default();

    for input in inputs {
        let output = output_path_for(config, input);
        match brand_file(config, input, &output) {
            Ok(()) => report.branded.push(output),
            Err(PaperError::MissingSource(path)) => {
                log::warn!("skipping {} (file not found)", path.display());
                report.skipped.push(path);
            }
            Err(e) => {
                log::warn!("failed to brand {}: {e}", input.display());
                report.failed.push((input.clone(), e.to_string()));
            }
        }
    }

    report
}
