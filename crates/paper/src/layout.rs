//! Paper layout planning
//!
//! Every page is described as an ordered list of [`Region`]s: the page
//! chrome built from the configuration plus the paper's own content. A single
//! [`draw_region`] expands each region into backend-independent [`DrawOp`]s.
//! The PDF renderer and the HTML writer both consume the resulting display
//! list, so layout can be tested without producing any output.
//!
//! Paint order on every page is watermark, header, content, footer.

use crate::config::{Palette, PressConfig};
use crate::schema::{ExamPaper, PaperPage, Region, RegionContent, TextAlign};
use crate::watermark::centered_origin;
use pdf_core::{Align, Color, Corners, PageSize, ShapeStyle};
use std::path::{Path, PathBuf};

const CARD_RADIUS: f64 = 8.0;
const CARD_SHADOW_OFFSET: f64 = 3.0;
const CARD_BAR_HEIGHT: f64 = 24.0;

/// One backend-independent drawing step
///
/// Coordinates are points from the top-left corner of the page.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Single line of text; `y` is the baseline and `x` the alignment anchor
    Text {
        text: String,
        x: f64,
        y: f64,
        size: f32,
        bold: bool,
        color: Color,
        align: Align,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        corners: Corners,
        style: ShapeStyle,
    },
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
        style: ShapeStyle,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        width: f64,
    },
    /// Image file fitted into the box, aspect kept
    Image {
        path: PathBuf,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        opacity: Option<f32>,
    },
}

fn text_region(
    x: f64,
    y: f64,
    text: &str,
    size: f32,
    bold: bool,
    color: Color,
    align: TextAlign,
) -> Region {
    Region::new(
        x,
        y,
        0.0,
        0.0,
        RegionContent::Text {
            text: text.to_string(),
            size,
            bold,
            color: Some(color),
            align,
        },
    )
}

fn image_region(x: f64, y: f64, size: f64, path: &Path, opacity: Option<f32>) -> Region {
    Region::new(
        x,
        y,
        size,
        size,
        RegionContent::Image {
            path: path.to_path_buf(),
            opacity,
        },
    )
}

/// Faded logo centered on the page
pub fn watermark_regions(config: &PressConfig, size: PageSize) -> Vec<Region> {
    let side = config.paper.watermark_size;
    let (x, y) = centered_origin(size, side);
    vec![image_region(
        x,
        y,
        side,
        &config.assets.watermark,
        Some(config.paper.watermark_opacity),
    )]
}

/// Header band, logos, title and the page's own header lines
pub fn header_regions(
    paper: &ExamPaper,
    page: &PaperPage,
    config: &PressConfig,
    size: PageSize,
) -> Vec<Region> {
    let palette = &config.palette;
    let band = config.paper.header_height;
    let logo = config.paper.header_logo_size;
    let logo_top = band - 15.0 - logo;

    let mut regions = vec![
        Region::new(
            0.0,
            0.0,
            size.width,
            band,
            RegionContent::Box {
                fill: Some(palette.header_background),
                stroke: None,
                thickness: 0.0,
                radius: 0.0,
                opacity: None,
            },
        ),
        Region::new(
            0.0,
            band,
            size.width,
            0.0,
            RegionContent::Rule {
                color: Some(palette.primary),
                thickness: 3.0,
            },
        ),
        image_region(25.0, logo_top, logo, &config.assets.left_logo, None),
        image_region(
            size.width - 25.0 - logo,
            logo_top,
            logo,
            &config.assets.right_logo,
            None,
        ),
    ];

    let institute = paper
        .institute
        .as_deref()
        .unwrap_or(&config.paper.institute);
    regions.push(text_region(
        size.width / 2.0,
        50.0,
        institute,
        26.0,
        true,
        palette.primary,
        TextAlign::Center,
    ));

    if let Some(subtitle) = &page.subtitle {
        regions.push(text_region(
            size.width / 2.0,
            75.0,
            subtitle,
            12.0,
            false,
            palette.text,
            TextAlign::Center,
        ));
    }

    if let Some(details) = &page.student_details {
        let strip_top = band + 5.0;
        regions.push(Region::new(
            20.0,
            strip_top,
            size.width - 40.0,
            30.0,
            RegionContent::Box {
                fill: None,
                stroke: Some(palette.border),
                thickness: 1.0,
                radius: 5.0,
                opacity: None,
            },
        ));
        regions.push(text_region(
            35.0,
            strip_top + 20.0,
            details,
            10.0,
            false,
            palette.text,
            TextAlign::Left,
        ));
    }

    if let Some(notes) = &page.notes {
        let baseline = band + 60.0;
        if !notes.left.is_empty() {
            regions.push(text_region(
                20.0,
                baseline,
                &notes.left,
                10.0,
                false,
                palette.primary,
                TextAlign::Left,
            ));
        }
        if !notes.right.is_empty() {
            regions.push(text_region(
                size.width - 20.0,
                baseline - 2.0,
                &notes.right,
                10.0,
                false,
                palette.primary,
                TextAlign::Right,
            ));
        }
    }

    regions
}

/// Accent rule, page number disc, attribution and URL
pub fn footer_regions(config: &PressConfig, page_number: usize, size: PageSize) -> Vec<Region> {
    let palette = &config.palette;
    let footer = &config.footer;
    let baseline = size.height - 23.0;

    vec![
        Region::new(
            0.0,
            size.height - 35.0,
            size.width,
            0.0,
            RegionContent::Rule {
                color: Some(palette.accent),
                thickness: 2.0,
            },
        ),
        Region::new(
            18.0,
            size.height - 38.0,
            24.0,
            24.0,
            RegionContent::Circle {
                fill: Some(palette.primary),
                stroke: None,
            },
        ),
        text_region(
            30.0,
            baseline,
            &page_number.to_string(),
            footer.font_size,
            true,
            Color::white(),
            TextAlign::Center,
        ),
        text_region(
            size.width / 2.0,
            baseline,
            &footer.attribution,
            footer.font_size,
            false,
            palette.text,
            TextAlign::Center,
        ),
        text_region(
            size.width - 20.0,
            baseline,
            &footer.url,
            footer.font_size,
            false,
            palette.primary,
            TextAlign::Right,
        ),
    ]
}

/// All regions of one page (0-indexed), in paint order
pub fn page_regions(
    paper: &ExamPaper,
    index: usize,
    config: &PressConfig,
    size: PageSize,
) -> Vec<Region> {
    let Some(page) = paper.pages.get(index) else {
        return Vec::new();
    };

    let mut regions = watermark_regions(config, size);
    regions.extend(header_regions(paper, page, config, size));
    regions.extend(page.regions.iter().cloned());
    regions.extend(footer_regions(config, index + 1, size));
    regions
}

/// Display list of every page of a paper
pub fn plan_paper(paper: &ExamPaper, config: &PressConfig, size: PageSize) -> Vec<Vec<DrawOp>> {
    (0..paper.pages.len())
        .map(|index| {
            let mut ops = Vec::new();
            for region in page_regions(paper, index, config, size) {
                draw_region(&region, &config.palette, &mut ops);
            }
            ops
        })
        .collect()
}

/// Expand one region into drawing operations
///
/// Colors a region leaves unset come from the palette.
pub fn draw_region(region: &Region, palette: &Palette, ops: &mut Vec<DrawOp>) {
    draw_region_at(region, 0.0, 0.0, palette, ops);
}

fn draw_region_at(region: &Region, dx: f64, dy: f64, palette: &Palette, ops: &mut Vec<DrawOp>) {
    let x = region.x + dx;
    let y = region.y + dy;
    let (width, height) = (region.width, region.height);

    match &region.content {
        RegionContent::Text {
            text,
            size,
            bold,
            color,
            align,
        } => ops.push(DrawOp::Text {
            text: text.clone(),
            x,
            y,
            size: *size,
            bold: *bold,
            color: color.unwrap_or(palette.text),
            align: (*align).into(),
        }),

        RegionContent::Card {
            title,
            marks,
            accent,
            children,
        } => {
            ops.push(DrawOp::Rect {
                x: x + CARD_SHADOW_OFFSET,
                y: y + CARD_SHADOW_OFFSET,
                width,
                height,
                radius: CARD_RADIUS,
                corners: Corners::All,
                style: ShapeStyle::filled(Color::gray(0.9)),
            });
            ops.push(DrawOp::Rect {
                x,
                y,
                width,
                height,
                radius: CARD_RADIUS,
                corners: Corners::All,
                style: ShapeStyle::filled(Color::white()).with_stroke(palette.border, 1.0),
            });
            ops.push(DrawOp::Rect {
                x,
                y,
                width,
                height: CARD_BAR_HEIGHT,
                radius: CARD_RADIUS,
                corners: Corners::Top,
                style: ShapeStyle::filled(accent.unwrap_or(palette.primary)),
            });
            let bar_baseline = y + 17.0;
            ops.push(DrawOp::Text {
                text: title.clone(),
                x: x + 10.0,
                y: bar_baseline,
                size: 10.0,
                bold: false,
                color: Color::white(),
                align: Align::Left,
            });
            if !marks.is_empty() {
                ops.push(DrawOp::Text {
                    text: marks.clone(),
                    x: x + width - 10.0,
                    y: bar_baseline,
                    size: 10.0,
                    bold: false,
                    color: Color::white(),
                    align: Align::Right,
                });
            }
            for child in children {
                draw_region_at(child, x, y, palette, ops);
            }
        }

        RegionContent::Math {
            top,
            operator,
            bottom,
        } => {
            let number = |text: &str, nx: f64, ny: f64, align: Align| DrawOp::Text {
                text: text.to_string(),
                x: nx,
                y: ny,
                size: 14.0,
                bold: true,
                color: palette.text,
                align,
            };
            ops.push(number(top, x + 40.0, y, Align::Right));
            ops.push(number(bottom, x + 40.0, y + 18.0, Align::Right));
            ops.push(number(operator, x - 5.0, y + 18.0, Align::Left));
            ops.push(DrawOp::Line {
                x1: x - 5.0,
                y1: y + 24.0,
                x2: x + 45.0,
                y2: y + 24.0,
                color: palette.text,
                width: 1.5,
            });
        }

        RegionContent::Rule { color, thickness } => ops.push(DrawOp::Line {
            x1: x,
            y1: y,
            x2: x + width,
            y2: y + height,
            color: color.unwrap_or(palette.text),
            width: *thickness,
        }),

        RegionContent::Box {
            fill,
            stroke,
            thickness,
            radius,
            opacity,
        } => ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            radius: *radius,
            corners: Corners::All,
            style: shape_style(*fill, *stroke, *thickness, *opacity, palette),
        }),

        RegionContent::Circle { fill, stroke } => ops.push(DrawOp::Circle {
            cx: x + width / 2.0,
            cy: y + height / 2.0,
            radius: width.min(height) / 2.0,
            style: shape_style(*fill, *stroke, 1.0, None, palette),
        }),

        RegionContent::Image { path, opacity } => ops.push(DrawOp::Image {
            path: path.clone(),
            x,
            y,
            width,
            height,
            opacity: *opacity,
        }),
    }
}

/// A shape with neither fill nor stroke is outlined in the text color
fn shape_style(
    fill: Option<Color>,
    stroke: Option<Color>,
    thickness: f64,
    opacity: Option<f32>,
    palette: &Palette,
) -> ShapeStyle {
    let stroke = match (fill, stroke) {
        (None, None) => Some(palette.text),
        (_, stroke) => stroke,
    };
    ShapeStyle {
        fill,
        stroke,
        line_width: thickness,
        opacity,
    }
}
