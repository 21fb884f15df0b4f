//! Static HTML rendition of a paper
//!
//! The same display list the PDF renderer paints is written out as one
//! inline SVG per A4 page. Text stays text, so the browser shapes Devanagari
//! itself; images are embedded as base64 `data:` URIs so the file is self
//! contained. Printing the page to PDF from a browser gives the final paper.

use crate::assets::AssetCache;
use crate::config::PressConfig;
use crate::layout::{plan_paper, DrawOp};
use crate::schema::ExamPaper;
use crate::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pdf_core::{Align, Corners, PageSize, ShapeStyle};
use std::fmt::Write as _;
use std::path::Path;

const STYLE: &str = r#"
    @page { size: A4; margin: 0; }
    body { margin: 0; background: #e5e7eb; -webkit-print-color-adjust: exact; print-color-adjust: exact; }
    .page { width: 210mm; height: 297mm; margin: 10mm auto; background: white; overflow: hidden; page-break-after: always; }
    .page svg { display: block; width: 100%; height: 100%; }
    .page text { font-family: 'Noto Sans Devanagari', 'Nirmala UI', 'Mangal', sans-serif; white-space: pre; }
    .note { max-width: 210mm; margin: 10mm auto 0; font: 14px sans-serif; color: #374151; }
    @media print {
        body { background: white; }
        .page { margin: 0; }
        .note { display: none; }
    }
"#;

const PRINT_NOTE: &str = "To save as PDF: open the print dialog (Ctrl+P), choose \
\"Save as PDF\", set margins to None and enable background graphics.";

/// Render a paper to a complete HTML document
pub fn render_html(paper: &ExamPaper, config: &PressConfig) -> Result<String> {
    let size = PageSize::A4;
    let mut assets = AssetCache::new();
    let mut html = String::new();

    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html lang=\"hi\">\n<head>\n<meta charset=\"UTF-8\">");
    let _ = writeln!(html, "<title>{}</title>", escape(&paper.title));
    let _ = writeln!(html, "<style>{STYLE}</style>\n</head>\n<body>");
    let _ = writeln!(html, "<p class=\"note\">{}</p>", escape(PRINT_NOTE));

    for ops in plan_paper(paper, config, size) {
        let _ = writeln!(html, "<section class=\"page\">");
        let _ = writeln!(
            html,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\">",
            n(size.width),
            n(size.height)
        );
        for op in &ops {
            write_op(&mut html, op, &mut assets);
        }
        let _ = writeln!(html, "</svg>\n</section>");
    }

    let _ = writeln!(html, "</body>\n</html>");
    Ok(html)
}

/// Render a paper and write the HTML file
pub fn write_html<P: AsRef<Path>>(paper: &ExamPaper, config: &PressConfig, path: P) -> Result<()> {
    let html = render_html(paper, config)?;
    std::fs::write(path.as_ref(), html)?;
    log::info!("wrote {}", path.as_ref().display());
    Ok(())
}

fn write_op(out: &mut String, op: &DrawOp, assets: &mut AssetCache) {
    match op {
        DrawOp::Text {
            text,
            x,
            y,
            size,
            bold,
            color,
            align,
        } => {
            let anchor = match align {
                Align::Left => "start",
                Align::Center => "middle",
                Align::Right => "end",
            };
            let weight = if *bold { " font-weight=\"bold\"" } else { "" };
            let _ = writeln!(
                out,
                "<text x=\"{}\" y=\"{}\" font-size=\"{}\"{weight} fill=\"{}\" text-anchor=\"{anchor}\">{}</text>",
                n(*x),
                n(*y),
                n(*size as f64),
                color.to_hex(),
                escape(text)
            );
        }

        DrawOp::Rect {
            x,
            y,
            width,
            height,
            radius,
            corners,
            style,
        } => {
            let paint = paint_attributes(style);
            let radius = radius.min(width / 2.0).min(height / 2.0).max(0.0);
            if radius > 0.0 && *corners == Corners::Top {
                let (x, y, w, h, r) = (*x, *y, *width, *height, radius);
                let _ = writeln!(
                    out,
                    "<path d=\"M{} {} L{} {} Q{} {} {} {} L{} {} Q{} {} {} {} L{} {} Z\"{paint}/>",
                    n(x),
                    n(y + h),
                    n(x),
                    n(y + r),
                    n(x),
                    n(y),
                    n(x + r),
                    n(y),
                    n(x + w - r),
                    n(y),
                    n(x + w),
                    n(y),
                    n(x + w),
                    n(y + r),
                    n(x + w),
                    n(y + h),
                );
            } else {
                let rounded = if radius > 0.0 {
                    format!(" rx=\"{}\"", n(radius))
                } else {
                    String::new()
                };
                let _ = writeln!(
                    out,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"{rounded}{paint}/>",
                    n(*x),
                    n(*y),
                    n(*width),
                    n(*height)
                );
            }
        }

        DrawOp::Circle {
            cx,
            cy,
            radius,
            style,
        } => {
            let _ = writeln!(
                out,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\"{}/>",
                n(*cx),
                n(*cy),
                n(*radius),
                paint_attributes(style)
            );
        }

        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            color,
            width,
        } => {
            let _ = writeln!(
                out,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
                n(*x1),
                n(*y1),
                n(*x2),
                n(*y2),
                color.to_hex(),
                n(*width)
            );
        }

        DrawOp::Image {
            path,
            x,
            y,
            width,
            height,
            opacity,
        } => {
            let Some(data) = assets.get(path) else {
                return;
            };
            let opacity = opacity
                .map(|o| format!(" opacity=\"{}\"", n(o as f64)))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "<image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"xMidYMid meet\"{opacity}/>",
                data_uri(&data),
                n(*x),
                n(*y),
                n(*width),
                n(*height)
            );
        }
    }
}

fn paint_attributes(style: &ShapeStyle) -> String {
    let mut attrs = match style.fill {
        Some(fill) => format!(" fill=\"{}\"", fill.to_hex()),
        None => " fill=\"none\"".to_string(),
    };
    if let Some(stroke) = style.stroke {
        let _ = write!(
            attrs,
            " stroke=\"{}\" stroke-width=\"{}\"",
            stroke.to_hex(),
            n(style.line_width)
        );
    }
    if let Some(opacity) = style.opacity {
        let _ = write!(attrs, " opacity=\"{}\"", n(opacity as f64));
    }
    attrs
}

/// Base64 `data:` URI with the MIME type sniffed from the bytes
fn data_uri(data: &[u8]) -> String {
    let mime = match image::guess_format(data) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        _ => "application/octet-stream",
    };
    format!("data:{mime};base64,{}", STANDARD.encode(data))
}

/// Number for an SVG attribute (at most 2 decimals)
fn n(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PaperPage, Region};
    use pdf_core::Color;

    fn paper() -> ExamPaper {
        ExamPaper {
            title: "Class 1 <Maths>".to_string(),
            institute: None,
            pages: vec![
                PaperPage {
                    subtitle: Some("विषय: गणित (Maths)".to_string()),
                    regions: vec![Region::text(30.0, 200.0, "(a) 4500 [  ] 5400", 11.0)],
                    ..PaperPage::default()
                },
                PaperPage::default(),
            ],
        }
    }

    #[test]
    fn test_one_svg_per_page() {
        let mut config = PressConfig::default();
        config.assets.watermark = "/nonexistent/wm.png".into();
        config.assets.left_logo = "/nonexistent/l.png".into();
        config.assets.right_logo = "/nonexistent/r.png".into();

        let html = render_html(&paper(), &config).unwrap();
        assert_eq!(html.matches("<svg ").count(), 2);
        assert!(html.contains("<title>Class 1 &lt;Maths&gt;</title>"));
        assert!(html.contains(">विषय: गणित (Maths)</text>"));
        assert!(html.contains("Shri Classes &amp; DBG Gurukulam"));
        assert!(html.contains("text-anchor=\"end\""));
        assert!(!html.contains("<image "));
    }

    #[test]
    fn test_images_embedded_as_base64() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("DBG-logo.png");
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([21, 76, 121, 255]));
        img.save(&logo).unwrap();

        let mut config = PressConfig::default();
        config.assets.watermark = logo.clone();
        config.assets.left_logo = logo;
        config.assets.right_logo = dir.path().join("missing.png");

        let html = render_html(&paper(), &config).unwrap();
        assert!(html.contains("href=\"data:image/png;base64,"));
        assert!(html.contains("opacity=\"0.08\""));
        // Watermark and left logo on both pages, right logo missing
        assert_eq!(html.matches("<image ").count(), 4);
    }

    #[test]
    fn test_top_rounded_rect_is_path() {
        let mut out = String::new();
        let op = DrawOp::Rect {
            x: 20.0,
            y: 185.0,
            width: 100.0,
            height: 24.0,
            radius: 8.0,
            corners: Corners::Top,
            style: ShapeStyle::filled(Color::from_rgb(0x15, 0x4c, 0x79)),
        };
        write_op(&mut out, &op, &mut AssetCache::new());
        assert_eq!(
            out,
            "<path d=\"M20 209 L20 193 Q20 185 28 185 L112 185 Q120 185 120 193 L120 209 Z\" fill=\"#154c79\"/>\n"
        );
    }

    #[test]
    fn test_number_format() {
        assert_eq!(n(595.28), "595.28");
        assert_eq!(n(3.0), "3");
        assert_eq!(n(-0.001), "0");
        assert_eq!(n(0.15f32 as f64), "0.15");
    }

    #[test]
    fn test_write_html_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Class_1_Exam.html");
        write_html(&paper(), &PressConfig::default(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }
}
