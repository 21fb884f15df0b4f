//! Text operators

use crate::document::Color;
use crate::font::{encode_win_ansi, pdf_literal};
use crate::graphics::color_operator;
use crate::{num, Align};

/// Font, size, measured width and fill color of one text run
pub struct TextRenderContext {
    /// Font resource name on the page (e.g. "XpF1")
    pub font_name: String,
    pub font_size: f32,
    /// Measured width in points, used to shift the anchor for `Align`
    pub text_width: f64,
    pub color: Color,
}

/// `BT ... ET` block showing `text` on the baseline at (`x`, `y`) in PDF
/// user space; `x` is an anchor interpreted through `align`
pub fn generate_text_operators(
    text: &str,
    x: f64,
    y: f64,
    align: Align,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    format!(
        "BT\n{color}/{font} {size} Tf\n{x} {y} Td\n{literal} Tj\nET\n",
        color = color_operator(ctx.color, false),
        font = ctx.font_name,
        size = num(ctx.font_size as f64),
        x = num(x + align.shift(ctx.text_width)),
        y = num(y),
        literal = pdf_literal(&encode_win_ansi(text)),
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ops(text: &str, x: f64, align: Align, width: f64, color: Color) -> String {
        let ctx = TextRenderContext {
            font_name: "XpF1".to_string(),
            font_size: 9.0,
            text_width: width,
            color,
        };
        String::from_utf8(generate_text_operators(text, x, 30.0, align, &ctx)).unwrap()
    }

    #[test]
    fn test_left_aligned_block() {
        assert_eq!(
            ops("Page 1 of 2", 30.0, Align::Left, 48.0, Color::black()),
            "BT\n0 0 0 rg\n/XpF1 9 Tf\n30 30 Td\n(Page 1 of 2) Tj\nET\n"
        );
    }

    #[test]
    fn test_anchor_shift() {
        assert!(ops("Test", 200.0, Align::Center, 100.0, Color::black()).contains("150 30 Td"));
        assert!(ops("A", 100.0, Align::Center, 0.0, Color::black()).contains("100 30 Td"));

        let url = ops("https://dbggurukulam.com", 300.0, Align::Right, 80.0, Color::blue());
        assert!(url.contains("220 30 Td"));
        assert!(url.contains("0 0 1 rg"));
    }

    #[test]
    fn test_parentheses_escaped() {
        let attribution = ops(
            "DBG Gurukulam (by IITian Golu Sir)",
            0.0,
            Align::Left,
            0.0,
            Color::black(),
        );
        assert!(attribution.contains("(DBG Gurukulam \\(by IITian Golu Sir\\)) Tj"));
    }
}
