//! Vector drawing operators
//!
//! Generators here work in PDF user space (origin bottom-left). The document
//! converts from top-left page coordinates before calling them.

use crate::document::Color;
use crate::num;

/// Bezier control distance for a quarter circle of radius 1
const KAPPA: f64 = 0.552_284_75;

/// Fill/stroke description for a closed shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    /// Fill color, `None` for no fill
    pub fill: Option<Color>,
    /// Stroke color, `None` for no outline
    pub stroke: Option<Color>,
    /// Outline width in points
    pub line_width: f64,
    /// Constant paint opacity (0.0 - 1.0), `None` for opaque
    pub opacity: Option<f32>,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            line_width: 1.0,
            opacity: None,
        }
    }
}

impl ShapeStyle {
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn stroked(color: Color, line_width: f64) -> Self {
        Self {
            stroke: Some(color),
            line_width,
            ..Self::default()
        }
    }

    /// Add an outline to a style
    pub fn with_stroke(mut self, color: Color, line_width: f64) -> Self {
        self.stroke = Some(color);
        self.line_width = line_width;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    /// Path painting operator for this style
    fn paint_operator(&self) -> &'static str {
        match (self.fill.is_some(), self.stroke.is_some()) {
            (true, true) => "B",
            (true, false) => "f",
            (false, true) => "S",
            (false, false) => "n",
        }
    }
}

/// Which corners of a rectangle are rounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Corners {
    #[default]
    All,
    /// Only the two upper corners (title bars sitting on a box)
    Top,
}

/// `r g b rg` or `r g b RG`
pub(crate) fn color_operator(color: Color, stroke: bool) -> String {
    let op = if stroke { "RG" } else { "rg" };
    format!(
        "{} {} {} {op}\n",
        num(color.r as f64),
        num(color.g as f64),
        num(color.b as f64)
    )
}

/// Open a graphics state and apply style colors, width and opacity
fn begin_style(style: &ShapeStyle, gstate: Option<&str>) -> String {
    let mut ops = String::from("q\n");
    if let Some(name) = gstate {
        ops.push_str(&format!("/{name} gs\n"));
    }
    if let Some(fill) = style.fill {
        ops.push_str(&color_operator(fill, false));
    }
    if let Some(stroke) = style.stroke {
        ops.push_str(&color_operator(stroke, true));
        ops.push_str(&format!("{} w\n", num(style.line_width)));
    }
    ops
}

/// Rectangle with bottom-left corner at (x, y)
pub fn generate_rect_operators(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    style: &ShapeStyle,
    gstate: Option<&str>,
) -> Vec<u8> {
    let mut ops = begin_style(style, gstate);
    ops.push_str(&format!(
        "{} {} {} {} re\n{}\nQ\n",
        num(x),
        num(y),
        num(width),
        num(height),
        style.paint_operator()
    ));
    ops.into_bytes()
}

/// Rounded rectangle with bottom-left corner at (x, y)
///
/// The radius is clamped to half of the shorter side.
#[allow(clippy::too_many_arguments)]
pub fn generate_rounded_rect_operators(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    radius: f64,
    corners: Corners,
    style: &ShapeStyle,
    gstate: Option<&str>,
) -> Vec<u8> {
    let r = radius.max(0.0).min(width.min(height) / 2.0);
    if r == 0.0 {
        return generate_rect_operators(x, y, width, height, style, gstate);
    }
    let k = r * KAPPA;
    let (right, top) = (x + width, y + height);

    let mut path = String::new();
    let mut line = |px: f64, py: f64, op: &str| {
        path.push_str(&format!("{} {} {op}\n", num(px), num(py)));
    };

    match corners {
        Corners::All => {
            line(x + r, y, "m");
            line(right - r, y, "l");
        }
        Corners::Top => {
            line(x, y, "m");
            line(right, y, "l");
        }
    }
    let curve = |pts: [(f64, f64); 3]| {
        let [(x1, y1), (x2, y2), (x3, y3)] = pts;
        format!(
            "{} {} {} {} {} {} c\n",
            num(x1),
            num(y1),
            num(x2),
            num(y2),
            num(x3),
            num(y3)
        )
    };

    let mut tail = String::new();
    if corners == Corners::All {
        tail.push_str(&curve([(right - r + k, y), (right, y + r - k), (right, y + r)]));
    }
    tail.push_str(&format!("{} {} l\n", num(right), num(top - r)));
    tail.push_str(&curve([(right, top - r + k), (right - r + k, top), (right - r, top)]));
    tail.push_str(&format!("{} {} l\n", num(x + r), num(top)));
    tail.push_str(&curve([(x + r - k, top), (x, top - r + k), (x, top - r)]));
    match corners {
        Corners::All => {
            tail.push_str(&format!("{} {} l\n", num(x), num(y + r)));
            tail.push_str(&curve([(x, y + r - k), (x + r - k, y), (x + r, y)]));
        }
        Corners::Top => {
            tail.push_str(&format!("{} {} l\n", num(x), num(y)));
        }
    }
    tail.push_str("h\n");

    let mut ops = begin_style(style, gstate);
    ops.push_str(&path);
    ops.push_str(&tail);
    ops.push_str(style.paint_operator());
    ops.push_str("\nQ\n");
    ops.into_bytes()
}

/// Circle centered at (cx, cy)
pub fn generate_circle_operators(
    cx: f64,
    cy: f64,
    radius: f64,
    style: &ShapeStyle,
    gstate: Option<&str>,
) -> Vec<u8> {
    let r = radius.max(0.0);
    let k = r * KAPPA;
    let segments = [
        [(cx + r, cy + k), (cx + k, cy + r), (cx, cy + r)],
        [(cx - k, cy + r), (cx - r, cy + k), (cx - r, cy)],
        [(cx - r, cy - k), (cx - k, cy - r), (cx, cy - r)],
        [(cx + k, cy - r), (cx + r, cy - k), (cx + r, cy)],
    ];

    let mut ops = begin_style(style, gstate);
    ops.push_str(&format!("{} {} m\n", num(cx + r), num(cy)));
    for [(x1, y1), (x2, y2), (x3, y3)] in segments {
        ops.push_str(&format!(
            "{} {} {} {} {} {} c\n",
            num(x1),
            num(y1),
            num(x2),
            num(y2),
            num(x3),
            num(y3)
        ));
    }
    ops.push_str(&format!("h\n{}\nQ\n", style.paint_operator()));
    ops.into_bytes()
}

/// Straight line between two points
pub fn generate_line_operators(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    color: Color,
    line_width: f64,
    gstate: Option<&str>,
) -> Vec<u8> {
    let style = ShapeStyle::stroked(color, line_width);
    let mut ops = begin_style(&style, gstate);
    ops.push_str(&format!(
        "{} {} m\n{} {} l\nS\nQ\n",
        num(x1),
        num(y1),
        num(x2),
        num(y2)
    ));
    ops.into_bytes()
}
