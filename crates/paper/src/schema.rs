//! Exam paper JSON schema types
//!
//! A paper is a list of pages. Each page names its header lines and lists
//! content regions; everything around them (watermark, header band, footer)
//! comes from the configuration.

use crate::config::hex_color;
use crate::{PaperError, Result};
use pdf_core::{Align, Color};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Horizontal text alignment relative to the region's X
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl From<TextAlign> for Align {
    fn from(align: TextAlign) -> Self {
        match align {
            TextAlign::Left => Align::Left,
            TextAlign::Center => Align::Center,
            TextAlign::Right => Align::Right,
        }
    }
}

/// Root paper structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamPaper {
    /// Document title (used by the HTML rendition)
    pub title: String,

    /// Overrides the configured institute name in the header
    #[serde(default)]
    pub institute: Option<String>,

    pub pages: Vec<PaperPage>,
}

impl ExamPaper {
    /// Parse a paper from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let paper: Self = serde_json::from_str(json)?;
        if paper.pages.is_empty() {
            return Err(PaperError::InvalidPaper("paper has no pages".to_string()));
        }
        Ok(paper)
    }

    /// Read a paper description file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// One page of a paper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperPage {
    /// Centered line under the institute name (class/subject/time, or a
    /// section heading on later pages)
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Text of the boxed student-details strip
    #[serde(default)]
    pub student_details: Option<String>,

    #[serde(default)]
    pub notes: Option<Notes>,

    #[serde(default)]
    pub regions: Vec<Region>,
}

/// Line under the student strip: left note and right-aligned note
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notes {
    #[serde(default)]
    pub left: String,
    #[serde(default)]
    pub right: String,
}

/// A positioned piece of content
///
/// Coordinates are points from the top-left corner of the page, or of the
/// enclosing card for card children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(flatten)]
    pub content: RegionContent,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64, content: RegionContent) -> Self {
        Self {
            x,
            y,
            width,
            height,
            content,
        }
    }

    /// A text region whose baseline is at `y`
    pub fn text(x: f64, y: f64, text: impl Into<String>, size: f32) -> Self {
        Self::new(
            x,
            y,
            0.0,
            0.0,
            RegionContent::Text {
                text: text.into(),
                size,
                bold: false,
                color: None,
                align: TextAlign::Left,
            },
        )
    }
}

fn default_text_size() -> f32 {
    10.0
}

fn default_rule_thickness() -> f64 {
    0.5
}

fn default_box_thickness() -> f64 {
    1.0
}

/// What a region draws
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionContent {
    /// One line of text; `y` is the baseline
    Text {
        text: String,
        #[serde(default = "default_text_size")]
        size: f32,
        #[serde(default)]
        bold: bool,
        #[serde(default, with = "hex_color::option")]
        color: Option<Color>,
        #[serde(default)]
        align: TextAlign,
    },

    /// Question card: shadowed rounded box with a colored title bar
    Card {
        title: String,
        #[serde(default)]
        marks: String,
        /// Title bar color, the palette's primary color when unset
        #[serde(default, with = "hex_color::option")]
        accent: Option<Color>,
        #[serde(default)]
        children: Vec<Region>,
    },

    /// Vertical arithmetic problem; `y` is the baseline of the first operand
    Math {
        top: String,
        operator: String,
        bottom: String,
    },

    /// Straight line from (x, y) to (x + width, y + height)
    Rule {
        #[serde(default, with = "hex_color::option")]
        color: Option<Color>,
        #[serde(default = "default_rule_thickness")]
        thickness: f64,
    },

    /// Rectangle, rounded when `radius` is positive
    Box {
        #[serde(default, with = "hex_color::option")]
        fill: Option<Color>,
        #[serde(default, with = "hex_color::option")]
        stroke: Option<Color>,
        #[serde(default = "default_box_thickness")]
        thickness: f64,
        #[serde(default)]
        radius: f64,
        #[serde(default)]
        opacity: Option<f32>,
    },

    /// Circle filling the region's box
    Circle {
        #[serde(default, with = "hex_color::option")]
        fill: Option<Color>,
        #[serde(default, with = "hex_color::option")]
        stroke: Option<Color>,
    },

    /// Image file fitted into the region with its aspect ratio kept
    Image {
        path: PathBuf,
        #[serde(default)]
        opacity: Option<f32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_paper() {
        let paper = ExamPaper::from_json(
            r#"{
                "title": "Class 1 Maths",
                "pages": [{ "regions": [] }]
            }"#,
        )
        .unwrap();
        assert_eq!(paper.title, "Class 1 Maths");
        assert_eq!(paper.institute, None);
        assert_eq!(paper.pages.len(), 1);
    }

    #[test]
    fn test_parse_regions() {
        let paper = ExamPaper::from_json(
            r##"{
                "title": "t",
                "pages": [{
                    "subtitle": "गणित - भाग 2",
                    "notes": { "left": "Total Questions: 16", "right": "पूर्णांक: 80" },
                    "regions": [
                        { "kind": "text", "x": 30, "y": 200, "text": "(a) 75 :" },
                        { "kind": "card", "x": 20, "y": 185, "width": 267, "height": 120,
                          "title": "प्र. 1", "marks": "[5 अंक]", "accent": "#e08d3c",
                          "children": [
                            { "kind": "math", "x": 50, "y": 55, "top": "4230", "operator": "+", "bottom": "1540" }
                          ] },
                        { "kind": "rule", "x": 0, "y": 10, "width": 100 },
                        { "kind": "image", "x": 0, "y": 0, "width": 50, "height": 50, "path": "logo.png", "opacity": 0.5 }
                    ]
                }]
            }"##,
        )
        .unwrap();

        let page = &paper.pages[0];
        assert_eq!(page.subtitle.as_deref(), Some("गणित - भाग 2"));
        assert_eq!(page.notes.as_ref().unwrap().left, "Total Questions: 16");

        assert_eq!(
            page.regions[0],
            Region::text(30.0, 200.0, "(a) 75 :", 10.0)
        );

        match &page.regions[1].content {
            RegionContent::Card {
                accent, children, ..
            } => {
                assert_eq!(*accent, Some(Color::from_rgb(0xe0, 0x8d, 0x3c)));
                assert_eq!(children.len(), 1);
                assert!(matches!(children[0].content, RegionContent::Math { .. }));
            }
            other => panic!("expected card, got {other:?}"),
        }

        assert_eq!(
            page.regions[2].content,
            RegionContent::Rule {
                color: None,
                thickness: 0.5
            }
        );
        assert_eq!(page.regions[3].width, 50.0);
    }

    #[test]
    fn test_empty_paper_rejected() {
        let result = ExamPaper::from_json(r#"{ "title": "t", "pages": [] }"#);
        assert!(matches!(result, Err(PaperError::InvalidPaper(_))));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = ExamPaper::from_json(
            r#"{ "title": "t", "pages": [{ "regions": [{ "kind": "table", "x": 0, "y": 0 }] }] }"#,
        );
        assert!(matches!(result, Err(PaperError::JsonError(_))));
    }

    #[test]
    fn test_align_conversion() {
        assert_eq!(Align::from(TextAlign::Center), Align::Center);
        assert_eq!(Align::from(TextAlign::default()), Align::Left);
    }
}
