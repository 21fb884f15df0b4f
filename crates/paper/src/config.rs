//! Press configuration
//!
//! One `PressConfig` value drives a whole run. It is read from JSON, every
//! field has a default, and it is validated once before any document is
//! touched.

use crate::{PaperError, Result};
use pdf_core::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which pages receive the corner logos during branding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoPages {
    #[default]
    FirstPage,
    EveryPage,
}

/// How a faded watermark is produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkMode {
    /// Draw the image with a reduced paint opacity
    #[default]
    Native,
    /// Multiply the image's own alpha channel before embedding
    BakedAlpha,
}

/// Image files used for logos and watermarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub left_logo: PathBuf,
    pub right_logo: PathBuf,
    pub watermark: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            left_logo: PathBuf::from("DBG-logo.png"),
            right_logo: PathBuf::from("DBM-logo.png"),
            watermark: PathBuf::from("DBG-logo.png"),
        }
    }
}

/// Colors, written as `#rrggbb` in JSON
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    #[serde(with = "hex_color")]
    pub primary: Color,
    #[serde(with = "hex_color")]
    pub accent: Color,
    #[serde(with = "hex_color")]
    pub header_background: Color,
    #[serde(with = "hex_color")]
    pub border: Color,
    #[serde(with = "hex_color")]
    pub text: Color,
    #[serde(with = "hex_color")]
    pub link: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Color::from_rgb(0x15, 0x4c, 0x79),
            accent: Color::from_rgb(0xe0, 0x8d, 0x3c),
            header_background: Color::from_rgb(0xf4, 0xf6, 0xf9),
            border: Color::from_rgb(0xd1, 0xd5, 0xdb),
            text: Color::black(),
            link: Color::blue(),
        }
    }
}

/// Footer text shared by branded documents and generated papers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    pub attribution: String,
    pub url: String,
    pub font_size: f32,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            attribution: "Shri Classes & DBG Gurukulam (by IITian Golu Sir)".to_string(),
            url: "https://dbggurukulam.com".to_string(),
            font_size: 9.0,
        }
    }
}

/// Settings of the branding pass over existing PDFs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    pub logo_pages: LogoPages,
    pub logo_size: f64,
    pub margin_top: f64,
    pub margin_side: f64,
    /// Side of the square box the watermark is fitted into, in points
    pub watermark_size: f64,
    pub watermark_opacity: f32,
    /// Paint the watermark under the existing page content
    pub watermark_behind: bool,
    pub output_dir: PathBuf,
    pub output_prefix: String,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            logo_pages: LogoPages::FirstPage,
            logo_size: 65.0,
            margin_top: 10.0,
            margin_side: 20.0,
            watermark_size: 300.0,
            watermark_opacity: 0.15,
            watermark_behind: true,
            output_dir: PathBuf::from("branded_output"),
            output_prefix: "BRANDED_".to_string(),
        }
    }
}

/// Page chrome of generated papers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub institute: String,
    pub header_height: f64,
    pub header_logo_size: f64,
    pub watermark_size: f64,
    pub watermark_opacity: f32,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            institute: "DBG GURUKULAM".to_string(),
            header_height: 110.0,
            header_logo_size: 75.0,
            watermark_size: 450.0,
            watermark_opacity: 0.08,
        }
    }
}

/// Font discovery for text the built-in font cannot show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Tried in order; the first one covering Devanagari wins
    pub candidates: Vec<PathBuf>,
    /// Pixels rendered per point
    pub supersample: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            candidates: hindi_text::default_font_candidates(),
            supersample: hindi_text::DEFAULT_SUPERSAMPLE,
        }
    }
}

/// Complete configuration of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressConfig {
    pub assets: AssetConfig,
    pub palette: Palette,
    pub footer: FooterConfig,
    pub branding: BrandingConfig,
    pub paper: PaperConfig,
    pub fonts: FontConfig,
    pub watermark_mode: WatermarkMode,
}

impl PressConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PaperError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Check every value a run depends on
    pub fn validate(&self) -> Result<()> {
        check_opacity("branding.watermark_opacity", self.branding.watermark_opacity)?;
        check_opacity("paper.watermark_opacity", self.paper.watermark_opacity)?;

        let sizes = [
            ("branding.logo_size", self.branding.logo_size),
            ("branding.watermark_size", self.branding.watermark_size),
            ("paper.header_height", self.paper.header_height),
            ("paper.header_logo_size", self.paper.header_logo_size),
            ("paper.watermark_size", self.paper.watermark_size),
            ("footer.font_size", self.footer.font_size as f64),
        ];
        for (name, value) in sizes {
            if !(value.is_finite() && value > 0.0) {
                return Err(PaperError::ConfigError(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let margins = [
            ("branding.margin_top", self.branding.margin_top),
            ("branding.margin_side", self.branding.margin_side),
        ];
        for (name, value) in margins {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PaperError::ConfigError(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }

        if !(1..=8).contains(&self.fonts.supersample) {
            return Err(PaperError::ConfigError(format!(
                "fonts.supersample must be 1-8, got {}",
                self.fonts.supersample
            )));
        }
        if self.fonts.candidates.is_empty() {
            return Err(PaperError::ConfigError(
                "fonts.candidates must list at least one font".to_string(),
            ));
        }
        if self.branding.output_prefix.is_empty() {
            return Err(PaperError::ConfigError(
                "branding.output_prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_opacity(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PaperError::ConfigError(format!(
            "{name} must be between 0 and 1, got {value}"
        )))
    }
}

/// Serde adapter for `#rrggbb` colors
pub(crate) mod hex_color {
    use pdf_core::Color;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&color.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Color::from_hex(&hex)
            .ok_or_else(|| D::Error::custom(format!("invalid color {hex:?}, expected #rrggbb")))
    }

    /// Same as the parent module for optional colors
    pub mod option {
        use pdf_core::Color;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            color: &Option<Color>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match color {
                Some(color) => serializer.serialize_some(&color.to_hex()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Color>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|hex| {
                    Color::from_hex(&hex).ok_or_else(|| {
                        D::Error::custom(format!("invalid color {hex:?}, expected #rrggbb"))
                    })
                })
                .transpose()
        }
    }
}
