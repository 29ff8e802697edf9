//! Render configuration and the settings file

use crate::{InviteError, ResourceKind, Result};
use pdf_core::{Color, FontData};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 120;
pub const DEFAULT_FONT_SIZE: u32 = 20;
pub const DEFAULT_OUTPUT_PREFIX: &str = "invitation_";

/// Overlay rasterization quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    #[default]
    Normal,
    High,
}

impl RenderQuality {
    /// Overlay pixels per PDF point
    pub fn raster_scale(self) -> f32 {
        match self {
            RenderQuality::Normal => 2.0,
            RenderQuality::High => 3.0,
        }
    }
}

/// Named text colors offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    #[default]
    Black,
    Red,
    Blue,
    Gold,
    Green,
    Maroon,
}

impl TextColor {
    pub fn to_color(self) -> Color {
        match self {
            TextColor::Black => Color::black(),
            TextColor::Red => Color::red(),
            TextColor::Blue => Color::blue(),
            TextColor::Gold => Color::gold(),
            TextColor::Green => Color::green(),
            TextColor::Maroon => Color::maroon(),
        }
    }
}

/// Everything the renderer needs besides the text and its position
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub font: Option<FontData>,
    /// Font size given to newly marked positions
    pub font_size_default: f32,
    pub color: Color,
    pub quality: RenderQuality,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_size_default: DEFAULT_FONT_SIZE as f32,
            color: Color::default(),
            quality: RenderQuality::default(),
        }
    }
}

impl RenderConfig {
    pub fn with_font(mut self, font: FontData) -> Self {
        self.font = Some(font);
        self
    }

    /// The configured font, or [`InviteError::NoFontLoaded`]
    pub fn require_font(&self) -> Result<&FontData> {
        self.font.as_ref().ok_or(InviteError::NoFontLoaded)
    }

    /// Set the default size for new positions, validating the range
    pub fn set_font_size_default(&mut self, size: u32) -> Result<()> {
        validate_font_size(size)?;
        self.font_size_default = size as f32;
        Ok(())
    }
}

fn validate_font_size(size: u32) -> Result<()> {
    if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
        return Err(InviteError::Config(format!(
            "font size {size} is outside {MIN_FONT_SIZE}..={MAX_FONT_SIZE}"
        )));
    }
    Ok(())
}

/// Persistent user settings (TOML)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Font size for newly marked positions
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    #[serde(default)]
    pub rendering_quality: RenderQuality,

    #[serde(default)]
    pub text_color: TextColor,

    /// Font loaded at startup
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    /// Output file name prefix
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Worker threads for batch generation (1 = sequential)
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

const fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

fn default_output_prefix() -> String {
    DEFAULT_OUTPUT_PREFIX.to_string()
}

const fn default_jobs() -> usize {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            rendering_quality: RenderQuality::default(),
            text_color: TextColor::default(),
            font_path: None,
            output_prefix: default_output_prefix(),
            jobs: default_jobs(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| InviteError::resource(ResourceKind::Config, path, e))?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| InviteError::Config(format!("Failed to parse config: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from default locations (`$XDG_CONFIG_HOME/rsinvite/config.toml`,
    /// `./rsinvite.toml`), falling back to defaults
    pub fn load() -> Self {
        if let Some(config_dir) = config_dir() {
            let user_config = config_dir.join("rsinvite").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(settings) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return settings;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = PathBuf::from("rsinvite.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(settings) => {
                    tracing::debug!("Loaded config from ./rsinvite.toml");
                    return settings;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./rsinvite.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        validate_font_size(self.font_size)?;

        if self
            .output_prefix
            .chars()
            .any(|c| matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(InviteError::Config(format!(
                "output prefix {:?} must not contain path separators",
                self.output_prefix
            )));
        }

        if self.jobs == 0 {
            return Err(InviteError::Config("jobs must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Build a render configuration, loading the configured font if any
    pub fn render_config(&self) -> Result<RenderConfig> {
        self.validate()?;

        let font = match &self.font_path {
            Some(path) => Some(
                FontData::from_file(path)
                    .map_err(|e| InviteError::resource(ResourceKind::Font, path, e))?,
            ),
            None => None,
        };

        Ok(RenderConfig {
            font,
            font_size_default: self.font_size as f32,
            color: self.text_color.to_color(),
            quality: self.rendering_quality,
        })
    }
}

/// The user's configuration directory following XDG conventions
fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quality_scale() {
        assert_eq!(RenderQuality::Normal.raster_scale(), 2.0);
        assert_eq!(RenderQuality::High.raster_scale(), 3.0);
    }

    #[test]
    fn test_palette_values() {
        assert_eq!(TextColor::Gold.to_color(), Color::rgba(255, 215, 0, 255));
        assert_eq!(TextColor::Green.to_color(), Color::rgb(0, 128, 0));
        assert_eq!(TextColor::Maroon.to_color(), Color::rgb(128, 0, 0));
        assert_eq!(TextColor::default(), TextColor::Black);
    }

    #[test]
    fn test_render_config_defaults() {
        let config = RenderConfig::default();
        assert!(config.font.is_none());
        assert_eq!(config.font_size_default, 20.0);
        assert_eq!(config.color, Color::black());
        assert!(matches!(config.require_font(), Err(InviteError::NoFontLoaded)));
    }

    #[test]
    fn test_set_font_size_default_range() {
        let mut config = RenderConfig::default();
        config.set_font_size_default(8).expect("8 is allowed");
        config.set_font_size_default(120).expect("120 is allowed");
        assert_eq!(config.font_size_default, 120.0);
        assert!(config.set_font_size_default(7).is_err());
        assert!(config.set_font_size_default(121).is_err());
        assert_eq!(config.font_size_default, 120.0);
    }

    #[test]
    fn test_settings_defaults_from_empty_toml() {
        let settings = Settings::from_toml_str("").expect("Failed to parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.output_prefix, "invitation_");
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = Settings::from_toml_str(
            r#"
            font_size = 32
            rendering_quality = "high"
            text_color = "maroon"
            output_prefix = "card_"
            jobs = 4
            "#,
        )
        .expect("Failed to parse");

        assert_eq!(settings.font_size, 32);
        assert_eq!(settings.rendering_quality, RenderQuality::High);
        assert_eq!(settings.text_color, TextColor::Maroon);
        assert_eq!(settings.output_prefix, "card_");
        assert_eq!(settings.jobs, 4);

        let config = settings.render_config().expect("Failed to build config");
        assert_eq!(config.font_size_default, 32.0);
        assert_eq!(config.color, Color::maroon());
        assert_eq!(config.quality, RenderQuality::High);
    }

    #[test]
    fn test_settings_rejects_out_of_range() {
        assert!(matches!(
            Settings::from_toml_str("font_size = 200"),
            Err(InviteError::Config(_))
        ));
        assert!(Settings::from_toml_str("jobs = 0").is_err());
        assert!(Settings::from_toml_str("output_prefix = \"a/b\"").is_err());
        assert!(Settings::from_toml_str("text_color = \"purple\"").is_err());
    }

    #[test]
    fn test_settings_from_missing_file() {
        let result = Settings::from_file("/nonexistent/rsinvite.toml");
        assert!(matches!(
            result,
            Err(InviteError::ResourceLoad {
                kind: ResourceKind::Config,
                ..
            })
        ));
    }

    #[test]
    fn test_render_config_bad_font_path() {
        let settings = Settings {
            font_path: Some(PathBuf::from("/nonexistent/font.ttf")),
            ..Settings::default()
        };
        assert!(matches!(
            settings.render_config(),
            Err(InviteError::ResourceLoad {
                kind: ResourceKind::Font,
                ..
            })
        ));
    }
}
