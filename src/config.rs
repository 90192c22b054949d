use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::theme::{TextStyleId, ThemeId};

pub const DEFAULT_CONFIG_FILE: &str = "photobooth.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub strip: StripConfig,
    pub output: OutputConfig,
    pub print: PrintConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackend {
    /// Shell out to a still-capture program for every frame
    Command,
    /// Animated synthetic frames, for machines without a camera
    TestPattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub backend: CameraBackend,
    /// Device node to open; `None` picks the first one found
    pub device: Option<String>,
    pub width: u32,
    pub height: u32,
    pub capture_program: String,
    /// Placeholders: {device} {width} {height} {output}
    pub capture_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub countdown_from: u32,
    pub tick_ms: u64,
    pub settle_ms: u64,
    pub preview_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripConfig {
    pub theme: String,
    pub text_style: String,
    pub event_name: String,
    pub font: String,
    pub font_size: f32,
    /// Optional `#RRGGBB` override for the theme accent colour
    pub accent_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub save_dir: PathBuf,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintConfig {
    pub enabled: bool,
    /// Printer queue name; `None` uses the system default printer
    pub printer: Option<String>,
    pub print_program: String,
    pub media: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                backend: CameraBackend::Command,
                device: None,
                width: 640,
                height: 480,
                capture_program: "fswebcam".to_string(),
                capture_args: vec![
                    "--quiet".to_string(),
                    "--no-banner".to_string(),
                    "--device".to_string(),
                    "{device}".to_string(),
                    "--resolution".to_string(),
                    "{width}x{height}".to_string(),
                    "--jpeg".to_string(),
                    "95".to_string(),
                    "{output}".to_string(),
                ],
            },
            capture: CaptureConfig {
                countdown_from: 3,
                tick_ms: 1000,
                settle_ms: 150,
                preview_interval_ms: 33,
            },
            strip: StripConfig {
                theme: ThemeId::BirthdayCelebration.key().to_string(),
                text_style: TextStyleId::Script.key().to_string(),
                event_name: "my event".to_string(),
                font: "DejaVuSans".to_string(),
                font_size: 48.0,
                accent_color: None,
            },
            output: OutputConfig {
                save_dir: PathBuf::from("photos"),
                jpeg_quality: 92,
            },
            print: PrintConfig {
                enabled: true,
                printer: None,
                print_program: "lp".to_string(),
                media: "4x6".to_string(),
            },
        }
    }
}

impl Config {
    /// Load `photobooth.toml` from the working directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            log::info!("Config file not found, using default configuration");
            Ok(Self::default())
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| "Failed to parse configuration file")?;
        config.validate()?;

        log::info!("Configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        std::fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow::anyhow!("Invalid capture dimensions"));
        }

        if self.capture.countdown_from == 0 {
            return Err(anyhow::anyhow!("Countdown must start at 1 or more"));
        }

        if self.capture.preview_interval_ms == 0 {
            return Err(anyhow::anyhow!("Invalid preview interval"));
        }

        if self.output.jpeg_quality == 0 || self.output.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("Invalid JPEG quality: {}", self.output.jpeg_quality));
        }

        if self.strip.font_size <= 0.0 {
            return Err(anyhow::anyhow!("Invalid font size: {}", self.strip.font_size));
        }

        self.theme_id()?;
        self.text_style_id()?;
        self.accent_override()?;

        Ok(())
    }

    pub fn theme_id(&self) -> Result<ThemeId> {
        ThemeId::from_key(&self.strip.theme)
            .ok_or_else(|| anyhow::anyhow!("Unknown theme: {}", self.strip.theme))
    }

    pub fn text_style_id(&self) -> Result<TextStyleId> {
        TextStyleId::from_key(&self.strip.text_style)
            .ok_or_else(|| anyhow::anyhow!("Unknown text style: {}", self.strip.text_style))
    }

    pub fn accent_override(&self) -> Result<Option<image::Rgb<u8>>> {
        self.strip
            .accent_color
            .as_deref()
            .map(parse_hex_color)
            .transpose()
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.capture.tick_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.capture.settle_ms)
    }

    pub fn preview_interval(&self) -> Duration {
        Duration::from_millis(self.capture.preview_interval_ms)
    }
}

/// Parse `#RGB` or `#RRGGBB` into an RGB pixel.
pub fn parse_hex_color(color_str: &str) -> Result<image::Rgb<u8>> {
    let hex = color_str
        .strip_prefix('#')
        .ok_or_else(|| anyhow::anyhow!("Color must start with #"))?;
    if !hex.is_ascii() {
        return Err(anyhow::anyhow!("Invalid hex color format: {}", color_str));
    }

    let (r, g, b) = match hex.len() {
        3 => (
            u8::from_str_radix(&hex[0..1].repeat(2), 16)?,
            u8::from_str_radix(&hex[1..2].repeat(2), 16)?,
            u8::from_str_radix(&hex[2..3].repeat(2), 16)?,
        ),
        6 => (
            u8::from_str_radix(&hex[0..2], 16)?,
            u8::from_str_radix(&hex[2..4], 16)?,
            u8::from_str_radix(&hex[4..6], 16)?,
        ),
        _ => return Err(anyhow::anyhow!("Invalid hex color format: {}", color_str)),
    };

    Ok(image::Rgb([r, g, b]))
}

// Configuration builder for easier setup
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn backend(mut self, backend: CameraBackend) -> Self {
        self.config.camera.backend = backend;
        self
    }

    pub fn capture_size(mut self, width: u32, height: u32) -> Self {
        self.config.camera.width = width;
        self.config.camera.height = height;
        self
    }

    pub fn countdown(mut self, from: u32, tick_ms: u64, settle_ms: u64) -> Self {
        self.config.capture.countdown_from = from;
        self.config.capture.tick_ms = tick_ms;
        self.config.capture.settle_ms = settle_ms;
        self
    }

    pub fn theme(mut self, theme: ThemeId) -> Self {
        self.config.strip.theme = theme.key().to_string();
        self
    }

    pub fn text_style(mut self, style: TextStyleId) -> Self {
        self.config.strip.text_style = style.key().to_string();
        self
    }

    pub fn event_name(mut self, name: &str) -> Self {
        self.config.strip.event_name = name.to_string();
        self
    }

    pub fn save_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.output.save_dir = dir.into();
        self
    }

    pub fn printing(mut self, enabled: bool) -> Self {
        self.config.print.enabled = enabled;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.save_dir, PathBuf::from("photos"));
        assert_eq!(config.theme_id().unwrap(), ThemeId::BirthdayCelebration);
        assert_eq!(config.tick(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .backend(CameraBackend::TestPattern)
            .capture_size(320, 240)
            .countdown(2, 10, 0)
            .theme(ThemeId::BrideGlam)
            .text_style(TextStyleId::Modern)
            .printing(false)
            .build()
            .unwrap();

        assert_eq!(config.camera.backend, CameraBackend::TestPattern);
        assert_eq!(config.camera.width, 320);
        assert_eq!(config.capture.countdown_from, 2);
        assert_eq!(config.theme_id().unwrap(), ThemeId::BrideGlam);
        assert_eq!(config.text_style_id().unwrap(), TextStyleId::Modern);
        assert!(!config.print.enabled);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.output.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.output.jpeg_quality = 90;
        config.strip.theme = "halloween".to_string();
        assert!(config.validate().is_err());

        config.strip.theme = "wedding-elegance".to_string();
        config.strip.accent_color = Some("f1f5f9".to_string());
        assert!(config.validate().is_err());

        config.strip.accent_color = Some("#f1f5f9".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("photobooth.toml");

        let original_config = ConfigBuilder::new()
            .event_name("Alex & Taylor")
            .theme(ThemeId::GroomClassic)
            .build()
            .unwrap();
        original_config.save_to_file(&config_path).unwrap();

        let loaded_config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(loaded_config.strip.event_name, "Alex & Taylor");
        assert_eq!(loaded_config.theme_id().unwrap(), ThemeId::GroomClassic);
        assert_eq!(loaded_config.camera.capture_args, original_config.camera.capture_args);
        assert_eq!(loaded_config.print.printer, None);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#000").unwrap(), image::Rgb([0, 0, 0]));
        assert_eq!(parse_hex_color("#FF0000").unwrap(), image::Rgb([255, 0, 0]));
        assert_eq!(parse_hex_color("#f1f5f9").unwrap(), image::Rgb([241, 245, 249]));
        assert!(parse_hex_color("FF0000").is_err());
        assert!(parse_hex_color("#GG0000").is_err());
        assert!(parse_hex_color("#12345").is_err());
    }
}
