use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{BackgroundSpec, Color, Position, ThemeAssets, ThemeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            "" => Err(Error::Config(format!(
                "output path has no extension: {}",
                path.display()
            ))),
            other => Err(Error::Config(format!("unsupported output format: {other}"))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
        }
    }
}

/// Title text plus how it should be styled and placed.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub text: String,
    /// Font family override; `None` uses the configured family for the detected script.
    pub font: Option<String>,
    pub font_size: u32,
    /// `None` uses the theme palette (templates) or white (plain backgrounds).
    pub color: Option<Color>,
    pub position: Position,
}

impl TextSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
            font_size: crate::DEFAULT_FONT_SIZE,
            color: None,
            position: Position::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Composition {
    Background(BackgroundSpec),
    Template {
        theme: ThemeConfig,
        assets: ThemeAssets,
    },
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub title: TextSpec,
    pub composition: Composition,
    pub output: PathBuf,
    pub quality: u8,
    pub width: u32,
    pub height: u32,
    pub optimize_title: bool,
}

impl GenerationRequest {
    pub fn new(title: TextSpec, composition: Composition, output: impl Into<PathBuf>) -> Self {
        Self {
            title,
            composition,
            output: output.into(),
            quality: crate::DEFAULT_QUALITY,
            width: crate::DEFAULT_WIDTH,
            height: crate::DEFAULT_HEIGHT,
            optimize_title: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "invalid canvas size {}x{}",
                self.width, self.height
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(Error::Config(format!(
                "quality must be within 1..=100, got {}",
                self.quality
            )));
        }
        if self.title.font_size == 0 {
            return Err(Error::Config("font size must be positive".to_string()));
        }
        if self.title.font_size > crate::MAX_FONT_SIZE {
            return Err(Error::Config(format!(
                "font size must be at most {}, got {}",
                crate::MAX_FONT_SIZE,
                self.title.font_size
            )));
        }
        if let Composition::Background(spec) = &self.composition {
            spec.validate()?;
        }
        OutputFormat::from_path(&self.output)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub path: PathBuf,
    /// The title that was actually rendered.
    pub title: String,
    pub was_optimized: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),
    #[error("asset error: {0}")]
    Asset(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("optimization error: {0}")]
    Optimization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
