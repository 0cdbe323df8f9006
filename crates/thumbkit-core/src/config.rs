use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{
    BackgroundSpec, Color, Composition, GenerationRequest, GradientDirection, Position, TextSpec,
    ThemeAssets, ThemeConfig, DEFAULT_CJK_FONT_THRESHOLD, DEFAULT_FONT_SIZE, DEFAULT_HEIGHT,
    DEFAULT_LINE_SPACING, DEFAULT_MARGIN_RATIO, DEFAULT_MAX_LINES, DEFAULT_MIN_FONT_SIZE,
    DEFAULT_OPTIMIZER_MAX_TOKENS, DEFAULT_OPTIMIZER_TEMPERATURE, DEFAULT_OPTIMIZER_TIMEOUT_MS,
    DEFAULT_PNG_OPT_LEVEL, DEFAULT_PNG_QUANTIZE_DITHER, DEFAULT_PNG_QUANTIZE_QUALITY,
    DEFAULT_PNG_QUANTIZE_SPEED, DEFAULT_QUALITY, DEFAULT_SHRINK_STEP, DEFAULT_WIDTH,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub background: BackgroundSpec,
    /// When set, requests are composed from a theme template instead of `background`.
    pub template: Option<TemplateOptions>,
    pub text: TextOptions,
    pub font: FontOptions,
    pub layout: LayoutOptions,
    pub png: PngOptions,
    /// Upper bound on the encoded file size (YouTube rejects thumbnails over 2 MB).
    pub max_bytes: Option<u64>,
    pub optimizer: OptimizerOptions,
    pub batch: BatchOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            quality: DEFAULT_QUALITY,
            background: BackgroundSpec::Gradient {
                color1: Color::rgb(0x66, 0x7e, 0xea),
                color2: Color::rgb(0x76, 0x4b, 0xa2),
                direction: GradientDirection::Diagonal,
            },
            template: None,
            text: TextOptions::default(),
            font: FontOptions::default(),
            layout: LayoutOptions::default(),
            png: PngOptions::default(),
            max_bytes: None,
            optimizer: OptimizerOptions::default(),
            batch: BatchOptions::default(),
        }
    }
}

impl Config {
    /// Builds a request for `text` from the configured defaults.
    pub fn request(
        &self,
        text: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> GenerationRequest {
        let composition = match &self.template {
            Some(template) => Composition::Template {
                theme: template.theme.clone(),
                assets: template.assets.clone(),
            },
            None => Composition::Background(self.background.clone()),
        };
        let title = TextSpec {
            text: text.into(),
            font: self.text.font.clone(),
            font_size: self.text.size,
            color: self.text.color,
            position: self.text.position,
        };
        let mut request = GenerationRequest::new(title, composition, output);
        request.quality = self.quality;
        request.width = self.width;
        request.height = self.height;
        request.optimize_title = self.optimizer.enabled;
        request
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOptions {
    #[serde(flatten)]
    pub theme: ThemeConfig,
    #[serde(flatten)]
    pub assets: ThemeAssets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub font: Option<String>,
    pub size: u32,
    pub color: Option<Color>,
    pub position: Position,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font: None,
            size: DEFAULT_FONT_SIZE,
            color: None,
            position: Position::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FontOptions {
    pub family: String,
    #[serde(rename = "cjk_family")]
    pub cjk_family: Option<String>,
    pub file: Option<PathBuf>,
    pub dirs: Vec<PathBuf>,
    #[serde(rename = "system_fonts")]
    pub system_fonts: bool,
    #[serde(rename = "cjk_region")]
    pub cjk_region: CjkRegion,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            cjk_family: None,
            file: None,
            dirs: Vec::new(),
            system_fonts: true,
            cjk_region: CjkRegion::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CjkRegion {
    #[default]
    Sc,
    Tc,
    Hk,
    Jp,
    Kr,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Safety margin on each side, as a fraction of the box width.
    pub margin_ratio: f32,
    pub shrink_step: u32,
    pub min_font_size: u32,
    /// 0 means unlimited.
    pub max_lines: usize,
    pub line_spacing: f32,
    pub cjk_font_threshold: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            margin_ratio: DEFAULT_MARGIN_RATIO,
            shrink_step: DEFAULT_SHRINK_STEP,
            min_font_size: DEFAULT_MIN_FONT_SIZE,
            max_lines: DEFAULT_MAX_LINES,
            line_spacing: DEFAULT_LINE_SPACING,
            cjk_font_threshold: DEFAULT_CJK_FONT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    #[default]
    Auto,
    En,
    Zh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerOptions {
    pub enabled: bool,
    pub model: String,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub target_language: TargetLanguage,
    pub custom_prompt: Option<String>,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gemini-2.0-flash-exp".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_ms: DEFAULT_OPTIMIZER_TIMEOUT_MS,
            temperature: DEFAULT_OPTIMIZER_TEMPERATURE,
            max_output_tokens: DEFAULT_OPTIMIZER_MAX_TOKENS,
            target_language: TargetLanguage::Auto,
            custom_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Worker threads for batch mode; 0 uses every available core.
    pub threads: usize,
    pub prefix: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            prefix: "thumbnail".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PngStrip {
    None,
    #[default]
    Safe,
    All,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngQuantPreset {
    Fast,
    Balanced,
    Best,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PngOptions {
    pub optimize: bool,
    pub level: u8,
    pub strip: PngStrip,
    pub quantize: bool,
    pub quantize_preset: Option<PngQuantPreset>,
    pub quantize_quality: u8,
    pub quantize_speed: u8,
    pub quantize_dither: f32,
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            level: DEFAULT_PNG_OPT_LEVEL,
            strip: PngStrip::Safe,
            quantize: false,
            quantize_preset: None,
            quantize_quality: DEFAULT_PNG_QUANTIZE_QUALITY,
            quantize_speed: DEFAULT_PNG_QUANTIZE_SPEED,
            quantize_dither: DEFAULT_PNG_QUANTIZE_DITHER,
        }
    }
}
