use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use thumbkit_core::{
    GradientDirection, LineOrientation, OutputFormat, PngQuantPreset, PngStrip, TargetLanguage,
    Theme, TriangleDirection,
};

#[derive(Parser, Debug)]
#[command(
    name = "thumbkit",
    about = "Generate YouTube thumbnails from a title.",
    version
)]
pub(crate) struct Args {
    /// Title text. Use "-" to read it from stdin.
    pub(crate) text: Option<String>,

    /// Output file (.png/.jpg/.webp). In batch and matrix mode, the output directory.
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,

    /// Output format for batch and matrix mode (png, jpg, webp).
    #[arg(long, value_enum)]
    pub(crate) format: Option<FormatArg>,

    /// JSON profile (default/base/youtube/user or custom file).
    #[arg(short, long)]
    pub(crate) config: Option<String>,

    /// Prompt for the title and theme.
    #[arg(short, long)]
    pub(crate) interactive: bool,

    /// Read one title per line from a file ("-" for stdin) and render each.
    #[arg(long)]
    pub(crate) batch: Option<String>,

    /// Render every theme variant of the title into the output directory.
    #[arg(long)]
    pub(crate) matrix: bool,

    /// Pick a random dark/light theme variant.
    #[arg(long)]
    pub(crate) random_theme: bool,

    /// Seed for --random-theme.
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Canvas width in pixels.
    #[arg(short = 'W', long)]
    pub(crate) width: Option<u32>,

    /// Canvas height in pixels.
    #[arg(short = 'H', long)]
    pub(crate) height: Option<u32>,

    /// Encoder quality for JPEG/WebP (1-100).
    #[arg(short, long)]
    pub(crate) quality: Option<u8>,

    /// Maximum encoded size in bytes.
    #[arg(long)]
    pub(crate) max_bytes: Option<u64>,

    /// Background kind.
    #[arg(short = 'b', long, value_enum)]
    pub(crate) background: Option<BackgroundArg>,

    /// Solid color or first gradient/pattern color (e.g. #667eea).
    #[arg(long)]
    pub(crate) color1: Option<String>,

    /// Second gradient/pattern color.
    #[arg(long)]
    pub(crate) color2: Option<String>,

    /// Gradient direction.
    #[arg(long, value_enum)]
    pub(crate) direction: Option<GradientDirectionArg>,

    /// Pattern name (dots, lines, grid, waves).
    #[arg(long)]
    pub(crate) pattern: Option<String>,

    /// Pattern spacing in pixels.
    #[arg(long)]
    pub(crate) spacing: Option<u32>,

    /// Orientation for the lines pattern.
    #[arg(long, value_enum)]
    pub(crate) orientation: Option<LineOrientationArg>,

    /// Background image path.
    #[arg(long)]
    pub(crate) image: Option<PathBuf>,

    /// Gaussian blur radius for the background image.
    #[arg(long)]
    pub(crate) blur: Option<f32>,

    /// Overlay color drawn over the background image.
    #[arg(long)]
    pub(crate) overlay_color: Option<String>,

    /// Overlay opacity (0-1).
    #[arg(long)]
    pub(crate) overlay_opacity: Option<f32>,

    /// Theme template instead of a plain background.
    #[arg(short = 't', long, value_enum)]
    pub(crate) theme: Option<ThemeArg>,

    /// Mirror the theme layout horizontally.
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub(crate) flip: Option<bool>,

    /// Accent triangle direction, or none.
    #[arg(long, value_enum)]
    pub(crate) triangle: Option<TriangleArg>,

    /// Template image (required for the custom theme).
    #[arg(long)]
    pub(crate) template: Option<PathBuf>,

    /// Logo image for dark/light themes.
    #[arg(long)]
    pub(crate) logo: Option<PathBuf>,

    /// Side panel image for dark/light themes.
    #[arg(long)]
    pub(crate) side_image: Option<PathBuf>,

    /// Author line for dark/light themes.
    #[arg(long)]
    pub(crate) author: Option<String>,

    /// Requested font size.
    #[arg(short = 's', long)]
    pub(crate) font_size: Option<u32>,

    /// Text color (e.g. #ffffff).
    #[arg(long)]
    pub(crate) text_color: Option<String>,

    /// Text position: top, center, bottom or x,y.
    #[arg(long)]
    pub(crate) position: Option<String>,

    /// Latin font family.
    #[arg(long = "font.family")]
    pub(crate) font_family: Option<String>,

    /// CJK font family.
    #[arg(long = "font.cjk-family")]
    pub(crate) font_cjk_family: Option<String>,

    /// Font file path.
    #[arg(long = "font.file")]
    pub(crate) font_file: Option<PathBuf>,

    /// Extra font directories (comma-separated).
    #[arg(long = "font.dirs")]
    pub(crate) font_dirs: Option<String>,

    /// Load installed system fonts.
    #[arg(
        long = "font.system",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub(crate) font_system: Option<bool>,

    /// CJK region preference (auto reads the locale).
    #[arg(long = "font.cjk-region", value_enum)]
    pub(crate) font_cjk_region: Option<FontCjkRegionArg>,

    /// Rewrite mixed-language titles with Gemini (needs GEMINI_API_KEY).
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub(crate) optimize: Option<bool>,

    /// Language the optimized title should use.
    #[arg(long, value_enum)]
    pub(crate) target_language: Option<TargetLanguageArg>,

    /// System prompt replacing the built-in optimization prompt.
    #[arg(long)]
    pub(crate) prompt: Option<String>,

    /// Gemini model name.
    #[arg(long)]
    pub(crate) model: Option<String>,

    /// Optimizer timeout (ms or duration like 10s).
    #[arg(long = "optimizer.timeout")]
    pub(crate) optimizer_timeout: Option<String>,

    /// Batch worker threads (0 = all cores).
    #[arg(long)]
    pub(crate) threads: Option<usize>,

    /// File name prefix for batch outputs.
    #[arg(long)]
    pub(crate) prefix: Option<String>,

    /// Optimize PNG output with oxipng.
    #[arg(
        long = "png.opt",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub(crate) png_opt: Option<bool>,

    /// PNG optimization level (0-6).
    #[arg(long = "png.level")]
    pub(crate) png_level: Option<u8>,

    /// PNG metadata stripping (none, safe, all).
    #[arg(long = "png.strip", value_enum)]
    pub(crate) png_strip: Option<PngStripArg>,

    /// Enable lossy PNG quantization.
    #[arg(
        long = "png.quantize",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub(crate) png_quantize: Option<bool>,

    /// PNG quantization preset (fast, balanced, best).
    #[arg(long = "png.quantize-preset", value_enum)]
    pub(crate) png_quantize_preset: Option<PngQuantPresetArg>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long)]
    pub(crate) log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum FormatArg {
    Png,
    Jpg,
    Webp,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpg => OutputFormat::Jpeg,
            FormatArg::Webp => OutputFormat::Webp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackgroundArg {
    Solid,
    Gradient,
    Pattern,
    Image,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum GradientDirectionArg {
    Vertical,
    Horizontal,
    Diagonal,
}

impl From<GradientDirectionArg> for GradientDirection {
    fn from(value: GradientDirectionArg) -> Self {
        match value {
            GradientDirectionArg::Vertical => GradientDirection::Vertical,
            GradientDirectionArg::Horizontal => GradientDirection::Horizontal,
            GradientDirectionArg::Diagonal => GradientDirection::Diagonal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum LineOrientationArg {
    Diagonal,
    Horizontal,
}

impl From<LineOrientationArg> for LineOrientation {
    fn from(value: LineOrientationArg) -> Self {
        match value {
            LineOrientationArg::Diagonal => LineOrientation::Diagonal,
            LineOrientationArg::Horizontal => LineOrientation::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum ThemeArg {
    Dark,
    Light,
    Custom,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Custom => Theme::Custom,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum TriangleArg {
    Bottom,
    Top,
    None,
}

impl TriangleArg {
    pub(crate) fn direction(self) -> Option<TriangleDirection> {
        match self {
            TriangleArg::Bottom => Some(TriangleDirection::Bottom),
            TriangleArg::Top => Some(TriangleDirection::Top),
            TriangleArg::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum FontCjkRegionArg {
    Auto,
    Sc,
    Tc,
    Hk,
    Jp,
    Kr,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum TargetLanguageArg {
    Auto,
    En,
    Zh,
}

impl From<TargetLanguageArg> for TargetLanguage {
    fn from(value: TargetLanguageArg) -> Self {
        match value {
            TargetLanguageArg::Auto => TargetLanguage::Auto,
            TargetLanguageArg::En => TargetLanguage::En,
            TargetLanguageArg::Zh => TargetLanguage::Zh,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum PngStripArg {
    None,
    Safe,
    All,
}

impl From<PngStripArg> for PngStrip {
    fn from(value: PngStripArg) -> Self {
        match value {
            PngStripArg::None => PngStrip::None,
            PngStripArg::Safe => PngStrip::Safe,
            PngStripArg::All => PngStrip::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum PngQuantPresetArg {
    Fast,
    Balanced,
    Best,
}

impl From<PngQuantPresetArg> for PngQuantPreset {
    fn from(value: PngQuantPresetArg) -> Self {
        match value {
            PngQuantPresetArg::Fast => PngQuantPreset::Fast,
            PngQuantPresetArg::Balanced => PngQuantPreset::Balanced,
            PngQuantPresetArg::Best => PngQuantPreset::Best,
        }
    }
}
