const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;
const DEFAULT_QUALITY: u8 = 95;
const DEFAULT_FONT_SIZE: u32 = 80;
const MAX_FONT_SIZE: u32 = 4096;
const FONT_HEIGHT_TO_WIDTH_RATIO: f32 = 1.68;
const BASELINE_RATIO: f32 = 0.9;
const DEFAULT_MARGIN_RATIO: f32 = 0.06;
const DEFAULT_SHRINK_STEP: u32 = 4;
const DEFAULT_MIN_FONT_SIZE: u32 = 16;
const DEFAULT_MAX_LINES: usize = 3;
const DEFAULT_LINE_SPACING: f32 = 1.2;
const DEFAULT_CJK_FONT_THRESHOLD: f32 = 0.6;
const SINGLE_LANGUAGE_HIGH: f32 = 0.9;
const SINGLE_LANGUAGE_LOW: f32 = 0.1;
const DEFAULT_OPTIMIZER_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_OPTIMIZER_TEMPERATURE: f32 = 0.1;
const DEFAULT_OPTIMIZER_MAX_TOKENS: u32 = 50;
const MAX_OPTIMIZED_TITLE_CHARS: usize = 200;
const DEFAULT_PNG_OPT_LEVEL: u8 = 2;
const MAX_PNG_OPT_LEVEL: u8 = 6;
const DEFAULT_PNG_QUANTIZE_QUALITY: u8 = 85;
const DEFAULT_PNG_QUANTIZE_SPEED: u8 = 4;
const DEFAULT_PNG_QUANTIZE_DITHER: f32 = 1.0;
const MIN_BUDGET_QUALITY: u8 = 40;
const BUDGET_QUALITY_STEP: u8 = 5;

mod background;
mod canvas;
mod color;
mod config;
mod encode;
mod fonts;
mod layout;
mod optimizer;
mod pipeline;
mod render;
mod svg;
mod template;
mod types;

pub use background::{
    render_background, GradientDirection, ImageBackground, LineOrientation, PatternKind,
    PatternParams, PatternSpec, BackgroundSpec,
};
pub use canvas::Canvas;
pub use color::Color;
pub use config::{
    BatchOptions, CjkRegion, Config, FontOptions, LayoutOptions, OptimizerOptions, PngOptions,
    PngQuantPreset, PngStrip, TargetLanguage, TemplateOptions, TextOptions,
};
pub use fonts::{cjk_ratio, is_cjk, FontFace, FontFamilies, FontSet};
pub use layout::{
    Anchor, CellMeasure, FontMeasure, Position, TextAlign, TextBox, TextLayout,
    TextLayoutEngine, TextMeasure,
};
pub use optimizer::{
    needs_optimization, GeminiClient, GeminiConfig, GenerationPrompt, OptimizedTitle,
    TextGenerator, TitleOptimizer, TITLE_OPTIMIZATION_SYSTEM_PROMPT,
};
pub use pipeline::{ThumbnailPipeline, VariantSampler};
pub use template::{
    compose, Palette, Rect, TemplateLayout, Theme, ThemeAssets, ThemeConfig, Triangle,
    TriangleConfig, TriangleDirection,
};
pub use types::{
    Composition, Error, GenerationRequest, GenerationResult, OutputFormat, Result, TextSpec,
};

#[cfg(test)]
mod tests;
