//! Background synthesis: solid fills, linear gradients, procedural patterns
//! and processed photos.
//!
//! Every variant is validated when it is built (directly or through serde),
//! so rendering only fails on I/O or decoding problems.

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tiny_skia::{FillRule, Paint, PathBuilder, Stroke, Transform};

use crate::{Canvas, Color, Error, Result};

const DEFAULT_PATTERN_SPACING: u32 = 40;
const DEFAULT_DOT_RADIUS: f32 = 8.0;
const DEFAULT_LINE_WIDTH: f32 = 3.0;
const DEFAULT_WAVE_AMPLITUDE: f32 = 30.0;
const DEFAULT_WAVE_FREQUENCY: f32 = 0.02;
const WAVE_SAMPLE_STEP: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackgroundSpec {
    Solid {
        color: Color,
    },
    Gradient {
        color1: Color,
        color2: Color,
        #[serde(default)]
        direction: GradientDirection,
    },
    Pattern(PatternSpec),
    Image(ImageBackground),
}

impl BackgroundSpec {
    pub fn validate(&self) -> Result<()> {
        match self {
            BackgroundSpec::Solid { .. } | BackgroundSpec::Gradient { .. } => Ok(()),
            BackgroundSpec::Pattern(spec) => spec.validate(),
            BackgroundSpec::Image(spec) => spec.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BackgroundSpec::Solid { .. } => "solid",
            BackgroundSpec::Gradient { .. } => "gradient",
            BackgroundSpec::Pattern(_) => "pattern",
            BackgroundSpec::Image(_) => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientDirection {
    #[default]
    Vertical,
    Horizontal,
    Diagonal,
}

impl GradientDirection {
    /// Interpolation factor for pixel (`x`, `y`) on a `width`×`height` canvas.
    pub fn factor(self, x: u32, y: u32, width: u32, height: u32) -> f32 {
        match self {
            GradientDirection::Horizontal => x as f32 / width as f32,
            GradientDirection::Vertical => y as f32 / height as f32,
            GradientDirection::Diagonal => (x + y) as f32 / (width + height) as f32,
        }
    }
}

impl FromStr for GradientDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertical" => Ok(GradientDirection::Vertical),
            "horizontal" => Ok(GradientDirection::Horizontal),
            "diagonal" => Ok(GradientDirection::Diagonal),
            other => Err(Error::Config(format!(
                "unknown gradient direction {other:?} (expected vertical, horizontal or diagonal)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineOrientation {
    #[default]
    Diagonal,
    Horizontal,
}

impl FromStr for LineOrientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diagonal" => Ok(LineOrientation::Diagonal),
            "horizontal" => Ok(LineOrientation::Horizontal),
            other => Err(Error::Config(format!("unknown line orientation {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatternKind {
    Dots {
        radius: f32,
    },
    Lines {
        line_width: f32,
        orientation: LineOrientation,
    },
    Grid {
        line_width: f32,
    },
    Waves {
        amplitude: f32,
        frequency: f32,
        line_width: f32,
    },
}

/// Loose, per-kind parameters; missing values take the documented defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PatternParams {
    pub radius: Option<f32>,
    pub line_width: Option<f32>,
    pub orientation: Option<LineOrientation>,
    pub amplitude: Option<f32>,
    pub frequency: Option<f32>,
}

impl PatternKind {
    pub fn from_name(name: &str, params: &PatternParams) -> Result<Self> {
        let line_width = params.line_width.unwrap_or(DEFAULT_LINE_WIDTH);
        match name.trim().to_ascii_lowercase().as_str() {
            "dots" => Ok(PatternKind::Dots {
                radius: params.radius.unwrap_or(DEFAULT_DOT_RADIUS),
            }),
            "lines" => Ok(PatternKind::Lines {
                line_width,
                orientation: params.orientation.unwrap_or_default(),
            }),
            "grid" => Ok(PatternKind::Grid { line_width }),
            "waves" => Ok(PatternKind::Waves {
                amplitude: params.amplitude.unwrap_or(DEFAULT_WAVE_AMPLITUDE),
                frequency: params.frequency.unwrap_or(DEFAULT_WAVE_FREQUENCY),
                line_width,
            }),
            other => Err(Error::Config(format!(
                "unknown pattern {other:?} (expected dots, lines, grid or waves)"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Dots { .. } => "dots",
            PatternKind::Lines { .. } => "lines",
            PatternKind::Grid { .. } => "grid",
            PatternKind::Waves { .. } => "waves",
        }
    }

    /// The parameters that rebuild this kind through [`PatternKind::from_name`].
    pub fn params(&self) -> PatternParams {
        match *self {
            PatternKind::Dots { radius } => PatternParams {
                radius: Some(radius),
                ..PatternParams::default()
            },
            PatternKind::Lines {
                line_width,
                orientation,
            } => PatternParams {
                line_width: Some(line_width),
                orientation: Some(orientation),
                ..PatternParams::default()
            },
            PatternKind::Grid { line_width } => PatternParams {
                line_width: Some(line_width),
                ..PatternParams::default()
            },
            PatternKind::Waves {
                amplitude,
                frequency,
                line_width,
            } => PatternParams {
                line_width: Some(line_width),
                amplitude: Some(amplitude),
                frequency: Some(frequency),
                ..PatternParams::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPattern", into = "RawPattern")]
pub struct PatternSpec {
    pub kind: PatternKind,
    pub color1: Color,
    pub color2: Color,
    pub spacing: u32,
}

impl PatternSpec {
    pub fn new(kind: PatternKind, color1: Color, color2: Color, spacing: u32) -> Result<Self> {
        let spec = Self {
            kind,
            color1,
            color2,
            spacing,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_parts(
        name: &str,
        color1: Color,
        color2: Color,
        spacing: Option<u32>,
        params: &PatternParams,
    ) -> Result<Self> {
        let kind = PatternKind::from_name(name, params)?;
        PatternSpec::new(
            kind,
            color1,
            color2,
            spacing.unwrap_or(DEFAULT_PATTERN_SPACING),
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.spacing == 0 {
            return Err(Error::Config("pattern spacing must be positive".to_string()));
        }
        let positive = |name: &str, value: f32| -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::Config(format!("pattern {name} must be positive, got {value}")))
            }
        };
        match self.kind {
            PatternKind::Dots { radius } => positive("radius", radius),
            PatternKind::Lines { line_width, .. } | PatternKind::Grid { line_width } => {
                positive("line_width", line_width)
            }
            PatternKind::Waves {
                amplitude,
                frequency,
                line_width,
            } => {
                positive("line_width", line_width)?;
                if !amplitude.is_finite() || amplitude < 0.0 {
                    return Err(Error::Config(format!(
                        "pattern amplitude must be >= 0, got {amplitude}"
                    )));
                }
                if !frequency.is_finite() {
                    return Err(Error::Config("pattern frequency must be finite".to_string()));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPattern {
    pattern: String,
    color1: Color,
    color2: Color,
    #[serde(default)]
    spacing: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    orientation: Option<LineOrientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amplitude: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    frequency: Option<f32>,
}

impl TryFrom<RawPattern> for PatternSpec {
    type Error = Error;

    fn try_from(raw: RawPattern) -> Result<Self> {
        let params = PatternParams {
            radius: raw.radius,
            line_width: raw.line_width,
            orientation: raw.orientation,
            amplitude: raw.amplitude,
            frequency: raw.frequency,
        };
        PatternSpec::from_parts(&raw.pattern, raw.color1, raw.color2, raw.spacing, &params)
    }
}

impl From<PatternSpec> for RawPattern {
    fn from(spec: PatternSpec) -> Self {
        let params = spec.kind.params();
        RawPattern {
            pattern: spec.kind.name().to_string(),
            color1: spec.color1,
            color2: spec.color2,
            spacing: Some(spec.spacing),
            radius: params.radius,
            line_width: params.line_width,
            orientation: params.orientation,
            amplitude: params.amplitude,
            frequency: params.frequency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawImageBackground", into = "RawImageBackground")]
pub struct ImageBackground {
    pub path: PathBuf,
    pub blur_radius: f32,
    pub overlay_color: Color,
    pub overlay_opacity: f32,
}

impl ImageBackground {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            blur_radius: 0.0,
            overlay_color: Color::BLACK,
            overlay_opacity: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.blur_radius.is_finite() || self.blur_radius < 0.0 {
            return Err(Error::Config(format!(
                "blur radius must be >= 0, got {}",
                self.blur_radius
            )));
        }
        if !(0.0..=1.0).contains(&self.overlay_opacity) {
            return Err(Error::Config(format!(
                "overlay opacity must be within 0..=1, got {}",
                self.overlay_opacity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawImageBackground {
    #[serde(alias = "image_path")]
    path: PathBuf,
    #[serde(default, alias = "blur")]
    blur_radius: f32,
    #[serde(default)]
    overlay_color: Option<Color>,
    #[serde(default)]
    overlay_opacity: f32,
}

impl TryFrom<RawImageBackground> for ImageBackground {
    type Error = Error;

    fn try_from(raw: RawImageBackground) -> Result<Self> {
        let spec = ImageBackground {
            path: raw.path,
            blur_radius: raw.blur_radius,
            overlay_color: raw.overlay_color.unwrap_or(Color::BLACK),
            overlay_opacity: raw.overlay_opacity,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl From<ImageBackground> for RawImageBackground {
    fn from(spec: ImageBackground) -> Self {
        RawImageBackground {
            path: spec.path,
            blur_radius: spec.blur_radius,
            overlay_color: Some(spec.overlay_color),
            overlay_opacity: spec.overlay_opacity,
        }
    }
}

pub fn render_background(spec: &BackgroundSpec, width: u32, height: u32) -> Result<Canvas> {
    spec.validate()?;
    match spec {
        BackgroundSpec::Solid { color } => Canvas::filled(width, height, *color),
        BackgroundSpec::Gradient {
            color1,
            color2,
            direction,
        } => render_gradient(*color1, *color2, *direction, width, height),
        BackgroundSpec::Pattern(pattern) => {
            let mut canvas = Canvas::filled(width, height, pattern.color1)?;
            draw_pattern(&mut canvas, pattern);
            Ok(canvas)
        }
        BackgroundSpec::Image(image) => render_image(image, width, height),
    }
}

pub(crate) fn render_gradient(
    color1: Color,
    color2: Color,
    direction: GradientDirection,
    width: u32,
    height: u32,
) -> Result<Canvas> {
    let mut canvas = Canvas::new(width, height)?;
    let row_len = width as usize * 4;
    let data = canvas.pixmap_mut().data_mut();
    for (y, row) in data.chunks_exact_mut(row_len).enumerate() {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let t = direction.factor(x as u32, y as u32, width, height);
            px.copy_from_slice(&color1.lerp(color2, t).premultiplied());
        }
    }
    Ok(canvas)
}

fn draw_pattern(canvas: &mut Canvas, spec: &PatternSpec) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let spacing = spec.spacing as f32;
    let mut paint = Paint::default();
    paint.set_color(spec.color2.to_skia());
    paint.anti_alias = true;
    let pixmap = canvas.pixmap_mut();

    match spec.kind {
        PatternKind::Dots { radius } => {
            let mut pb = PathBuilder::new();
            let mut y = spacing / 2.0;
            while y < height + radius {
                let mut x = spacing / 2.0;
                while x < width + radius {
                    pb.push_circle(x, y, radius);
                    x += spacing;
                }
                y += spacing;
            }
            if let Some(path) = pb.finish() {
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
        PatternKind::Lines {
            line_width,
            orientation,
        } => {
            let mut pb = PathBuilder::new();
            match orientation {
                LineOrientation::Horizontal => {
                    push_horizontal_lines(&mut pb, width, height, spacing)
                }
                LineOrientation::Diagonal => {
                    let mut x = -(height / spacing).ceil() * spacing;
                    while x <= width {
                        pb.move_to(x, 0.0);
                        pb.line_to(x + height, height);
                        x += spacing;
                    }
                }
            }
            stroke(pixmap, pb, &paint, line_width);
        }
        PatternKind::Grid { line_width } => {
            let mut pb = PathBuilder::new();
            push_horizontal_lines(&mut pb, width, height, spacing);
            let mut x = spacing / 2.0;
            while x < width {
                pb.move_to(x, 0.0);
                pb.line_to(x, height);
                x += spacing;
            }
            stroke(pixmap, pb, &paint, line_width);
        }
        PatternKind::Waves {
            amplitude,
            frequency,
            line_width,
        } => {
            let mut pb = PathBuilder::new();
            let mut baseline = spacing / 2.0;
            while baseline < height + amplitude {
                pb.move_to(0.0, baseline);
                let mut x = WAVE_SAMPLE_STEP;
                while x <= width {
                    pb.line_to(x, baseline + amplitude * (frequency * x).sin());
                    x += WAVE_SAMPLE_STEP;
                }
                baseline += spacing;
            }
            stroke(pixmap, pb, &paint, line_width);
        }
    }
}

fn push_horizontal_lines(pb: &mut PathBuilder, width: f32, height: f32, spacing: f32) {
    let mut y = spacing / 2.0;
    while y < height {
        pb.move_to(0.0, y);
        pb.line_to(width, y);
        y += spacing;
    }
}

fn stroke(pixmap: &mut tiny_skia::Pixmap, pb: PathBuilder, paint: &Paint, width: f32) {
    let Some(path) = pb.finish() else {
        return;
    };
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, paint, &stroke, Transform::identity(), None);
}

fn render_image(spec: &ImageBackground, width: u32, height: u32) -> Result<Canvas> {
    let image = load_image(&spec.path)?;
    let filled = image.resize_to_fill(width, height, FilterType::Lanczos3);
    let filled = if spec.blur_radius > 0.0 {
        filled.blur(spec.blur_radius)
    } else {
        filled
    };
    let mut rgba = filled.to_rgba8();
    for px in rgba.pixels_mut() {
        let [r, g, b, a] = px.0;
        let flat = Color::BLACK.blend_over(Color::rgb(r, g, b), a as f32 / 255.0);
        let out = flat.blend_over(spec.overlay_color, spec.overlay_opacity);
        px.0 = [out.r, out.g, out.b, 255];
    }
    Canvas::from_rgba(width, height, rgba.as_raw())
}

pub(crate) fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(Error::Asset(format!("image not found: {}", path.display())));
    }
    image::open(path)
        .map_err(|err| Error::Asset(format!("failed to decode {}: {err}", path.display())))
}

/// Loads `path` and scales it to `width`×`height`: cropping when `fill`,
/// letterboxing (aspect kept, smaller result) otherwise.
pub(crate) fn load_fitted(
    path: &Path,
    width: u32,
    height: u32,
    fill: bool,
) -> Result<DynamicImage> {
    let image = load_image(path)?;
    Ok(if fill {
        image.resize_to_fill(width, height, FilterType::Lanczos3)
    } else {
        image.resize(width, height, FilterType::Lanczos3)
    })
}
