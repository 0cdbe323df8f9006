//! Theme templates: the split panel layout with a directional accent, a logo,
//! an author line and the title, plus the full-bleed `custom` theme.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::background::{load_fitted, render_gradient};
use crate::render::rasterize_overlay;
use crate::svg::{logo_badge, polygon, text_layer};
use crate::{
    Anchor, Canvas, Color, Error, FontSet, GradientDirection, Position, Result, TextBox,
    TextLayoutEngine, TextSpec,
};

const SEAM_RATIO: f32 = 0.4375;
const TRIANGLE_WIDTH_RATIO: f32 = 0.125;
const EDGE_RATIO: f32 = 0.03;
const SEAM_GAP_RATIO: f32 = 0.02;
const LOGO_SIZE_RATIO: f32 = 0.12;
const LOGO_TOP_RATIO: f32 = 0.05;
const TITLE_TOP_RATIO: f32 = 0.18;
const TITLE_BOTTOM_RATIO: f32 = 0.80;
const AUTHOR_TOP_RATIO: f32 = 0.84;
const AUTHOR_BOTTOM_RATIO: f32 = 0.96;
const CUSTOM_TITLE_RATIO: f32 = 0.6;
const AUTHOR_FONT_RATIO: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Custom,
}

impl Theme {
    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Custom => "custom",
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "custom" => Ok(Theme::Custom),
            other => Err(Error::Config(format!(
                "unknown theme {other:?} (expected dark, light or custom)"
            ))),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriangleDirection {
    #[default]
    Bottom,
    Top,
}

impl TriangleDirection {
    pub fn name(self) -> &'static str {
        match self {
            TriangleDirection::Bottom => "bottom",
            TriangleDirection::Top => "top",
        }
    }
}

impl FromStr for TriangleDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bottom" => Ok(TriangleDirection::Bottom),
            "top" => Ok(TriangleDirection::Top),
            other => Err(Error::Config(format!(
                "unknown triangle direction {other:?} (expected top or bottom)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangleConfig {
    pub enabled: bool,
    pub direction: TriangleDirection,
}

impl Default for TriangleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            direction: TriangleDirection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub theme: Theme,
    pub flip: bool,
    /// Ignored by the `custom` theme.
    pub triangle: Option<TriangleConfig>,
}

impl ThemeConfig {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            flip: false,
            triangle: None,
        }
    }

    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    pub fn with_triangle(mut self, direction: TriangleDirection) -> Self {
        self.triangle = Some(TriangleConfig {
            enabled: true,
            direction,
        });
        self
    }

    pub fn triangle_direction(&self) -> Option<TriangleDirection> {
        if self.theme == Theme::Custom {
            return None;
        }
        self.triangle
            .filter(|triangle| triangle.enabled)
            .map(|triangle| triangle.direction)
    }

    /// Short descriptive name such as `dark_flip_top` or `custom_std`.
    pub fn name(&self) -> String {
        let flip = if self.flip { "flip" } else { "std" };
        match self.triangle_direction() {
            Some(direction) => format!("{}_{flip}_{}", self.theme, direction.name()),
            None => format!("{}_{flip}", self.theme),
        }
    }

    /// Every named variant: dark and light across flip and triangle
    /// direction, then custom across flip.
    pub fn matrix() -> Vec<ThemeConfig> {
        let mut out = Vec::new();
        for theme in [Theme::Dark, Theme::Light] {
            for flip in [false, true] {
                for direction in [TriangleDirection::Bottom, TriangleDirection::Top] {
                    out.push(
                        ThemeConfig::new(theme)
                            .with_flip(flip)
                            .with_triangle(direction),
                    );
                }
            }
        }
        for flip in [false, true] {
            out.push(ThemeConfig::new(Theme::Custom).with_flip(flip));
        }
        out
    }
}

/// Caller-resolved files and strings a theme draws with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeAssets {
    /// Background image; overrides the palette for dark/light, required for custom.
    pub template: Option<PathBuf>,
    pub logo: Option<PathBuf>,
    pub side_image: Option<PathBuf>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub title: Color,
    pub author: Color,
    /// Fill of the accent triangle; matches the text panel so the seam reads as a slope.
    pub accent: Color,
    pub side_from: Color,
    pub side_to: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Palette {
        match theme {
            Theme::Dark | Theme::Custom => Palette {
                background: Color::rgb(0x10, 0x10, 0x14),
                title: Color::WHITE,
                author: Color::rgb(0xa0, 0xa0, 0xa8),
                accent: Color::rgb(0x10, 0x10, 0x14),
                side_from: Color::rgb(0x2a, 0x2a, 0x35),
                side_to: Color::rgb(0x4a, 0x4a, 0x5a),
            },
            Theme::Light => Palette {
                background: Color::rgb(0xf5, 0xf5, 0xf7),
                title: Color::rgb(0x11, 0x11, 0x11),
                author: Color::rgb(0x55, 0x55, 0x55),
                accent: Color::rgb(0xf5, 0xf5, 0xf7),
                side_from: Color::rgb(0xd8, 0xd8, 0xe0),
                side_to: Color::rgb(0xb8, 0xb8, 0xc8),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn mirrored(self, canvas_width: u32) -> Rect {
        Rect {
            x: canvas_width as i32 - self.x - self.width as i32,
            ..self
        }
    }
}

impl From<Rect> for TextBox {
    fn from(rect: Rect) -> Self {
        TextBox::new(rect.x, rect.y, rect.width, rect.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub points: [(i32, i32); 3],
    pub color: Color,
    pub direction: TriangleDirection,
}

impl Triangle {
    pub fn mirrored(self, canvas_width: u32) -> Triangle {
        let w = canvas_width as i32;
        Triangle {
            points: self.points.map(|(x, y)| (w - x, y)),
            ..self
        }
    }
}

/// Resolved element placement for one canvas size, in whole pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLayout {
    pub width: u32,
    pub height: u32,
    pub title: Rect,
    pub author: Option<Rect>,
    pub logo: Option<Rect>,
    pub side: Option<Rect>,
    pub triangle: Option<Triangle>,
    pub flipped: bool,
}

fn frac(value: u32, ratio: f32) -> i32 {
    (value as f32 * ratio).round() as i32
}

impl TemplateLayout {
    pub fn for_theme(config: &ThemeConfig, width: u32, height: u32) -> TemplateLayout {
        let layout = if config.theme == Theme::Custom {
            TemplateLayout {
                width,
                height,
                title: Rect::new(0, 0, frac(width, CUSTOM_TITLE_RATIO) as u32, height),
                author: None,
                logo: None,
                side: None,
                triangle: None,
                flipped: false,
            }
        } else {
            Self::split(config, width, height)
        };
        if config.flip {
            layout.flipped()
        } else {
            layout
        }
    }

    fn split(config: &ThemeConfig, width: u32, height: u32) -> TemplateLayout {
        let w = width as i32;
        let h = height as i32;
        let seam = frac(width, SEAM_RATIO);
        let edge = frac(width, EDGE_RATIO);
        let text_right = seam - frac(width, SEAM_GAP_RATIO);
        let text_width = (text_right - edge).max(1) as u32;
        let span = |top: f32, bottom: f32| {
            let y0 = frac(height, top);
            (y0, (frac(height, bottom) - y0).max(1) as u32)
        };
        let (title_y, title_h) = span(TITLE_TOP_RATIO, TITLE_BOTTOM_RATIO);
        let (author_y, author_h) = span(AUTHOR_TOP_RATIO, AUTHOR_BOTTOM_RATIO);
        let logo_size = frac(height, LOGO_SIZE_RATIO).max(1) as u32;
        let palette = Palette::for_theme(config.theme);
        let triangle = config.triangle_direction().map(|direction| {
            let tip = seam + frac(width, TRIANGLE_WIDTH_RATIO);
            let points = match direction {
                TriangleDirection::Bottom => [(seam, 0), (tip, 0), (seam, h)],
                TriangleDirection::Top => [(seam, h), (tip, h), (seam, 0)],
            };
            Triangle {
                points,
                color: palette.accent,
                direction,
            }
        });
        TemplateLayout {
            width,
            height,
            title: Rect::new(edge, title_y, text_width, title_h),
            author: Some(Rect::new(edge, author_y, text_width, author_h)),
            logo: Some(Rect::new(
                edge,
                frac(height, LOGO_TOP_RATIO),
                logo_size,
                logo_size,
            )),
            side: Some(Rect::new(seam, 0, (w - seam).max(1) as u32, height)),
            triangle,
            flipped: false,
        }
    }

    /// Mirrors placement horizontally. Applying it twice restores the layout.
    pub fn flipped(&self) -> TemplateLayout {
        let w = self.width;
        TemplateLayout {
            width: self.width,
            height: self.height,
            title: self.title.mirrored(w),
            author: self.author.map(|rect| rect.mirrored(w)),
            logo: self.logo.map(|rect| rect.mirrored(w)),
            side: self.side.map(|rect| rect.mirrored(w)),
            triangle: self.triangle.map(|triangle| triangle.mirrored(w)),
            flipped: !self.flipped,
        }
    }
}

/// Renders a themed thumbnail.
///
/// Missing logo or side image files fall back to built-in artwork with a
/// warning; an unreadable template is fatal.
pub fn compose(
    config: &ThemeConfig,
    assets: &ThemeAssets,
    title: &TextSpec,
    engine: &TextLayoutEngine,
    fonts: &FontSet,
    width: u32,
    height: u32,
) -> Result<Canvas> {
    if config.theme == Theme::Custom && assets.template.is_none() {
        return Err(Error::Config(
            "the custom theme needs a template image".to_string(),
        ));
    }
    let layout = TemplateLayout::for_theme(config, width, height);
    let palette = Palette::for_theme(config.theme);

    let mut canvas = match &assets.template {
        Some(path) => {
            let image = load_fitted(path, width, height, true).map_err(|err| {
                Error::Render(format!("template {}: {err}", path.display()))
            })?;
            Canvas::from_rgba(width, height, image.to_rgba8().as_raw())?
        }
        None => Canvas::filled(width, height, palette.background)?,
    };

    let mut shapes = String::new();
    if config.theme != Theme::Custom {
        if let Some(rect) = layout.side {
            draw_side(&mut canvas, rect, assets, &palette)?;
        }
        if let Some(triangle) = &layout.triangle {
            shapes.push_str(&polygon(&triangle.points, triangle.color));
        }
        if let Some(rect) = layout.logo {
            if !draw_logo(&mut canvas, rect, assets) {
                shapes.push_str(&logo_badge(
                    rect.x,
                    rect.y,
                    rect.width,
                    palette.title,
                    palette.background,
                ));
            }
        }
    }
    rasterize_overlay(&mut canvas, &shapes, fonts.database())?;

    let mut text = String::new();
    if let (Some(rect), Some(author)) = (layout.author, assets.author.as_deref()) {
        if !author.trim().is_empty() {
            let size = ((rect.height as f32) * AUTHOR_FONT_RATIO).round().max(1.0) as u32;
            match engine.layout(
                author,
                rect.into(),
                size,
                title.font.as_deref(),
                Position::Named(Anchor::Center),
                fonts.options(),
            ) {
                Ok(block) => text.push_str(&text_layer(&block, palette.author)),
                Err(err) => tracing::warn!(%err, "author line skipped"),
            }
        }
    }
    let block = if layout.flipped {
        engine.layout_mirrored(
            &title.text,
            layout.title.into(),
            title.font_size,
            title.font.as_deref(),
            title.position,
            fonts.options(),
            width,
        )?
    } else {
        engine.layout(
            &title.text,
            layout.title.into(),
            title.font_size,
            title.font.as_deref(),
            title.position,
            fonts.options(),
        )?
    };
    text.push_str(&text_layer(&block, title.color.unwrap_or(palette.title)));
    rasterize_overlay(&mut canvas, &text, fonts.database())?;
    Ok(canvas)
}

fn draw_side(
    canvas: &mut Canvas,
    rect: Rect,
    assets: &ThemeAssets,
    palette: &Palette,
) -> Result<()> {
    if let Some(path) = &assets.side_image {
        match load_fitted(path, rect.width, rect.height, true) {
            Ok(image) => {
                let rgba = image.to_rgba8();
                canvas.blit_rgba(
                    rect.x as i64,
                    rect.y as i64,
                    rgba.width(),
                    rgba.height(),
                    rgba.as_raw(),
                );
                return Ok(());
            }
            Err(err) => tracing::warn!(%err, "side image unavailable, using default panel"),
        }
    } else if assets.template.is_some() {
        return Ok(());
    }
    let panel = render_gradient(
        palette.side_from,
        palette.side_to,
        GradientDirection::Diagonal,
        rect.width,
        rect.height,
    )?;
    canvas.blit_rgba(
        rect.x as i64,
        rect.y as i64,
        rect.width,
        rect.height,
        &panel.to_rgba(),
    );
    Ok(())
}

/// Blits the logo file into `rect`, centered with its aspect kept. Returns
/// false when the built-in badge should be drawn instead.
fn draw_logo(canvas: &mut Canvas, rect: Rect, assets: &ThemeAssets) -> bool {
    let Some(path) = &assets.logo else {
        return false;
    };
    match load_fitted(path, rect.width, rect.height, false) {
        Ok(image) => {
            let rgba = image.to_rgba8();
            let x = rect.x + (rect.width as i32 - rgba.width() as i32) / 2;
            let y = rect.y + (rect.height as i32 - rgba.height() as i32) / 2;
            canvas.blit_rgba(x as i64, y as i64, rgba.width(), rgba.height(), rgba.as_raw());
            true
        }
        Err(err) => {
            tracing::warn!(%err, "logo unavailable, using default badge");
            false
        }
    }
}
