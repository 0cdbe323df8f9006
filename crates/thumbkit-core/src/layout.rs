use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use unicode_width::UnicodeWidthChar;

use crate::svg::text_line_svg;
use crate::{
    Error, FontFace, FontFamilies, FontOptions, FontSet, LayoutOptions, Result,
    FONT_HEIGHT_TO_WIDTH_RATIO,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Where a text block goes inside its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition", into = "RawPosition")]
pub enum Position {
    Named(Anchor),
    /// Top-left corner of the block, in canvas pixels. A flipped template
    /// mirrors it to `canvas_width - x` and makes it the top-right corner.
    Point { x: i32, y: i32 },
}

/// Horizontal alignment of the lines within a fitted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
    End,
}

/// Resolved placement: a named anchor, or a block edge pinned to a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Named(Anchor),
    Start { x: i32, y: i32 },
    End { x: i32, y: i32 },
}

impl From<Position> for Placement {
    fn from(position: Position) -> Self {
        match position {
            Position::Named(anchor) => Placement::Named(anchor),
            Position::Point { x, y } => Placement::Start { x, y },
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::Named(Anchor::Center)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPosition {
    Name(String),
    Point([i32; 2]),
}

impl TryFrom<RawPosition> for Position {
    type Error = Error;

    fn try_from(raw: RawPosition) -> Result<Self> {
        match raw {
            RawPosition::Name(value) => value.parse(),
            RawPosition::Point([x, y]) => Ok(Position::Point { x, y }),
        }
    }
}

impl From<Position> for RawPosition {
    fn from(value: Position) -> Self {
        match value {
            Position::Named(_) => RawPosition::Name(value.to_string()),
            Position::Point { x, y } => RawPosition::Point([x, y]),
        }
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        match raw.to_ascii_lowercase().as_str() {
            "top" => return Ok(Position::Named(Anchor::Top)),
            "center" | "centre" | "middle" => return Ok(Position::Named(Anchor::Center)),
            "bottom" => return Ok(Position::Named(Anchor::Bottom)),
            _ => {}
        }
        let parts = raw.split(',').map(str::trim).collect::<Vec<_>>();
        if let [x, y] = parts.as_slice() {
            if let (Ok(x), Ok(y)) = (x.parse::<i32>(), y.parse::<i32>()) {
                return Ok(Position::Point { x, y });
            }
        }
        Err(Error::Config(format!(
            "invalid position {raw:?} (expected top, center, bottom or x,y)"
        )))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Named(Anchor::Top) => f.write_str("top"),
            Position::Named(Anchor::Center) => f.write_str("center"),
            Position::Named(Anchor::Bottom) => f.write_str("bottom"),
            Position::Point { x, y } => write!(f, "{x},{y}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl TextBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Horizontal advance of a single line of text.
pub trait TextMeasure: Send + Sync {
    fn line_width(
        &self,
        text: &str,
        font_size: u32,
        face: FontFace,
        families: &FontFamilies,
    ) -> f32;
}

/// Fixed-pitch model: one cell per narrow character, two per wide one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellMeasure;

impl TextMeasure for CellMeasure {
    fn line_width(&self, text: &str, font_size: u32, _: FontFace, _: &FontFamilies) -> f32 {
        text_width_cells(text) as f32 * font_size as f32 / FONT_HEIGHT_TO_WIDTH_RATIO
    }
}

/// Measures with the same usvg text pipeline that later renders the line.
#[derive(Clone)]
pub struct FontMeasure {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl FontMeasure {
    pub fn new(fonts: &FontSet) -> Self {
        Self {
            fontdb: Arc::clone(fonts.database()),
        }
    }

    fn shaped_width(
        &self,
        text: &str,
        font_size: u32,
        face: FontFace,
        families: &FontFamilies,
    ) -> Option<f32> {
        let svg = text_line_svg(text, font_size, face, families);
        let mut opt = usvg::Options::default();
        opt.fontdb = Arc::clone(&self.fontdb);
        let tree = usvg::Tree::from_str(&svg, &opt).ok()?;
        if !tree.root().has_children() {
            return None;
        }
        Some(tree.root().abs_bounding_box().width())
    }
}

impl fmt::Debug for FontMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontMeasure")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl TextMeasure for FontMeasure {
    fn line_width(
        &self,
        text: &str,
        font_size: u32,
        face: FontFace,
        families: &FontFamilies,
    ) -> f32 {
        if text.trim().is_empty() {
            return 0.0;
        }
        self.shaped_width(text, font_size, face, families)
            .unwrap_or_else(|| CellMeasure.line_width(text, font_size, face, families))
    }
}

pub(crate) fn text_width_cells(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

/// A fitted text block; coordinates are canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: u32,
    pub lines: Vec<String>,
    pub line_widths: Vec<f32>,
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
    pub line_height: f32,
    pub face: FontFace,
    pub families: FontFamilies,
    /// Named anchors center each line; points align lines to the pinned edge.
    pub align: TextAlign,
    /// Every size tried, largest first.
    pub attempts: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    space_before: bool,
}

#[derive(Clone)]
pub struct TextLayoutEngine {
    options: LayoutOptions,
    measure: Arc<dyn TextMeasure>,
}

impl fmt::Debug for TextLayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextLayoutEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

struct FitRegion {
    x: i32,
    y: i32,
    width: f32,
    height: f32,
}

impl TextLayoutEngine {
    pub fn new(options: LayoutOptions, measure: Arc<dyn TextMeasure>) -> Self {
        Self { options, measure }
    }

    pub fn with_cell_measure(options: LayoutOptions) -> Self {
        Self::new(options, Arc::new(CellMeasure))
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn layout(
        &self,
        text: &str,
        area: TextBox,
        requested_size: u32,
        family_hint: Option<&str>,
        position: Position,
        fonts: &FontOptions,
    ) -> Result<TextLayout> {
        self.layout_at(text, area, requested_size, family_hint, position.into(), fonts)
    }

    /// Lays out text for a horizontally mirrored canvas. A point position is
    /// reflected to `canvas_width - x` and the block ends at that column.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn layout_mirrored(
        &self,
        text: &str,
        area: TextBox,
        requested_size: u32,
        family_hint: Option<&str>,
        position: Position,
        fonts: &FontOptions,
        canvas_width: u32,
    ) -> Result<TextLayout> {
        let placement = match position {
            Position::Point { x, y } => Placement::End {
                x: canvas_width as i32 - x,
                y,
            },
            Position::Named(anchor) => Placement::Named(anchor),
        };
        self.layout_at(text, area, requested_size, family_hint, placement, fonts)
    }

    fn layout_at(
        &self,
        text: &str,
        area: TextBox,
        requested_size: u32,
        family_hint: Option<&str>,
        placement: Placement,
        fonts: &FontOptions,
    ) -> Result<TextLayout> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Config("title text is empty".to_string()));
        }
        if requested_size == 0 {
            return Err(Error::Config("font size must be positive".to_string()));
        }
        let face = FontFace::detect(text, self.options.cjk_font_threshold);
        let families = FontFamilies::resolve(fonts, family_hint, text);
        let region = self.fit_region(area, placement)?;
        let paragraphs = tokenize(text);

        let floor = self.options.min_font_size.min(requested_size).max(1);
        let step = self.options.shrink_step.max(1);
        // A block is at least one font size tall, so larger sizes never fit.
        let mut size = requested_size.min(region.height as u32).max(floor);
        let mut attempts = Vec::new();
        loop {
            attempts.push(size);
            if let Some(lines) = self.try_fit(&paragraphs, size, face, &families, &region, false) {
                return Ok(self.finish(
                    lines, size, face, families, area, &region, placement, attempts,
                ));
            }
            tracing::debug!(size, "text does not fit, shrinking");
            if size <= floor {
                break;
            }
            size = size.saturating_sub(step).max(floor);
        }

        if let Some(lines) = self.try_fit(&paragraphs, size, face, &families, &region, true) {
            return Ok(self.finish(
                lines, size, face, families, area, &region, placement, attempts,
            ));
        }
        Err(Error::Render(format!(
            "text {text:?} does not fit a {}x{} box even at {size}px",
            area.width, area.height
        )))
    }

    fn fit_region(&self, area: TextBox, placement: Placement) -> Result<FitRegion> {
        let margin_x = (area.width as f32 * self.options.margin_ratio).round() as i32;
        let margin_y = (area.height as f32 * self.options.margin_ratio).round() as i32;
        let outside = |x: i32, y: i32| {
            Error::Config(format!(
                "text position {x},{y} lies outside the {}x{} box at {},{}",
                area.width, area.height, area.x, area.y
            ))
        };
        match placement {
            Placement::Named(_) => Ok(FitRegion {
                x: area.x + margin_x,
                y: area.y + margin_y,
                width: (area.width as i32 - 2 * margin_x).max(0) as f32,
                height: (area.height as i32 - 2 * margin_y).max(0) as f32,
            }),
            Placement::Start { x, y } => {
                if !area.contains(x, y) {
                    return Err(outside(x, y));
                }
                Ok(FitRegion {
                    x,
                    y,
                    width: (area.right() - margin_x - x).max(0) as f32,
                    height: (area.bottom() - margin_y - y).max(0) as f32,
                })
            }
            // `x` is the exclusive right edge of the block.
            Placement::End { x, y } => {
                if !area.contains(x - 1, y) {
                    return Err(outside(x, y));
                }
                Ok(FitRegion {
                    x: area.x + margin_x,
                    y,
                    width: (x - area.x - margin_x).max(0) as f32,
                    height: (area.bottom() - margin_y - y).max(0) as f32,
                })
            }
        }
    }

    fn block_height(&self, lines: usize, size: u32) -> f32 {
        let line_height = size as f32 * self.options.line_spacing;
        line_height * lines.saturating_sub(1) as f32 + size as f32
    }

    fn try_fit(
        &self,
        paragraphs: &[Vec<Token>],
        size: u32,
        face: FontFace,
        families: &FontFamilies,
        region: &FitRegion,
        break_words: bool,
    ) -> Option<Vec<String>> {
        let measure = |line: &str| self.measure.line_width(line, size, face, families);
        let mut lines = Vec::new();
        for paragraph in paragraphs {
            lines.extend(wrap_tokens(paragraph, region.width, break_words, &measure)?);
        }
        if self.options.max_lines > 0 && lines.len() > self.options.max_lines {
            return None;
        }
        if self.block_height(lines.len(), size) > region.height {
            return None;
        }
        Some(lines)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        lines: Vec<String>,
        size: u32,
        face: FontFace,
        families: FontFamilies,
        area: TextBox,
        region: &FitRegion,
        placement: Placement,
        attempts: Vec<u32>,
    ) -> TextLayout {
        let line_widths = lines
            .iter()
            .map(|line| self.measure.line_width(line, size, face, &families))
            .collect::<Vec<_>>();
        let width = line_widths.iter().copied().fold(0.0f32, f32::max).ceil() as u32;
        let height = self.block_height(lines.len(), size).ceil() as u32;
        let margin_y = region.y - area.y;
        let (origin_x, origin_y, align) = match placement {
            Placement::Start { x, y } => (x, y, TextAlign::Start),
            Placement::End { x, y } => (x - width as i32, y, TextAlign::End),
            Placement::Named(anchor) => {
                let x = region.x + ((region.width - width as f32) / 2.0).floor().max(0.0) as i32;
                let y = match anchor {
                    Anchor::Top => region.y,
                    Anchor::Bottom => area.bottom() - margin_y - height as i32,
                    Anchor::Center => area.y + (area.height as i32 - height as i32) / 2,
                };
                (x, y, TextAlign::Center)
            }
        };
        TextLayout {
            font_size: size,
            lines,
            line_widths,
            origin_x,
            origin_y,
            width,
            height,
            line_height: size as f32 * self.options.line_spacing,
            face,
            families,
            align,
            attempts,
        }
    }
}

fn is_wide(ch: char) -> bool {
    UnicodeWidthChar::width(ch).unwrap_or(0) >= 2
}

/// One token list per hard line; wide characters are single-character tokens.
fn tokenize(text: &str) -> Vec<Vec<Token>> {
    text.lines()
        .map(|line| {
            let mut tokens = Vec::new();
            let mut current = String::new();
            let mut space_before = false;
            let mut pending_space = false;
            for ch in line.chars() {
                if ch.is_whitespace() {
                    if !current.is_empty() {
                        tokens.push(Token {
                            text: std::mem::take(&mut current),
                            space_before,
                        });
                    }
                    pending_space = true;
                    continue;
                }
                if is_wide(ch) {
                    if !current.is_empty() {
                        tokens.push(Token {
                            text: std::mem::take(&mut current),
                            space_before,
                        });
                        pending_space = false;
                    }
                    tokens.push(Token {
                        text: ch.to_string(),
                        space_before: pending_space,
                    });
                    pending_space = false;
                    continue;
                }
                if current.is_empty() {
                    space_before = pending_space;
                    pending_space = false;
                }
                current.push(ch);
            }
            if !current.is_empty() {
                tokens.push(Token {
                    text: current,
                    space_before,
                });
            }
            tokens
        })
        .collect()
}

fn wrap_tokens(
    tokens: &[Token],
    max_width: f32,
    break_words: bool,
    measure: &dyn Fn(&str) -> f32,
) -> Option<Vec<String>> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for token in tokens {
        if !current.is_empty() {
            let mut candidate = current.clone();
            if token.space_before {
                candidate.push(' ');
            }
            candidate.push_str(&token.text);
            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }
        if measure(&token.text) <= max_width {
            current = token.text.clone();
            continue;
        }
        if !break_words {
            return None;
        }
        for ch in token.text.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            if current.is_empty() {
                return None;
            }
            lines.push(std::mem::take(&mut current));
            current.push(ch);
            if measure(&current) > max_width {
                return None;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Some(lines)
}

#[cfg(test)]
pub(crate) fn wrap_for_test(text: &str, max_width: f32, size: u32) -> Option<Vec<String>> {
    let families = FontFamilies::resolve(&FontOptions::default(), None, text);
    let measure = |line: &str| CellMeasure.line_width(line, size, FontFace::Latin, &families);
    let mut out = Vec::new();
    for paragraph in tokenize(text) {
        out.extend(wrap_tokens(&paragraph, max_width, false, &measure)?);
    }
    Some(out)
}
