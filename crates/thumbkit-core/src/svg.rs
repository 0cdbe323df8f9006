use crate::fonts::split_text_by_face;
use crate::{Color, FontFace, FontFamilies, TextAlign, TextLayout, BASELINE_RATIO};

/// Runs of one line paired with the `font-family` each should use.
///
/// A CJK-face line is shaped entirely with the CJK list (those faces carry
/// Latin glyphs too); a Latin-face line switches lists per run.
pub(crate) fn text_runs(
    line: &str,
    face: FontFace,
    families: &FontFamilies,
) -> Vec<(String, String)> {
    match face {
        FontFace::Cjk => vec![(families.css(FontFace::Cjk), line.to_string())],
        FontFace::Latin => split_text_by_face(line)
            .into_iter()
            .map(|(run_face, text)| (families.css(run_face), text))
            .collect(),
    }
}

#[allow(clippy::too_many_arguments)]
fn push_text_element(
    out: &mut String,
    line: &str,
    x: f32,
    baseline: f32,
    font_size: u32,
    anchor: &str,
    fill: Color,
    face: FontFace,
    families: &FontFamilies,
) {
    let runs = text_runs(line, face, families);
    out.push_str(&format!(
        r#"<text x="{x:.2}" y="{baseline:.2}" font-size="{font_size}" font-weight="bold" text-anchor="{anchor}" xml:space="preserve""#
    ));
    let (hex, opacity) = fill.svg_paint();
    out.push_str(&format!(r#" fill="{hex}""#));
    if opacity < 1.0 {
        out.push_str(&format!(r#" fill-opacity="{opacity:.3}""#));
    }
    out.push('>');
    for (family, text) in runs {
        out.push_str(&format!(
            r#"<tspan font-family="{}">{}</tspan>"#,
            escape_attr(&family),
            escape_text(&text)
        ));
    }
    out.push_str("</text>");
}

/// Standalone document holding one line, used to measure shaped width.
pub(crate) fn text_line_svg(
    line: &str,
    font_size: u32,
    face: FontFace,
    families: &FontFamilies,
) -> String {
    let chars = u32::try_from(line.chars().count()).unwrap_or(u32::MAX);
    let width = chars
        .saturating_add(2)
        .saturating_mul(font_size)
        .saturating_mul(2);
    let height = font_size.saturating_mul(2);
    let mut body = String::new();
    push_text_element(
        &mut body,
        line,
        0.0,
        font_size as f32 * BASELINE_RATIO,
        font_size,
        "start",
        Color::BLACK,
        face,
        families,
    );
    svg_document(width, height, &body)
}

/// `<text>` elements for every line of a fitted block.
pub(crate) fn text_layer(layout: &TextLayout, color: Color) -> String {
    let mut out = String::new();
    let top = layout.origin_y as f32;
    for (index, line) in layout.lines.iter().enumerate() {
        let baseline =
            top + index as f32 * layout.line_height + layout.font_size as f32 * BASELINE_RATIO;
        let left = layout.origin_x as f32;
        let (x, anchor) = match layout.align {
            TextAlign::Start => (left, "start"),
            TextAlign::Center => (left + layout.width as f32 / 2.0, "middle"),
            TextAlign::End => (left + layout.width as f32, "end"),
        };
        push_text_element(
            &mut out,
            line,
            x,
            baseline,
            layout.font_size,
            anchor,
            color,
            layout.face,
            &layout.families,
        );
    }
    out
}

pub(crate) fn polygon(points: &[(i32, i32)], color: Color) -> String {
    let (hex, opacity) = color.svg_paint();
    let coords = points
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(r#"<polygon points="{coords}" fill="{hex}" fill-opacity="{opacity:.3}"/>"#)
}

/// Rounded badge with a play glyph, drawn when no logo file is available.
pub(crate) fn logo_badge(x: i32, y: i32, size: u32, badge: Color, glyph: Color) -> String {
    let s = size as f32;
    let (badge_hex, _) = badge.svg_paint();
    let (glyph_hex, _) = glyph.svg_paint();
    let radius = s * 0.2;
    let (x, y) = (x as f32, y as f32);
    let p1 = (x + s * 0.38, y + s * 0.28);
    let p2 = (x + s * 0.38, y + s * 0.72);
    let p3 = (x + s * 0.74, y + s * 0.5);
    format!(
        r#"<rect x="{x:.2}" y="{y:.2}" width="{s:.2}" height="{s:.2}" rx="{radius:.2}" fill="{badge_hex}"/><polygon points="{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}" fill="{glyph_hex}"/>"#,
        p1.0, p1.1, p2.0, p2.1, p3.0, p3.1
    )
}

pub(crate) fn svg_document(width: u32, height: u32, body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">{body}</svg>"#
    )
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}
