use std::sync::Arc;

use crate::svg::svg_document;
use crate::{Canvas, Error, Result};

/// Draws an SVG fragment sized to the canvas on top of its current pixels.
pub(crate) fn rasterize_overlay(
    canvas: &mut Canvas,
    body: &str,
    fontdb: &Arc<usvg::fontdb::Database>,
) -> Result<()> {
    if body.is_empty() {
        return Ok(());
    }
    let svg = svg_document(canvas.width(), canvas.height(), body);
    let mut opt = usvg::Options::default();
    opt.fontdb = Arc::clone(fontdb);
    let tree = usvg::Tree::from_str(&svg, &opt)
        .map_err(|err| Error::Render(format!("usvg parse: {err}")))?;
    let mut pixmap_mut = canvas.pixmap_mut().as_mut();
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    Ok(())
}
