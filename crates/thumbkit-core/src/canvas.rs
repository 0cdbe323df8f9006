use std::fs;
use std::path::{Path, PathBuf};

use crate::encode::encode_canvas;
use crate::{Color, Error, OutputFormat, PngOptions, Result};

/// Fixed-size RGBA raster every layer is drawn into.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pixmap: tiny_skia::Pixmap,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| Error::Render(format!("invalid canvas size {width}x{height}")))?;
        Ok(Self { pixmap })
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self> {
        let mut canvas = Canvas::new(width, height)?;
        canvas.pixmap.fill(color.to_skia());
        Ok(canvas)
    }

    /// Builds a canvas from straight-alpha RGBA8 bytes.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(Error::Render(format!(
                "rgba buffer has {} bytes, expected {expected}",
                rgba.len()
            )));
        }
        let mut canvas = Canvas::new(width, height)?;
        for (dst, src) in canvas
            .pixmap
            .data_mut()
            .chunks_exact_mut(4)
            .zip(rgba.chunks_exact(4))
        {
            let color = Color::rgba(src[0], src[1], src[2], src[3]);
            dst.copy_from_slice(&color.premultiplied());
        }
        Ok(canvas)
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let pixel = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(
            pixel.red(),
            pixel.green(),
            pixel.blue(),
            pixel.alpha(),
        ))
    }

    pub(crate) fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        let idx = (y as usize * self.width() as usize + x as usize) * 4;
        self.pixmap.data_mut()[idx..idx + 4].copy_from_slice(&color.premultiplied());
    }

    /// Straight-alpha RGBA8 copy of the pixels.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect()
    }

    /// Source-over copy of straight-alpha `rgba` with its top-left corner at (`x`, `y`).
    /// Pixels falling outside the canvas are dropped.
    pub(crate) fn blit_rgba(&mut self, x: i64, y: i64, width: u32, height: u32, rgba: &[u8]) {
        for row in 0..height as i64 {
            let dy = y + row;
            if dy < 0 || dy >= self.height() as i64 {
                continue;
            }
            for col in 0..width as i64 {
                let dx = x + col;
                if dx < 0 || dx >= self.width() as i64 {
                    continue;
                }
                let idx = ((row * width as i64 + col) * 4) as usize;
                let src = Color::rgba(rgba[idx], rgba[idx + 1], rgba[idx + 2], rgba[idx + 3]);
                if src.a == 0 {
                    continue;
                }
                let base = self.pixel(dx as u32, dy as u32).unwrap_or(Color::BLACK);
                let blended =
                    base.blend_over(Color::rgb(src.r, src.g, src.b), src.a as f32 / 255.0);
                self.set_pixel(dx as u32, dy as u32, blended);
            }
        }
    }

    pub(crate) fn pixmap(&self) -> &tiny_skia::Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut tiny_skia::Pixmap {
        &mut self.pixmap
    }

    pub fn encode(
        &self,
        format: OutputFormat,
        quality: u8,
        png: &PngOptions,
        max_bytes: Option<u64>,
    ) -> Result<Vec<u8>> {
        encode_canvas(self, format, quality, png, max_bytes)
    }

    /// Encodes by extension and writes `path`; the canvas is released afterwards.
    pub fn save(
        self,
        path: &Path,
        quality: u8,
        png: &PngOptions,
        max_bytes: Option<u64>,
    ) -> Result<PathBuf> {
        let format = OutputFormat::from_path(path)?;
        let bytes = self.encode(format, quality, png, max_bytes)?;
        drop(self);
        write_atomic(path, &bytes)?;
        Ok(path.to_path_buf())
    }
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| Error::Config(format!("invalid output path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.partial"));
    if let Err(err) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}
