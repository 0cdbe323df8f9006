use crate::{
    Canvas, Error, OutputFormat, PngOptions, PngQuantPreset, PngStrip, Result,
    BUDGET_QUALITY_STEP, DEFAULT_PNG_QUANTIZE_DITHER, DEFAULT_PNG_QUANTIZE_QUALITY,
    DEFAULT_PNG_QUANTIZE_SPEED, MAX_PNG_OPT_LEVEL, MIN_BUDGET_QUALITY,
};
use std::io::Cursor;

/// Straight-alpha snapshot of a canvas, taken once per encode so the size
/// budget loop can re-encode without touching the pixmap again.
struct Frame<'a> {
    canvas: &'a Canvas,
    rgba: Vec<u8>,
}

impl<'a> Frame<'a> {
    fn new(canvas: &'a Canvas) -> Self {
        Self {
            canvas,
            rgba: canvas.to_rgba(),
        }
    }

    fn width(&self) -> u32 {
        self.canvas.width()
    }

    fn height(&self) -> u32 {
        self.canvas.height()
    }

    fn encode(&self, format: OutputFormat, quality: u8, png: &PngOptions) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Png => {
                let raw = if png.quantize {
                    self.quantized_png(png)?
                } else {
                    self.canvas
                        .pixmap()
                        .encode_png()
                        .map_err(|err| Error::Render(format!("png encode: {err}")))?
                };
                optimize_png(raw, png)
            }
            OutputFormat::Jpeg => self.jpeg(quality),
            OutputFormat::Webp => Ok(self.webp(quality)),
        }
    }

    fn jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let rgb: Vec<u8> = self
            .rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        let mut out = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut out), quality)
            .encode(&rgb, self.width(), self.height(), image::ExtendedColorType::Rgb8)
            .map_err(|err| Error::Render(format!("jpeg encode: {err}")))?;
        Ok(out)
    }

    fn webp(&self, quality: u8) -> Vec<u8> {
        webp::Encoder::from_rgba(&self.rgba, self.width(), self.height())
            .encode(f32::from(quality))
            .to_vec()
    }

    fn quantized_png(&self, png: &PngOptions) -> Result<Vec<u8>> {
        let (width, height) = (self.width() as usize, self.height() as usize);
        let pixels: Vec<imagequant::RGBA> = self
            .rgba
            .chunks_exact(4)
            .map(|px| imagequant::RGBA::new(px[0], px[1], px[2], px[3]))
            .collect();
        let settings = QuantizeSettings::for_options(png);

        let quant_err = |stage: &str, err: imagequant::Error| {
            Error::Render(format!("png quantize {stage}: {err:?}"))
        };
        let mut attr = imagequant::new();
        attr.set_quality(0, settings.quality.min(100))
            .map_err(|err| quant_err("quality", err))?;
        attr.set_speed(i32::from(settings.speed.clamp(1, 10)))
            .map_err(|err| quant_err("speed", err))?;
        let mut image = attr
            .new_image(pixels, width, height, 0.0)
            .map_err(|err| quant_err("image", err))?;
        let mut result = attr
            .quantize(&mut image)
            .map_err(|err| quant_err("palette", err))?;
        result
            .set_dithering_level(settings.dither.clamp(0.0, 1.0))
            .map_err(|err| quant_err("dither", err))?;
        let (palette, indices) = result
            .remapped(&mut image)
            .map_err(|err| quant_err("remap", err))?;
        write_indexed_png(&palette, &indices, self.width(), self.height())
    }
}

pub(crate) fn encode_canvas(
    canvas: &Canvas,
    format: OutputFormat,
    quality: u8,
    png: &PngOptions,
    max_bytes: Option<u64>,
) -> Result<Vec<u8>> {
    let frame = Frame::new(canvas);
    let quality = quality.clamp(1, 100);
    let mut bytes = frame.encode(format, quality, png)?;
    let Some(limit) = max_bytes else {
        return Ok(bytes);
    };
    if bytes.len() as u64 <= limit {
        return Ok(bytes);
    }

    match format {
        OutputFormat::Png if !png.quantize => {
            let quantized = PngOptions {
                quantize: true,
                ..png.clone()
            };
            bytes = frame.encode(format, quality, &quantized)?;
        }
        OutputFormat::Png => {}
        OutputFormat::Jpeg | OutputFormat::Webp => {
            let mut current = quality;
            while bytes.len() as u64 > limit && current > MIN_BUDGET_QUALITY {
                current = current
                    .saturating_sub(BUDGET_QUALITY_STEP)
                    .max(MIN_BUDGET_QUALITY);
                bytes = frame.encode(format, current, png)?;
                tracing::debug!(
                    quality = current,
                    size = bytes.len(),
                    "re-encoded under size budget"
                );
            }
        }
    }
    if bytes.len() as u64 > limit {
        tracing::warn!(
            size = bytes.len(),
            limit,
            "encoded image still exceeds the size budget"
        );
    }
    Ok(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct QuantizeSettings {
    quality: u8,
    speed: u8,
    dither: f32,
}

impl QuantizeSettings {
    /// A preset wins over the individual quantize fields.
    fn for_options(png: &PngOptions) -> Self {
        match png.quantize_preset {
            Some(PngQuantPreset::Fast) => Self {
                quality: 70,
                speed: 7,
                dither: 0.5,
            },
            Some(PngQuantPreset::Balanced) => Self {
                quality: DEFAULT_PNG_QUANTIZE_QUALITY,
                speed: DEFAULT_PNG_QUANTIZE_SPEED,
                dither: DEFAULT_PNG_QUANTIZE_DITHER,
            },
            Some(PngQuantPreset::Best) => Self {
                quality: 95,
                speed: 1,
                dither: 1.0,
            },
            None => Self {
                quality: png.quantize_quality,
                speed: png.quantize_speed,
                dither: png.quantize_dither,
            },
        }
    }
}

fn write_indexed_png(
    palette: &[imagequant::RGBA],
    indices: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    if indices.len() != width as usize * height as usize {
        return Err(Error::Render("png quantize: index buffer size mismatch".to_string()));
    }
    let rgb: Vec<u8> = palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
    let alpha: Vec<u8> = palette.iter().map(|c| c.a).collect();

    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(rgb);
    if alpha.iter().any(|&a| a < 255) {
        encoder.set_trns(alpha);
    }
    let png_err = |err: png::EncodingError| Error::Render(format!("png encode: {err}"));
    let mut writer = encoder.write_header().map_err(png_err)?;
    writer.write_image_data(indices).map_err(png_err)?;
    writer.finish().map_err(png_err)?;
    Ok(out)
}

fn optimize_png(raw: Vec<u8>, png: &PngOptions) -> Result<Vec<u8>> {
    if !png.optimize {
        return Ok(raw);
    }
    let mut options = oxipng::Options::from_preset(png.level.min(MAX_PNG_OPT_LEVEL));
    options.strip = match png.strip {
        PngStrip::None => oxipng::StripChunks::None,
        PngStrip::Safe => oxipng::StripChunks::Safe,
        PngStrip::All => oxipng::StripChunks::All,
    };
    oxipng::optimize_from_memory(&raw, &options)
        .map_err(|err| Error::Render(format!("png optimize: {err}")))
}
