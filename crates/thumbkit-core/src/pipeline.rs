use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;

use crate::render::rasterize_overlay;
use crate::svg::text_layer;
use crate::{
    compose, render_background, Canvas, Color, Composition, Config, Error, FontMeasure, FontSet,
    GenerationRequest, GenerationResult, OptimizedTitle, OutputFormat, Result, TextBox,
    TextLayoutEngine, TextMeasure, TextSpec, Theme, ThemeConfig, TitleOptimizer,
};

/// Turns generation requests into encoded thumbnails.
///
/// Fonts are loaded once at construction; the pipeline is shared read-only
/// across batch workers.
#[derive(Debug)]
pub struct ThumbnailPipeline {
    config: Config,
    fonts: FontSet,
    engine: TextLayoutEngine,
    optimizer: TitleOptimizer,
}

impl ThumbnailPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let fonts = FontSet::load(&config.font)?;
        let engine = TextLayoutEngine::new(config.layout, Arc::new(FontMeasure::new(&fonts)));
        Ok(Self {
            config,
            fonts,
            engine,
            optimizer: TitleOptimizer::disabled(),
        })
    }

    pub fn with_optimizer(mut self, optimizer: TitleOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_measure(mut self, measure: Arc<dyn TextMeasure>) -> Self {
        self.engine = TextLayoutEngine::new(self.config.layout, measure);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// Renders without touching the file system.
    pub fn render(&self, request: &GenerationRequest) -> Result<(Canvas, OptimizedTitle)> {
        request.validate()?;
        let title = if request.optimize_title {
            self.optimizer.maybe_optimize(&request.title.text)
        } else {
            OptimizedTitle::unchanged(request.title.text.clone())
        };
        let spec = TextSpec {
            text: title.text.clone(),
            ..request.title.clone()
        };
        let canvas = match &request.composition {
            Composition::Background(background) => {
                let mut canvas = render_background(background, request.width, request.height)?;
                let block = self.engine.layout(
                    &spec.text,
                    TextBox::new(0, 0, request.width, request.height),
                    spec.font_size,
                    spec.font.as_deref(),
                    spec.position,
                    self.fonts.options(),
                )?;
                let layer = text_layer(&block, spec.color.unwrap_or(Color::WHITE));
                rasterize_overlay(&mut canvas, &layer, self.fonts.database())?;
                canvas
            }
            Composition::Template { theme, assets } => compose(
                theme,
                assets,
                &spec,
                &self.engine,
                &self.fonts,
                request.width,
                request.height,
            )?,
        };
        Ok((canvas, title))
    }

    #[tracing::instrument(skip(self, request), fields(output = %request.output.display()))]
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let (canvas, title) = self.render(request)?;
        let path = canvas.save(
            &request.output,
            request.quality,
            &self.config.png,
            self.config.max_bytes,
        )?;
        tracing::info!(path = %path.display(), optimized = title.was_optimized, "wrote thumbnail");
        Ok(GenerationResult {
            path,
            title: title.text,
            was_optimized: title.was_optimized,
        })
    }

    /// Generates every request on a bounded worker pool. Results keep input
    /// order and a failed item never stops the others.
    pub fn batch_generate(&self, requests: &[GenerationRequest]) -> Vec<Result<GenerationResult>> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if self.config.batch.threads > 0 {
            builder = builder.num_threads(self.config.batch.threads);
        }
        match builder.build() {
            Ok(pool) => pool.install(|| {
                requests
                    .par_iter()
                    .map(|request| self.generate(request))
                    .collect()
            }),
            Err(err) => {
                tracing::warn!(%err, "failed to build thread pool, generating sequentially");
                requests.iter().map(|request| self.generate(request)).collect()
            }
        }
    }

    /// One thumbnail per text, styled like `style` and named
    /// `{prefix}_{index:03}.{ext}` (1-based) under `output_dir`.
    pub fn batch_texts(
        &self,
        texts: &[String],
        style: &GenerationRequest,
        output_dir: &Path,
    ) -> Vec<Result<GenerationResult>> {
        let ext = OutputFormat::from_path(&style.output)
            .map(OutputFormat::extension)
            .unwrap_or(OutputFormat::Png.extension());
        let requests = texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let mut request = style.clone();
                request.title.text = text.clone();
                request.output = output_dir.join(format!(
                    "{}_{:03}.{ext}",
                    self.config.batch.prefix,
                    index + 1
                ));
                request
            })
            .collect::<Vec<_>>();
        self.batch_generate(&requests)
    }
}

/// Seeded source of random theme variants; the same seed yields the same sequence.
#[derive(Debug, Clone)]
pub struct VariantSampler {
    rng: StdRng,
}

impl VariantSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn pick(&mut self, choices: &[ThemeConfig]) -> Result<ThemeConfig> {
        choices
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| Error::Config("no theme variants to choose from".to_string()))
    }

    /// A dark or light variant; `custom` needs a caller-supplied template so it
    /// is only drawn when `allow_custom` is set.
    pub fn next_theme(&mut self, allow_custom: bool) -> ThemeConfig {
        let choices = ThemeConfig::matrix()
            .into_iter()
            .filter(|config| allow_custom || config.theme != Theme::Custom)
            .collect::<Vec<_>>();
        self.pick(&choices)
            .unwrap_or_else(|_| ThemeConfig::new(Theme::Dark))
    }
}
