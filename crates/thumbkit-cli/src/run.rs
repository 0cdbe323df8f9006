use crate::args::{Args, BackgroundArg, FontCjkRegionArg};
use crate::config::{load_config, save_user_config};
use crate::interactive::run_interactive;
use crate::io::{init_logging, read_stdin_with, report_results};
use crate::parse::{
    parse_font_dirs, parse_log_level, parse_timeout_ms, parse_titles, region_from_locale_vars,
};
use clap::{CommandFactory, Parser};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use thumbkit_core::{
    BackgroundSpec, CjkRegion, Color, Composition, Config, GeminiClient, GeminiConfig,
    GenerationRequest, GradientDirection, ImageBackground, OptimizerOptions, OutputFormat,
    PatternParams, PatternSpec, Position, TemplateOptions, Theme, ThemeConfig, ThumbnailPipeline,
    TitleOptimizer, TriangleConfig, TriangleDirection, VariantSampler,
};
use tracing::level_filters::LevelFilter;

const DEFAULT_OUTPUT: &str = "thumbnail.png";
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

pub(crate) fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    run_with(args, atty::is(atty::Stream::Stdin), None)
}

pub(crate) fn run_with(
    args: Args,
    stdin_is_tty: bool,
    stdin_override: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    init_logging(resolve_log_level(args.log_level.as_deref()));

    let (mut config, is_default_config) = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let mut text = args.text.clone();
    if args.interactive {
        if !stdin_is_tty {
            return Err("interactive mode requires a TTY".into());
        }
        run_interactive(&mut config, &mut text)?;
        if is_default_config {
            let path = save_user_config(&config)?;
            tracing::info!(path = %path.display(), "saved user profile");
        }
    }
    if args.batch.is_some() && args.matrix {
        return Err("--batch cannot be combined with --matrix".into());
    }
    if args.random_theme {
        let mut sampler = VariantSampler::new(args.seed);
        let theme = sampler.next_theme(false);
        tracing::info!(variant = %theme.name(), "picked random theme");
        let assets = config
            .template
            .take()
            .map(|template| template.assets)
            .unwrap_or_default();
        config.template = Some(TemplateOptions { theme, assets });
    }

    let titles = if let Some(batch) = args.batch.as_deref() {
        let contents = if batch == "-" {
            read_stdin_with(stdin_override)?
        } else {
            fs::read_to_string(batch)
                .map_err(|err| format!("failed to read batch file {batch}: {err}"))?
        };
        let titles = parse_titles(&contents);
        if titles.is_empty() {
            return Err("batch input has no titles".into());
        }
        titles
    } else {
        match text.as_deref() {
            Some("-") => vec![read_stdin_with(stdin_override)?.trim().to_string()],
            Some(value) => vec![value.to_string()],
            None if !stdin_is_tty => vec![read_stdin_with(stdin_override)?.trim().to_string()],
            None => {
                let mut cmd = Args::command();
                cmd.print_help()?;
                println!();
                return Ok(());
            }
        }
    };

    let optimizer = build_optimizer(&config.optimizer, api_key_from_env());
    let pipeline = ThumbnailPipeline::new(config)?.with_optimizer(optimizer);
    let format = args.format.map(OutputFormat::from).unwrap_or(OutputFormat::Png);

    let results = if args.batch.is_some() {
        let dir = args.output.clone().unwrap_or_else(|| PathBuf::from("."));
        let style = pipeline
            .config()
            .request("", dir.join(format!("style.{}", format.extension())));
        pipeline.batch_texts(&titles, &style, &dir)
    } else {
        let title = titles.into_iter().next().unwrap_or_default();
        if args.matrix {
            let dir = args.output.clone().unwrap_or_else(|| PathBuf::from("."));
            let requests = matrix_requests(pipeline.config(), &title, &dir, format);
            pipeline.batch_generate(&requests)
        } else {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
            vec![pipeline.generate(&pipeline.config().request(title, output))]
        }
    };

    let stdout = io::stdout();
    let stderr = io::stderr();
    report_results(results, &mut stdout.lock(), &mut stderr.lock())?;
    Ok(())
}

fn resolve_log_level(arg: Option<&str>) -> LevelFilter {
    arg.and_then(parse_log_level)
        .or_else(|| env::var("THUMBKIT_LOG").ok().as_deref().and_then(parse_log_level))
        .unwrap_or(LevelFilter::WARN)
}

fn api_key_from_env() -> Option<String> {
    API_KEY_VARS.iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn build_optimizer(options: &OptimizerOptions, api_key: Option<String>) -> TitleOptimizer {
    if !options.enabled {
        return TitleOptimizer::disabled();
    }
    let Some(api_key) = api_key else {
        tracing::warn!("title optimization needs GEMINI_API_KEY or GOOGLE_API_KEY, skipping");
        return TitleOptimizer::new(None, options);
    };
    match GeminiClient::new(GeminiConfig::new(api_key, options)) {
        Ok(client) => TitleOptimizer::new(Some(Box::new(client)), options),
        Err(err) => {
            tracing::warn!(%err, "title optimizer unavailable");
            TitleOptimizer::new(None, options)
        }
    }
}

/// One request per theme variant, named after the variant. Custom variants
/// need a template image and are skipped without one.
fn matrix_requests(
    config: &Config,
    title: &str,
    dir: &Path,
    format: OutputFormat,
) -> Vec<GenerationRequest> {
    let assets = config
        .template
        .as_ref()
        .map(|template| template.assets.clone())
        .unwrap_or_default();
    ThemeConfig::matrix()
        .into_iter()
        .filter(|theme| {
            let usable = theme.theme != Theme::Custom || assets.template.is_some();
            if !usable {
                tracing::warn!(
                    variant = %theme.name(),
                    "skipping custom variant without a template"
                );
            }
            usable
        })
        .map(|theme| {
            let path = dir.join(format!("{}.{}", theme.name(), format.extension()));
            let mut request = config.request(title, path);
            request.composition = Composition::Template {
                theme,
                assets: assets.clone(),
            };
            request
        })
        .collect()
}

fn apply_overrides(config: &mut Config, args: &Args) -> Result<(), Box<dyn Error>> {
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(max_bytes) = args.max_bytes {
        config.max_bytes = (max_bytes > 0).then_some(max_bytes);
    }

    apply_background(config, args)?;
    apply_template(config, args);

    if let Some(size) = args.font_size {
        config.text.size = size;
    }
    if let Some(color) = args.text_color.as_deref() {
        config.text.color = Some(Color::parse(color)?);
    }
    if let Some(position) = args.position.as_deref() {
        config.text.position = position.parse::<Position>()?;
    }
    if let Some(family) = args.font_family.clone() {
        config.font.family = family;
    }
    if let Some(family) = args.font_cjk_family.clone() {
        config.font.cjk_family = Some(family).filter(|name| !name.trim().is_empty());
    }
    if let Some(file) = args.font_file.clone() {
        config.font.file = Some(file);
    }
    if let Some(dirs) = args.font_dirs.as_deref() {
        config.font.dirs = parse_font_dirs(dirs)?;
    }
    if let Some(system) = args.font_system {
        config.font.system_fonts = system;
    }
    if let Some(region) = args.font_cjk_region {
        config.font.cjk_region = match region {
            FontCjkRegionArg::Auto => {
                let vars = ["LC_ALL", "LC_CTYPE", "LANG"].map(|name| env::var(name).ok());
                region_from_locale_vars(vars.iter().map(Option::as_deref))
                    .unwrap_or(config.font.cjk_region)
            }
            FontCjkRegionArg::Sc => CjkRegion::Sc,
            FontCjkRegionArg::Tc => CjkRegion::Tc,
            FontCjkRegionArg::Hk => CjkRegion::Hk,
            FontCjkRegionArg::Jp => CjkRegion::Jp,
            FontCjkRegionArg::Kr => CjkRegion::Kr,
        };
    }

    if let Some(optimize) = args.optimize {
        config.optimizer.enabled = optimize;
    }
    if let Some(language) = args.target_language {
        config.optimizer.target_language = language.into();
    }
    if let Some(prompt) = args.prompt.clone() {
        config.optimizer.custom_prompt = Some(prompt);
    }
    if let Some(model) = args.model.clone() {
        config.optimizer.model = model;
    }
    if let Some(timeout) = args.optimizer_timeout.as_deref() {
        config.optimizer.timeout_ms = parse_timeout_ms(timeout)?;
    }

    if let Some(threads) = args.threads {
        config.batch.threads = threads;
    }
    if let Some(prefix) = args.prefix.clone() {
        config.batch.prefix = prefix;
    }

    let mut quantize_set = false;
    if let Some(opt) = args.png_opt {
        config.png.optimize = opt;
    }
    if let Some(level) = args.png_level {
        config.png.level = level;
    }
    if let Some(strip) = args.png_strip {
        config.png.strip = strip.into();
    }
    if let Some(quantize) = args.png_quantize {
        config.png.quantize = quantize;
        quantize_set = true;
    }
    if let Some(preset) = args.png_quantize_preset {
        config.png.quantize_preset = Some(preset.into());
        if !quantize_set {
            config.png.quantize = true;
        }
    }
    Ok(())
}

fn current_colors(background: &BackgroundSpec) -> (Color, Color) {
    match background {
        BackgroundSpec::Solid { color } => (*color, *color),
        BackgroundSpec::Gradient { color1, color2, .. } => (*color1, *color2),
        BackgroundSpec::Pattern(pattern) => (pattern.color1, pattern.color2),
        BackgroundSpec::Image(_) => (Color::rgb(0x66, 0x7e, 0xea), Color::rgb(0x76, 0x4b, 0xa2)),
    }
}

/// Background flags replace the profile background and drop any theme template.
fn apply_background(config: &mut Config, args: &Args) -> Result<(), Box<dyn Error>> {
    let colors_set = args.color1.is_some() || args.color2.is_some() || args.direction.is_some();
    let kind = args.background.or_else(|| {
        if args.image.is_some() {
            Some(BackgroundArg::Image)
        } else if args.pattern.is_some() {
            Some(BackgroundArg::Pattern)
        } else if colors_set {
            Some(match config.background {
                BackgroundSpec::Solid { .. } if args.color2.is_none() => BackgroundArg::Solid,
                BackgroundSpec::Pattern(_) => BackgroundArg::Pattern,
                _ => BackgroundArg::Gradient,
            })
        } else {
            None
        }
    });
    let Some(kind) = kind else {
        return Ok(());
    };

    let (current1, current2) = current_colors(&config.background);
    let color1 = args
        .color1
        .as_deref()
        .map(Color::parse)
        .transpose()?
        .unwrap_or(current1);
    let color2 = args
        .color2
        .as_deref()
        .map(Color::parse)
        .transpose()?
        .unwrap_or(current2);

    config.background = match kind {
        BackgroundArg::Solid => BackgroundSpec::Solid { color: color1 },
        BackgroundArg::Gradient => {
            let current = match config.background {
                BackgroundSpec::Gradient { direction, .. } => direction,
                _ => GradientDirection::Diagonal,
            };
            BackgroundSpec::Gradient {
                color1,
                color2,
                direction: args.direction.map(Into::into).unwrap_or(current),
            }
        }
        BackgroundArg::Pattern => {
            let current = match &config.background {
                BackgroundSpec::Pattern(pattern) => Some(pattern),
                _ => None,
            };
            let name = args
                .pattern
                .as_deref()
                .or(current.map(|pattern| pattern.kind.name()))
                .unwrap_or("dots");
            // Shape settings carry over while the pattern kind stays the same.
            let (mut params, spacing) = match current {
                Some(pattern) if pattern.kind.name().eq_ignore_ascii_case(name.trim()) => {
                    (pattern.kind.params(), Some(pattern.spacing))
                }
                _ => (PatternParams::default(), None),
            };
            if let Some(orientation) = args.orientation {
                params.orientation = Some(orientation.into());
            }
            BackgroundSpec::Pattern(PatternSpec::from_parts(
                name,
                color1,
                color2,
                args.spacing.or(spacing),
                &params,
            )?)
        }
        BackgroundArg::Image => {
            let current = match &config.background {
                BackgroundSpec::Image(image) => Some(image.clone()),
                _ => None,
            };
            let mut image = match (args.image.clone(), current) {
                (Some(path), Some(current)) => ImageBackground { path, ..current },
                (Some(path), None) => ImageBackground::new(path),
                (None, Some(current)) => current,
                (None, None) => return Err("--background image needs --image <PATH>".into()),
            };
            if let Some(blur) = args.blur {
                image.blur_radius = blur;
            }
            if let Some(color) = args.overlay_color.as_deref() {
                image.overlay_color = Color::parse(color)?;
            }
            if let Some(opacity) = args.overlay_opacity {
                image.overlay_opacity = opacity;
            }
            image.validate()?;
            BackgroundSpec::Image(image)
        }
    };
    config.template = None;
    Ok(())
}

fn apply_template(config: &mut Config, args: &Args) {
    let wanted = args.theme.is_some()
        || args.flip.is_some()
        || args.triangle.is_some()
        || args.template.is_some()
        || args.logo.is_some()
        || args.side_image.is_some()
        || args.author.is_some();
    if !wanted {
        return;
    }
    let mut template = config.template.take().unwrap_or_else(|| TemplateOptions {
        theme: ThemeConfig::new(Theme::Dark).with_triangle(TriangleDirection::Bottom),
        ..TemplateOptions::default()
    });
    if let Some(theme) = args.theme {
        template.theme.theme = theme.into();
    }
    if let Some(flip) = args.flip {
        template.theme.flip = flip;
    }
    if let Some(triangle) = args.triangle {
        template.theme.triangle = Some(match triangle.direction() {
            Some(direction) => TriangleConfig {
                enabled: true,
                direction,
            },
            None => TriangleConfig {
                enabled: false,
                ..TriangleConfig::default()
            },
        });
    }
    if let Some(path) = args.template.clone() {
        template.assets.template = Some(path);
    }
    if let Some(path) = args.logo.clone() {
        template.assets.logo = Some(path);
    }
    if let Some(path) = args.side_image.clone() {
        template.assets.side_image = Some(path);
    }
    if let Some(author) = args.author.clone() {
        template.assets.author = Some(author).filter(|value| !value.trim().is_empty());
    }
    config.template = Some(template);
}
