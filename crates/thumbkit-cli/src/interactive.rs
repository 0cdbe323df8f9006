use std::error::Error;
use std::path::PathBuf;
use thumbkit_core::{
    BackgroundSpec, Color, Config, GradientDirection, TemplateOptions, Theme, ThemeAssets,
    ThemeConfig, TriangleDirection,
};

use dialoguer::{Confirm, Input, Select};

pub(crate) const DEFAULT_INTERACTIVE_TITLE: &str = "测试标题 Test Title";

const STYLE_ITEMS: [&str; 4] = ["gradient", "dark", "light", "custom"];
const TRIANGLE_ITEMS: [&str; 3] = ["bottom", "top", "none"];

pub(crate) fn run_interactive(
    config: &mut Config,
    text: &mut Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompter = DialoguerPrompter;
    run_interactive_with(&prompter, config, text)
}

pub(crate) trait Prompter {
    fn select(&self, prompt: &str, items: &[&str], default: usize)
        -> Result<usize, Box<dyn Error>>;
    fn input_string(
        &self,
        prompt: &str,
        default: Option<&str>,
        allow_empty: bool,
    ) -> Result<String, Box<dyn Error>>;
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, Box<dyn Error>>;
}

struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn select(
        &self,
        prompt: &str,
        items: &[&str],
        default: usize,
    ) -> Result<usize, Box<dyn Error>> {
        Ok(Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?)
    }

    fn input_string(
        &self,
        prompt: &str,
        default: Option<&str>,
        allow_empty: bool,
    ) -> Result<String, Box<dyn Error>> {
        let mut input = Input::new().with_prompt(prompt).allow_empty(allow_empty);
        if let Some(value) = default {
            input = input.default(value.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }
}

fn optional_path(value: String) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn path_default(path: Option<&PathBuf>) -> String {
    path.map(|path| path.display().to_string())
        .unwrap_or_default()
}

pub(crate) fn run_interactive_with(
    prompter: &dyn Prompter,
    config: &mut Config,
    text: &mut Option<String>,
) -> Result<(), Box<dyn Error>> {
    let title_default = text.as_deref().unwrap_or(DEFAULT_INTERACTIVE_TITLE);
    let title = prompter.input_string("Title", Some(title_default), false)?;
    if !title.trim().is_empty() {
        *text = Some(title);
    }

    let current = config.template.clone();
    let style_default = match current.as_ref().map(|template| template.theme.theme) {
        None => 0,
        Some(Theme::Dark) => 1,
        Some(Theme::Light) => 2,
        Some(Theme::Custom) => 3,
    };
    let style = prompter.select("Style", &STYLE_ITEMS, style_default)?;
    if style == 0 {
        config.template = None;
        let (color1, color2) = match &config.background {
            BackgroundSpec::Gradient { color1, color2, .. } => (*color1, *color2),
            _ => (Color::rgb(0x66, 0x7e, 0xea), Color::rgb(0x76, 0x4b, 0xa2)),
        };
        let color1 = prompter.input_string("First color", Some(&color1.to_hex()), false)?;
        let color2 = prompter.input_string("Second color", Some(&color2.to_hex()), false)?;
        config.background = BackgroundSpec::Gradient {
            color1: Color::parse(&color1)?,
            color2: Color::parse(&color2)?,
            direction: GradientDirection::Diagonal,
        };
    } else {
        let theme = match style {
            1 => Theme::Dark,
            2 => Theme::Light,
            _ => Theme::Custom,
        };
        let mut assets = current
            .map(|template| template.assets)
            .unwrap_or_else(ThemeAssets::default);
        let flip_default = config
            .template
            .as_ref()
            .map(|template| template.theme.flip)
            .unwrap_or(false);
        let mut theme_config =
            ThemeConfig::new(theme).with_flip(prompter.confirm("Flip layout?", flip_default)?);

        if theme == Theme::Custom {
            let template = prompter.input_string(
                "Template image",
                Some(&path_default(assets.template.as_ref())),
                false,
            )?;
            assets.template = Some(
                optional_path(template).ok_or("the custom theme needs a template image")?,
            );
        } else {
            match prompter.select("Triangle", &TRIANGLE_ITEMS, 0)? {
                0 => theme_config = theme_config.with_triangle(TriangleDirection::Bottom),
                1 => theme_config = theme_config.with_triangle(TriangleDirection::Top),
                _ => {}
            }
            let logo = prompter.input_string(
                "Logo image (empty for badge)",
                Some(&path_default(assets.logo.as_ref())),
                true,
            )?;
            assets.logo = optional_path(logo);
            let author = prompter.input_string(
                "Author (empty to skip)",
                Some(assets.author.as_deref().unwrap_or("")),
                true,
            )?;
            assets.author = (!author.trim().is_empty()).then(|| author.trim().to_string());
        }
        config.template = Some(TemplateOptions {
            theme: theme_config,
            assets,
        });
    }

    config.optimizer.enabled = prompter.confirm(
        "Optimize mixed-language titles?",
        config.optimizer.enabled,
    )?;
    Ok(())
}
