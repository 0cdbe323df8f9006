use super::*;
use crate::canvas::write_atomic;
use crate::fonts::split_text_by_face;
use crate::layout::wrap_for_test;
use crate::optimizer::clean_reply;
use crate::svg::text_line_svg;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn test_font_options() -> FontOptions {
    FontOptions {
        system_fonts: false,
        ..FontOptions::default()
    }
}

fn test_fonts() -> FontSet {
    FontSet::load(&test_font_options()).expect("load fonts")
}

fn test_config() -> Config {
    Config {
        font: test_font_options(),
        ..Config::default()
    }
}

fn cell_engine() -> TextLayoutEngine {
    TextLayoutEngine::with_cell_measure(LayoutOptions::default())
}

fn test_pipeline(config: Config) -> ThumbnailPipeline {
    ThumbnailPipeline::new(config)
        .expect("pipeline")
        .with_measure(Arc::new(CellMeasure))
}

fn write_solid_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    image.save(path).expect("write png");
}

fn decoded_pixel(path: &Path, x: u32, y: u32) -> [u8; 4] {
    let image = image::open(path).expect("decode").to_rgba8();
    image.get_pixel(x, y).0
}

fn assert_close(actual: Option<Color>, expected: Color) {
    let actual = actual.expect("pixel in bounds");
    let near = |a: u8, b: u8| a.abs_diff(b) <= 2;
    assert!(
        near(actual.r, expected.r) && near(actual.g, expected.g) && near(actual.b, expected.b),
        "{actual:?} != {expected:?}"
    );
}

fn noise_canvas(width: u32, height: u32) -> Canvas {
    let mut state = 0x2545_f491_u32;
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        for _ in 0..3 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            rgba.push((state & 0xff) as u8);
        }
        rgba.push(255);
    }
    Canvas::from_rgba(width, height, &rgba).expect("canvas")
}

// ---- color ----

#[test]
fn color_parses_hex_forms() {
    assert_eq!(Color::parse("#fff").expect("short"), Color::WHITE);
    assert_eq!(
        Color::parse("#667eea").expect("long"),
        Color::rgb(0x66, 0x7e, 0xea)
    );
    assert_eq!(
        Color::parse("#00000080").expect("alpha"),
        Color::rgba(0, 0, 0, 0x80)
    );
    assert!(matches!(Color::parse("667eea"), Err(Error::Config(_))));
    assert!(matches!(Color::parse("#12345"), Err(Error::Config(_))));
    assert!(matches!(Color::parse("#gggggg"), Err(Error::Config(_))));
}

#[test]
fn color_lerp_hits_both_endpoints() {
    let a = Color::rgb(0x66, 0x7e, 0xea);
    let b = Color::rgb(0x76, 0x4b, 0xa2);
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(
        Color::BLACK.lerp(Color::WHITE, 0.5),
        Color::rgb(128, 128, 128)
    );
}

#[test]
fn color_serde_uses_hex_strings() {
    let color: Color = serde_json::from_str(r##""#101014""##).expect("parse");
    assert_eq!(color, Color::rgb(0x10, 0x10, 0x14));
    assert_eq!(
        serde_json::to_string(&color).expect("serialize"),
        r##""#101014""##
    );
    assert!(serde_json::from_str::<Color>(r#""red""#).is_err());
}

// ---- background ----

#[test]
fn gradient_starts_at_first_color_in_every_direction() {
    let color1 = Color::rgb(0x66, 0x7e, 0xea);
    let color2 = Color::rgb(0x76, 0x4b, 0xa2);
    for direction in [
        GradientDirection::Horizontal,
        GradientDirection::Vertical,
        GradientDirection::Diagonal,
    ] {
        let spec = BackgroundSpec::Gradient {
            color1,
            color2,
            direction,
        };
        let canvas = render_background(&spec, 64, 32).expect("render");
        assert_eq!(canvas.pixel(0, 0), Some(color1), "{direction:?}");
    }
}

#[test]
fn horizontal_gradient_moves_toward_second_color() {
    let spec = BackgroundSpec::Gradient {
        color1: Color::BLACK,
        color2: Color::WHITE,
        direction: GradientDirection::Horizontal,
    };
    let canvas = render_background(&spec, 100, 4).expect("render");
    let left = canvas.pixel(0, 2).expect("left");
    let middle = canvas.pixel(50, 2).expect("middle");
    let right = canvas.pixel(99, 2).expect("right");
    assert_eq!(left, Color::BLACK);
    assert_eq!(middle, Color::rgb(128, 128, 128));
    assert!(right.r > 250);
    assert_eq!(canvas.pixel(50, 0), canvas.pixel(50, 3));
}

#[test]
fn gradient_direction_rejects_unknown_token() {
    assert_eq!(
        "Diagonal".parse::<GradientDirection>().expect("parse"),
        GradientDirection::Diagonal
    );
    assert!(matches!(
        "radial".parse::<GradientDirection>(),
        Err(Error::Config(_))
    ));
}

#[test]
fn solid_background_fills_every_pixel() {
    let color = Color::rgb(10, 20, 30);
    let canvas = render_background(&BackgroundSpec::Solid { color }, 8, 6).expect("render");
    assert_eq!((canvas.width(), canvas.height()), (8, 6));
    for y in 0..6 {
        for x in 0..8 {
            assert_eq!(canvas.pixel(x, y), Some(color));
        }
    }
}

#[test]
fn every_pattern_kind_keeps_requested_size() {
    let black = Color::BLACK;
    let white = Color::WHITE;
    for name in ["dots", "lines", "grid", "waves"] {
        let spec = PatternSpec::from_parts(name, black, white, None, &PatternParams::default())
            .expect("pattern");
        let canvas =
            render_background(&BackgroundSpec::Pattern(spec), 333, 127).expect("render pattern");
        assert_eq!((canvas.width(), canvas.height()), (333, 127), "{name}");
        let pixels = canvas.to_rgba();
        assert!(
            pixels.chunks_exact(4).any(|px| px[0] > 128),
            "{name} drew nothing"
        );
    }
}

#[test]
fn dots_sit_half_a_pitch_in() {
    let spec = PatternSpec::new(
        PatternKind::Dots { radius: 8.0 },
        Color::BLACK,
        Color::WHITE,
        40,
    )
    .expect("pattern");
    let canvas = render_background(&BackgroundSpec::Pattern(spec), 80, 80).expect("render");
    assert_eq!(canvas.pixel(20, 20), Some(Color::WHITE));
    assert_eq!(canvas.pixel(60, 60), Some(Color::WHITE));
    assert_eq!(canvas.pixel(0, 0), Some(Color::BLACK));
    assert_eq!(canvas.pixel(40, 40), Some(Color::BLACK));
}

#[test]
fn horizontal_lines_follow_spacing() {
    let spec = PatternSpec::new(
        PatternKind::Lines {
            line_width: 4.0,
            orientation: LineOrientation::Horizontal,
        },
        Color::BLACK,
        Color::WHITE,
        20,
    )
    .expect("pattern");
    let canvas = render_background(&BackgroundSpec::Pattern(spec), 50, 50).expect("render");
    assert_eq!(canvas.pixel(25, 10), Some(Color::WHITE));
    assert_eq!(canvas.pixel(25, 20), Some(Color::BLACK));
}

#[test]
fn pattern_json_uses_defaults_and_validates() {
    let spec: BackgroundSpec = serde_json::from_str(
        r##"{"type":"pattern","pattern":"waves","color1":"#000000","color2":"#ffffff"}"##,
    )
    .expect("parse pattern");
    let BackgroundSpec::Pattern(pattern) = spec else {
        panic!("expected pattern");
    };
    assert_eq!(pattern.spacing, 40);
    assert_eq!(
        pattern.kind,
        PatternKind::Waves {
            amplitude: 30.0,
            frequency: 0.02,
            line_width: 3.0
        }
    );

    let unknown = serde_json::from_str::<BackgroundSpec>(
        r##"{"type":"pattern","pattern":"stars","color1":"#000","color2":"#fff"}"##,
    );
    assert!(unknown.is_err());
    let zero = serde_json::from_str::<BackgroundSpec>(
        r##"{"type":"pattern","pattern":"dots","color1":"#000","color2":"#fff","spacing":0}"##,
    );
    assert!(zero.is_err());
    assert!(matches!(
        PatternSpec::from_parts(
            "hexagons",
            Color::BLACK,
            Color::WHITE,
            None,
            &PatternParams::default()
        ),
        Err(Error::Config(_))
    ));
}

#[test]
fn image_background_validates_overlay() {
    let json = r##"{"type":"image","path":"bg.png","overlay_opacity":1.5}"##;
    assert!(serde_json::from_str::<BackgroundSpec>(json).is_err());
    let json = r##"{"type":"image","path":"bg.png","blur_radius":2.0,"overlay_opacity":0.4}"##;
    let spec = serde_json::from_str::<BackgroundSpec>(json).expect("parse");
    let BackgroundSpec::Image(image) = spec else {
        panic!("expected image");
    };
    assert_eq!(image.overlay_color, Color::BLACK);
    assert_eq!(image.blur_radius, 2.0);
}

#[test]
fn missing_image_background_is_asset_error() {
    let spec = BackgroundSpec::Image(ImageBackground::new("/definitely/missing/bg.png"));
    assert!(matches!(
        render_background(&spec, 32, 32),
        Err(Error::Asset(_))
    ));
}

#[test]
fn corrupt_image_background_is_asset_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not a png").expect("write");
    let spec = BackgroundSpec::Image(ImageBackground::new(&path));
    assert!(matches!(
        render_background(&spec, 32, 32),
        Err(Error::Asset(_))
    ));
}

#[test]
fn image_background_fills_and_applies_overlay() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wide.png");
    write_solid_png(&path, 200, 100, [200, 0, 0, 255]);

    let plain = render_background(&BackgroundSpec::Image(ImageBackground::new(&path)), 64, 64)
        .expect("render");
    assert_eq!((plain.width(), plain.height()), (64, 64));
    assert_close(plain.pixel(32, 32), Color::rgb(200, 0, 0));

    let mut dimmed = ImageBackground::new(&path);
    dimmed.overlay_opacity = 0.5;
    dimmed.blur_radius = 3.0;
    let canvas = render_background(&BackgroundSpec::Image(dimmed), 64, 64).expect("render");
    assert_close(canvas.pixel(32, 32), Color::rgb(100, 0, 0));
}

// ---- fonts ----

#[test]
fn cjk_ratio_counts_non_space_characters() {
    assert_eq!(cjk_ratio(""), 0.0);
    assert_eq!(cjk_ratio("   "), 0.0);
    assert_eq!(cjk_ratio("你好"), 1.0);
    assert_eq!(cjk_ratio("ab 你好"), 0.5);
    assert!(is_cjk('한'));
    assert!(is_cjk('カ'));
    assert!(!is_cjk('A'));
}

#[test]
fn font_face_switches_at_threshold() {
    assert_eq!(FontFace::detect("你好世界", 0.6), FontFace::Cjk);
    assert_eq!(FontFace::detect("你好世ab", 0.6), FontFace::Cjk);
    assert_eq!(FontFace::detect("你好ab", 0.6), FontFace::Latin);
    assert_eq!(FontFace::detect("你好世界abc", 0.5), FontFace::Cjk);
    assert_eq!(FontFace::detect("Hello", 0.6), FontFace::Latin);
}

#[test]
fn split_by_face_keeps_punctuation_with_previous_run() {
    let runs = split_text_by_face("AI技术, Guide!");
    assert_eq!(
        runs,
        vec![
            (FontFace::Latin, "AI".to_string()),
            (FontFace::Cjk, "技术, ".to_string()),
            (FontFace::Latin, "Guide!".to_string()),
        ]
    );
}

#[test]
fn cjk_region_from_locale() {
    assert_eq!(CjkRegion::from_locale("ja_JP.UTF-8"), Some(CjkRegion::Jp));
    assert_eq!(CjkRegion::from_locale("ko-KR"), Some(CjkRegion::Kr));
    assert_eq!(CjkRegion::from_locale("zh_TW"), Some(CjkRegion::Tc));
    assert_eq!(CjkRegion::from_locale("zh-Hant"), Some(CjkRegion::Tc));
    assert_eq!(CjkRegion::from_locale("zh_HK.UTF-8"), Some(CjkRegion::Hk));
    assert_eq!(CjkRegion::from_locale("zh_CN"), Some(CjkRegion::Sc));
    assert_eq!(CjkRegion::from_locale("en_US.UTF-8"), None);
    assert_eq!(CjkRegion::from_locale(""), None);
    assert!("kr".parse::<CjkRegion>().is_ok());
    assert!(matches!("xx".parse::<CjkRegion>(), Err(Error::Config(_))));
}

#[test]
fn font_families_put_region_and_overrides_first() {
    let options = FontOptions {
        family: "Inter".to_string(),
        cjk_family: Some("LXGW WenKai".to_string()),
        cjk_region: CjkRegion::Tc,
        ..test_font_options()
    };
    let families = FontFamilies::resolve(&options, Some("Montserrat"), "繁體中文");
    assert_eq!(families.latin[0], "Montserrat");
    assert_eq!(families.latin[1], "Inter");
    assert_eq!(families.latin.last().map(String::as_str), Some("sans-serif"));
    assert_eq!(families.cjk[0], "LXGW WenKai");
    assert_eq!(families.cjk[1], "Noto Sans CJK TC");

    let kana = FontFamilies::resolve(&test_font_options(), None, "ひらがな");
    assert_eq!(kana.cjk[0], "Noto Sans CJK JP");
    assert_eq!(kana.latin[0], "Noto Sans");
}

#[test]
fn font_set_reports_missing_font_file() {
    let options = FontOptions {
        file: Some(PathBuf::from("/missing/font.ttf")),
        ..test_font_options()
    };
    assert!(matches!(FontSet::load(&options), Err(Error::Asset(_))));
}

// ---- layout ----

#[test]
fn position_parses_names_points_and_json() {
    assert_eq!(
        "center".parse::<Position>().expect("center"),
        Position::Named(Anchor::Center)
    );
    assert_eq!(
        " 120, 80 ".parse::<Position>().expect("point"),
        Position::Point { x: 120, y: 80 }
    );
    assert!(matches!("left".parse::<Position>(), Err(Error::Config(_))));
    let point: Position = serde_json::from_str("[10, 20]").expect("array");
    assert_eq!(point, Position::Point { x: 10, y: 20 });
    let named: Position = serde_json::from_str(r#""bottom""#).expect("name");
    assert_eq!(named, Position::Named(Anchor::Bottom));
    assert_eq!(
        serde_json::to_string(&Position::Point { x: 1, y: 2 }).expect("serialize"),
        "[1,2]"
    );
}

#[test]
fn layout_keeps_requested_size_when_it_fits() {
    let engine = cell_engine();
    let layout = engine
        .layout(
            "Python Tutorial 2024",
            TextBox::new(0, 0, 1280, 720),
            80,
            None,
            Position::default(),
            &test_font_options(),
        )
        .expect("layout");
    assert_eq!(layout.font_size, 80);
    assert_eq!(layout.attempts, vec![80]);
    assert_eq!(layout.lines, vec!["Python Tutorial 2024".to_string()]);
    assert_eq!(layout.face, FontFace::Latin);
    assert_eq!(layout.width, 953);
    assert_eq!(layout.height, 80);
    assert_eq!((layout.origin_x, layout.origin_y), (163, 320));
    assert_eq!(layout.align, TextAlign::Center);
}

#[test]
fn layout_anchors_resolve_inside_margins() {
    let engine = cell_engine();
    let area = TextBox::new(0, 0, 1280, 720);
    let place = |anchor| {
        engine
            .layout(
                "Python Tutorial 2024",
                area,
                80,
                None,
                Position::Named(anchor),
                &test_font_options(),
            )
            .expect("layout")
    };
    let top = place(Anchor::Top);
    let bottom = place(Anchor::Bottom);
    assert_eq!(top.origin_y, 43);
    assert_eq!(bottom.origin_y, 720 - 43 - 80);
    assert_eq!(top.origin_x, bottom.origin_x);
    assert!(top.origin_x + top.width as i32 <= 1280 - 77);
}

#[test]
fn layout_shrinks_until_words_fit() {
    let engine = cell_engine();
    let layout = engine
        .layout(
            "Supercalifragilistic expialidocious words",
            TextBox::new(0, 0, 400, 200),
            80,
            None,
            Position::default(),
            &test_font_options(),
        )
        .expect("layout");
    assert_eq!(layout.font_size, 28);
    assert_eq!(
        layout.lines,
        vec![
            "Supercalifragilistic".to_string(),
            "expialidocious words".to_string()
        ]
    );
    assert_eq!(layout.attempts.first(), Some(&80));
    assert_eq!(layout.attempts.last(), Some(&28));
    assert!(layout.attempts.windows(2).all(|pair| pair[0] > pair[1]));
    assert!(layout.width <= 400 - 2 * 24);
    assert!(layout.height <= 200 - 2 * 12);
}

#[test]
fn layout_breaks_words_at_the_floor() {
    let engine = cell_engine();
    let layout = engine
        .layout(
            "abcdefghijklmnopqrstuvwxyz",
            TextBox::new(0, 0, 100, 100),
            20,
            None,
            Position::default(),
            &test_font_options(),
        )
        .expect("layout");
    assert_eq!(layout.font_size, 16);
    assert_eq!(layout.attempts, vec![20, 16]);
    assert_eq!(
        layout.lines,
        vec![
            "abcdefghi".to_string(),
            "jklmnopqr".to_string(),
            "stuvwxyz".to_string()
        ]
    );
}

#[test]
fn layout_fails_when_a_glyph_cannot_fit() {
    let engine = cell_engine();
    let result = engine.layout(
        "W",
        TextBox::new(0, 0, 10, 10),
        40,
        None,
        Position::default(),
        &test_font_options(),
    );
    assert!(matches!(result, Err(Error::Render(_))));
}

#[test]
fn layout_never_grows_past_max_lines() {
    let options = LayoutOptions {
        max_lines: 1,
        ..LayoutOptions::default()
    };
    let engine = TextLayoutEngine::with_cell_measure(options);
    let layout = engine
        .layout(
            "one two three four five six",
            TextBox::new(0, 0, 400, 400),
            60,
            None,
            Position::default(),
            &test_font_options(),
        )
        .expect("layout");
    assert_eq!(layout.lines.len(), 1);
    assert!(layout.font_size < 60);
}

#[test]
fn layout_breaks_between_wide_characters() {
    let options = LayoutOptions {
        min_font_size: 16,
        ..LayoutOptions::default()
    };
    let engine = TextLayoutEngine::with_cell_measure(options);
    let layout = engine
        .layout(
            "你好世界",
            TextBox::new(0, 0, 50, 100),
            16,
            None,
            Position::default(),
            &test_font_options(),
        )
        .expect("layout");
    assert_eq!(layout.face, FontFace::Cjk);
    assert_eq!(layout.attempts, vec![16]);
    assert_eq!(layout.lines, vec!["你好".to_string(), "世界".to_string()]);
}

#[test]
fn layout_honors_hard_line_breaks() {
    let lines = wrap_for_test("Hello\nWorld", 10_000.0, 40).expect("wrap");
    assert_eq!(lines, vec!["Hello".to_string(), "World".to_string()]);
    let lines = wrap_for_test("AI 技术 guide", 10_000.0, 40).expect("wrap");
    assert_eq!(lines, vec!["AI 技术 guide".to_string()]);
}

#[test]
fn layout_point_position_is_verbatim_and_checked() {
    let engine = cell_engine();
    let area = TextBox::new(0, 0, 1280, 720);
    let layout = engine
        .layout(
            "Hi",
            area,
            40,
            None,
            Position::Point { x: 100, y: 120 },
            &test_font_options(),
        )
        .expect("layout");
    assert_eq!((layout.origin_x, layout.origin_y), (100, 120));
    assert_eq!(layout.align, TextAlign::Start);

    let outside = engine.layout(
        "Hi",
        area,
        40,
        None,
        Position::Point { x: 2000, y: 10 },
        &test_font_options(),
    );
    assert!(matches!(outside, Err(Error::Config(_))));
}

#[test]
fn layout_mirrored_point_ends_at_reflected_column() {
    let engine = cell_engine();
    let options = test_font_options();
    let point = Position::Point { x: 100, y: 200 };
    let plain = engine
        .layout("Hi", TextBox::new(38, 130, 496, 446), 40, None, point, &options)
        .expect("layout");
    let mirrored = engine
        .layout_mirrored(
            "Hi",
            TextBox::new(746, 130, 496, 446),
            40,
            None,
            point,
            &options,
            1280,
        )
        .expect("mirrored layout");
    assert_eq!(mirrored.align, TextAlign::End);
    assert_eq!(mirrored.font_size, plain.font_size);
    assert_eq!(mirrored.origin_y, 200);
    assert_eq!(mirrored.origin_x + mirrored.width as i32, 1180);
    assert_eq!(
        mirrored.origin_x,
        1280 - plain.origin_x - plain.width as i32
    );

    let outside = engine.layout_mirrored(
        "Hi",
        TextBox::new(746, 130, 496, 446),
        40,
        None,
        Position::Point { x: 600, y: 200 },
        &options,
        1280,
    );
    assert!(matches!(outside, Err(Error::Config(_))));
}

#[test]
fn layout_starts_shrinking_from_the_box_height() {
    let fonts = test_fonts();
    let engine = TextLayoutEngine::new(
        LayoutOptions::default(),
        Arc::new(FontMeasure::new(&fonts)),
    );
    let layout = engine
        .layout(
            "Hello",
            TextBox::new(0, 0, 400, 200),
            600_000_000,
            None,
            Position::default(),
            fonts.options(),
        )
        .expect("layout");
    assert_eq!(layout.attempts.first(), Some(&176));
    assert!(layout.attempts.len() <= 41, "{:?}", layout.attempts);
    assert!(layout.font_size <= 176);
}

#[test]
fn line_svg_saturates_huge_font_sizes() {
    let families = FontFamilies::resolve(&test_font_options(), None, "Hello");
    let svg = text_line_svg("Hello", u32::MAX, FontFace::Latin, &families);
    assert!(svg.contains(&format!(r#"width="{}""#, u32::MAX)));
    assert!(svg.contains(&format!(r#"height="{}""#, u32::MAX)));
}

#[test]
fn layout_rejects_blank_text() {
    let engine = cell_engine();
    let result = engine.layout(
        "   ",
        TextBox::new(0, 0, 100, 100),
        40,
        None,
        Position::default(),
        &test_font_options(),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn font_measure_falls_back_to_cells_without_faces() {
    let fonts = test_fonts();
    let measure = FontMeasure::new(&fonts);
    let families = FontFamilies::resolve(fonts.options(), None, "Hello");
    let expected = CellMeasure.line_width("Hello", 42, FontFace::Latin, &families);
    let measured = measure.line_width("Hello", 42, FontFace::Latin, &families);
    if fonts.database().is_empty() {
        assert_eq!(measured, expected);
    } else {
        assert!(measured > 0.0);
    }
    assert_eq!(measure.line_width("  ", 42, FontFace::Latin, &families), 0.0);
}

// ---- template ----

#[test]
fn theme_tokens_parse() {
    assert_eq!("Light".parse::<Theme>().expect("theme"), Theme::Light);
    assert!(matches!("neon".parse::<Theme>(), Err(Error::Config(_))));
    assert_eq!(
        "top".parse::<TriangleDirection>().expect("direction"),
        TriangleDirection::Top
    );
    assert!(matches!(
        "left".parse::<TriangleDirection>(),
        Err(Error::Config(_))
    ));
}

#[test]
fn theme_matrix_names_every_variant() {
    let names = ThemeConfig::matrix()
        .iter()
        .map(ThemeConfig::name)
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "dark_std_bottom",
            "dark_std_top",
            "dark_flip_bottom",
            "dark_flip_top",
            "light_std_bottom",
            "light_std_top",
            "light_flip_bottom",
            "light_flip_top",
            "custom_std",
            "custom_flip",
        ]
    );
}

#[test]
fn custom_theme_ignores_triangle() {
    let config = ThemeConfig::new(Theme::Custom).with_triangle(TriangleDirection::Top);
    assert_eq!(config.triangle_direction(), None);
    let layout = TemplateLayout::for_theme(&config, 1280, 720);
    assert!(layout.triangle.is_none());
    assert!(layout.logo.is_none());
    assert_eq!(layout.title, Rect::new(0, 0, 768, 720));
    let flipped = TemplateLayout::for_theme(&config.with_flip(true), 1280, 720);
    assert_eq!(flipped.title, Rect::new(512, 0, 768, 720));
}

#[test]
fn template_layout_places_elements_from_fractions() {
    let config = ThemeConfig::new(Theme::Dark).with_triangle(TriangleDirection::Bottom);
    let layout = TemplateLayout::for_theme(&config, 1280, 720);
    assert_eq!(layout.side, Some(Rect::new(560, 0, 720, 720)));
    assert_eq!(layout.logo, Some(Rect::new(38, 36, 86, 86)));
    assert_eq!(layout.title, Rect::new(38, 130, 496, 446));
    assert_eq!(layout.author, Some(Rect::new(38, 605, 496, 86)));
    let triangle = layout.triangle.expect("triangle");
    assert_eq!(triangle.points, [(560, 0), (720, 0), (560, 720)]);

    let top = TemplateLayout::for_theme(
        &ThemeConfig::new(Theme::Dark).with_triangle(TriangleDirection::Top),
        1280,
        720,
    );
    assert_eq!(
        top.triangle.expect("triangle").points,
        [(560, 720), (720, 720), (560, 0)]
    );
}

#[test]
fn flipping_twice_is_identity() {
    for config in ThemeConfig::matrix() {
        let layout = TemplateLayout::for_theme(&config, 1280, 720);
        assert_eq!(layout.flipped().flipped(), layout, "{}", config.name());
    }
}

#[test]
fn flip_only_moves_elements_horizontally() {
    let base = ThemeConfig::new(Theme::Dark).with_triangle(TriangleDirection::Top);
    let standard = TemplateLayout::for_theme(&base, 1280, 720);
    let flipped = TemplateLayout::for_theme(&base.clone().with_flip(true), 1280, 720);

    let same_vertical = |a: Rect, b: Rect| a.y == b.y && a.width == b.width && a.height == b.height;
    assert!(same_vertical(standard.title, flipped.title));
    assert_ne!(standard.title.x, flipped.title.x);
    let side = standard.side.expect("side");
    let flipped_side = flipped.side.expect("side");
    assert!(same_vertical(side, flipped_side));
    assert_eq!(flipped_side.x, 0);

    let a = standard.triangle.expect("triangle");
    let b = flipped.triangle.expect("triangle");
    assert_eq!(a.color, b.color);
    assert_eq!(a.direction, b.direction);
    for (p, q) in a.points.iter().zip(b.points.iter()) {
        assert_eq!(p.1, q.1);
        assert_eq!(q.0, 1280 - p.0);
    }
}

#[test]
fn compose_dark_theme_draws_panels_and_triangle() {
    let fonts = test_fonts();
    let engine = cell_engine();
    let title = TextSpec::new("Rust 101");
    let palette = Palette::for_theme(Theme::Dark);

    let bottom = compose(
        &ThemeConfig::new(Theme::Dark).with_triangle(TriangleDirection::Bottom),
        &ThemeAssets::default(),
        &title,
        &engine,
        &fonts,
        320,
        180,
    )
    .expect("compose");
    assert_eq!((bottom.width(), bottom.height()), (320, 180));
    assert_eq!(bottom.pixel(2, 2), Some(palette.background));
    assert_ne!(bottom.pixel(300, 90), Some(palette.background));
    assert_eq!(bottom.pixel(145, 10), Some(palette.accent));

    let top = compose(
        &ThemeConfig::new(Theme::Dark).with_triangle(TriangleDirection::Top),
        &ThemeAssets::default(),
        &title,
        &engine,
        &fonts,
        320,
        180,
    )
    .expect("compose");
    assert_ne!(top.pixel(145, 10), Some(palette.accent));

    let flipped = compose(
        &ThemeConfig::new(Theme::Dark)
            .with_triangle(TriangleDirection::Bottom)
            .with_flip(true),
        &ThemeAssets::default(),
        &title,
        &engine,
        &fonts,
        320,
        180,
    )
    .expect("compose");
    assert_ne!(flipped.pixel(2, 2), Some(palette.background));
    assert_eq!(flipped.pixel(317, 2), Some(palette.background));
}

#[test]
fn compose_mirrors_point_titles_when_flipped() {
    let fonts = test_fonts();
    let engine = cell_engine();
    let title = TextSpec {
        position: Position::Point { x: 100, y: 200 },
        ..TextSpec::new("Hi")
    };
    for flip in [false, true] {
        let canvas = compose(
            &ThemeConfig::new(Theme::Dark)
                .with_triangle(TriangleDirection::Top)
                .with_flip(flip),
            &ThemeAssets::default(),
            &title,
            &engine,
            &fonts,
            1280,
            720,
        )
        .unwrap_or_else(|err| panic!("compose with flip={flip}: {err}"));
        assert_eq!((canvas.width(), canvas.height()), (1280, 720));
    }
}

#[test]
fn compose_falls_back_when_optional_assets_are_missing() {
    let fonts = test_fonts();
    let assets = ThemeAssets {
        logo: Some(PathBuf::from("/missing/logo.png")),
        side_image: Some(PathBuf::from("/missing/side.png")),
        author: Some("Thumbkit".to_string()),
        ..ThemeAssets::default()
    };
    let canvas = compose(
        &ThemeConfig::new(Theme::Light),
        &assets,
        &TextSpec::new("Fallbacks"),
        &cell_engine(),
        &fonts,
        320,
        180,
    )
    .expect("compose");
    assert_eq!((canvas.width(), canvas.height()), (320, 180));
}

#[test]
fn compose_uses_side_image_and_logo_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let side = dir.path().join("side.png");
    let logo = dir.path().join("logo.png");
    write_solid_png(&side, 40, 40, [0, 200, 0, 255]);
    write_solid_png(&logo, 10, 10, [0, 0, 200, 255]);
    let assets = ThemeAssets {
        logo: Some(logo),
        side_image: Some(side),
        ..ThemeAssets::default()
    };
    let canvas = compose(
        &ThemeConfig::new(Theme::Dark),
        &assets,
        &TextSpec::new("Assets"),
        &cell_engine(),
        &test_fonts(),
        320,
        180,
    )
    .expect("compose");
    assert_close(canvas.pixel(300, 170), Color::rgb(0, 200, 0));
    assert_close(canvas.pixel(20, 20), Color::rgb(0, 0, 200));
}

#[test]
fn compose_template_errors() {
    let fonts = test_fonts();
    let engine = cell_engine();
    let title = TextSpec::new("Title");
    let custom = compose(
        &ThemeConfig::new(Theme::Custom),
        &ThemeAssets::default(),
        &title,
        &engine,
        &fonts,
        320,
        180,
    );
    assert!(matches!(custom, Err(Error::Config(_))));

    let missing = ThemeAssets {
        template: Some(PathBuf::from("/missing/template.png")),
        ..ThemeAssets::default()
    };
    let dark = compose(
        &ThemeConfig::new(Theme::Dark),
        &missing,
        &title,
        &engine,
        &fonts,
        320,
        180,
    );
    assert!(matches!(dark, Err(Error::Render(_))));
}

#[test]
fn compose_custom_theme_uses_template_verbatim() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = dir.path().join("template.png");
    write_solid_png(&template, 64, 36, [20, 40, 200, 255]);
    let assets = ThemeAssets {
        template: Some(template),
        logo: Some(PathBuf::from("/ignored/logo.png")),
        ..ThemeAssets::default()
    };
    let canvas = compose(
        &ThemeConfig::new(Theme::Custom),
        &assets,
        &TextSpec::new("Custom"),
        &cell_engine(),
        &test_fonts(),
        128,
        72,
    )
    .expect("compose");
    assert_close(canvas.pixel(120, 68), Color::rgb(20, 40, 200));
    assert_close(canvas.pixel(2, 2), Color::rgb(20, 40, 200));
}

// ---- optimizer ----

struct FakeGenerator {
    reply: Option<String>,
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<GenerationPrompt>>>,
}

impl FakeGenerator {
    fn new(reply: Option<&str>) -> (Self, Arc<AtomicUsize>, Arc<Mutex<Option<GenerationPrompt>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));
        (
            Self {
                reply: reply.map(str::to_string),
                calls: Arc::clone(&calls),
                last: Arc::clone(&last),
            },
            calls,
            last,
        )
    }
}

impl TextGenerator for FakeGenerator {
    fn generate(&self, prompt: &GenerationPrompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().expect("lock") = Some(prompt.clone());
        self.reply
            .clone()
            .ok_or_else(|| Error::Optimization("service down".to_string()))
    }
}

#[test]
fn needs_optimization_boundaries_are_inclusive() {
    assert!(!needs_optimization("一二三四五六七八九a"));
    assert!(!needs_optimization("a b c d e f g h i 一"));
    assert!(!needs_optimization("Pure English Title"));
    assert!(!needs_optimization("纯中文标题"));
    assert!(!needs_optimization(""));
    assert!(needs_optimization("AI技术指南 Complete Tutorial 2024"));
}

#[test]
fn optimizer_uses_generator_for_mixed_titles() {
    let (generator, calls, last) = FakeGenerator::new(Some("\"AI技术完整指南教程\"\n"));
    let optimizer = TitleOptimizer::new(Some(Box::new(generator)), &OptimizerOptions::default());
    let result = optimizer.maybe_optimize("AI技术指南 Complete Tutorial 2024");
    assert_eq!(result.text, "AI技术完整指南教程");
    assert!(result.was_optimized);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let prompt = last.lock().expect("lock").clone().expect("prompt");
    assert_eq!(prompt.system, TITLE_OPTIMIZATION_SYSTEM_PROMPT);
    assert_eq!(prompt.user, "AI技术指南 Complete Tutorial 2024");
    assert_eq!(prompt.temperature, 0.1);
    assert_eq!(prompt.max_output_tokens, 50);
}

#[test]
fn optimizer_skips_single_language_titles() {
    let (generator, calls, _) = FakeGenerator::new(Some("unused"));
    let optimizer = TitleOptimizer::new(Some(Box::new(generator)), &OptimizerOptions::default());
    let result = optimizer.maybe_optimize("Python Tutorial 2024");
    assert_eq!(result, OptimizedTitle::unchanged("Python Tutorial 2024"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn optimizer_falls_back_on_failure_or_bad_reply() {
    let title = "AI技术指南 Complete Tutorial 2024";
    let (failing, _, _) = FakeGenerator::new(None);
    let optimizer = TitleOptimizer::new(Some(Box::new(failing)), &OptimizerOptions::default());
    assert_eq!(optimizer.maybe_optimize(title), OptimizedTitle::unchanged(title));

    let long = "x".repeat(MAX_OPTIMIZED_TITLE_CHARS + 1);
    let (verbose, _, _) = FakeGenerator::new(Some(&long));
    let optimizer = TitleOptimizer::new(Some(Box::new(verbose)), &OptimizerOptions::default());
    assert_eq!(optimizer.maybe_optimize(title), OptimizedTitle::unchanged(title));

    let (blank, _, _) = FakeGenerator::new(Some("  \n \n"));
    let optimizer = TitleOptimizer::new(Some(Box::new(blank)), &OptimizerOptions::default());
    assert_eq!(optimizer.maybe_optimize(title), OptimizedTitle::unchanged(title));

    let disabled = TitleOptimizer::disabled();
    assert!(!disabled.is_available());
    assert_eq!(disabled.maybe_optimize(title), OptimizedTitle::unchanged(title));
}

#[test]
fn optimizer_prompt_carries_language_and_custom_instruction() {
    let options = OptimizerOptions {
        target_language: TargetLanguage::Zh,
        custom_prompt: Some("Only Chinese please".to_string()),
        ..OptimizerOptions::default()
    };
    let optimizer = TitleOptimizer::new(None, &options);
    let prompt = optimizer.prompt("AI技术 Guide");
    assert_eq!(prompt.system, "Only Chinese please");
    assert_eq!(prompt.user, "Target language: Chinese\nAI技术 Guide");

    let blank_custom = OptimizerOptions {
        custom_prompt: Some("   ".to_string()),
        ..OptimizerOptions::default()
    };
    let optimizer = TitleOptimizer::new(None, &blank_custom);
    assert_eq!(
        optimizer.prompt("t").system,
        TITLE_OPTIMIZATION_SYSTEM_PROMPT
    );
}

#[test]
fn clean_reply_takes_first_line_without_quotes() {
    assert_eq!(
        clean_reply("\n  「最新科技资讯」 \nextra").expect("reply"),
        "最新科技资讯"
    );
    assert!(matches!(clean_reply("\"\""), Err(Error::Optimization(_))));
}

fn read_http_request(stream: &mut TcpStream) -> String {
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        let read = stream.read(&mut buf).unwrap_or(0);
        if read == 0 {
            break data.len();
        }
        data.extend_from_slice(&buf[..read]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let length = head
        .lines()
        .find_map(|line| {
            let lower = line.to_ascii_lowercase();
            lower
                .strip_prefix("content-length:")
                .and_then(|value| value.trim().parse::<usize>().ok())
        })
        .unwrap_or(0);
    while data.len() < header_end + length {
        let read = stream.read(&mut buf).unwrap_or(0);
        if read == 0 {
            break;
        }
        data.extend_from_slice(&buf[..read]);
    }
    String::from_utf8_lossy(&data).to_string()
}

fn write_http_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = if status == 200 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {status_text}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).expect("write response");
}

fn spawn_gemini_stub(status: u16, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_http_request(&mut stream);
        write_http_response(&mut stream, status, body);
        request
    });
    (format!("http://{addr}/v1beta"), handle)
}

fn gemini_client(endpoint: String) -> GeminiClient {
    let options = OptimizerOptions {
        model: "test-model".to_string(),
        endpoint,
        timeout_ms: 2_000,
        ..OptimizerOptions::default()
    };
    GeminiClient::new(GeminiConfig::new("secret-key", &options)).expect("client")
}

#[test]
fn gemini_client_posts_generate_content() {
    let (endpoint, handle) = spawn_gemini_stub(
        200,
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"AI技术完整指南教程\n"}]}}]}"#,
    );
    let client = gemini_client(endpoint);
    let optimizer = TitleOptimizer::new(Some(Box::new(client)), &OptimizerOptions::default());
    let result = optimizer.maybe_optimize("AI技术指南 Complete Tutorial 2024");
    assert_eq!(result.text, "AI技术完整指南教程");
    assert!(result.was_optimized);

    let request = handle.join().expect("server");
    assert!(request.starts_with("POST /v1beta/models/test-model:generateContent "));
    assert!(request.to_ascii_lowercase().contains("x-goog-api-key: secret-key"));
    assert!(request.contains(r#""maxOutputTokens":50"#));
    assert!(request.contains(r#""systemInstruction""#));
}

#[test]
fn gemini_client_maps_status_errors() {
    let (endpoint, handle) = spawn_gemini_stub(500, r#"{"error":{"message":"boom"}}"#);
    let client = gemini_client(endpoint);
    let prompt = TitleOptimizer::disabled().prompt("AI技术 Guide");
    let result = client.generate(&prompt);
    assert!(matches!(result, Err(Error::Optimization(_))));
    handle.join().expect("server");
}

#[test]
fn gemini_client_rejects_empty_key() {
    let config = GeminiConfig::new("  ", &OptimizerOptions::default());
    assert!(matches!(GeminiClient::new(config), Err(Error::Config(_))));
}

// ---- encode ----

#[test]
fn output_format_follows_extension() {
    assert_eq!(
        OutputFormat::from_path(Path::new("a/b.PNG")).expect("png"),
        OutputFormat::Png
    );
    assert_eq!(
        OutputFormat::from_path(Path::new("thumb.JPG")).expect("jpg"),
        OutputFormat::Jpeg
    );
    assert_eq!(
        OutputFormat::from_path(Path::new("thumb.webp")).expect("webp"),
        OutputFormat::Webp
    );
    assert!(matches!(
        OutputFormat::from_path(Path::new("thumb.bmp")),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        OutputFormat::from_path(Path::new("thumb")),
        Err(Error::Config(_))
    ));
}

#[test]
fn size_budget_lowers_jpeg_quality() {
    let canvas = noise_canvas(96, 96);
    let png = PngOptions::default();
    let full = canvas
        .encode(OutputFormat::Jpeg, 95, &png, None)
        .expect("encode");
    let budget = canvas
        .encode(OutputFormat::Jpeg, 95, &png, Some(full.len() as u64 / 2))
        .expect("encode with budget");
    assert!(budget.len() < full.len());
    assert_eq!(&budget[..2], &[0xff, 0xd8]);
}

#[test]
fn webp_and_png_encoders_emit_their_signatures() {
    let canvas = Canvas::filled(16, 16, Color::rgb(1, 2, 3)).expect("canvas");
    let png = canvas
        .encode(OutputFormat::Png, 95, &PngOptions::default(), None)
        .expect("png");
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    let webp = canvas
        .encode(OutputFormat::Webp, 80, &PngOptions::default(), None)
        .expect("webp");
    assert_eq!(&webp[..4], b"RIFF");
    assert_eq!(&webp[8..12], b"WEBP");
}

#[test]
fn quantized_png_stays_decodable() {
    let canvas = noise_canvas(32, 32);
    let options = PngOptions {
        quantize: true,
        quantize_preset: Some(PngQuantPreset::Fast),
        ..PngOptions::default()
    };
    let bytes = canvas
        .encode(OutputFormat::Png, 95, &options, None)
        .expect("encode");
    let decoded = image::load_from_memory(&bytes).expect("decode");
    assert_eq!((decoded.width(), decoded.height()), (32, 32));
}

#[test]
fn write_atomic_creates_parents_and_leaves_no_partial() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested/deeper/out.png");
    write_atomic(&path, b"data").expect("write");
    assert_eq!(std::fs::read(&path).expect("read"), b"data");
    let leftovers = std::fs::read_dir(path.parent().expect("parent"))
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
        .count();
    assert_eq!(leftovers, 0);
}

// ---- config ----

#[test]
fn config_defaults_match_documented_values() {
    let cfg = Config::default();
    assert_eq!((cfg.width, cfg.height, cfg.quality), (1280, 720, 95));
    assert_eq!(cfg.text.size, 80);
    assert_eq!(cfg.layout.shrink_step, 4);
    assert_eq!(cfg.layout.max_lines, 3);
    assert_eq!(cfg.optimizer.timeout_ms, 10_000);
    assert_eq!(cfg.batch.prefix, "thumbnail");
    assert!(cfg.template.is_none());
}

#[test]
fn config_json_flattens_template_options() {
    let cfg: Config = serde_json::from_str(
        r##"{
            "quality": 88,
            "max_bytes": 2097152,
            "template": {"theme": "light", "flip": true, "triangle": {"direction": "top"}, "logo": "logo.png", "author": "Me"},
            "text": {"size": 64, "color": "#ff0000", "position": [10, 20]}
        }"##,
    )
    .expect("parse config");
    let template = cfg.template.clone().expect("template");
    assert_eq!(template.theme.theme, Theme::Light);
    assert!(template.theme.flip);
    assert_eq!(
        template.theme.triangle_direction(),
        Some(TriangleDirection::Top)
    );
    assert_eq!(template.assets.logo, Some(PathBuf::from("logo.png")));
    assert_eq!(template.assets.author.as_deref(), Some("Me"));
    assert_eq!(cfg.max_bytes, Some(2_097_152));

    let request = cfg.request("Hello", "out/hello.jpg");
    assert_eq!(request.quality, 88);
    assert_eq!(request.title.font_size, 64);
    assert_eq!(request.title.color, Some(Color::rgb(255, 0, 0)));
    assert_eq!(request.title.position, Position::Point { x: 10, y: 20 });
    assert!(matches!(request.composition, Composition::Template { .. }));
}

#[test]
fn request_validation_catches_bad_values() {
    let cfg = test_config();
    let mut request = cfg.request("Title", "out.png");
    assert!(request.validate().is_ok());
    request.quality = 0;
    assert!(matches!(request.validate(), Err(Error::Config(_))));
    let mut request = cfg.request("Title", "out.gif");
    assert!(matches!(request.validate(), Err(Error::Config(_))));
    request.output = PathBuf::from("out.png");
    request.width = 0;
    assert!(matches!(request.validate(), Err(Error::Config(_))));

    let mut request = cfg.request("Title", "out.png");
    request.title.font_size = MAX_FONT_SIZE;
    assert!(request.validate().is_ok());
    request.title.font_size = 600_000_000;
    assert!(matches!(request.validate(), Err(Error::Config(_))));
}

// ---- pipeline ----

#[test]
fn gradient_request_writes_deterministic_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(test_config());
    let first = pipeline.config().request("Python Tutorial 2024", dir.path().join("a.png"));
    let second = pipeline.config().request("Python Tutorial 2024", dir.path().join("b.png"));

    let result = pipeline.generate(&first).expect("generate");
    pipeline.generate(&second).expect("generate again");
    assert_eq!(result.path, dir.path().join("a.png"));
    assert_eq!(result.title, "Python Tutorial 2024");
    assert!(!result.was_optimized);
    assert_eq!(
        image::image_dimensions(&result.path).expect("dimensions"),
        (1280, 720)
    );
    assert_eq!(decoded_pixel(&result.path, 0, 0), [0x66, 0x7e, 0xea, 0xff]);
    assert_eq!(
        std::fs::read(dir.path().join("a.png")).expect("read a"),
        std::fs::read(dir.path().join("b.png")).expect("read b")
    );
}

#[test]
fn missing_image_background_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(test_config());
    let output = dir.path().join("out.png");
    let request = GenerationRequest::new(
        TextSpec::new("Hello"),
        Composition::Background(BackgroundSpec::Image(ImageBackground::new(
            dir.path().join("missing.jpg"),
        ))),
        &output,
    );
    assert!(matches!(pipeline.generate(&request), Err(Error::Asset(_))));
    assert!(!output.exists());
}

#[test]
fn mixed_title_with_unreachable_service_keeps_original() {
    let dir = tempfile::tempdir().expect("tempdir");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let client = gemini_client(format!("http://{addr}/v1beta"));
    let optimizer = TitleOptimizer::new(Some(Box::new(client)), &OptimizerOptions::default());
    let pipeline = test_pipeline(test_config()).with_optimizer(optimizer);

    let mut request = pipeline
        .config()
        .request("AI技术指南 Complete Tutorial 2024", dir.path().join("mixed.png"));
    request.optimize_title = true;
    let result = pipeline.generate(&request).expect("generate");
    assert_eq!(result.title, "AI技术指南 Complete Tutorial 2024");
    assert!(!result.was_optimized);
    assert!(result.path.exists());
}

#[test]
fn optimized_title_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (generator, _, _) = FakeGenerator::new(Some("AI技术完整指南教程"));
    let optimizer = TitleOptimizer::new(Some(Box::new(generator)), &OptimizerOptions::default());
    let pipeline = test_pipeline(test_config()).with_optimizer(optimizer);
    let mut request = pipeline
        .config()
        .request("AI技术指南 Complete Tutorial 2024", dir.path().join("opt.webp"));
    request.optimize_title = true;
    let result = pipeline.generate(&request).expect("generate");
    assert_eq!(result.title, "AI技术完整指南教程");
    assert!(result.was_optimized);
}

#[test]
fn template_request_renders_through_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config();
    cfg.width = 640;
    cfg.height = 360;
    cfg.template = Some(TemplateOptions {
        theme: ThemeConfig::new(Theme::Light).with_triangle(TriangleDirection::Bottom),
        assets: ThemeAssets::default(),
    });
    let pipeline = test_pipeline(cfg);
    let request = pipeline
        .config()
        .request("Light theme", dir.path().join("light.jpg"));
    let result = pipeline.generate(&request).expect("generate");
    assert_eq!(
        image::image_dimensions(&result.path).expect("dimensions"),
        (640, 360)
    );
}

#[test]
fn rendered_glyphs_stay_inside_the_fitted_block() {
    let font = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fonts/Tuffy.ttf");
    let cfg = Config {
        width: 640,
        height: 360,
        background: BackgroundSpec::Solid {
            color: Color::WHITE,
        },
        font: FontOptions {
            family: "Tuffy".to_string(),
            file: Some(font),
            system_fonts: false,
            ..FontOptions::default()
        },
        ..Config::default()
    };
    let pipeline = ThumbnailPipeline::new(cfg).expect("pipeline");
    let fonts = pipeline.fonts();
    assert!(!fonts.database().is_empty());

    let mut request = pipeline
        .config()
        .request("Typography Jumps Quickly", "glyphs.png");
    request.title.font_size = 200;
    request.title.color = Some(Color::BLACK);
    let (canvas, _) = pipeline.render(&request).expect("render");

    let engine = TextLayoutEngine::new(
        pipeline.config().layout,
        Arc::new(FontMeasure::new(fonts)),
    );
    let block = engine
        .layout(
            &request.title.text,
            TextBox::new(0, 0, 640, 360),
            200,
            None,
            request.title.position,
            fonts.options(),
        )
        .expect("layout");
    assert!(block.font_size < 200);

    let mut ink: Option<(i32, i32, i32, i32)> = None;
    for y in 0..360 {
        for x in 0..640 {
            let dark = canvas.pixel(x, y).is_some_and(|px| px.r < 128);
            if dark {
                let (x, y) = (x as i32, y as i32);
                ink = Some(match ink {
                    None => (x, y, x, y),
                    Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
                });
            }
        }
    }
    let (left, top, right, bottom) = ink.expect("glyphs were drawn");
    let slack = block.font_size as i32 / 4;
    assert!(left > 0 && top > 0 && right < 639 && bottom < 359);
    assert!(left >= block.origin_x - slack, "{left} vs {block:?}");
    assert!(right <= block.origin_x + block.width as i32 + slack, "{right} vs {block:?}");
    assert!(top >= block.origin_y - slack, "{top} vs {block:?}");
    assert!(bottom <= block.origin_y + block.height as i32 + slack, "{bottom} vs {block:?}");
}

#[test]
fn batch_texts_names_outputs_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(test_config());
    let style = pipeline.config().request("", dir.path().join("style.jpg"));
    let texts = vec!["One".to_string(), "Two".to_string(), "Three".to_string()];
    let results = pipeline.batch_texts(&texts, &style, dir.path());
    let paths = results
        .into_iter()
        .map(|result| result.expect("item").path)
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        vec![
            dir.path().join("thumbnail_001.jpg"),
            dir.path().join("thumbnail_002.jpg"),
            dir.path().join("thumbnail_003.jpg"),
        ]
    );
    assert!(paths.iter().all(|path| path.exists()));
}

#[test]
fn batch_failures_stay_isolated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config();
    cfg.batch.threads = 2;
    let pipeline = test_pipeline(cfg);
    let requests = vec![
        pipeline.config().request("First", dir.path().join("1.png")),
        pipeline.config().request("Second", dir.path().join("2.bmp")),
        pipeline.config().request("Third", dir.path().join("3.png")),
    ];
    let results = pipeline.batch_generate(&requests);
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].as_ref().expect("first").path,
        dir.path().join("1.png")
    );
    assert!(matches!(results[1], Err(Error::Config(_))));
    assert_eq!(results[2].as_ref().expect("third").title, "Third");
}

#[test]
fn variant_sampler_is_reproducible() {
    let mut a = VariantSampler::new(Some(42));
    let mut b = VariantSampler::new(Some(42));
    let first = (0..8).map(|_| a.next_theme(false)).collect::<Vec<_>>();
    let second = (0..8).map(|_| b.next_theme(false)).collect::<Vec<_>>();
    assert_eq!(first, second);
    assert!(first.iter().all(|config| config.theme != Theme::Custom));
    assert!(matches!(a.pick(&[]), Err(Error::Config(_))));
}
