use super::cjk::region_for_text;
use crate::{CjkRegion, Error, FontFace, FontOptions, Result};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use usvg::fontdb::Database;

const LATIN_FAMILIES: &[&str] = &[
    "Noto Sans",
    "Inter",
    "Roboto",
    "Helvetica Neue",
    "Arial",
    "Segoe UI",
    "DejaVu Sans",
    "Liberation Sans",
];
const GENERIC_SANS: &str = "sans-serif";

static FONTDB_CACHE: Lazy<Mutex<HashMap<FontOptions, Arc<Database>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub(crate) fn push_family(out: &mut Vec<String>, seen: &mut HashSet<String>, name: &str) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return;
    }
    let key = family_key(trimmed);
    if seen.insert(key) {
        out.push(trimmed.to_string());
    }
}

pub(crate) fn family_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

pub(crate) fn is_generic_family(name: &str) -> bool {
    matches!(
        family_key(name).as_str(),
        "serif" | "sans-serif" | "sans" | "monospace" | "cursive" | "fantasy"
    )
}

/// Ordered family lists handed to usvg, one per face.
///
/// Concrete names come first; the generic `sans-serif` is always last so a
/// missing family degrades to whatever the database maps it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFamilies {
    pub latin: Vec<String>,
    pub cjk: Vec<String>,
}

impl FontFamilies {
    pub fn resolve(options: &FontOptions, hint: Option<&str>, text: &str) -> Self {
        let mut latin = Vec::new();
        let mut seen = HashSet::new();
        for name in hint.into_iter().chain([options.family.as_str()]) {
            if !is_generic_family(name) {
                push_family(&mut latin, &mut seen, name);
            }
        }
        for name in LATIN_FAMILIES {
            push_family(&mut latin, &mut seen, name);
        }

        let mut cjk = Vec::new();
        let mut seen = HashSet::new();
        if let Some(name) = &options.cjk_family {
            push_family(&mut cjk, &mut seen, name);
        }
        let region = region_for_text(text, options.cjk_region);
        // Preferred region first, then every other region as a glyph fallback.
        let others = CjkRegion::ALL.into_iter().filter(|other| *other != region);
        for name in std::iter::once(region)
            .chain(others)
            .flat_map(CjkRegion::families)
        {
            push_family(&mut cjk, &mut seen, name);
        }
        for name in &latin {
            push_family(&mut cjk, &mut seen, name);
        }

        latin.push(GENERIC_SANS.to_string());
        cjk.push(GENERIC_SANS.to_string());
        Self { latin, cjk }
    }

    pub fn list(&self, face: FontFace) -> &[String] {
        match face {
            FontFace::Latin => &self.latin,
            FontFace::Cjk => &self.cjk,
        }
    }

    /// Comma-separated value for an SVG `font-family` attribute.
    pub fn css(&self, face: FontFace) -> String {
        self.list(face).join(", ")
    }
}

/// Font database for `options`, built once per process and shared by every render.
pub(crate) fn shared_fontdb(options: &FontOptions) -> Result<Arc<Database>> {
    let mut cache = FONTDB_CACHE
        .lock()
        .map_err(|_| Error::Render("font cache lock poisoned".to_string()))?;
    if let Some(db) = cache.get(options) {
        return Ok(Arc::clone(db));
    }
    let db = Arc::new(build_fontdb(options)?);
    tracing::debug!(faces = db.len(), "loaded font database");
    cache.insert(options.clone(), Arc::clone(&db));
    Ok(db)
}

pub(crate) fn build_fontdb(options: &FontOptions) -> Result<Database> {
    let mut fontdb = Database::new();
    if let Some(font_file) = &options.file {
        let bytes = std::fs::read(font_file).map_err(|err| {
            Error::Asset(format!("font file {}: {err}", font_file.display()))
        })?;
        fontdb.load_font_data(bytes);
    }
    for dir in &options.dirs {
        if dir.is_dir() {
            fontdb.load_fonts_dir(dir);
        } else {
            tracing::warn!(dir = %dir.display(), "font directory not found");
        }
    }
    if options.system_fonts {
        fontdb.load_system_fonts();
    }
    if let Some(name) = pick_sans_serif(&fontdb, options) {
        fontdb.set_sans_serif_family(name);
    }
    Ok(fontdb)
}

pub(crate) fn collect_font_families(db: &Database) -> HashMap<String, String> {
    let mut families = HashMap::new();
    for face in db.faces() {
        for (family, _) in &face.families {
            families
                .entry(family_key(family))
                .or_insert_with(|| family.clone());
        }
    }
    families
}

fn pick_sans_serif(db: &Database, options: &FontOptions) -> Option<String> {
    let families = collect_font_families(db);
    let preferred = [options.family.as_str()];
    preferred
        .iter()
        .chain(LATIN_FAMILIES)
        .filter(|name| !is_generic_family(name))
        .find_map(|name| families.get(&family_key(name)).cloned())
        .or_else(|| {
            db.faces()
                .next()
                .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
        })
}

/// Font options paired with the database they resolve against.
#[derive(Clone)]
pub struct FontSet {
    options: FontOptions,
    database: Arc<Database>,
}

impl FontSet {
    pub fn load(options: &FontOptions) -> Result<Self> {
        Ok(Self {
            options: options.clone(),
            database: shared_fontdb(options)?,
        })
    }

    pub fn options(&self) -> &FontOptions {
        &self.options
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("options", &self.options)
            .field("faces", &self.database.len())
            .finish()
    }
}
