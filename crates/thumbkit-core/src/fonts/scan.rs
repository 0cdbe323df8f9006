use serde::{Deserialize, Serialize};

/// Which family list a run of text is shaped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFace {
    Latin,
    Cjk,
}

pub fn is_cjk(ch: char) -> bool {
    let cp = ch as u32;
    matches!(
        cp,
        0x4E00..=0x9FFF
            | 0x3400..=0x4DBF
            | 0x20000..=0x2A6DF
            | 0x2A700..=0x2B73F
            | 0x2B740..=0x2B81F
            | 0x2B820..=0x2CEAF
            | 0x2CEB0..=0x2EBEF
            | 0x2F800..=0x2FA1F
            | 0x3040..=0x309F
            | 0x30A0..=0x30FF
            | 0x31F0..=0x31FF
            | 0x1100..=0x11FF
            | 0x3130..=0x318F
            | 0xAC00..=0xD7AF
            | 0x3100..=0x312F
            | 0x31A0..=0x31BF
    )
}

/// Fraction of non-whitespace characters that are CJK; 0.0 for blank text.
pub fn cjk_ratio(text: &str) -> f32 {
    let mut total = 0usize;
    let mut cjk = 0usize;
    for ch in text.chars().filter(|ch| !ch.is_whitespace()) {
        total += 1;
        if is_cjk(ch) {
            cjk += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        cjk as f32 / total as f32
    }
}

impl FontFace {
    pub fn detect(text: &str, threshold: f32) -> FontFace {
        if cjk_ratio(text) >= threshold {
            FontFace::Cjk
        } else {
            FontFace::Latin
        }
    }
}

fn face_for_char(ch: char, prev: Option<FontFace>) -> FontFace {
    if is_cjk(ch) {
        return FontFace::Cjk;
    }
    if !ch.is_alphanumeric() {
        if let Some(prev) = prev {
            return prev;
        }
    }
    FontFace::Latin
}

/// Splits a line into runs that share a face; punctuation and spaces stick to
/// the run before them.
pub(crate) fn split_text_by_face(text: &str) -> Vec<(FontFace, String)> {
    let mut out: Vec<(FontFace, String)> = Vec::new();
    for ch in text.chars() {
        let prev = out.last().map(|(face, _)| *face);
        let face = face_for_char(ch, prev);
        match out.last_mut() {
            Some((current, run)) if *current == face => run.push(ch),
            _ => out.push((face, ch.to_string())),
        }
    }
    out
}
