use crate::CjkRegion;
use unicode_script::{Script, UnicodeScript};

impl CjkRegion {
    /// Reads a POSIX/BCP-47 style locale tag (`zh_TW.UTF-8`, `ja-JP`, `zh-Hant`).
    pub fn from_locale(value: &str) -> Option<CjkRegion> {
        let raw = value.trim();
        if raw.is_empty() {
            return None;
        }
        let mut base = raw.to_ascii_lowercase();
        if let Some(pos) = base.find(['.', '@']) {
            base.truncate(pos);
        }
        let normalized = base.replace('-', "_");
        let parts = normalized
            .split('_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();
        match parts.first().copied()? {
            "ja" => Some(CjkRegion::Jp),
            "ko" => Some(CjkRegion::Kr),
            "zh" => {
                if parts.iter().any(|part| matches!(*part, "hk" | "mo")) {
                    Some(CjkRegion::Hk)
                } else if parts.iter().any(|part| matches!(*part, "tw" | "hant")) {
                    Some(CjkRegion::Tc)
                } else {
                    Some(CjkRegion::Sc)
                }
            }
            _ => None,
        }
    }

    pub const ALL: [CjkRegion; 5] = [
        CjkRegion::Sc,
        CjkRegion::Tc,
        CjkRegion::Hk,
        CjkRegion::Jp,
        CjkRegion::Kr,
    ];

    /// Installed family names that cover this region's glyph variants, best first.
    pub fn families(self) -> &'static [&'static str] {
        match self {
            CjkRegion::Sc => &[
                "Noto Sans CJK SC",
                "Source Han Sans SC",
                "PingFang SC",
                "Hiragino Sans GB",
                "Microsoft YaHei",
                "WenQuanYi Micro Hei",
                "WenQuanYi Zen Hei",
            ],
            CjkRegion::Tc => &[
                "Noto Sans CJK TC",
                "Source Han Sans TC",
                "PingFang TC",
                "Microsoft JhengHei",
            ],
            CjkRegion::Hk => &[
                "Noto Sans CJK HK",
                "Source Han Sans HK",
                "PingFang HK",
                "Microsoft JhengHei",
            ],
            CjkRegion::Jp => &[
                "Noto Sans CJK JP",
                "Source Han Sans JP",
                "Hiragino Sans",
                "Yu Gothic",
                "Meiryo",
            ],
            CjkRegion::Kr => &[
                "Noto Sans CJK KR",
                "Source Han Sans KR",
                "Apple SD Gothic Neo",
                "Malgun Gothic",
            ],
        }
    }
}

impl std::str::FromStr for CjkRegion {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sc" => Ok(CjkRegion::Sc),
            "tc" => Ok(CjkRegion::Tc),
            "hk" => Ok(CjkRegion::Hk),
            "jp" => Ok(CjkRegion::Jp),
            "kr" => Ok(CjkRegion::Kr),
            other => Err(crate::Error::Config(format!(
                "unknown cjk region {other:?} (expected sc, tc, hk, jp or kr)"
            ))),
        }
    }
}

/// Kana and Hangul pin the region regardless of preference; Han-only text keeps it.
pub(crate) fn region_for_text(text: &str, preferred: CjkRegion) -> CjkRegion {
    let mut bopomofo = false;
    for ch in text.chars() {
        match ch.script() {
            Script::Hiragana | Script::Katakana => return CjkRegion::Jp,
            Script::Hangul => return CjkRegion::Kr,
            Script::Bopomofo => bopomofo = true,
            _ => {}
        }
    }
    if bopomofo && preferred == CjkRegion::Sc {
        CjkRegion::Tc
    } else {
        preferred
    }
}
