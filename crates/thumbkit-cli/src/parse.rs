use std::error::Error;
use std::path::PathBuf;
use thumbkit_core::CjkRegion;
use tracing::level_filters::LevelFilter;

pub(crate) fn parse_font_dirs(input: &str) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(trimmed
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect())
}

pub(crate) fn parse_timeout_ms(input: &str) -> Result<u64, Box<dyn Error>> {
    let trimmed = input.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Ok(trimmed.parse()?);
    }
    let duration = humantime::parse_duration(trimmed)?;
    let millis = duration.as_millis();
    if millis > u64::MAX as u128 {
        return Err("timeout too large".into());
    }
    Ok(millis as u64)
}

pub(crate) fn parse_log_level(value: &str) -> Option<LevelFilter> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "" => None,
        "off" | "none" | "0" | "false" | "no" => Some(LevelFilter::OFF),
        "error" | "err" | "1" => Some(LevelFilter::ERROR),
        "warn" | "warning" | "2" => Some(LevelFilter::WARN),
        "info" | "3" => Some(LevelFilter::INFO),
        "debug" | "dbg" | "4" => Some(LevelFilter::DEBUG),
        "trace" | "5" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

/// Titles for batch mode: one per non-blank line, surrounding whitespace trimmed.
pub(crate) fn parse_titles(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// First CJK-capable locale among `LC_ALL`, `LC_CTYPE` and `LANG`.
pub(crate) fn region_from_locale_vars<'a>(
    values: impl IntoIterator<Item = Option<&'a str>>,
) -> Option<CjkRegion> {
    values
        .into_iter()
        .flatten()
        .find_map(CjkRegion::from_locale)
}
