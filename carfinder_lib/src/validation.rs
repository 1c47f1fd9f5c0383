//! Input validation for search configuration.

use std::time::Duration;

use url::Url;

use crate::config::SearchSpec;
use crate::error::CarFinderError;

pub const MAX_TEXT_LENGTH: usize = 100;
pub const MAX_KEYWORDS: usize = 20;
pub const MIN_MODEL_YEAR: i32 = 1900;
pub const MAX_MODEL_YEAR: i32 = 2099;
pub const MAX_DELAY: Duration = Duration::from_secs(300);
pub const MAX_LIMIT: usize = 1000;
pub const MAX_SINCE_DAYS: u32 = 36_500;

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, CarFinderError> {
    if input.len() > max_len {
        return Err(CarFinderError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(CarFinderError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a keyword list: sanitize each entry, lowercase, drop duplicates.
pub fn validate_keywords(keywords: &[String]) -> Result<Vec<String>, CarFinderError> {
    if keywords.len() > MAX_KEYWORDS {
        return Err(CarFinderError::InvalidInput(format!(
            "at most {} keywords are allowed",
            MAX_KEYWORDS
        )));
    }
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let clean = sanitize_text(keyword, MAX_TEXT_LENGTH)?.to_lowercase();
        if !out.contains(&clean) {
            out.push(clean);
        }
    }
    Ok(out)
}

/// Validate a model year (1900..=2099).
pub fn validate_year(year: i32) -> Result<i32, CarFinderError> {
    if !(MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&year) {
        return Err(CarFinderError::InvalidInput(format!(
            "year {} is outside {}..={}",
            year, MIN_MODEL_YEAR, MAX_MODEL_YEAR
        )));
    }
    Ok(year)
}

/// Validate an optional year range; both ends are optional but must be ordered.
pub fn validate_year_range(
    min_year: Option<i32>,
    max_year: Option<i32>,
) -> Result<(Option<i32>, Option<i32>), CarFinderError> {
    let min_year = min_year.map(validate_year).transpose()?;
    let max_year = max_year.map(validate_year).transpose()?;
    if let (Some(min), Some(max)) = (min_year, max_year) {
        if min > max {
            return Err(CarFinderError::InvalidInput(format!(
                "min year {} is after max year {}",
                min, max
            )));
        }
    }
    Ok((min_year, max_year))
}

/// Validate the new-listing limit (must be 1..=1000).
pub fn validate_limit(limit: usize) -> Result<usize, CarFinderError> {
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(CarFinderError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// Validate the recency window in days (at most a century).
pub fn validate_since_days(days: u32) -> Result<u32, CarFinderError> {
    if days > MAX_SINCE_DAYS {
        return Err(CarFinderError::InvalidInput(format!(
            "since must not exceed {} days",
            MAX_SINCE_DAYS
        )));
    }
    Ok(days)
}

/// Validate a delay given in (possibly fractional) seconds.
pub fn validate_delay_secs(secs: f64) -> Result<Duration, CarFinderError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(CarFinderError::InvalidInput(
            "delay must be a non-negative number of seconds".to_string(),
        ));
    }
    let delay = Duration::from_secs_f64(secs);
    if delay > MAX_DELAY {
        return Err(CarFinderError::InvalidInput(format!(
            "delay must not exceed {} seconds",
            MAX_DELAY.as_secs()
        )));
    }
    Ok(delay)
}

/// Validate a proxy URL: must parse and use http, https, socks5 or socks5h.
pub fn validate_proxy(input: &str) -> Result<String, CarFinderError> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|e| {
        CarFinderError::InvalidInput(format!("invalid proxy URL '{}': {}", trimmed, e))
    })?;
    match url.scheme() {
        "http" | "https" | "socks5" | "socks5h" => Ok(trimmed.to_string()),
        other => Err(CarFinderError::InvalidInput(format!(
            "unsupported proxy scheme '{}'",
            other
        ))),
    }
}

/// Validate a region name syntactically: lowercase letters and digits only.
pub fn validate_region(input: &str) -> Result<String, CarFinderError> {
    let lower = input.trim().to_ascii_lowercase();
    if lower.is_empty()
        || lower.len() > 63
        || !lower.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(CarFinderError::InvalidInput(format!(
            "invalid region '{}'. Use a marketplace sub-site name such as sfbay or losangeles",
            input
        )));
    }
    Ok(lower)
}

/// Validate and normalise a whole search configuration, returning a cleaned copy.
pub fn validate_spec(spec: &SearchSpec) -> Result<SearchSpec, CarFinderError> {
    let make = sanitize_text(&spec.make, MAX_TEXT_LENGTH)?;
    let model = sanitize_text(&spec.model, MAX_TEXT_LENGTH)?;
    let query = spec
        .query
        .as_deref()
        .map(|q| sanitize_text(q, MAX_TEXT_LENGTH))
        .transpose()?;
    if spec.regions.is_empty() {
        return Err(CarFinderError::InvalidInput(
            "at least one region is required".to_string(),
        ));
    }
    let mut regions: Vec<String> = Vec::with_capacity(spec.regions.len());
    for region in &spec.regions {
        let region = validate_region(region)?;
        if !regions.contains(&region) {
            regions.push(region);
        }
    }
    let (min_year, max_year) = validate_year_range(spec.min_year, spec.max_year)?;
    let proxy = spec.proxy.as_deref().map(validate_proxy).transpose()?;
    if spec.delay > MAX_DELAY {
        return Err(CarFinderError::InvalidInput(format!(
            "delay must not exceed {} seconds",
            MAX_DELAY.as_secs()
        )));
    }

    Ok(SearchSpec {
        make,
        model,
        query,
        regions,
        owner_only: spec.owner_only,
        required_keywords: validate_keywords(&spec.required_keywords)?,
        forbidden_keywords: validate_keywords(&spec.forbidden_keywords)?,
        min_year,
        max_year,
        limit: validate_limit(spec.limit)?,
        delay: spec.delay,
        since_days: spec.since_days.map(validate_since_days).transpose()?,
        undated: spec.undated,
        proxy,
    })
}
