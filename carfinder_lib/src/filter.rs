//! Title matching and recency filtering of extracted candidates.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::config::{SearchSpec, UndatedPolicy};

/// Why a candidate was turned away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    ForbiddenKeyword(String),
    MissingMake,
    MissingModel,
    MissingKeyword(String),
    YearOutOfRange(i32),
    TooOld,
    Undated,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ForbiddenKeyword(k) => write!(f, "forbidden keyword '{}'", k),
            Rejection::MissingMake => write!(f, "make not in title"),
            Rejection::MissingModel => write!(f, "model not in title"),
            Rejection::MissingKeyword(k) => write!(f, "required keyword '{}' missing", k),
            Rejection::YearOutOfRange(y) => write!(f, "year {} out of range", y),
            Rejection::TooOld => write!(f, "posted before cutoff"),
            Rejection::Undated => write!(f, "no posted date"),
        }
    }
}

/// Spellings of `model` accepted in titles: as given, without hyphens,
/// without spaces, and with hyphens turned into single spaces. Lowercased,
/// in that order, without duplicates.
pub fn model_variants(model: &str) -> Vec<String> {
    let m = model.trim().to_lowercase();
    let spaced = m
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut out: Vec<String> = Vec::with_capacity(4);
    for variant in [m.clone(), m.replace('-', ""), m.replace(' ', ""), spaced] {
        if !variant.is_empty() && !out.contains(&variant) {
            out.push(variant);
        }
    }
    out
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("year pattern compiles"))
}

/// All year-like tokens (1900-2099) in `title`.
pub fn years_in(title: &str) -> Vec<i32> {
    year_re()
        .captures_iter(title)
        .filter_map(|cap| cap[1].parse().ok())
        .collect()
}

/// Decides from the title alone whether a candidate is the vehicle searched for.
///
/// Listing bodies are never consulted; they mention too many unrelated vehicles.
#[derive(Clone, Debug)]
pub struct MatchFilter {
    make: String,
    variants: Vec<String>,
    required: Vec<String>,
    forbidden: Vec<String>,
    min_year: Option<i32>,
    max_year: Option<i32>,
}

fn lowered(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

impl MatchFilter {
    pub fn new(spec: &SearchSpec) -> Self {
        Self {
            make: spec.make.trim().to_lowercase(),
            variants: model_variants(&spec.model),
            required: lowered(&spec.required_keywords),
            forbidden: lowered(&spec.forbidden_keywords),
            min_year: spec.min_year,
            max_year: spec.max_year,
        }
    }

    /// Checks every rule in order and reports the first one that fails.
    pub fn check(&self, title: &str) -> Result<(), Rejection> {
        let tl = title.to_lowercase();
        if let Some(word) = self.forbidden.iter().find(|w| tl.contains(w.as_str())) {
            return Err(Rejection::ForbiddenKeyword(word.clone()));
        }
        if !tl.contains(&self.make) {
            return Err(Rejection::MissingMake);
        }
        if !self.variants.iter().any(|v| tl.contains(v.as_str())) {
            return Err(Rejection::MissingModel);
        }
        if let Some(word) = self.required.iter().find(|w| !tl.contains(w.as_str())) {
            return Err(Rejection::MissingKeyword(word.clone()));
        }
        if self.min_year.is_some() || self.max_year.is_some() {
            if let Some(year) = years_in(title).into_iter().max() {
                let too_low = self.min_year.is_some_and(|min| year < min);
                let too_high = self.max_year.is_some_and(|max| year > max);
                if too_low || too_high {
                    return Err(Rejection::YearOutOfRange(year));
                }
            }
        }
        Ok(())
    }

    pub fn accepts(&self, title: &str) -> bool {
        self.check(title).is_ok()
    }
}

/// Parses the timestamp shapes seen on result pages and feeds. Naive values are taken as UTC.
pub fn parse_posted(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Applies the `since_days` cutoff to a candidate's posted timestamp.
#[derive(Clone, Debug)]
pub struct RecencyFilter {
    cutoff: Option<DateTime<Utc>>,
    undated: UndatedPolicy,
}

impl RecencyFilter {
    pub fn new(spec: &SearchSpec, now: DateTime<Utc>) -> Self {
        Self {
            cutoff: spec.since_days.map(|days| {
                Duration::try_days(i64::from(days))
                    .and_then(|back| now.checked_sub_signed(back))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC)
            }),
            undated: spec.undated,
        }
    }

    pub fn check(&self, posted_at: Option<&str>) -> Result<(), Rejection> {
        let Some(cutoff) = self.cutoff else {
            return Ok(());
        };
        match posted_at.and_then(parse_posted) {
            Some(posted) if posted >= cutoff => Ok(()),
            Some(_) => Err(Rejection::TooOld),
            None => match self.undated {
                UndatedPolicy::Include => Ok(()),
                UndatedPolicy::Exclude => Err(Rejection::Undated),
            },
        }
    }

    pub fn admits(&self, posted_at: Option<&str>) -> bool {
        self.check(posted_at).is_ok()
    }
}
