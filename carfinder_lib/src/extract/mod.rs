//! Turning fetched documents into raw listing candidates.
//!
//! Two extractors share one contract: document text plus region in, a
//! sequence of [`RawCandidate`] out, with no network or storage access.
//! Finding nothing is a valid outcome and never an error.

mod feed;
mod html;
mod strategy;

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::listing::RawCandidate;

pub use self::feed::parse_feed;
pub use self::html::{Anchor, HtmlExtractor};
pub use self::strategy::{first_containers, first_resolved, ContainerStrategy, Strategy};

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}

/// Result of extracting one results page.
#[derive(Debug, Default)]
pub struct PageExtract {
    pub candidates: Vec<RawCandidate>,
    /// Absolute URL of the next results page, if the page links one.
    pub next_page: Option<String>,
    /// Label of the container strategy that matched, if any did.
    pub layout: Option<&'static str>,
}

/// Receives diagnostics from the extractors, such as a results page in
/// which no container strategy matched (a sign of markup drift).
pub trait ExtractObserver {
    fn no_containers(&self, region: &str, document: &str);
}

/// Logs diagnostics through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ExtractObserver for LogObserver {
    fn no_containers(&self, region: &str, document: &str) {
        tracing::debug!(
            region,
            bytes = document.len(),
            "no listing containers matched any layout"
        );
    }
}

/// Logs like [`LogObserver`] and also saves the offending document to a file.
#[derive(Debug, Clone)]
pub struct DumpObserver {
    path: PathBuf,
}

impl DumpObserver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExtractObserver for DumpObserver {
    fn no_containers(&self, region: &str, document: &str) {
        LogObserver.no_containers(region, document);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!("could not create {}: {}", parent.display(), err);
                return;
            }
        }
        match std::fs::write(&self.path, document) {
            Ok(()) => tracing::info!("saved unmatched page to {}", self.path.display()),
            Err(err) => tracing::warn!("could not write {}: {}", self.path.display(), err),
        }
    }
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d,]*").expect("amount pattern compiles"))
}

fn currency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s*(\d[\d,]*)").expect("currency pattern compiles"))
}

fn parens_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]+)\)").expect("parenthesis pattern compiles"))
}

fn to_amount(digits: &str) -> Option<i64> {
    digits.replace(',', "").parse().ok()
}

/// Reads the first amount in a dedicated price element's text.
/// `"$12,500 obo"` gives `Some(12500)`; text without digits gives `None`.
pub fn parse_price(text: &str) -> Option<i64> {
    amount_re().find(text).and_then(|m| to_amount(m.as_str()))
}

/// Finds the first `$`-prefixed amount in free text.
pub fn scan_currency(text: &str) -> Option<i64> {
    currency_re()
        .captures(text)
        .and_then(|cap| to_amount(&cap[1]))
}

/// Text inside the first pair of parentheses, trimmed.
pub fn parenthesized(text: &str) -> Option<String> {
    parens_re()
        .captures(text)
        .map(|cap| cap[1].trim().to_string())
        .filter(|s| !s.is_empty())
}
