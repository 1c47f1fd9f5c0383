//! Listing records as they move through the pipeline.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A listing as extracted from one page element or feed entry, before filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawCandidate {
    /// Site-assigned posting id, or the listing URL when none is available.
    pub id: String,
    pub title: String,
    pub url: String,
    pub price: Option<i64>,
    pub location: Option<String>,
    /// ISO-8601 timestamp or the page's display text, as found.
    pub posted_at: Option<String>,
    pub region: String,
}

/// A candidate that passed filtering, stamped for persistence.
///
/// Field order matches the CSV export header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedListing {
    pub id: String,
    pub title: String,
    pub price: Option<i64>,
    pub location: Option<String>,
    pub posted_at: Option<String>,
    pub region: String,
    pub url: String,
    pub inserted_at: String,
}

impl NormalizedListing {
    pub fn from_candidate(candidate: RawCandidate, inserted_at: DateTime<Utc>) -> Self {
        let id = if candidate.id.is_empty() {
            candidate.url.clone()
        } else {
            candidate.id
        };
        Self {
            id,
            title: candidate.title,
            price: candidate.price,
            location: candidate.location,
            posted_at: candidate.posted_at,
            region: candidate.region,
            url: candidate.url,
            inserted_at: inserted_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}
