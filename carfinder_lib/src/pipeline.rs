//! Pagination driver: walks each region's result pages, falls back to the
//! feed when a page is blocked or comes back empty, and hands every accepted
//! listing to the archive until the run-wide limit is reached.

use std::time::Duration;

use carfinder_api::{Query, Region, RegionTable, SearchQuery};
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::Serialize;

use crate::archive::Archive;
use crate::block::page_is_blocked;
use crate::client::PageSource;
use crate::config::SearchSpec;
use crate::db::{DbError, InsertOutcome};
use crate::error::CarFinderError;
use crate::extract::{parse_feed, ExtractObserver, HtmlExtractor, LogObserver};
use crate::filter::{MatchFilter, RecencyFilter};
use crate::listing::{NormalizedListing, RawCandidate};

/// Results per page on the site; the offset advances by this much.
pub const RESULTS_PER_PAGE: u32 = 120;
/// Page ceiling per region, independent of the result limit.
pub const MAX_PAGES: u32 = 20;

/// Paging knobs that are not part of a search.
#[derive(Clone, Debug)]
pub struct DriverOptions {
    pub max_pages: u32,
    pub page_stride: u32,
    /// Random extra pause added to the search delay, drawn from this range.
    pub jitter: (Duration, Duration),
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
            page_stride: RESULTS_PER_PAGE,
            jitter: (Duration::from_millis(300), Duration::from_millis(900)),
        }
    }
}

impl DriverOptions {
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.jitter = (min, max.max(min));
        self
    }

    fn pause(&self, base: Duration) -> Duration {
        let (min, max) = self.jitter;
        let extra = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        base + extra
    }
}

/// What happened in one region.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub pages: u32,
    pub feed_fallbacks: u32,
    pub new: usize,
    pub duplicates: usize,
    pub rejected: usize,
    /// Set when a fetch failure ended the region early.
    pub failure: Option<String>,
}

impl RegionSummary {
    fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            ..Self::default()
        }
    }
}

/// Outcome of a whole run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub regions: Vec<RegionSummary>,
    /// Listings persisted by this run, in the order they were found.
    pub new_listings: Vec<NormalizedListing>,
    pub limit_reached: bool,
}

impl RunSummary {
    pub fn new_count(&self) -> usize {
        self.new_listings.len()
    }

    pub fn duplicates(&self) -> usize {
        self.regions.iter().map(|r| r.duplicates).sum()
    }

    pub fn rejected(&self) -> usize {
        self.regions.iter().map(|r| r.rejected).sum()
    }

    pub fn pages(&self) -> u32 {
        self.regions.iter().map(|r| r.pages).sum()
    }

    pub fn feed_fallbacks(&self) -> u32 {
        self.regions.iter().map(|r| r.feed_fallbacks).sum()
    }

    pub fn failed_regions(&self) -> Vec<&str> {
        self.regions
            .iter()
            .filter(|r| r.failure.is_some())
            .map(|r| r.region.as_str())
            .collect()
    }
}

/// One page's worth of candidates and whether more pages may follow.
struct PageYield {
    candidates: Vec<RawCandidate>,
    has_next: bool,
}

/// Run-wide state threaded through the page loop.
struct RunState<'s> {
    spec: &'s SearchSpec,
    matcher: MatchFilter,
    recency: RecencyFilter,
    summary: RunSummary,
}

impl RunState<'_> {
    fn limit_reached(&self) -> bool {
        self.summary.new_count() >= self.spec.limit
    }
}

pub struct Driver<'a, S> {
    source: S,
    regions: &'a RegionTable,
    extractor: HtmlExtractor,
    observer: Box<dyn ExtractObserver + Send + Sync + 'a>,
    options: DriverOptions,
}

impl<'a, S: PageSource> Driver<'a, S> {
    pub fn new(source: S, regions: &'a RegionTable) -> Result<Self, CarFinderError> {
        Ok(Self {
            source,
            regions,
            extractor: HtmlExtractor::new()?,
            observer: Box::new(LogObserver),
            options: DriverOptions::default(),
        })
    }

    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn ExtractObserver + Send + Sync + 'a>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_extractor(mut self, extractor: HtmlExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs the search over every region in order. Fetch failures end only
    /// the region they happen in; storage failures end the run.
    pub async fn run(
        &self,
        spec: &SearchSpec,
        archive: &mut Archive,
    ) -> Result<RunSummary, CarFinderError> {
        let query = SearchQuery::new(&spec.search_text()).with_category(spec.category());
        let mut state = RunState {
            spec,
            matcher: MatchFilter::new(spec),
            recency: RecencyFilter::new(spec, Utc::now()),
            summary: RunSummary::default(),
        };

        for name in &spec.regions {
            if state.limit_reached() {
                break;
            }
            let region = self.regions.resolve(name)?;
            tracing::info!(
                "Region: {} | query='{}' | category={}",
                region.name,
                query.query,
                query.category
            );
            let mut stats = RegionSummary::new(&region.name);
            let result = self
                .run_region(&region, &query, &mut state, archive, &mut stats)
                .await;
            state.summary.regions.push(stats);
            result?;
        }

        state.summary.limit_reached = state.limit_reached();
        let db = archive.db();
        db.set_meta(
            "last_run_at",
            &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        db.set_meta("last_run_new", &state.summary.new_count().to_string())?;
        db.set_meta(
            "last_run_regions",
            &serde_json::to_string(&state.summary.regions).map_err(DbError::from)?,
        )?;

        tracing::info!(
            "Done. New listings added: {} (duplicates {}, rejected {}, pages {})",
            state.summary.new_count(),
            state.summary.duplicates(),
            state.summary.rejected(),
            state.summary.pages()
        );
        Ok(state.summary)
    }

    async fn run_region(
        &self,
        region: &Region,
        base: &SearchQuery,
        state: &mut RunState<'_>,
        archive: &mut Archive,
        stats: &mut RegionSummary,
    ) -> Result<(), CarFinderError> {
        for page in 0..self.options.max_pages {
            let offset = page * self.options.page_stride;
            let query = base.clone().with_offset(offset);

            let body = match self.source.fetch_page(region, &query).await {
                Ok(body) => body,
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!("{}; moving on to the next region", err);
                    stats.failure = Some(err.to_string());
                    return Ok(());
                }
            };
            stats.pages += 1;

            let yielded = self.read_page(region, &query, &body, offset, stats).await?;
            if yielded.candidates.is_empty() {
                tracing::info!("{}: no items on page {}", region.name, page + 1);
                return Ok(());
            }

            for candidate in yielded.candidates {
                if state.limit_reached() {
                    break;
                }
                self.consider(candidate, state, archive, stats)?;
            }

            if state.limit_reached() || !yielded.has_next {
                return Ok(());
            }
            if page + 1 < self.options.max_pages {
                tokio::time::sleep(self.options.pause(state.spec.delay)).await;
            }
        }
        tracing::info!(
            "{}: stopped at the {}-page ceiling",
            region.name,
            self.options.max_pages
        );
        Ok(())
    }

    /// Classifies a fetched page and produces its candidates, consulting the
    /// feed when the page is a block challenge or an empty first page.
    async fn read_page(
        &self,
        region: &Region,
        query: &SearchQuery,
        body: &str,
        offset: u32,
        stats: &mut RegionSummary,
    ) -> Result<PageYield, CarFinderError> {
        if page_is_blocked(body) {
            tracing::warn!(
                "{}: block/verification page detected, using feed fallback",
                region.name
            );
            return self.feed_fallback(region, query, stats).await;
        }

        let page = self.extractor.extract(body, region, self.observer.as_ref());
        if page.candidates.is_empty() && offset == 0 {
            tracing::info!("{}: results page empty, trying feed fallback", region.name);
            return self.feed_fallback(region, query, stats).await;
        }
        Ok(PageYield {
            has_next: page.next_page.is_some(),
            candidates: page.candidates,
        })
    }

    async fn feed_fallback(
        &self,
        region: &Region,
        query: &SearchQuery,
        stats: &mut RegionSummary,
    ) -> Result<PageYield, CarFinderError> {
        stats.feed_fallbacks += 1;
        let candidates = match self.source.fetch_feed(region, query).await {
            Ok(xml) => parse_feed(&xml, region),
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                tracing::warn!("{}", err);
                stats.failure = Some(err.to_string());
                Vec::new()
            }
        };
        if !candidates.is_empty() {
            tracing::info!("{}: feed returned {} items", region.name, candidates.len());
        }
        Ok(PageYield {
            candidates,
            has_next: false,
        })
    }

    fn consider(
        &self,
        candidate: RawCandidate,
        state: &mut RunState<'_>,
        archive: &mut Archive,
        stats: &mut RegionSummary,
    ) -> Result<(), CarFinderError> {
        let verdict = state
            .matcher
            .check(&candidate.title)
            .and_then(|()| state.recency.check(candidate.posted_at.as_deref()));
        if let Err(reason) = verdict {
            tracing::debug!("[REJECT] {}: {}", candidate.title, reason);
            stats.rejected += 1;
            return Ok(());
        }

        let listing = NormalizedListing::from_candidate(candidate, Utc::now());
        match archive.record(&listing)? {
            InsertOutcome::Inserted => {
                tracing::info!(
                    "[NEW] {}  {}  -> {}",
                    listing.title,
                    listing
                        .price
                        .map(|p| format!("${}", p))
                        .unwrap_or_else(|| "-".to_string()),
                    listing.url
                );
                stats.new += 1;
                state.summary.new_listings.push(listing);
            }
            InsertOutcome::Ignored => {
                tracing::debug!("[SKIP] dup: {}", listing.url);
                stats.duplicates += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_stays_in_jitter_range() {
        let opts = DriverOptions::default();
        for _ in 0..50 {
            let pause = opts.pause(Duration::from_millis(2500));
            assert!(pause >= Duration::from_millis(2800));
            assert!(pause <= Duration::from_millis(3400));
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let opts = DriverOptions::default().with_jitter(Duration::ZERO, Duration::ZERO);
        assert_eq!(opts.pause(Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[test]
    fn summary_totals() {
        let summary = RunSummary {
            regions: vec![
                RegionSummary {
                    region: "a".into(),
                    pages: 2,
                    duplicates: 1,
                    rejected: 3,
                    ..RegionSummary::default()
                },
                RegionSummary {
                    region: "b".into(),
                    pages: 1,
                    feed_fallbacks: 1,
                    failure: Some("timed out".into()),
                    ..RegionSummary::default()
                },
            ],
            ..RunSummary::default()
        };
        assert_eq!(summary.pages(), 3);
        assert_eq!(summary.duplicates(), 1);
        assert_eq!(summary.rejected(), 3);
        assert_eq!(summary.feed_fallbacks(), 1);
        assert_eq!(summary.failed_regions(), vec!["b"]);
    }
}
