//! Library layer for the car finder: retrying fetcher, block detection,
//! listing extraction, filtering, SQLite/CSV persistence and the
//! pagination driver that ties them together.
//!
//! Builds on `carfinder_api` for region lookup, query building and
//! single-shot requests.

pub mod archive;
pub mod block;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod filter;
pub mod listing;
pub mod pipeline;
pub mod validation;

pub use carfinder_api;
pub use carfinder_api::{Category, Query, Region, RegionTable, SearchQuery, KNOWN_REGIONS};

pub use archive::Archive;
pub use block::{is_blocked, page_is_blocked};
pub use client::{FailureKind, FetchFailed, PageSource, RetryConfig, RetryingClient};
pub use config::{SearchSpec, UndatedPolicy};
pub use db::{Db, DbError, InsertOutcome};
pub use error::CarFinderError;
pub use export::{CsvExport, ExportError};
pub use extract::{
    parse_feed, DumpObserver, ExtractError, ExtractObserver, HtmlExtractor, LogObserver,
    PageExtract,
};
pub use filter::{model_variants, MatchFilter, RecencyFilter, Rejection};
pub use listing::{NormalizedListing, RawCandidate};
pub use pipeline::{Driver, DriverOptions, RegionSummary, RunSummary};
