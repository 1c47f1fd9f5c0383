//! Error types for the library layer.

use std::fmt;

use crate::client::FetchFailed;
use crate::db::DbError;
use crate::export::ExportError;
use crate::extract::ExtractError;

/// Errors produced by the library layer, wrapping the marketplace client,
/// storage and export failures, and adding input validation failures.
#[derive(Debug)]
pub enum CarFinderError {
    /// A configuration error from the underlying client (bad region, bad proxy).
    Api(carfinder_api::Error),
    /// All fetch attempts for one request failed.
    Fetch(FetchFailed),
    /// The SQLite store could not be opened, initialised or written.
    Storage(DbError),
    /// The CSV export could not be written.
    Export(ExportError),
    /// An extraction strategy could not be constructed.
    Extract(ExtractError),
    /// User-provided input failed validation.
    InvalidInput(String),
}

impl CarFinderError {
    /// Storage and export failures abort a run; dedup cannot be trusted without them.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_fatal(),
            Self::Api(_) => false,
            Self::Storage(_) | Self::Export(_) | Self::Extract(_) | Self::InvalidInput(_) => true,
        }
    }
}

impl fmt::Display for CarFinderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "Client error: {}", e),
            Self::Fetch(e) => write!(f, "Fetch error: {}", e),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Export(e) => write!(f, "Export error: {}", e),
            Self::Extract(e) => write!(f, "Extraction error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for CarFinderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Fetch(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Extract(e) => Some(e),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<carfinder_api::Error> for CarFinderError {
    fn from(e: carfinder_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<FetchFailed> for CarFinderError {
    fn from(e: FetchFailed) -> Self {
        Self::Fetch(e)
    }
}

impl From<DbError> for CarFinderError {
    fn from(e: DbError) -> Self {
        Self::Storage(e)
    }
}

impl From<ExportError> for CarFinderError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

impl From<ExtractError> for CarFinderError {
    fn from(e: ExtractError) -> Self {
        Self::Extract(e)
    }
}
