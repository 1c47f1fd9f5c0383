//! Error types for the marketplace client.

/// Errors that can occur when building or sending a search request.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be sent or its body could not be read.
    #[error("Request failed: {0}")]
    RequestFailed(String),
    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// The server returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The region name is not in the table and cannot be turned into a host.
    #[error("Unknown region '{0}'")]
    UnknownRegion(String),
    /// The proxy URL was rejected by the HTTP client.
    #[error("Invalid proxy '{0}'")]
    InvalidProxy(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// True for failures of the request itself (network, timeout, non-2xx),
    /// as opposed to configuration mistakes that no retry can fix.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::RequestFailed(_) | Error::Timeout | Error::HttpStatus { .. }
        )
    }
}
