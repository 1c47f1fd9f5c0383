//! Client for a regional vehicle classifieds marketplace: region table,
//! search query builder and a one-shot page/feed fetcher.

mod client;
mod errors;
mod query;
pub mod regions;
mod user_agent;
pub use self::client::{Client, DEFAULT_TIMEOUT};
pub use self::errors::Error;
pub use self::query::{Category, Format, Query, QueryCommon, SearchQuery, SortOrder};
pub use self::regions::{Region, RegionTable, KNOWN_REGIONS};
pub use self::user_agent::{get_user_agent, USER_AGENTS};
