mod common;
pub use self::common::{Category, Format, Query, QueryCommon};

mod search;
pub use self::search::{SearchQuery, SortOrder};
