use std::fmt;

use url::Url;

use super::common::{Category, QueryCommon};
use super::Query;

/// Sort order requested from the search endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest postings first.
    #[default]
    Date,
    /// Site relevance ranking.
    Relevance,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Date => write!(f, "date"),
            SortOrder::Relevance => write!(f, "rel"),
        }
    }
}

/// A vehicle search against one region's `/search/<category>` endpoint.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    pub common: QueryCommon,
    pub query: String,
    pub category: Category,
    pub sort: SortOrder,
    /// Only postings that carry at least one photo.
    pub has_pic: bool,
    /// Match the query against titles only (`srchType=T`).
    pub title_only: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            common: QueryCommon::default(),
            query: String::new(),
            category: Category::AllSellers,
            sort: SortOrder::Date,
            has_pic: true,
            title_only: true,
        }
    }
}

impl Query for SearchQuery {
    fn get_common(&mut self) -> &mut QueryCommon {
        &mut self.common
    }

    fn common(&self) -> &QueryCommon {
        &self.common
    }

    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut().append_pair("query", &self.query);
        url.query_pairs_mut()
            .append_pair("sort", &self.sort.to_string());
        if self.has_pic {
            url.query_pairs_mut().append_pair("hasPic", "1");
        }
        if self.title_only {
            url.query_pairs_mut().append_pair("srchType", "T");
        }
        self.common.add_to_url(&url)
    }
}

impl SearchQuery {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_has_pic(mut self, has_pic: bool) -> Self {
        self.has_pic = has_pic;
        self
    }

    pub fn with_title_only(mut self, title_only: bool) -> Self {
        self.title_only = title_only;
        self
    }

    /// Path of the search endpoint relative to the region base.
    pub fn path(&self) -> String {
        format!("/search/{}", self.category.code())
    }
}
