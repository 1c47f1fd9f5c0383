//! Shared query infrastructure: the [`Query`] trait, [`QueryCommon`] fields, [`Category`] and [`Format`].

use std::fmt;

use url::Url;

/// Trait implemented by all query builders. Provides URL serialization and
/// shared builder methods for pagination and response format.
pub trait Query {
    /// Appends this query's parameters to the given URL, returning the modified URL.
    fn add_to_url(&self, url: &Url) -> Url;

    /// Returns a mutable reference to the common query fields.
    fn get_common(&mut self) -> &mut QueryCommon;

    /// Returns the common query fields.
    fn common(&self) -> &QueryCommon;

    /// Sets the result offset (0-based listing index, not a page number).
    fn with_offset(mut self, offset: u32) -> Self
    where
        Self: Sized,
    {
        self.get_common().offset = offset;
        self
    }

    /// Requests the given representation of the results.
    fn with_format(mut self, format: Format) -> Self
    where
        Self: Sized,
    {
        self.get_common().format = format;
        self
    }
}

/// Representation of a search results page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// The regular HTML results page.
    #[default]
    Html,
    /// The syndicated RSS feed of the same search.
    Rss,
}

/// Listing category searched within a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Category {
    /// Cars and trucks from all sellers (`cta`).
    #[default]
    AllSellers,
    /// Cars and trucks from owners only (`cto`).
    OwnerOnly,
}

impl Category {
    pub fn code(&self) -> &'static str {
        match self {
            Category::AllSellers => "cta",
            Category::OwnerOnly => "cto",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Fields shared by all query types: pagination offset and response format.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryCommon {
    /// Offset of the first result. Defaults to 0.
    pub offset: u32,
    /// Requested representation. Defaults to HTML.
    pub format: Format,
}

impl QueryCommon {
    /// Appends the offset and, for feeds, the format parameter to the URL.
    pub fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair("s", &self.offset.to_string());
        if self.format == Format::Rss {
            url.query_pairs_mut().append_pair("format", "rss");
        }
        url
    }
}
