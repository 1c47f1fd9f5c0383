//! Per-run search configuration.

use std::time::Duration;

use carfinder_api::Category;

/// What the recency cutoff does with listings that carry no usable posted timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UndatedPolicy {
    /// Undated listings pass the cutoff.
    #[default]
    Include,
    /// Undated listings are skipped whenever a cutoff is configured.
    Exclude,
}

/// Immutable description of one search run.
///
/// Built once with the `with_*` methods, checked by
/// [`validate_spec`](crate::validation::validate_spec), then shared by reference.
#[derive(Clone, Debug)]
pub struct SearchSpec {
    pub make: String,
    pub model: String,
    /// Free-text query sent to the site; `"<make> <model>"` when absent.
    pub query: Option<String>,
    /// Region names, processed in this order.
    pub regions: Vec<String>,
    pub owner_only: bool,
    /// Every keyword must appear in the title.
    pub required_keywords: Vec<String>,
    /// No keyword may appear in the title.
    pub forbidden_keywords: Vec<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    /// Maximum number of new listings persisted across all regions.
    pub limit: usize,
    /// Base pause between result pages; jitter is added on top.
    pub delay: Duration,
    /// Skip listings posted more than this many days ago.
    pub since_days: Option<u32>,
    pub undated: UndatedPolicy,
    pub proxy: Option<String>,
}

pub const DEFAULT_REGIONS: &[&str] = &["losangeles", "sandiego", "sfbay"];
pub const DEFAULT_LIMIT: usize = 25;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2500);

impl SearchSpec {
    pub fn new(make: &str, model: &str) -> Self {
        Self {
            make: make.trim().to_string(),
            model: model.trim().to_string(),
            query: None,
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            owner_only: false,
            required_keywords: Vec::new(),
            forbidden_keywords: Vec::new(),
            min_year: None,
            max_year: None,
            limit: DEFAULT_LIMIT,
            delay: DEFAULT_DELAY,
            since_days: None,
            undated: UndatedPolicy::Include,
            proxy: None,
        }
    }

    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_regions(mut self, regions: &[String]) -> Self {
        self.regions = regions.to_vec();
        self
    }

    pub fn with_owner_only(mut self, owner_only: bool) -> Self {
        self.owner_only = owner_only;
        self
    }

    pub fn with_required_keywords(mut self, keywords: &[String]) -> Self {
        self.required_keywords = keywords.to_vec();
        self
    }

    pub fn with_forbidden_keywords(mut self, keywords: &[String]) -> Self {
        self.forbidden_keywords = keywords.to_vec();
        self
    }

    pub fn with_year_range(mut self, min_year: Option<i32>, max_year: Option<i32>) -> Self {
        self.min_year = min_year;
        self.max_year = max_year;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_since_days(mut self, since_days: Option<u32>) -> Self {
        self.since_days = since_days;
        self
    }

    pub fn with_undated_policy(mut self, undated: UndatedPolicy) -> Self {
        self.undated = undated;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<&str>) -> Self {
        self.proxy = proxy
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        self
    }

    /// The text sent as the site's `query` parameter.
    pub fn search_text(&self) -> String {
        match &self.query {
            Some(q) => q.clone(),
            None => format!("{} {}", self.make, self.model),
        }
    }

    pub fn category(&self) -> Category {
        if self.owner_only {
            Category::OwnerOnly
        } else {
            Category::AllSellers
        }
    }
}
