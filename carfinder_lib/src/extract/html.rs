//! Results-page extractor. The marketplace has shipped several markups over
//! the years; each field is resolved through an ordered strategy list so a
//! layout can be added or retired without touching callers.

use carfinder_api::Region;
use scraper::{ElementRef, Html};

use super::strategy::{first_containers, first_resolved, ContainerStrategy, Strategy};
use super::{parse_price, scan_currency, ExtractError, ExtractObserver, PageExtract};
use crate::listing::RawCandidate;

const TITLE_FALLBACK_CHARS: usize = 140;

/// Container attributes that carry the site's posting id, in preference order.
const ID_ATTRIBUTES: &[&str] = &["data-pid", "data-id", "id"];

/// A listing link: its href as written, its `aria-label` and its visible text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub label: Option<String>,
    pub text: Option<String>,
}

fn normalized_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn anchor_of(el: ElementRef<'_>) -> Option<Anchor> {
    Some(Anchor {
        href: attr(el, "href")?,
        label: attr(el, "aria-label"),
        text: non_empty(normalized_text(el)),
    })
}

fn price_of(el: ElementRef<'_>) -> Option<i64> {
    parse_price(&normalized_text(el))
}

fn location_of(el: ElementRef<'_>) -> Option<String> {
    let text = normalized_text(el);
    non_empty(
        text.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
            .to_string(),
    )
}

fn datetime_of(el: ElementRef<'_>) -> Option<String> {
    attr(el, "datetime")
}

fn time_title_of(el: ElementRef<'_>) -> Option<String> {
    attr(el, "title")
}

fn display_time_of(el: ElementRef<'_>) -> Option<String> {
    non_empty(normalized_text(el))
}

fn href_of(el: ElementRef<'_>) -> Option<String> {
    attr(el, "href")
}

/// Extracts candidates from an HTML results page.
pub struct HtmlExtractor {
    containers: Vec<ContainerStrategy>,
    anchors: Vec<Strategy<Anchor>>,
    prices: Vec<Strategy<i64>>,
    locations: Vec<Strategy<String>>,
    posted: Vec<Strategy<String>>,
    next_page: Vec<Strategy<String>>,
}

impl HtmlExtractor {
    /// Builds the extractor with the strategy tables for every known layout.
    pub fn new() -> Result<Self, ExtractError> {
        let listing_link =
            "a.cl-app-anchor, a.hdrlnk, a.result-title, a[href*='/cto/'], a[href*='/ctd/']";
        Ok(Self {
            containers: vec![
                ContainerStrategy::new(
                    "search-result",
                    "li.cl-search-result, li.cl-static-search-result",
                )?,
                ContainerStrategy::new("result-row", "li.result-row")?,
                ContainerStrategy::new("static-result", ".cl-static-search-result")?,
                ContainerStrategy::new("linked-item", "li")?.requiring(listing_link)?,
            ],
            anchors: vec![
                Strategy::new("app-anchor", "a.cl-app-anchor", anchor_of)?,
                Strategy::new("title-hdrlnk", "a.result-title.hdrlnk", anchor_of)?,
                Strategy::new("result-title", "a.result-title", anchor_of)?,
                Strategy::new("posting-title", "a.posting-title", anchor_of)?,
                Strategy::new("titlestring", ".titlestring a", anchor_of)?,
                Strategy::new("hdrlnk", "a.hdrlnk", anchor_of)?,
                Strategy::new("posting-path", "a[href*='/cto/'], a[href*='/ctd/']", anchor_of)?,
                Strategy::new("any-link", "a[href]", anchor_of)?,
            ],
            prices: vec![
                Strategy::new("price", "span.price", price_of)?,
                Strategy::new("result-price", "span.result-price, .result-price", price_of)?,
                Strategy::new("price-tag", "span.pricenew, span.pricetag", price_of)?,
                Strategy::new("price-class", ".price", price_of)?,
                Strategy::new("price-like", "span[class*='price']", price_of)?,
            ],
            locations: vec![
                Strategy::new("neighborhood", "span.neighborhood", location_of)?,
                Strategy::new("result-hood", "span.result-hood, .result-hood", location_of)?,
                Strategy::new("hood", "span.hood", location_of)?,
                Strategy::new("location", ".location", location_of)?,
            ],
            posted: vec![
                Strategy::new("time-datetime", "time[datetime]", datetime_of)?,
                Strategy::new("time-title", "time[title]", time_title_of)?,
                Strategy::new("time-text", "time", display_time_of)?,
            ],
            next_page: vec![
                Strategy::new("button-next", "a.button.next", href_of)?,
                Strategy::new("next-page", "a.cl-next-page", href_of)?,
                Strategy::new("rel-next", "a[rel='next'], link[rel='next']", href_of)?,
            ],
        })
    }

    /// Replaces the container strategies, e.g. to try a new layout first.
    pub fn with_containers(mut self, containers: Vec<ContainerStrategy>) -> Self {
        self.containers = containers;
        self
    }

    /// Extracts all candidates and the next-page link from `html`.
    pub fn extract(
        &self,
        html: &str,
        region: &Region,
        observer: &dyn ExtractObserver,
    ) -> PageExtract {
        let document = Html::parse_document(html);
        let next_page = first_resolved(&self.next_page, document.root_element())
            .map(|href| absolutize(region, &href));

        let Some((layout, containers)) = first_containers(&self.containers, &document) else {
            observer.no_containers(&region.name, html);
            return PageExtract {
                candidates: Vec::new(),
                next_page,
                layout: None,
            };
        };
        tracing::debug!(
            region = %region.name,
            layout,
            containers = containers.len(),
            "matched listing containers"
        );

        let candidates = containers
            .into_iter()
            .filter_map(|el| self.candidate(el, region))
            .collect();

        PageExtract {
            candidates,
            next_page,
            layout: Some(layout),
        }
    }

    fn candidate(&self, container: ElementRef<'_>, region: &Region) -> Option<RawCandidate> {
        let anchor = first_resolved(&self.anchors, container)?;
        let url = absolutize(region, &anchor.href);
        let title = anchor
            .label
            .or_else(|| attr(container, "title"))
            .or(anchor.text)
            .unwrap_or_else(|| {
                normalized_text(container)
                    .chars()
                    .take(TITLE_FALLBACK_CHARS)
                    .collect()
            });
        let price = first_resolved(&self.prices, container)
            .or_else(|| scan_currency(&normalized_text(container)));
        let location = first_resolved(&self.locations, container);
        let posted_at = first_resolved(&self.posted, container);
        let id = ID_ATTRIBUTES
            .iter()
            .find_map(|name| attr(container, name))
            .unwrap_or_else(|| url.clone());

        Some(RawCandidate {
            id,
            title,
            url,
            price,
            location,
            posted_at,
            region: region.name.clone(),
        })
    }
}

fn absolutize(region: &Region, href: &str) -> String {
    region
        .base_url
        .join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
