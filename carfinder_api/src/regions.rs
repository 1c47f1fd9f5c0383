//! Region table: maps marketplace region names to their base URLs.

use std::collections::BTreeMap;

use url::Url;

use crate::Error;

/// Regions known ahead of time. Any other lowercase alphanumeric name is
/// resolved as a subdomain of the marketplace host.
pub const KNOWN_REGIONS: &[&str] = &[
    "losangeles",
    "sandiego",
    "sfbay",
    "orangecounty",
    "inlandempire",
    "ventura",
];

const MARKETPLACE_DOMAIN: &str = "craigslist.org";

/// A resolved region: its name and the base URL of its sub-site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub base_url: Url,
}

impl Region {
    pub fn new(name: &str, base_url: Url) -> Self {
        Self {
            name: name.to_string(),
            base_url,
        }
    }
}

enum Fallback {
    /// `https://<name>.<domain>`
    Subdomain(&'static str),
    /// Every unlisted region resolves to the same host. Used for testing.
    Fixed(Url),
}

/// Read-only region lookup table, built once at startup and passed by reference.
pub struct RegionTable {
    entries: BTreeMap<String, Url>,
    fallback: Fallback,
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionTable {
    /// Creates the production table with the known regions.
    pub fn new() -> Self {
        let entries = KNOWN_REGIONS
            .iter()
            .filter_map(|name| {
                Url::parse(&format!("https://{}.{}", name, MARKETPLACE_DOMAIN))
                    .ok()
                    .map(|url| (name.to_string(), url))
            })
            .collect();
        Self {
            entries,
            fallback: Fallback::Subdomain(MARKETPLACE_DOMAIN),
        }
    }

    /// Creates a table in which every region resolves to `base_url`. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        let url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            entries: BTreeMap::new(),
            fallback: Fallback::Fixed(url),
        })
    }

    /// Resolves a region name to its base URL.
    pub fn resolve(&self, name: &str) -> Result<Region, Error> {
        let name = name.trim().to_ascii_lowercase();
        if let Some(url) = self.entries.get(&name) {
            return Ok(Region::new(&name, url.clone()));
        }
        if !is_region_name(&name) {
            return Err(Error::UnknownRegion(name));
        }
        let url = match &self.fallback {
            Fallback::Fixed(url) => url.clone(),
            Fallback::Subdomain(domain) => {
                Url::parse(&format!("https://{}.{}", name, domain)).map_err(|e| {
                    tracing::error!("Invalid region host for {}: {}", name, e);
                    Error::UnknownRegion(name.clone())
                })?
            }
        };
        Ok(Region::new(&name, url))
    }

    /// Known regions and their base URLs, in name order.
    pub fn known(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.entries.iter().map(|(name, url)| (name.as_str(), url))
    }
}

fn is_region_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_region_resolves() {
        let table = RegionTable::new();
        let region = table.resolve("sfbay").unwrap();
        assert_eq!(region.name, "sfbay");
        assert_eq!(region.base_url.as_str(), "https://sfbay.craigslist.org/");
    }

    #[test]
    fn unlisted_region_becomes_subdomain() {
        let table = RegionTable::new();
        let region = table.resolve("Portland").unwrap();
        assert_eq!(region.name, "portland");
        assert_eq!(region.base_url.host_str(), Some("portland.craigslist.org"));
    }

    #[test]
    fn malformed_region_rejected() {
        let table = RegionTable::new();
        assert!(matches!(
            table.resolve("los angeles"),
            Err(Error::UnknownRegion(_))
        ));
        assert!(table.resolve("").is_err());
    }

    #[test]
    fn fixed_base_url_applies_to_every_region() {
        let table = RegionTable::with_base_url("http://127.0.0.1:9999/").unwrap();
        let a = table.resolve("sandiego").unwrap();
        let b = table.resolve("ventura").unwrap();
        assert_eq!(a.base_url, b.base_url);
        assert_eq!(a.name, "sandiego");
    }

    #[test]
    fn known_lists_all_regions() {
        let table = RegionTable::new();
        assert_eq!(table.known().count(), KNOWN_REGIONS.len());
    }
}
