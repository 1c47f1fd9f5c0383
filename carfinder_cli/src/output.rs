use anyhow::Result;
use carfinder_lib::{NormalizedListing, Region};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

const TITLE_WIDTH: usize = 60;

#[derive(Tabled, Serialize)]
struct ListingRow {
    #[tabled(rename = "Region")]
    #[serde(rename = "Region")]
    region: String,
    #[tabled(rename = "Title")]
    #[serde(rename = "Title")]
    title: String,
    #[tabled(rename = "Price")]
    #[serde(rename = "Price")]
    price: String,
    #[tabled(rename = "Location")]
    #[serde(rename = "Location")]
    location: String,
    #[tabled(rename = "Posted")]
    #[serde(rename = "Posted")]
    posted: String,
    #[tabled(rename = "URL")]
    #[serde(rename = "URL")]
    url: String,
}

#[derive(Tabled, Serialize)]
struct RegionRow {
    #[tabled(rename = "Region")]
    #[serde(rename = "Region")]
    name: String,
    #[tabled(rename = "Base URL")]
    #[serde(rename = "Base URL")]
    base_url: String,
}

// -- Row builders --

fn build_listing_rows(listings: &[NormalizedListing]) -> Vec<ListingRow> {
    listings
        .iter()
        .map(|l| ListingRow {
            region: l.region.clone(),
            title: truncate(&l.title, TITLE_WIDTH),
            price: format_price(l.price),
            location: l.location.clone().unwrap_or_default(),
            posted: l.posted_at.clone().unwrap_or_default(),
            url: l.url.clone(),
        })
        .collect()
}

fn build_region_rows(regions: &[Region]) -> Vec<RegionRow> {
    regions
        .iter()
        .map(|r| RegionRow {
            name: r.name.clone(),
            base_url: r.base_url.to_string(),
        })
        .collect()
}

// -- Printers --

pub fn print_listings(listings: &[NormalizedListing], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", Table::new(build_listing_rows(listings))),
        OutputFormat::Markdown => {
            let mut table = Table::new(build_listing_rows(listings));
            table.with(Style::markdown());
            println!("{}", table);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for listing in listings {
                wtr.serialize(listing)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => print_json(&listings),
    }
    Ok(())
}

pub fn print_regions(regions: &[Region], format: &OutputFormat) -> Result<()> {
    let rows = build_region_rows(regions);
    match format {
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Markdown => {
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => print_json(&rows),
    }
    Ok(())
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

/// `Some(21500)` renders as `$21,500`; a missing price as `-`.
fn format_price(price: Option<i64>) -> String {
    let Some(value) = price else {
        return "-".to_string();
    };
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use carfinder_lib::RegionTable;

    fn listing() -> NormalizedListing {
        NormalizedListing {
            id: "7801000001".into(),
            title: "2021 Mazda CX-30 Premium AWD".into(),
            price: Some(21500),
            location: Some("north park".into()),
            posted_at: Some("2024-05-01T10:15:00-07:00".into()),
            region: "sandiego".into(),
            url: "https://sandiego.craigslist.org/cto/d/x/7801000001.html".into(),
            inserted_at: "2024-05-02T01:00:00Z".into(),
        }
    }

    // -- format_price tests --

    #[test]
    fn test_format_price_thousands() {
        assert_eq!(format_price(Some(21_500)), "$21,500");
    }

    #[test]
    fn test_format_price_small() {
        assert_eq!(format_price(Some(950)), "$950");
        assert_eq!(format_price(Some(0)), "$0");
    }

    #[test]
    fn test_format_price_millions() {
        assert_eq!(format_price(Some(1_250_000)), "$1,250,000");
    }

    #[test]
    fn test_format_price_missing() {
        assert_eq!(format_price(None), "-");
    }

    // -- Row builder tests --

    #[test]
    fn test_build_listing_rows_mapping() {
        let rows = build_listing_rows(&[listing()]);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.region, "sandiego");
        assert_eq!(row.title, "2021 Mazda CX-30 Premium AWD");
        assert_eq!(row.price, "$21,500");
        assert_eq!(row.location, "north park");
        assert_eq!(row.posted, "2024-05-01T10:15:00-07:00");
    }

    #[test]
    fn test_build_listing_rows_missing_fields() {
        let mut bare = listing();
        bare.price = None;
        bare.location = None;
        bare.posted_at = None;
        let rows = build_listing_rows(&[bare]);
        assert_eq!(rows[0].price, "-");
        assert_eq!(rows[0].location, "");
        assert_eq!(rows[0].posted, "");
    }

    #[test]
    fn test_long_titles_are_truncated() {
        let mut long = listing();
        long.title = "x".repeat(100);
        let rows = build_listing_rows(&[long]);
        assert_eq!(rows[0].title.chars().count(), TITLE_WIDTH);
        assert!(rows[0].title.ends_with("..."));
    }

    #[test]
    fn test_table_has_headers() {
        let table = Table::new(build_listing_rows(&[listing()])).to_string();
        for header in ["Region", "Title", "Price", "Location", "Posted", "URL"] {
            assert!(table.contains(header), "missing {}", header);
        }
    }

    #[test]
    fn test_markdown_table() {
        let mut table = Table::new(build_listing_rows(&[listing()]));
        table.with(Style::markdown());
        let text = table.to_string();
        assert!(text.starts_with("| Region"));
        assert!(text.contains("|---"));
    }

    #[test]
    fn test_region_rows() {
        let regions: Vec<Region> = RegionTable::new()
            .known()
            .map(|(name, url)| Region::new(name, url.clone()))
            .collect();
        let rows = build_region_rows(&regions);
        assert_eq!(rows.len(), regions.len());
        let sfbay = rows.iter().find(|r| r.name == "sfbay").unwrap();
        assert_eq!(sfbay.base_url, "https://sfbay.craigslist.org/");
    }

    #[test]
    fn test_json_listing_fields() {
        let json = serde_json::to_value(vec![listing()]).unwrap();
        assert_eq!(json[0]["id"], "7801000001");
        assert_eq!(json[0]["price"], 21500);
        assert_eq!(json[0]["region"], "sandiego");
    }
}
