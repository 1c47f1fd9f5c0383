//! RSS/RDF (and Atom) feed variant of the results page. Used when the HTML
//! page is blocked or empty.

use carfinder_api::Region;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{parenthesized, scan_currency};
use crate::listing::RawCandidate;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Date,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" | b"summary" => Some(Field::Description),
            b"date" | b"pubDate" | b"published" | b"updated" => Some(Field::Date),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: String,
    link: String,
    description: String,
    date: String,
}

impl ItemBuilder {
    fn push(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::Date => &mut self.date,
        };
        slot.push_str(text);
    }

    /// Atom links arrive as `<link href="..."/>`; the first one wins.
    fn link_attr(&mut self, e: &BytesStart<'_>) {
        if !self.link.is_empty() {
            return;
        }
        if let Ok(Some(href)) = e.try_get_attribute("href") {
            if let Ok(value) = href.unescape_value() {
                self.link = value.into_owned();
            }
        }
    }

    fn finish(self, region: &Region) -> Option<RawCandidate> {
        let title = self.title.trim().to_string();
        let link = self.link.trim().to_string();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        let url = region
            .base_url
            .join(&link)
            .map(|u| u.to_string())
            .unwrap_or(link);
        let price = scan_currency(&title).or_else(|| scan_currency(&self.description));
        let location = parenthesized(&title);
        let date = self.date.trim();
        Some(RawCandidate {
            id: url.clone(),
            title,
            url,
            price,
            location,
            posted_at: (!date.is_empty()).then(|| date.to_string()),
            region: region.name.clone(),
        })
    }
}

fn is_item(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// Parses a results feed into candidates. A malformed document yields no
/// candidates at all, and a warning.
pub fn parse_feed(xml: &str, region: &Region) -> Vec<RawCandidate> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut item: Option<ItemBuilder> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if is_item(name.as_ref()) {
                    item = Some(ItemBuilder::default());
                } else if let Some(builder) = item.as_mut() {
                    field = Field::from_local_name(name.as_ref());
                    if field == Some(Field::Link) {
                        builder.link_attr(&e);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(builder) = item.as_mut() {
                    if e.local_name().as_ref() == b"link" {
                        builder.link_attr(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(builder), Some(f)) = (item.as_mut(), field) {
                    let text = match t.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(&t).into_owned(),
                    };
                    builder.push(f, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let (Some(builder), Some(f)) = (item.as_mut(), field) {
                    builder.push(f, &String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if is_item(name.as_ref()) {
                    if let Some(candidate) = item.take().and_then(|b| b.finish(region)) {
                        out.push(candidate);
                    }
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                tracing::warn!(
                    region = %region.name,
                    "feed parse error at byte {}: {}",
                    reader.buffer_position(),
                    err
                );
                return Vec::new();
            }
            _ => {}
        }
    }

    tracing::debug!(region = %region.name, items = out.len(), "parsed feed");
    out
}
