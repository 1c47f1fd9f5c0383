//! Ordered extraction strategies: each resolves one field from a page
//! element, and a field takes the first strategy that yields a value.

use scraper::{ElementRef, Html, Selector};

use super::ExtractError;

fn parse_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Resolves a value of type `T` from the descendants of a scope element
/// that match `selector`. The first match that `resolve` accepts wins.
pub struct Strategy<T> {
    label: &'static str,
    selector: Selector,
    resolve: fn(ElementRef<'_>) -> Option<T>,
}

impl<T> Strategy<T> {
    pub fn new(
        label: &'static str,
        css: &str,
        resolve: fn(ElementRef<'_>) -> Option<T>,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            label,
            selector: parse_selector(css)?,
            resolve,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn apply(&self, scope: ElementRef<'_>) -> Option<T> {
        scope.select(&self.selector).find_map(self.resolve)
    }
}

/// Tries `strategies` in order against `scope` and returns the first value found.
pub fn first_resolved<T>(strategies: &[Strategy<T>], scope: ElementRef<'_>) -> Option<T> {
    strategies.iter().find_map(|s| s.apply(scope))
}

/// Locates listing containers in a whole document.
pub struct ContainerStrategy {
    label: &'static str,
    selector: Selector,
    /// Containers must have a descendant matching this, when set.
    requires: Option<Selector>,
}

impl ContainerStrategy {
    pub fn new(label: &'static str, css: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            label,
            selector: parse_selector(css)?,
            requires: None,
        })
    }

    pub fn requiring(mut self, css: &str) -> Result<Self, ExtractError> {
        self.requires = Some(parse_selector(css)?);
        Ok(self)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn locate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document
            .select(&self.selector)
            .filter(|el| match &self.requires {
                Some(req) => el.select(req).next().is_some(),
                None => true,
            })
            .collect()
    }
}

/// Runs container strategies in order and keeps the first non-empty result,
/// together with the label of the strategy that produced it.
pub fn first_containers<'a>(
    strategies: &[ContainerStrategy],
    document: &'a Html,
) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    strategies.iter().find_map(|s| {
        let found = s.locate(document);
        if found.is_empty() {
            None
        } else {
            Some((s.label(), found))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(el: ElementRef<'_>) -> Option<String> {
        let text = el.text().collect::<String>().trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    #[test]
    fn first_strategy_with_a_value_wins() {
        let doc = Html::parse_fragment(
            r#"<div><span class="a"> </span><span class="b">second</span><span class="c">third</span></div>"#,
        );
        let strategies = vec![
            Strategy::new("a", "span.a", text_of).unwrap(),
            Strategy::new("b", "span.b", text_of).unwrap(),
            Strategy::new("c", "span.c", text_of).unwrap(),
        ];
        assert_eq!(
            first_resolved(&strategies, doc.root_element()),
            Some("second".to_string())
        );
    }

    #[test]
    fn no_strategy_matches() {
        let doc = Html::parse_fragment("<div><p>nothing</p></div>");
        let strategies = vec![Strategy::new("a", "span.a", text_of).unwrap()];
        assert_eq!(first_resolved(&strategies, doc.root_element()), None);
    }

    #[test]
    fn invalid_selector_is_reported() {
        let err = ContainerStrategy::new("bad", "li[").err().unwrap();
        assert!(matches!(err, ExtractError::Selector { .. }));
    }

    #[test]
    fn container_requirement_filters() {
        let doc = Html::parse_document(
            r#"<ul><li>menu</li><li><a href="/cto/d/x/1.html">car</a></li></ul>"#,
        );
        let strategies = vec![
            ContainerStrategy::new("rows", "li.result-row").unwrap(),
            ContainerStrategy::new("any-li", "li")
                .unwrap()
                .requiring("a[href*='/cto/']")
                .unwrap(),
        ];
        let (label, found) = first_containers(&strategies, &doc).unwrap();
        assert_eq!(label, "any-li");
        assert_eq!(found.len(), 1);
    }
}
