//! Anti-automation challenge detection.

use scraper::{Html, Node};

/// Phrases that mark a challenge or block page, compared case-insensitively.
pub const BLOCK_MARKERS: &[&str] = &[
    "unusual activity",
    "verify you are a human",
    "blocked",
    "are you a human",
];

/// Elements whose text never reaches the reader.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

/// Returns true when `text` carries one of the challenge phrases.
pub fn is_blocked(text: &str) -> bool {
    let lower = text.to_lowercase();
    BLOCK_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Classifies a fetched HTML page by its visible text only, so markers in
/// scripts, attributes or URLs do not count.
pub fn page_is_blocked(html: &str) -> bool {
    is_blocked(&visible_text(html))
}

/// Text nodes of `html` outside script and style elements, space separated.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let text = text.trim();
        if !text.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_marker() {
        assert!(is_blocked("We noticed Unusual Activity from your network"));
        assert!(is_blocked("Please verify you are a human"));
        assert!(is_blocked("This IP has been BLOCKED."));
        assert!(is_blocked("Are you a human?"));
    }

    #[test]
    fn challenge_page_is_blocked() {
        let page = "<html><body><h1>Please <b>verify</b> you are a human</h1></body></html>";
        assert!(!page_is_blocked("<html><body><p>2021 Mazda CX-30</p></body></html>"));
        assert!(page_is_blocked(
            "<html><body><p>This IP has been blocked.</p></body></html>"
        ));
        assert!(page_is_blocked(page));
    }

    #[test]
    fn markers_in_markup_are_ignored() {
        let page = r#"<html><head>
            <script>var popupBlocked = false;</script>
            <style>.blocked { display: none; }</style>
        </head><body>
            <ol><li class="cl-search-result blocked" data-pid="1">
                <a href="/cto/d/blocked-seller/1.html">2021 Mazda CX-30</a>
            </li></ol>
        </body></html>"#;
        assert!(!page_is_blocked(page));
        assert_eq!(visible_text(page), "2021 Mazda CX-30");
    }

    #[test]
    fn results_page_is_not_blocked() {
        let page = r#"<ol><li class="cl-static-search-result"><a href="/cto/d/x/1.html">2021 Mazda CX-30</a></li></ol>"#;
        assert!(!page_is_blocked(page));
        assert!(!page_is_blocked(""));
    }
}
