//! Parsed page wrapper shared by all extraction strategies.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Elements whose text is never visible on the page.
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

/// A loaded, parsed document plus its visible text split into lines.
///
/// Not `Send`: build it, read it, and drop it without awaiting in between.
pub struct PageDocument {
    html: Html,
    url: Option<Url>,
    lines: Vec<String>,
}

impl PageDocument {
    /// Parse a document. `url` is used to resolve relative links.
    pub fn parse(body: &str, url: Option<Url>) -> Self {
        let html = Html::parse_document(body);
        let lines = visible_lines(&html);
        Self { html, url, lines }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Visible text, one whitespace-collapsed line per text run.
    pub fn text_lines(&self) -> &[String] {
        &self.lines
    }

    /// Visible text joined with newlines.
    pub fn full_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Find the first link whose text contains one of `texts`
    /// (case-insensitive), resolved against the document URL.
    pub fn find_link(&self, texts: &[String]) -> Option<Url> {
        if texts.is_empty() {
            return None;
        }
        let needles: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
        let link_sel = Selector::parse("a[href]").expect("valid selector");

        self.html.select(&link_sel).find_map(|el| {
            let text = element_text(&el).to_lowercase();
            if !needles.iter().any(|n| text.contains(n.as_str())) {
                return None;
            }
            let href = el.value().attr("href")?.trim();
            if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
                return None;
            }
            match &self.url {
                Some(base) => base.join(href).ok(),
                None => Url::parse(href).ok(),
            }
        })
    }
}

/// Text content of an element, whitespace-collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Trim and collapse every whitespace run to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn visible_lines(html: &Html) -> Vec<String> {
    let mut lines = Vec::new();

    for node in html.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| INVISIBLE.contains(&e.name())))
            .unwrap_or(false);
        if hidden {
            continue;
        }
        for line in text.lines() {
            let line = collapse_whitespace(line);
            if !line.is_empty() {
                lines.push(line);
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_skips_scripts() {
        let doc = PageDocument::parse(
            r#"<html><head><style>.x{color:red}</style></head><body>
               <p>Hello
                  world</p>
               <script>var phone = "000";</script>
               <div><strong>Phone:</strong> 306-555-0100</div>
               </body></html>"#,
            None,
        );
        assert_eq!(doc.text_lines(), ["Hello", "world", "Phone:", "306-555-0100"]);
        assert!(!doc.full_text().contains("000\""));
    }

    #[test]
    fn find_link_resolves_relative_href() {
        let base = Url::parse("https://www.gscs.ca/BET").unwrap();
        let doc = PageDocument::parse(
            r##"<body>
                <a href="#top">Contact</a>
                <a href="/about">About</a>
                <a href="/BET/contact-us">Contact   Us</a>
            </body>"##,
            Some(base),
        );
        let link = doc.find_link(&["contact us".into()]).expect("link");
        assert_eq!(link.as_str(), "https://www.gscs.ca/BET/contact-us");
        assert!(doc.find_link(&[]).is_none());
        assert!(doc.find_link(&["admissions".into()]).is_none());
    }

    #[test]
    fn collapse() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
