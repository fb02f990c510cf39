//! HTML parser for extracting links and metadata
//!
//! Used both for freshly fetched pages and for pages re-read from the page
//! store, so a repeat crawl can follow links without refetching.

use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Links found on the page, absolute, in document order
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only anchors
///
/// Links are resolved against `base_url` and returned in document order;
/// scope and duplicate filtering is left to the frontier.
///
/// # Example
///
/// ```no_run
/// use pomforge::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
    }
}

const LINK_SELECTOR: &str = "a[href], link[rel='canonical'][href]";

/// Schemes that never lead to a crawlable page
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "#"];

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse(LINK_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves an href to an absolute http(s) URL, or None if it isn't a page link
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || SKIPPED_PREFIXES.iter().any(|p| href.starts_with(p)) {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.test/catalog/").unwrap()
    }

    #[test]
    fn test_title_is_trimmed() {
        let parsed = parse_html("<title>\n  Catalog  </title>", &base());
        assert_eq!(parsed.title.as_deref(), Some("Catalog"));

        let untitled = parse_html("<title>   </title>", &base());
        assert!(untitled.title.is_none());
    }

    #[test]
    fn test_links_resolve_against_base() {
        let html = r#"
            <a href="/cart">Cart</a>
            <a href="item-1">Item</a>
            <a href="https://cdn.test/x">CDN</a>
        "#;
        let parsed = parse_html(html, &base());
        assert_eq!(
            parsed.links,
            vec![
                "https://shop.test/cart",
                "https://shop.test/catalog/item-1",
                "https://cdn.test/x",
            ]
        );
    }

    #[test]
    fn test_non_navigational_links_are_skipped() {
        let html = r##"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:help@shop.test">mail</a>
            <a href="tel:+100">tel</a>
            <a href="data:text/html,hi">data</a>
            <a href="#reviews">anchor</a>
            <a href="/manual.pdf" download>pdf</a>
            <a href="ftp://shop.test/file">ftp</a>
            <a href="  ">blank</a>
        "##;
        assert!(parse_html(html, &base()).links.is_empty());
    }

    #[test]
    fn test_canonical_and_nofollow_are_kept() {
        let html = r#"
            <head><link rel="canonical" href="https://shop.test/catalog"></head>
            <body><a rel="nofollow" href="/login">Login</a></body>
        "#;
        let links = parse_html(html, &base()).links;
        assert!(links.contains(&"https://shop.test/login".to_string()));
        assert!(links.contains(&"https://shop.test/catalog".to_string()));
    }
}
