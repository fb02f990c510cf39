//! Filesystem-safe names derived from URLs

use url::Url;

/// Slug used for the root page of a site
pub const ROOT_SLUG: &str = "home";

/// Turns a start URL into a directory name for per-run outputs
///
/// The scheme is dropped and every character that is unsafe in a file name is
/// replaced by `_`, so `https://x.test/docs` becomes `x.test_docs`.
pub fn output_namespace(start_url: &str) -> String {
    let without_scheme = start_url
        .strip_prefix("https://")
        .or_else(|| start_url.strip_prefix("http://"))
        .unwrap_or(start_url);

    without_scheme
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derives a readable slug from a URL's path
///
/// Path segments are joined with `_`; characters outside `[A-Za-z0-9_-]` become
/// `-`. The site root maps to [`ROOT_SLUG`]. Distinct URLs can share a slug (for
/// example when they differ only by query string); callers that need an
/// injective mapping disambiguate on top of this.
pub fn page_slug(url: &Url) -> String {
    let slug = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(sanitize_segment)
                .collect::<Vec<_>>()
                .join("_")
        })
        .unwrap_or_default();

    if slug.is_empty() {
        ROOT_SLUG.to_string()
    } else {
        slug
    }
}

/// Joins the alphanumeric words of `text` in PascalCase
pub fn pascal_case(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Name of the page-object class generated for a URL
///
/// The last non-empty path segment in PascalCase followed by `Page`; the site
/// root is `HomePage`. Generated tests instantiate the same name.
pub fn page_class_name(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .unwrap_or_default();

    let mut name = pascal_case(last);

    if name.is_empty() {
        name.push_str("Home");
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.push_str("Page");
    name
}
