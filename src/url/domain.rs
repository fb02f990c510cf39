use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use pomforge::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// The domain boundary of a crawl
///
/// A scope is fixed by the start URL: its host plus any explicit port. A link is
/// in scope only when both match exactly, so `blog.example.com` is outside a crawl
/// started on `example.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScope {
    host: String,
    port: Option<u16>,
}

impl DomainScope {
    /// Builds the scope for a crawl starting at `start`
    pub fn from_url(start: &Url) -> UrlResult<Self> {
        let host = extract_domain(start).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            host,
            port: start.port(),
        })
    }

    /// Returns true if `url` belongs to this scope
    pub fn contains(&self, url: &Url) -> bool {
        extract_domain(url).as_deref() == Some(self.host.as_str()) && url.port() == self.port
    }

    /// The scope's host name
    pub fn host(&self) -> &str {
        &self.host
    }
}
