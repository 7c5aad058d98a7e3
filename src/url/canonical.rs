use crate::UrlError;
use url::Url;

/// Canonicalizes an absolute URL string
///
/// See [`canonicalize_with_base`] for the rules applied.
///
/// # Examples
///
/// ```
/// use webweave::url::canonicalize;
///
/// let url = canonicalize("HTTP://Example.COM:80/a/../b?q=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/b?q=1");
/// ```
pub fn canonicalize(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    finish(url)
}

/// Resolves `href` against `context` and canonicalizes the result
///
/// # Canonicalization Steps
///
/// 1. Resolve relative references (including `..` and `.` segments) against the context URL
/// 2. Lowercase scheme and host
/// 3. Strip the port when it is the scheme's default
/// 4. Remove the fragment
/// 5. Keep the query string as-is; a bare trailing `?` is dropped
///
/// Only `http` and `https` URLs with a host are accepted.
///
/// # Arguments
///
/// * `href` - The (possibly relative) link target
/// * `context` - The URL the link is resolved against
///
/// # Returns
///
/// * `Ok(Url)` - The canonical absolute URL
/// * `Err(UrlError)` - The link cannot be resolved to a crawlable URL
pub fn canonicalize_with_base(href: &str, context: &Url) -> Result<Url, UrlError> {
    let url = context
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    finish(url)
}

fn finish(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost),
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}
