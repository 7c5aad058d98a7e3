//! Content-Type header helpers

/// Splits a `Content-Type` header into its lowercase MIME type and charset
///
/// ```
/// use webweave::parser::parse_content_type;
///
/// let (mime, charset) = parse_content_type("Text/HTML; charset=\"UTF-8\"");
/// assert_eq!(mime.as_deref(), Some("text/html"));
/// assert_eq!(charset.as_deref(), Some("UTF-8"));
/// ```
pub fn parse_content_type(header: &str) -> (Option<String>, Option<String>) {
    let mut parts = header.split(';');

    let mime = parts
        .next()
        .map(|mime| mime.trim().to_ascii_lowercase())
        .filter(|mime| !mime.is_empty());

    let charset = parts
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        })
        .find(|charset| !charset.is_empty());

    (mime, charset)
}

/// Decodes page bytes to text using the declared charset
///
/// Single-byte Latin-1 and ASCII are mapped directly; everything else is read
/// as UTF-8 with invalid sequences replaced.
pub fn decode_content(bytes: &[u8], charset: Option<&str>) -> String {
    let charset = charset.map(|c| c.trim().to_ascii_lowercase());

    match charset.as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "us-ascii" | "ascii") => {
            bytes.iter().map(|&b| b as char).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}
