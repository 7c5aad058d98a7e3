//! HTML parse strategy
//!
//! Extracts from an HTML page:
//! - Visible body text, whitespace-collapsed
//! - The page title
//! - Outgoing links from `<a>`, `<area>`, `<link>`, `<frame>`, and `<iframe>`

use crate::config::CrawlerConfig;
use crate::crawler::Page;
use crate::parser::{decode_content, HtmlParseData, ParseData, ParseError, ParseStrategy};
use crate::url::{canonicalize_with_base, WebUrl};
use scraper::{ElementRef, Html, Selector};
use url::Url;

const HTML_MIME_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Elements whose text is never part of the visible body text
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Parses HTML documents with `scraper`
///
/// Malformed markup never fails the parse; the tree builder recovers and
/// whatever it produced is used.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParseStrategy;

impl ParseStrategy for HtmlParseStrategy {
    fn mime_types(&self) -> &'static [&'static str] {
        HTML_MIME_TYPES
    }

    fn parse(&self, page: &Page, config: &CrawlerConfig) -> Result<ParseData, ParseError> {
        let html = decode_content(&page.content, page.content_charset.as_deref());
        let document = Html::parse_document(&html);

        if !document.errors.is_empty() {
            tracing::trace!(
                "{} recoverable markup errors in {}",
                document.errors.len(),
                page.web_url
            );
        }

        let text = extract_body_text(&document);
        let title = extract_title(&document);

        let outgoing_urls = match resolve_context(&document, &page.web_url.url) {
            Some(context) => extract_outgoing_urls(&document, &context, config.max_outgoing_links),
            None => {
                tracing::debug!("No usable base URL for {}, skipping links", page.web_url);
                Vec::new()
            }
        };

        Ok(ParseData::Html(HtmlParseData {
            html,
            text,
            title,
            outgoing_urls,
        }))
    }
}

fn collapse_whitespace<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts the page title, or an empty string
fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(element.text()))
        .unwrap_or_default()
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    HIDDEN_ELEMENTS.contains(&element.value().name())
}

/// Collects the text of `<body>`, skipping script and style content
fn extract_body_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let visible = body.descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(is_hidden);
        (!hidden).then_some(&**text)
    });

    collapse_whitespace(visible)
}

/// Returns the URL relative links resolve against: `<base href>` if present, else the page URL
fn resolve_context(document: &Html, page_url: &str) -> Option<Url> {
    let page = Url::parse(page_url).ok();

    let base_href = Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .map(|href| href.trim().to_string())
        })
        .filter(|href| !href.is_empty());

    match (base_href, page) {
        (Some(href), Some(page)) => page.join(&href).ok().or(Some(page)),
        (Some(href), None) => Url::parse(&href).ok(),
        (None, page) => page,
    }
}

/// Link targets in document order with the anchor text of `<a>` elements
fn extract_raw_links(document: &Html) -> Vec<(String, Option<String>)> {
    let Ok(selector) = Selector::parse("a[href], area[href], link[href], frame[src], iframe[src]")
    else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let name = element.value().name();
            let target = match name {
                "frame" | "iframe" => element.value().attr("src"),
                _ => element.value().attr("href"),
            }?;

            let anchor = if name == "a" {
                Some(collapse_whitespace(element.text())).filter(|text| !text.is_empty())
            } else {
                None
            };

            Some((target.to_string(), anchor))
        })
        .collect()
}

/// Returns false for script pseudo-links and mail addresses
///
/// The check is case-insensitive and ignores a leading `http://`, so
/// `http://javascript:void(0)` is rejected too.
fn is_followable(href: &str) -> bool {
    let lower = href.to_lowercase();
    let target = lower.strip_prefix("http://").unwrap_or(&lower);
    !target.contains("javascript:") && !target.contains('@')
}

fn extract_outgoing_urls(document: &Html, context: &Url, max_links: usize) -> Vec<WebUrl> {
    let mut urls = Vec::new();

    for (href, anchor) in extract_raw_links(document) {
        if urls.len() >= max_links {
            break;
        }

        let href = href.trim();
        if href.is_empty() || !is_followable(href) {
            continue;
        }

        match canonicalize_with_base(href, context) {
            Ok(url) => urls.push(WebUrl::outgoing(url.to_string(), anchor)),
            Err(e) => tracing::trace!("Dropping link {}: {}", href, e),
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, html: &str) -> Page {
        Page::new(
            WebUrl::seed(url, 1),
            200,
            html.as_bytes().to_vec(),
            Some("text/html".to_string()),
            None,
        )
    }

    fn parse(html: &str) -> HtmlParseData {
        parse_with(html, &CrawlerConfig::default())
    }

    fn parse_with(html: &str, config: &CrawlerConfig) -> HtmlParseData {
        let page = page("https://example.com/dir/page", html);
        match HtmlParseStrategy.parse(&page, config).unwrap() {
            ParseData::Html(data) => data,
            other => panic!("expected HTML parse data, got {:?}", other),
        }
    }

    fn link_urls(data: &HtmlParseData) -> Vec<&str> {
        data.outgoing_urls.iter().map(|u| u.url.as_str()).collect()
    }

    #[test]
    fn test_title_and_text() {
        let data = parse(
            r#"<html><head><title>  Test   Page </title></head>
            <body><h1>Hello</h1>
            <p>brave   new
            world</p></body></html>"#,
        );

        assert_eq!(data.title, "Test Page");
        assert_eq!(data.text, "Hello brave new world");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let data = parse("<html><body>text</body></html>");
        assert_eq!(data.title, "");
    }

    #[test]
    fn test_script_and_style_excluded_from_text() {
        let data = parse(
            r#"<html><head><style>h1 { color: red }</style></head><body>
            <script>var x = 1;</script><p>visible</p><style>.a{}</style></body></html>"#,
        );
        assert_eq!(data.text, "visible");
    }

    #[test]
    fn test_html_source_kept() {
        let html = "<html><body><p>x</p></body></html>";
        assert_eq!(parse(html).html, html);
    }

    #[test]
    fn test_links_resolved_and_canonical() {
        let data = parse(
            r#"<html><body>
            <a href="/a#frag">A</a>
            <a href="b">B</a>
            <a href="HTTPS://Other.COM:443/c?">C</a>
            </body></html>"#,
        );

        assert_eq!(
            link_urls(&data),
            vec![
                "https://example.com/a",
                "https://example.com/dir/b",
                "https://other.com/c",
            ]
        );
    }

    #[test]
    fn test_all_link_elements_in_document_order() {
        let data = parse(
            r#"<html><head><link rel="stylesheet" href="/style.css"></head><body>
            <iframe src="/frame"></iframe>
            <map><area href="/area"></map>
            <a href="/anchor">text</a>
            </body></html>"#,
        );

        assert_eq!(
            link_urls(&data),
            vec![
                "https://example.com/style.css",
                "https://example.com/frame",
                "https://example.com/area",
                "https://example.com/anchor",
            ]
        );
    }

    #[test]
    fn test_anchor_text_recorded() {
        let data = parse(r#"<html><body><a href="/x"> Read   more </a><a href="/y"></a></body></html>"#);

        assert_eq!(data.outgoing_urls[0].anchor.as_deref(), Some("Read more"));
        assert_eq!(data.outgoing_urls[1].anchor, None);
    }

    #[test]
    fn test_base_href_changes_resolution() {
        let data = parse(
            r#"<html><head><base href="https://cdn.example.org/root/"></head>
            <body><a href="x">x</a></body></html>"#,
        );
        assert_eq!(link_urls(&data), vec!["https://cdn.example.org/root/x"]);
    }

    #[test]
    fn test_filtered_links() {
        let data = parse(
            r#"<html><body>
            <a href="javascript:void(0)">js</a>
            <a href="JavaScript:alert(1)">js</a>
            <a href="http://javascript:void(0)">js</a>
            <a href="mailto:someone@example.com">mail</a>
            <a href="http://user@example.com/">userinfo</a>
            <a href="">empty</a>
            <a href="   ">blank</a>
            <a href="ftp://example.com/file">ftp</a>
            <a href="/kept">kept</a>
            </body></html>"#,
        );

        assert_eq!(link_urls(&data), vec!["https://example.com/kept"]);
    }

    #[test]
    fn test_link_cap() {
        let config = CrawlerConfig {
            max_outgoing_links: 3,
            ..CrawlerConfig::default()
        };
        let data = parse_with(
            r#"<html><head><title>Capped</title></head><body>
            <p>body text</p>
            <a href="/1">1</a><a href="/2">2</a><a href="/3">3</a>
            <a href="/4">4</a><a href="/5">5</a>
            </body></html>"#,
            &config,
        );

        assert_eq!(
            link_urls(&data),
            vec![
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3",
            ]
        );
        assert_eq!(data.title, "Capped");
        assert!(data.text.contains("body text"));
    }

    #[test]
    fn test_malformed_markup_is_best_effort() {
        let data = parse("<html><body><div><p>unclosed <a href='/x'>link</div>");
        assert_eq!(link_urls(&data), vec!["https://example.com/x"]);
        assert!(data.text.contains("unclosed"));
    }

    #[test]
    fn test_is_followable() {
        assert!(is_followable("/path"));
        assert!(is_followable("https://example.com/"));
        assert!(!is_followable("javascript:void(0)"));
        assert!(!is_followable("http://JAVASCRIPT:x"));
        assert!(!is_followable("mailto:a@b.com"));
    }
}
