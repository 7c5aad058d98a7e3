use crate::config::CrawlerConfig;
use crate::crawler::Page;
use crate::parser::{decode_content, ParseData, ParseError, ParseStrategy, TextParseData};

/// Decodes plain text pages
#[derive(Debug, Default, Clone, Copy)]
pub struct TextParseStrategy;

impl ParseStrategy for TextParseStrategy {
    fn mime_types(&self) -> &'static [&'static str] {
        &["text/plain"]
    }

    fn parse(&self, page: &Page, _config: &CrawlerConfig) -> Result<ParseData, ParseError> {
        Ok(ParseData::Text(TextParseData {
            text: decode_content(&page.content, page.content_charset.as_deref()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::WebUrl;

    #[test]
    fn test_decodes_text() {
        let page = Page::new(
            WebUrl::seed("https://example.com/notes.txt", 1),
            200,
            b"line one\nline two".to_vec(),
            Some("text/plain".to_string()),
            Some("utf-8".to_string()),
        );

        let data = TextParseStrategy
            .parse(&page, &CrawlerConfig::default())
            .unwrap();
        assert!(matches!(data, ParseData::Text(ref t) if t.text == "line one\nline two"));
        assert!(data.outgoing_urls().is_empty());
    }
}
