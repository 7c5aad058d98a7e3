use crate::config::CrawlerConfig;
use crate::crawler::Page;
use crate::parser::{BinaryParseData, ParseData, ParseError, ParseStrategy, BINARY_CONTENT_TYPE};

/// Keeps the raw bytes of content no other strategy understands
///
/// Registered under [`BINARY_CONTENT_TYPE`], which the parser only consults
/// when binary content is included in the crawl.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryParseStrategy;

impl ParseStrategy for BinaryParseStrategy {
    fn mime_types(&self) -> &'static [&'static str] {
        &[BINARY_CONTENT_TYPE]
    }

    fn parse(&self, page: &Page, _config: &CrawlerConfig) -> Result<ParseData, ParseError> {
        Ok(ParseData::Binary(BinaryParseData {
            content: page.content.clone(),
        }))
    }
}
