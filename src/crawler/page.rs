use crate::parser::{HtmlParseData, ParseData};
use crate::url::WebUrl;

/// A fetched page, alive for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub web_url: WebUrl,

    /// HTTP status of the response the content came from
    pub status_code: u16,

    pub content: Vec<u8>,

    /// Lowercase MIME type without parameters
    pub content_type: Option<String>,

    pub content_charset: Option<String>,

    /// Filled by the parser; `None` until parsed
    pub parse_data: Option<ParseData>,
}

impl Page {
    pub fn new(
        web_url: WebUrl,
        status_code: u16,
        content: Vec<u8>,
        content_type: Option<String>,
        content_charset: Option<String>,
    ) -> Self {
        Self {
            web_url,
            status_code,
            content,
            content_type,
            content_charset,
            parse_data: None,
        }
    }

    /// Returns the HTML parse result, if the page was parsed as HTML
    pub fn html(&self) -> Option<&HtmlParseData> {
        self.parse_data.as_ref().and_then(ParseData::as_html)
    }
}
