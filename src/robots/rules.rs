//! Per-origin robots.txt rules and their cache entries

use chrono::{DateTime, Duration, Utc};
use robotstxt::DefaultMatcher;

/// The rules an origin published, or the absence of any
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRobots {
    /// No usable robots.txt: every path may be crawled
    Unrestricted,
    /// A robots.txt body, evaluated lazily per URL
    Rules(String),
}

impl ParsedRobots {
    /// Wraps a downloaded robots.txt body
    ///
    /// A body with nothing but whitespace places no restrictions.
    pub fn parse(body: &str) -> Self {
        if body.trim().is_empty() {
            Self::Unrestricted
        } else {
            Self::Rules(body.to_owned())
        }
    }

    /// Whether `agent` may fetch `url`
    ///
    /// `url` may be absolute or a bare path.
    pub fn permits(&self, url: &str, agent: &str) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Rules(body) => {
                DefaultMatcher::default().one_agent_allowed_by_robots(body, agent, url)
            }
        }
    }
}

/// A [`ParsedRobots`] together with the instant it stops being trusted
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: ParsedRobots,
    pub expires_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: ParsedRobots, ttl: Duration) -> Self {
        Self {
            rules,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
