//! URL handling module for Webweave
//!
//! This module provides the URL record shared by every crawler component and
//! the canonicalization rules used as the deduplication key.

mod canonical;

pub use canonical::{canonicalize, canonicalize_with_base};

use std::fmt;

/// Globally unique identity of a canonical URL, assigned by a [`DocIdServer`](crate::docid::DocIdServer)
pub type DocId = i64;

/// Distance of a URL record from the seeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    /// Hop count from a seed along the discovery graph; seeds are `Fresh(0)`
    Fresh(u32),

    /// The link points at a URL that already has a document id
    AlreadySeen,
}

impl Depth {
    /// Returns the hop count, or `None` for a rediscovered URL
    pub fn hops(&self) -> Option<u32> {
        match self {
            Self::Fresh(hops) => Some(*hops),
            Self::AlreadySeen => None,
        }
    }

    /// Returns true if this marks a rediscovery rather than a traversal depth
    pub fn is_already_seen(&self) -> bool {
        matches!(self, Self::AlreadySeen)
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::Fresh(0)
    }
}

/// One crawl target occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebUrl {
    /// Canonical URL; rewritten once if the fetch lands on a different final URL
    pub url: String,

    /// Document id, `None` until the allocator has assigned one
    pub doc_id: Option<DocId>,

    /// Document id of the page this record was extracted from
    pub parent_doc_id: Option<DocId>,

    /// URL of the page this record was extracted from
    pub parent_url: Option<String>,

    pub depth: Depth,

    /// Text of the link that produced this record
    pub anchor: Option<String>,
}

impl WebUrl {
    /// Creates a record with no id, no provenance and depth 0
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            doc_id: None,
            parent_doc_id: None,
            parent_url: None,
            depth: Depth::Fresh(0),
            anchor: None,
        }
    }

    /// Creates a seed record carrying an already-allocated id
    pub fn seed(url: impl Into<String>, doc_id: DocId) -> Self {
        Self {
            doc_id: Some(doc_id),
            ..Self::new(url)
        }
    }

    /// Creates a record for a link extracted from a page
    pub fn outgoing(url: impl Into<String>, anchor: Option<String>) -> Self {
        Self {
            anchor,
            ..Self::new(url)
        }
    }

    /// Creates the record for a redirect target of this record
    ///
    /// Provenance, depth and anchor text are carried over; the id is left unassigned.
    pub fn redirect_target(&self, moved_to: impl Into<String>) -> Self {
        Self {
            url: moved_to.into(),
            doc_id: None,
            parent_doc_id: self.parent_doc_id,
            parent_url: self.parent_url.clone(),
            depth: self.depth,
            anchor: self.anchor.clone(),
        }
    }

    /// Returns the host of this URL, if it parses
    pub fn host(&self) -> Option<String> {
        ::url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}

impl fmt::Display for WebUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
