//! Content-type registry
//!
//! Maps MIME types to parse strategy constructors. One registry is built per
//! crawl session and shared by every worker's [`Parser`](crate::parser::Parser).

use crate::parser::{BinaryParseStrategy, HtmlParseStrategy, ParseStrategy, TextParseStrategy};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Sentinel type the parser falls back to when binary content is included
pub const BINARY_CONTENT_TYPE: &str = "BINARY";

/// Constructs a fresh strategy instance for one parse
pub type StrategyFactory = Arc<dyn Fn() -> Box<dyn ParseStrategy> + Send + Sync>;

/// Mutable MIME type to strategy mapping
///
/// Keys are matched case-insensitively.
#[derive(Default)]
pub struct ContentTypeRegistry {
    mapping: RwLock<HashMap<String, StrategyFactory>>,
}

fn key(mime_type: &str) -> String {
    mime_type.trim().to_ascii_lowercase()
}

impl ContentTypeRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the HTML, plain text, and binary strategies
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_strategy::<HtmlParseStrategy>();
        registry.register_strategy::<TextParseStrategy>();
        registry.register_strategy::<BinaryParseStrategy>();
        registry
    }

    /// Maps every given MIME type to `factory`, replacing earlier mappings
    pub fn register<I, S>(&self, mime_types: I, factory: StrategyFactory)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mapping = self.mapping.write();
        for mime_type in mime_types {
            mapping.insert(key(mime_type.as_ref()), Arc::clone(&factory));
        }
    }

    /// Registers `S` for the MIME types it declares
    pub fn register_strategy<S>(&self)
    where
        S: ParseStrategy + Default + 'static,
    {
        let mime_types = S::default().mime_types();
        tracing::debug!("Registering parser for {:?}", mime_types);
        self.register(
            mime_types.iter().copied(),
            Arc::new(|| Box::new(S::default()) as Box<dyn ParseStrategy>),
        );
    }

    /// Removes the mapping for one MIME type; returns whether one existed
    pub fn unregister(&self, mime_type: &str) -> bool {
        self.mapping.write().remove(&key(mime_type)).is_some()
    }

    /// Removes the mappings for every MIME type `S` declares
    pub fn unregister_strategy<S>(&self)
    where
        S: ParseStrategy + Default,
    {
        let mut mapping = self.mapping.write();
        for mime_type in S::default().mime_types() {
            mapping.remove(&key(mime_type));
        }
    }

    /// Removes every mapping
    pub fn unregister_all(&self) {
        self.mapping.write().clear();
    }

    /// Returns the factory registered for `mime_type`
    pub fn lookup(&self, mime_type: &str) -> Option<StrategyFactory> {
        self.mapping.read().get(&key(mime_type)).cloned()
    }

    pub fn is_registered(&self, mime_type: &str) -> bool {
        self.mapping.read().contains_key(&key(mime_type))
    }

    /// Returns the registered MIME types, sorted
    pub fn mime_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.mapping.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for ContentTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentTypeRegistry")
            .field("mime_types", &self.mime_types())
            .finish()
    }
}
