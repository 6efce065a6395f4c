//! Trait seams for directory access.
//!
//! The pipeline never talks to a directory server itself; it consumes these
//! three capabilities and leaves the transport to the provider behind them.

use anyhow::Result;

use crate::models::{DirectoryRecord, ResolvedEntity};

/// Scope of a search relative to its base object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

/// One directory query.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub filter: &'a str,
    pub scope: SearchScope,
    pub attributes: &'a [&'a str],
    pub domain: &'a str,
    /// Narrows the search to a subtree when set; whole domain otherwise.
    pub base: Option<&'a str>,
}

impl<'a> SearchRequest<'a> {
    pub fn subtree(filter: &'a str, attributes: &'a [&'a str], domain: &'a str) -> Self {
        SearchRequest {
            filter,
            scope: SearchScope::Subtree,
            attributes,
            domain,
            base: None,
        }
    }
}

/// Lazy record source. Implementations must support unbounded result sizes
/// without materializing them per call; the pipeline applies backpressure.
pub trait DirectorySearcher: Send + Sync {
    fn search<'a>(
        &'a self,
        request: &SearchRequest<'_>,
    ) -> Result<Box<dyn Iterator<Item = DirectoryRecord> + Send + 'a>>;
}

/// Turns a raw record into its typed view. `None` means the record cannot
/// be attributed to a usable entity and is skipped (still counted).
pub trait EntityResolver: Send + Sync {
    fn resolve(&self, record: &DirectoryRecord) -> Option<ResolvedEntity>;
}

/// Enumerates reachable domains and their SIDs.
pub trait DomainLister: Send + Sync {
    fn domains(&self) -> Result<Vec<String>>;
    fn domain_sid(&self, domain: &str) -> Option<String>;
}
