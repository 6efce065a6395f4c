//! Directory access layer.
//!
//! Everything the pipeline knows about the directory service comes through
//! the trait seams defined here: searching for records, resolving records
//! into typed entities, and listing domains with their SIDs. The production
//! provider serves all three from a JSON snapshot export, keeping this tool
//! free of any directory protocol dependency.

/// Search, resolver, and domain-listing trait seams
pub mod search;

/// Method-keyed query construction
pub mod query;

/// Context object bundling the three directory collaborators
pub mod context;

/// Stealth target derivation from user path attributes
pub mod stealth;

/// Snapshot-backed production provider
pub mod snapshot;

pub use context::DirectoryContext;
pub use query::{gpo_container_query, query_for_method, MethodQuery};
pub use search::{DirectorySearcher, DomainLister, EntityResolver, SearchRequest, SearchScope};
pub use snapshot::SnapshotDirectory;
pub use stealth::stealth_targets;
