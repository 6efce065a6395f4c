//! Edge collection implementations.
//!
//! Workers hand each resolved directory entry to the collectors selected by
//! the active method. Collectors come in two families:
//!
//! - **Attribute-derived**: pure functions of the record's attribute bag
//!   (group memberships, account properties, decoded ACL entries). These
//!   never touch the network and cannot fail.
//! - **Host-backed**: live calls against the target computer through the
//!   platform boundary in [`crate::windows`] (sessions, logons, local group
//!   members). These run under a bounded timeout and report
//!   [`CollectError::Timeout`] when the host accepts connections but the
//!   enumeration call hangs.
//!
//! All collectors sit behind traits so the pipeline can be exercised with
//! fakes; [`CollectorSet::live`] wires the production implementations.

/// Collector traits, the shared error type, and the wired set
pub mod traits;

/// Group membership edges from memberOf and the primary group attribute
pub mod groups;

/// User and computer account property edges
pub mod properties;

/// Decoded ACL entry edges and the replication-rights accumulator
pub mod acl;

/// Session, logon, and local-admin collection against live hosts
pub mod hosts;

pub use acl::ParsedAclCollector;
pub use groups::AttributeGroupCollector;
pub use hosts::{GpoLinkAdminCollector, HostLocalAdminCollector, HostSessionCollector};
pub use properties::AttributePropertyCollector;
pub use traits::{
    AclCollector, CollectError, CollectResult, CollectorSet, GpoAdminCollector, GroupCollector,
    LocalAdminCollector, PropertyCollector, SessionCollector,
};
