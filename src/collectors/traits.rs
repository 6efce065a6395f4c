//! Collector trait seams and the shared failure type.

use std::fmt;

use crate::models::{
    AclEntryEdge, DirectoryRecord, GroupMembershipEdge, LocalAdminEdge, OutputEdge, ResolvedEntity,
    SessionEdge,
};

/// Failure of a collection call against a live host. Timeouts are kept
/// separate from other failures so the run statistics can count them.
#[derive(Debug)]
pub enum CollectError {
    /// The call did not complete within the collector deadline. The
    /// underlying native call is abandoned, not cancelled.
    Timeout,
    /// The call completed with an error.
    Failed(anyhow::Error),
}

impl CollectError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CollectError::Timeout)
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Timeout => write!(f, "collection timed out"),
            CollectError::Failed(err) => write!(f, "{:#}", err),
        }
    }
}

impl From<anyhow::Error> for CollectError {
    fn from(err: anyhow::Error) -> Self {
        CollectError::Failed(err)
    }
}

pub type CollectResult<T> = Result<T, CollectError>;

/// Derives group membership edges from a record's attribute bag.
pub trait GroupCollector: Send + Sync {
    fn memberships(
        &self,
        record: &DirectoryRecord,
        entity: &ResolvedEntity,
        domain_sid: Option<&str>,
    ) -> Vec<GroupMembershipEdge>;
}

/// Derives the property edge for a user or computer account.
pub trait PropertyCollector: Send + Sync {
    fn properties(&self, record: &DirectoryRecord, entity: &ResolvedEntity) -> Option<OutputEdge>;
}

/// Decodes ACL attribute values into entry edges.
///
/// Replication-right entries are withheld from the immediate result and
/// accumulated per principal; [`AclCollector::drain_accumulated`] runs once
/// per domain after the worker pool has drained and yields the synthesized
/// edges for principals holding the complete replication pair.
pub trait AclCollector: Send + Sync {
    fn entries(&self, record: &DirectoryRecord, entity: &ResolvedEntity) -> Vec<AclEntryEdge>;
    fn drain_accumulated(&self) -> Vec<AclEntryEdge>;
}

/// Collects user sessions from a live host over its three sources.
pub trait SessionCollector: Send + Sync {
    /// File-share sessions. Yields the client computer each user connects
    /// from, weighted 2.
    fn net_sessions(&self, computer: &str, domain: &str) -> CollectResult<Vec<SessionEdge>>;

    /// Workstation logons on the host itself, weighted 1.
    fn logged_on(&self, computer: &str, domain: &str) -> CollectResult<Vec<SessionEdge>>;

    /// Logons inferred from loaded registry hives, weighted 1. User names
    /// are raw SIDs; no name translation happens at this layer.
    fn registry_logged_on(&self, computer: &str) -> CollectResult<Vec<SessionEdge>>;
}

/// Collects members of the local administrators group from a live host.
pub trait LocalAdminCollector: Send + Sync {
    fn local_admins(&self, computer: &str, domain: &str) -> CollectResult<Vec<LocalAdminEdge>>;
}

/// Resolves admin edges pushed down through policy links on a container.
pub trait GpoAdminCollector: Send + Sync {
    fn gpo_admins(&self, record: &DirectoryRecord, domain: &str)
        -> CollectResult<Vec<LocalAdminEdge>>;
}

/// The full collector complement a run dispatches against.
pub struct CollectorSet {
    pub groups: Box<dyn GroupCollector>,
    pub properties: Box<dyn PropertyCollector>,
    pub acls: Box<dyn AclCollector>,
    pub sessions: Box<dyn SessionCollector>,
    pub local_admins: Box<dyn LocalAdminCollector>,
    pub gpo_admins: Box<dyn GpoAdminCollector>,
}

impl CollectorSet {
    /// Production wiring: attribute-derived collectors plus the host-backed
    /// collectors over the platform boundary.
    pub fn live() -> Self {
        CollectorSet {
            groups: Box::new(super::AttributeGroupCollector),
            properties: Box::new(super::AttributePropertyCollector),
            acls: Box::new(super::ParsedAclCollector::new()),
            sessions: Box::new(super::HostSessionCollector::new()),
            local_admins: Box::new(super::HostLocalAdminCollector::new()),
            gpo_admins: Box::new(super::GpoLinkAdminCollector),
        }
    }
}
