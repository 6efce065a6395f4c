//! Core data model: collection methods, directory records, resolved
//! entities, and the edge union emitted by every collector.

use std::collections::HashMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Selects both the upstream directory query and the per-entry dispatch
/// steps. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectionMethod {
    /// Account property edges for users and computers
    ObjectProps,
    /// Group membership edges
    Group,
    /// Local admin and session edges for computers only
    ComputerOnly,
    /// Local admin edges only
    LocalGroup,
    /// Local admin edges derived from GPO links
    GpoLocalGroup,
    /// Network session edges
    Session,
    /// Interactive logon edges from the network and registry sources
    LoggedOn,
    /// Session collection repeated until a deadline
    SessionLoop,
    /// Memberships plus admin and session edges for reachable computers
    Default,
    /// Access-control entry edges
    Acl,
    /// Domain trust edges only
    Trusts,
}

impl CollectionMethod {
    /// Methods that push the domain's trust edges before any entry work.
    pub fn seeds_trusts(self) -> bool {
        matches!(self, CollectionMethod::Default | CollectionMethod::Trusts)
    }

    /// Methods whose search is narrowed to the configured OU subtree.
    /// SessionLoop is not: loop passes always sweep the whole domain.
    pub fn ou_scoped(self) -> bool {
        matches!(
            self,
            CollectionMethod::ComputerOnly
                | CollectionMethod::Session
                | CollectionMethod::LocalGroup
                | CollectionMethod::LoggedOn
        )
    }
}

impl fmt::Display for CollectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionMethod::ObjectProps => "ObjectProps",
            CollectionMethod::Group => "Group",
            CollectionMethod::ComputerOnly => "ComputerOnly",
            CollectionMethod::LocalGroup => "LocalGroup",
            CollectionMethod::GpoLocalGroup => "GPOLocalGroup",
            CollectionMethod::Session => "Session",
            CollectionMethod::LoggedOn => "LoggedOn",
            CollectionMethod::SessionLoop => "SessionLoop",
            CollectionMethod::Default => "Default",
            CollectionMethod::Acl => "ACL",
            CollectionMethod::Trusts => "Trusts",
        };
        write!(f, "{}", name)
    }
}

/// One directory object as returned by the search collaborator: an opaque
/// attribute bag keyed by lowercase attribute name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Domain the record was read from
    pub domain: String,
    /// Distinguished name of the object
    pub distinguished_name: String,
    /// Multi-valued attributes, keys lowercase
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryRecord {
    /// First value of an attribute, if present and non-empty.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of an attribute; empty slice when absent.
    pub fn attr_values(&self, name: &str) -> &[String] {
        self.attributes
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Directory object classes this tool distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    User,
    Computer,
    Group,
    Gpo,
    Domain,
    Ou,
    Unknown,
}

impl ObjectKind {
    /// Maps the samAccountType attribute value onto an object kind.
    pub fn from_sam_account_type(value: &str) -> ObjectKind {
        match value {
            "805306368" => ObjectKind::User,
            "805306369" => ObjectKind::Computer,
            "268435456" | "268435457" | "536870912" | "536870913" => ObjectKind::Group,
            _ => ObjectKind::Unknown,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::User => "user",
            ObjectKind::Computer => "computer",
            ObjectKind::Group => "group",
            ObjectKind::Gpo => "gpo",
            ObjectKind::Domain => "domain",
            ObjectKind::Ou => "ou",
            ObjectKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Typed view of a record after resolution. Absence (resolution failure)
/// is expressed as `None` at the call sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub kind: ObjectKind,
    /// Name the entity is reachable or displayed under: DNS host name for
    /// computers, `account@domain` for everything else.
    pub network_name: String,
    pub sid: String,
}

/// Direction of a domain trust as seen from the source domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDirection {
    Inbound,
    Outbound,
    Bidirectional,
}

impl fmt::Display for TrustDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrustDirection::Inbound => "Inbound",
            TrustDirection::Outbound => "Outbound",
            TrustDirection::Bidirectional => "Bidirectional",
        };
        write!(f, "{}", name)
    }
}

/// Whether two domains share a forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustKind {
    ParentChild,
    External,
}

impl fmt::Display for TrustKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrustKind::ParentChild => "ParentChild",
            TrustKind::External => "External",
        };
        write!(f, "{}", name)
    }
}

/// One decoded trust relation between two domains.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainTrustEdge {
    pub source_domain: String,
    pub target_domain: String,
    pub direction: TrustDirection,
    pub kind: TrustKind,
    pub transitive: bool,
}

/// Membership of an account in a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMembershipEdge {
    pub group_name: String,
    pub account_name: String,
    pub account_kind: ObjectKind,
}

/// A user session observed on a computer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEdge {
    pub user_name: String,
    pub computer_name: String,
    /// Confidence weight: network-session observations carry 2, logon
    /// observations carry 1.
    pub weight: u32,
}

/// An account holding local administrative rights on a computer.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAdminEdge {
    pub computer_name: String,
    pub account_name: String,
    pub account_kind: ObjectKind,
}

/// One decoded access-control entry on a directory object.
#[derive(Debug, Clone, PartialEq)]
pub struct AclEntryEdge {
    pub object_name: String,
    pub object_kind: ObjectKind,
    pub principal_name: String,
    pub principal_kind: ObjectKind,
    pub rights: String,
    pub ace_kind: String,
    pub access_type: String,
    pub inherited: bool,
}

/// Property record for a user account.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPropertiesEdge {
    pub account_name: String,
    pub enabled: bool,
    pub pwd_last_set: i64,
    pub last_logon: i64,
    pub sid: String,
    pub sid_history: String,
    pub has_spn: bool,
    pub service_principal_names: Vec<String>,
}

/// Property record for a computer account.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputerPropertiesEdge {
    pub account_name: String,
    pub enabled: bool,
    pub pwd_last_set: i64,
    pub last_logon: i64,
    pub operating_system: String,
    pub sid: String,
}

/// Discriminant for [`OutputEdge`]; keys sink files and statement batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    GroupMembership,
    Session,
    LocalAdmin,
    AclEntry,
    DomainTrust,
    UserProperties,
    ComputerProperties,
}

impl EdgeKind {
    /// File the kind's edges append to under the output directory.
    pub fn file_name(self) -> &'static str {
        match self {
            EdgeKind::GroupMembership => "group_memberships.csv",
            EdgeKind::Session => "sessions.csv",
            EdgeKind::LocalAdmin => "local_admins.csv",
            EdgeKind::AclEntry => "acl_entries.csv",
            EdgeKind::DomainTrust => "domain_trusts.csv",
            EdgeKind::UserProperties => "user_properties.csv",
            EdgeKind::ComputerProperties => "computer_properties.csv",
        }
    }

    /// Header line written once per file lifetime.
    pub fn csv_header(self) -> &'static str {
        match self {
            EdgeKind::GroupMembership => "GroupName,AccountName,AccountType",
            EdgeKind::Session => "UserName,ComputerName,Weight",
            EdgeKind::LocalAdmin => "ComputerName,AccountName,AccountType",
            EdgeKind::AclEntry => {
                "ObjectName,ObjectType,PrincipalName,PrincipalType,Rights,ACEType,AccessControlType,IsInherited"
            }
            EdgeKind::DomainTrust => "SourceDomain,TargetDomain,TrustDirection,TrustType,Transitive",
            EdgeKind::UserProperties => {
                "AccountName,Enabled,PwdLastSet,LastLogon,Sid,SidHistory,HasSPN,ServicePrincipalNames"
            }
            EdgeKind::ComputerProperties => {
                "AccountName,Enabled,PwdLastSet,LastLogon,OperatingSystem,Sid"
            }
        }
    }

    /// Kind identifier tagging remote statements.
    pub fn type_tag(self) -> &'static str {
        match self {
            EdgeKind::GroupMembership => "group_membership",
            EdgeKind::Session => "session",
            EdgeKind::LocalAdmin => "local_admin",
            EdgeKind::AclEntry => "acl_entry",
            EdgeKind::DomainTrust => "domain_trust",
            EdgeKind::UserProperties => "user_properties",
            EdgeKind::ComputerProperties => "computer_properties",
        }
    }
}

/// Every relationship fact the pipeline can emit. Sinks match on the
/// variant explicitly; there is no runtime type inspection anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEdge {
    GroupMembership(GroupMembershipEdge),
    Session(SessionEdge),
    LocalAdmin(LocalAdminEdge),
    AclEntry(AclEntryEdge),
    DomainTrust(DomainTrustEdge),
    UserProperties(UserPropertiesEdge),
    ComputerProperties(ComputerPropertiesEdge),
}

impl OutputEdge {
    pub fn kind(&self) -> EdgeKind {
        match self {
            OutputEdge::GroupMembership(_) => EdgeKind::GroupMembership,
            OutputEdge::Session(_) => EdgeKind::Session,
            OutputEdge::LocalAdmin(_) => EdgeKind::LocalAdmin,
            OutputEdge::AclEntry(_) => EdgeKind::AclEntry,
            OutputEdge::DomainTrust(_) => EdgeKind::DomainTrust,
            OutputEdge::UserProperties(_) => EdgeKind::UserProperties,
            OutputEdge::ComputerProperties(_) => EdgeKind::ComputerProperties,
        }
    }

    /// Flattens the edge to one line in its kind's column order.
    pub fn csv_row(&self) -> String {
        match self {
            OutputEdge::GroupMembership(e) => format!(
                "{},{},{}",
                csv_escape(&e.group_name),
                csv_escape(&e.account_name),
                e.account_kind
            ),
            OutputEdge::Session(e) => format!(
                "{},{},{}",
                csv_escape(&e.user_name),
                csv_escape(&e.computer_name),
                e.weight
            ),
            OutputEdge::LocalAdmin(e) => format!(
                "{},{},{}",
                csv_escape(&e.computer_name),
                csv_escape(&e.account_name),
                e.account_kind
            ),
            OutputEdge::AclEntry(e) => format!(
                "{},{},{},{},{},{},{},{}",
                csv_escape(&e.object_name),
                e.object_kind,
                csv_escape(&e.principal_name),
                e.principal_kind,
                csv_escape(&e.rights),
                csv_escape(&e.ace_kind),
                csv_escape(&e.access_type),
                e.inherited
            ),
            OutputEdge::DomainTrust(e) => format!(
                "{},{},{},{},{}",
                csv_escape(&e.source_domain),
                csv_escape(&e.target_domain),
                e.direction,
                e.kind,
                e.transitive
            ),
            OutputEdge::UserProperties(e) => format!(
                "{},{},{},{},{},{},{},{}",
                csv_escape(&e.account_name),
                e.enabled,
                e.pwd_last_set,
                e.last_logon,
                csv_escape(&e.sid),
                csv_escape(&e.sid_history),
                e.has_spn,
                csv_escape(&e.service_principal_names.join("|"))
            ),
            OutputEdge::ComputerProperties(e) => format!(
                "{},{},{},{},{},{}",
                csv_escape(&e.account_name),
                e.enabled,
                e.pwd_last_set,
                e.last_logon,
                csv_escape(&e.operating_system),
                csv_escape(&e.sid)
            ),
        }
    }

    /// Parameter objects for the remote sink. Every kind expands to one
    /// object except DomainTrust, which yields one per trust direction.
    pub fn statement_params(&self) -> Vec<Value> {
        match self {
            OutputEdge::GroupMembership(e) => vec![json!({
                "group": e.group_name,
                "account": e.account_name,
                "account_type": e.account_kind.to_string(),
            })],
            OutputEdge::Session(e) => vec![json!({
                "user": e.user_name,
                "computer": e.computer_name,
                "weight": e.weight,
            })],
            OutputEdge::LocalAdmin(e) => vec![json!({
                "computer": e.computer_name,
                "account": e.account_name,
                "account_type": e.account_kind.to_string(),
            })],
            OutputEdge::AclEntry(e) => vec![json!({
                "object": e.object_name,
                "object_type": e.object_kind.to_string(),
                "principal": e.principal_name,
                "principal_type": e.principal_kind.to_string(),
                "rights": e.rights,
                "ace_type": e.ace_kind,
                "access_type": e.access_type,
                "inherited": e.inherited,
            })],
            OutputEdge::DomainTrust(e) => trust_params(e),
            OutputEdge::UserProperties(e) => vec![json!({
                "account": e.account_name,
                "enabled": e.enabled,
                "pwd_last_set": e.pwd_last_set,
                "last_logon": e.last_logon,
                "sid": e.sid,
                "sid_history": e.sid_history,
                "has_spn": e.has_spn,
                "service_principal_names": e.service_principal_names,
            })],
            OutputEdge::ComputerProperties(e) => vec![json!({
                "account": e.account_name,
                "enabled": e.enabled,
                "pwd_last_set": e.pwd_last_set,
                "last_logon": e.last_logon,
                "operating_system": e.operating_system,
                "sid": e.sid,
            })],
        }
    }
}

/// One (trusting, trusted) pair per direction the trust permits.
fn trust_params(edge: &DomainTrustEdge) -> Vec<Value> {
    let source = edge.source_domain.to_uppercase();
    let target = edge.target_domain.to_uppercase();
    let pair = |trusting: &str, trusted: &str| {
        json!({
            "trusting": trusting,
            "trusted": trusted,
            "trust_kind": edge.kind.to_string(),
            "transitive": edge.transitive,
        })
    };
    match edge.direction {
        TrustDirection::Outbound => vec![pair(&source, &target)],
        TrustDirection::Inbound => vec![pair(&target, &source)],
        TrustDirection::Bidirectional => vec![pair(&source, &target), pair(&target, &source)],
    }
}

/// Quotes a field when it contains the delimiter, quotes, or line breaks.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
