//! Native Windows API boundary.
//!
//! Every native enumeration call lives behind one of these functions: the
//! implementation copies the system-owned buffer into plain owned values
//! and releases the buffer exactly once before returning, so no pointer or
//! free obligation ever crosses this module's boundary. Non-Windows builds
//! get mock implementations with identical signatures that return empty
//! results.

#[cfg(target_os = "windows")]
mod netapi;
#[cfg(target_os = "windows")]
mod registry;

#[cfg(not(target_os = "windows"))]
mod mock_impl;

/// One raw trust relationship exactly as the native enumeration reports
/// it: a partner domain plus two undecoded bitmasks.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustRecord {
    pub domain_name: String,
    pub flags: u32,
    pub attributes: u32,
}

/// One SMB session on a server.
#[derive(Debug, Clone, PartialEq)]
pub struct NetSession {
    /// Host the session originates from
    pub computer: String,
    /// Account holding the session
    pub user: String,
}

/// One workstation logon on a server.
#[derive(Debug, Clone, PartialEq)]
pub struct WkstaUser {
    pub user: String,
    pub logon_domain: String,
}

/// One member of a server-local group.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalGroupMember {
    /// `DOMAIN\name` form as reported by the server
    pub name: String,
    /// Raw SID_NAME_USE discriminant
    pub sid_use: u32,
}

#[cfg(target_os = "windows")]
pub use netapi::{
    enumerate_domain_trusts, enumerate_local_group_members, enumerate_logged_on_users,
    enumerate_net_sessions,
};
#[cfg(target_os = "windows")]
pub use registry::enumerate_user_hive_keys;

#[cfg(not(target_os = "windows"))]
pub use mock_impl::{
    enumerate_domain_trusts, enumerate_local_group_members, enumerate_logged_on_users,
    enumerate_net_sessions, enumerate_user_hive_keys,
};
