//! Mock implementations of the native enumeration calls for non-Windows
//! platforms. Same signatures, empty results.

use anyhow::Result;
use log::debug;

use super::{LocalGroupMember, NetSession, TrustRecord, WkstaUser};

pub fn enumerate_domain_trusts(server: &str) -> Result<Vec<TrustRecord>> {
    debug!(
        "Mock trust enumeration against {}; on Windows this calls DsEnumerateDomainTrustsW",
        server
    );
    Ok(Vec::new())
}

pub fn enumerate_net_sessions(server: &str) -> Result<Vec<NetSession>> {
    debug!(
        "Mock session enumeration against {}; on Windows this calls NetSessionEnum",
        server
    );
    Ok(Vec::new())
}

pub fn enumerate_logged_on_users(server: &str) -> Result<Vec<WkstaUser>> {
    debug!(
        "Mock logon enumeration against {}; on Windows this calls NetWkstaUserEnum",
        server
    );
    Ok(Vec::new())
}

pub fn enumerate_local_group_members(server: &str, group: &str) -> Result<Vec<LocalGroupMember>> {
    debug!(
        "Mock local group enumeration of {} against {}; on Windows this calls NetLocalGroupGetMembers",
        group, server
    );
    Ok(Vec::new())
}

pub fn enumerate_user_hive_keys(server: &str) -> Result<Vec<String>> {
    debug!(
        "Mock registry hive enumeration against {}; on Windows this reads HKEY_USERS remotely",
        server
    );
    Ok(Vec::new())
}
