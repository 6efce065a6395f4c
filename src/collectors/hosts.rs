//! Session, logon, and local-admin collection against live hosts.
//!
//! Each call runs the native enumeration on its own thread under a bounded
//! wait. Mapping from raw enumeration rows to edges is pure and lives in
//! free functions so it stays testable without a network.

use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam::channel;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::constants::{HOST_COLLECTOR_TIMEOUT_SECS, LOCAL_ADMIN_GROUP};
use crate::models::{DirectoryRecord, LocalAdminEdge, ObjectKind, SessionEdge};
use crate::windows;

use super::traits::{
    CollectError, CollectResult, GpoAdminCollector, LocalAdminCollector, SessionCollector,
};

lazy_static! {
    static ref GPLINK: Regex = Regex::new(r"\[LDAP://([^;\]]+);(\d+)\]").unwrap();
}

/// Runs a native enumeration call on its own thread and bounds the wait.
/// On timeout the call is abandoned; the spawned thread finishes whenever
/// the native call returns and its result is dropped.
fn run_bounded<T, F>(label: &str, target: &str, timeout: Duration, call: F) -> CollectResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = channel::bounded(1);
    let spawned = std::thread::Builder::new()
        .name(format!("{}-{}", label, target))
        .spawn(move || {
            let _ = tx.send(call());
        });
    if let Err(err) = spawned {
        return Err(CollectError::Failed(anyhow!(
            "failed to spawn {} thread: {}",
            label,
            err
        )));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CollectError::Failed(err)),
        Err(channel::RecvTimeoutError::Timeout) => {
            debug!("{} call against {} exceeded {:?}", label, target, timeout);
            Err(CollectError::Timeout)
        }
        Err(channel::RecvTimeoutError::Disconnected) => Err(CollectError::Failed(anyhow!(
            "{} thread against {} ended without a result",
            label,
            target
        ))),
    }
}

fn short_host(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}

/// Sessions and logons through the workstation service.
pub struct HostSessionCollector {
    timeout: Duration,
}

impl HostSessionCollector {
    pub fn new() -> Self {
        HostSessionCollector {
            timeout: Duration::from_secs(HOST_COLLECTOR_TIMEOUT_SECS),
        }
    }
}

impl Default for HostSessionCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCollector for HostSessionCollector {
    fn net_sessions(&self, computer: &str, domain: &str) -> CollectResult<Vec<SessionEdge>> {
        let target = computer.to_string();
        let raw = run_bounded("sessions", computer, self.timeout, move || {
            windows::enumerate_net_sessions(&target)
        })?;
        Ok(session_edges(raw, computer, domain))
    }

    fn logged_on(&self, computer: &str, domain: &str) -> CollectResult<Vec<SessionEdge>> {
        let target = computer.to_string();
        let raw = run_bounded("logons", computer, self.timeout, move || {
            windows::enumerate_logged_on_users(&target)
        })?;
        Ok(logon_edges(raw, computer, domain))
    }

    fn registry_logged_on(&self, computer: &str) -> CollectResult<Vec<SessionEdge>> {
        let target = computer.to_string();
        let keys = run_bounded("hive-keys", computer, self.timeout, move || {
            windows::enumerate_user_hive_keys(&target)
        })?;
        Ok(registry_edges(keys, computer))
    }
}

/// Local administrators through the SAM group on the host.
pub struct HostLocalAdminCollector {
    timeout: Duration,
}

impl HostLocalAdminCollector {
    pub fn new() -> Self {
        HostLocalAdminCollector {
            timeout: Duration::from_secs(HOST_COLLECTOR_TIMEOUT_SECS),
        }
    }
}

impl Default for HostLocalAdminCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalAdminCollector for HostLocalAdminCollector {
    fn local_admins(&self, computer: &str, domain: &str) -> CollectResult<Vec<LocalAdminEdge>> {
        let target = computer.to_string();
        let raw = run_bounded("admins", computer, self.timeout, move || {
            windows::enumerate_local_group_members(&target, LOCAL_ADMIN_GROUP)
        })?;
        Ok(admin_edges(raw, computer, domain))
    }
}

/// Surfaces the active policy links on a container. Resolving the linked
/// templates to admin edges needs SYSVOL file access, which this build
/// does not carry, so the result is always empty.
pub struct GpoLinkAdminCollector;

impl GpoAdminCollector for GpoLinkAdminCollector {
    fn gpo_admins(
        &self,
        record: &DirectoryRecord,
        _domain: &str,
    ) -> CollectResult<Vec<LocalAdminEdge>> {
        let links = match record.attr("gplink") {
            Some(raw) => active_gpo_links(raw),
            None => Vec::new(),
        };
        if !links.is_empty() {
            debug!(
                "{} active policy links on {}; template resolution needs SYSVOL access",
                links.len(),
                record.distinguished_name
            );
        }
        Ok(Vec::new())
    }
}

/// DNs of linked policies whose disable bit is clear.
fn active_gpo_links(raw: &str) -> Vec<String> {
    GPLINK
        .captures_iter(raw)
        .filter_map(|caps| {
            let flags = caps[2].parse::<u32>().ok()?;
            if flags & 0x1 != 0 {
                return None;
            }
            Some(caps[1].to_string())
        })
        .collect()
}

/// The session list on a server names the client each user connects from;
/// the edge places the user at that client machine.
fn session_edges(
    raw: Vec<windows::NetSession>,
    queried: &str,
    domain: &str,
) -> Vec<SessionEdge> {
    let queried_short = short_host(queried);
    let mut edges = Vec::new();

    for session in raw {
        let user = session.user.trim();
        if user.is_empty() || user.ends_with('$') {
            continue;
        }
        let client = session.computer.trim().trim_start_matches('\\');
        if client.is_empty() {
            continue;
        }
        if short_host(client).eq_ignore_ascii_case(queried_short) {
            continue;
        }
        // Bare NetBIOS names are qualified with the enumeration domain;
        // addresses and full names pass through.
        let computer_name = if client.contains('.') {
            client.to_lowercase()
        } else {
            format!("{}.{}", client, domain).to_lowercase()
        };
        edges.push(SessionEdge {
            user_name: format!("{}@{}", user, domain).to_uppercase(),
            computer_name,
            weight: 2,
        });
    }

    edges
}

/// Workstation logons happen on the queried host itself.
fn logon_edges(raw: Vec<windows::WkstaUser>, queried: &str, domain: &str) -> Vec<SessionEdge> {
    let queried_short = short_host(queried);
    let mut edges = Vec::new();

    for logon in raw {
        let user = logon.user.trim();
        if user.is_empty() || user.ends_with('$') {
            continue;
        }
        // Machine-local accounts carry the host name as their logon
        // domain and never map to a directory principal.
        if logon.logon_domain.eq_ignore_ascii_case(queried_short) {
            continue;
        }
        edges.push(SessionEdge {
            user_name: format!("{}@{}", user, domain).to_uppercase(),
            computer_name: queried.to_string(),
            weight: 1,
        });
    }

    edges
}

/// Loaded user hives name logged-on users by SID. The SIDs pass through
/// untranslated; only domain-account hives are kept.
fn registry_edges(keys: Vec<String>, queried: &str) -> Vec<SessionEdge> {
    keys.into_iter()
        .filter(|key| key.starts_with("S-1-5-21-") && !key.ends_with("_Classes"))
        .map(|sid| SessionEdge {
            user_name: sid,
            computer_name: queried.to_string(),
            weight: 1,
        })
        .collect()
}

fn admin_edges(
    raw: Vec<windows::LocalGroupMember>,
    queried: &str,
    domain: &str,
) -> Vec<LocalAdminEdge> {
    let queried_short = short_host(queried);
    let mut edges = Vec::new();

    for member in raw {
        let (scope, account) = match member.name.split_once('\\') {
            Some(parts) => parts,
            None => ("", member.name.as_str()),
        };
        if account.is_empty() {
            continue;
        }
        // Members scoped to the machine itself are local accounts.
        if scope.eq_ignore_ascii_case(queried_short) {
            continue;
        }
        let kind = match member.sid_use {
            1 if account.ends_with('$') => ObjectKind::Computer,
            1 => ObjectKind::User,
            2 | 4 | 5 => ObjectKind::Group,
            other => {
                debug!("Skipping member {} with SID use {}", member.name, other);
                continue;
            }
        };
        let account_name = match kind {
            ObjectKind::Computer => {
                format!("{}.{}", account.trim_end_matches('$'), domain).to_lowercase()
            }
            _ => format!("{}@{}", account, domain).to_uppercase(),
        };
        edges.push(LocalAdminEdge {
            computer_name: queried.to_string(),
            account_name,
            account_kind: kind,
        });
    }

    edges
}
