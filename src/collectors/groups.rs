//! Group membership edges derived from directory attributes.

use log::debug;

use crate::models::{DirectoryRecord, GroupMembershipEdge, ResolvedEntity};

use super::traits::GroupCollector;

/// Derives one edge per `memberOf` value plus the primary-group edge from
/// `primaryGroupID` and the domain SID. Pure attribute work.
pub struct AttributeGroupCollector;

impl GroupCollector for AttributeGroupCollector {
    fn memberships(
        &self,
        record: &DirectoryRecord,
        entity: &ResolvedEntity,
        domain_sid: Option<&str>,
    ) -> Vec<GroupMembershipEdge> {
        let mut edges = Vec::new();

        for dn in record.attr_values("memberof") {
            match group_name_from_dn(dn) {
                Some(group_name) => edges.push(GroupMembershipEdge {
                    group_name,
                    account_name: entity.network_name.clone(),
                    account_kind: entity.kind,
                }),
                None => debug!("Skipping group DN without CN and DC components: {}", dn),
            }
        }

        if let (Some(rid), Some(sid)) = (record.attr("primarygroupid"), domain_sid) {
            edges.push(GroupMembershipEdge {
                group_name: primary_group_name(rid, sid, &record.domain),
                account_name: entity.network_name.clone(),
                account_kind: entity.kind,
            });
        }

        edges
    }
}

/// `CN=Domain Admins,CN=Users,DC=testlab,DC=local` becomes
/// `DOMAIN ADMINS@TESTLAB.LOCAL`.
fn group_name_from_dn(dn: &str) -> Option<String> {
    let mut name: Option<String> = None;
    let mut domain_parts: Vec<String> = Vec::new();

    for rdn in split_rdns(dn) {
        let (key, value) = match rdn.split_once('=') {
            Some(parts) => parts,
            None => continue,
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "cn" if name.is_none() => name = Some(value.trim().to_string()),
            "dc" => domain_parts.push(value.trim().to_string()),
            _ => {}
        }
    }

    let name = name?;
    if name.is_empty() || domain_parts.is_empty() {
        return None;
    }
    Some(format!("{}@{}", name, domain_parts.join(".")).to_uppercase())
}

/// Splits a distinguished name on commas, honoring backslash escapes so
/// names like `CN=Smith\, John` stay intact.
fn split_rdns(dn: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for ch in dn.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == ',' {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Well-known builtin RIDs map to their fixed names; anything else falls
/// back to the constructed group SID.
fn primary_group_name(rid: &str, domain_sid: &str, domain: &str) -> String {
    let well_known = match rid {
        "512" => Some("DOMAIN ADMINS"),
        "513" => Some("DOMAIN USERS"),
        "514" => Some("DOMAIN GUESTS"),
        "515" => Some("DOMAIN COMPUTERS"),
        "516" => Some("DOMAIN CONTROLLERS"),
        "517" => Some("CERT PUBLISHERS"),
        "518" => Some("SCHEMA ADMINS"),
        "519" => Some("ENTERPRISE ADMINS"),
        "520" => Some("GROUP POLICY CREATOR OWNERS"),
        "521" => Some("READ-ONLY DOMAIN CONTROLLERS"),
        _ => None,
    };
    match well_known {
        Some(name) => format!("{}@{}", name, domain.to_uppercase()),
        None => format!("{}-{}", domain_sid, rid),
    }
}
