//! Access-control entry edges and the replication-rights accumulator.
//!
//! ACL decoding happens upstream; each record carries its decoded entries
//! as `parsedacl` attribute values of the form
//! `Principal;PrincipalType;Rights;ACEType;AccessType;IsInherited`.
//! Replication rights are special-cased: a principal only becomes
//! interesting once it holds both halves of the replication pair on the
//! domain head, so those entries accumulate across the whole domain and
//! drain as synthesized `DcSync` edges after the worker pool finishes.

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::models::{AclEntryEdge, DirectoryRecord, ObjectKind, ResolvedEntity};

use super::traits::AclCollector;

const GET_CHANGES: &str = "DS-Replication-Get-Changes";
const GET_CHANGES_ALL: &str = "DS-Replication-Get-Changes-All";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SyncKey {
    object_name: String,
    principal_name: String,
    principal_kind: ObjectKind,
}

#[derive(Debug, Default)]
struct SyncRights {
    get_changes: bool,
    get_changes_all: bool,
}

/// Parses decoded ACL attribute values into entry edges. Shared across the
/// worker pool; only the accumulator takes a lock.
pub struct ParsedAclCollector {
    syncers: Mutex<HashMap<SyncKey, SyncRights>>,
}

impl ParsedAclCollector {
    pub fn new() -> Self {
        ParsedAclCollector {
            syncers: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for ParsedAclCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl AclCollector for ParsedAclCollector {
    fn entries(&self, record: &DirectoryRecord, entity: &ResolvedEntity) -> Vec<AclEntryEdge> {
        let mut edges = Vec::new();

        for value in record.attr_values("parsedacl") {
            let parsed = match parse_entry(value) {
                Some(parsed) => parsed,
                None => {
                    debug!(
                        "Skipping malformed ACL value on {}: {}",
                        record.distinguished_name, value
                    );
                    continue;
                }
            };

            // Deny entries do not grant anything worth an edge.
            if parsed.access_type != "AccessAllowed" {
                continue;
            }

            if entity.kind == ObjectKind::Domain
                && (parsed.ace_kind == GET_CHANGES || parsed.ace_kind == GET_CHANGES_ALL)
            {
                let key = SyncKey {
                    object_name: entity.network_name.clone(),
                    principal_name: parsed.principal_name,
                    principal_kind: parsed.principal_kind,
                };
                let mut syncers = self.syncers.lock().unwrap();
                let rights = syncers.entry(key).or_default();
                if parsed.ace_kind == GET_CHANGES {
                    rights.get_changes = true;
                } else {
                    rights.get_changes_all = true;
                }
                continue;
            }

            edges.push(AclEntryEdge {
                object_name: entity.network_name.clone(),
                object_kind: entity.kind,
                principal_name: parsed.principal_name,
                principal_kind: parsed.principal_kind,
                rights: parsed.rights,
                ace_kind: parsed.ace_kind,
                access_type: parsed.access_type,
                inherited: parsed.inherited,
            });
        }

        edges
    }

    fn drain_accumulated(&self) -> Vec<AclEntryEdge> {
        let drained: HashMap<SyncKey, SyncRights> =
            std::mem::take(&mut *self.syncers.lock().unwrap());

        let mut edges: Vec<AclEntryEdge> = drained
            .into_iter()
            .filter(|(_, rights)| rights.get_changes && rights.get_changes_all)
            .map(|(key, _)| AclEntryEdge {
                object_name: key.object_name,
                object_kind: ObjectKind::Domain,
                principal_name: key.principal_name,
                principal_kind: key.principal_kind,
                rights: "DcSync".to_string(),
                ace_kind: String::new(),
                access_type: "AccessAllowed".to_string(),
                inherited: false,
            })
            .collect();
        edges.sort_by(|a, b| {
            (&a.object_name, &a.principal_name).cmp(&(&b.object_name, &b.principal_name))
        });
        edges
    }
}

struct ParsedEntry {
    principal_name: String,
    principal_kind: ObjectKind,
    rights: String,
    ace_kind: String,
    access_type: String,
    inherited: bool,
}

fn parse_entry(value: &str) -> Option<ParsedEntry> {
    let fields: Vec<&str> = value.split(';').collect();
    if fields.len() != 6 {
        return None;
    }
    let principal_name = fields[0].trim();
    if principal_name.is_empty() {
        return None;
    }
    Some(ParsedEntry {
        principal_name: principal_name.to_string(),
        principal_kind: parse_kind(fields[1].trim())?,
        rights: fields[2].trim().to_string(),
        ace_kind: fields[3].trim().to_string(),
        access_type: fields[4].trim().to_string(),
        inherited: parse_bool(fields[5].trim())?,
    })
}

fn parse_kind(word: &str) -> Option<ObjectKind> {
    match word.to_ascii_lowercase().as_str() {
        "user" => Some(ObjectKind::User),
        "computer" => Some(ObjectKind::Computer),
        "group" => Some(ObjectKind::Group),
        "gpo" => Some(ObjectKind::Gpo),
        "domain" => Some(ObjectKind::Domain),
        "ou" => Some(ObjectKind::Ou),
        _ => None,
    }
}

fn parse_bool(word: &str) -> Option<bool> {
    match word.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
