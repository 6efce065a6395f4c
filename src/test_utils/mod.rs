//! Shared fixtures for unit tests.

#![cfg(test)]

use serde_json::json;

use crate::constants::test::{TEST_DOMAIN, TEST_DOMAIN_SID};
use crate::directory::snapshot::DirectorySnapshot;
use crate::directory::{DirectoryContext, SnapshotDirectory};
use crate::models::DirectoryRecord;
use crate::probe::LivenessProbe;

/// Probe with a scripted answer, for tests that control reachability.
pub struct FixedProbe {
    pub alive: bool,
}

impl LivenessProbe for FixedProbe {
    fn is_alive(&self, _host: &str) -> bool {
        self.alive
    }
}

/// Wires one snapshot into all three directory collaborator seats.
pub fn context_over(directory: SnapshotDirectory) -> DirectoryContext {
    DirectoryContext::new(
        Box::new(directory.clone()),
        Box::new(directory.clone()),
        Box::new(directory),
    )
}

/// Snapshot carrying the standard test domain and the given records.
pub fn snapshot_with_records(records: Vec<DirectoryRecord>) -> SnapshotDirectory {
    let mut snapshot: DirectorySnapshot = serde_json::from_value(json!({
        "domains": [
            {
                "name": TEST_DOMAIN,
                "sid": TEST_DOMAIN_SID,
                "controllers": ["dc01.testlab.local"]
            }
        ],
        "records": []
    }))
    .expect("fixture snapshot should deserialize");
    snapshot.records = records;
    SnapshotDirectory::from_snapshot(snapshot)
}

/// User record carrying one group membership.
pub fn user_record(sam: &str) -> DirectoryRecord {
    serde_json::from_value(json!({
        "domain": TEST_DOMAIN,
        "distinguished_name": format!("CN={},CN=Users,DC=testlab,DC=local", sam),
        "attributes": {
            "samaccountname": [sam],
            "samaccounttype": ["805306368"],
            "objectsid": [format!("{}-1104", TEST_DOMAIN_SID)],
            "memberof": ["CN=Remote Support,CN=Users,DC=testlab,DC=local"]
        }
    }))
    .expect("fixture record should deserialize")
}

/// Computer record resolvable to a DNS host name.
pub fn computer_record(sam: &str, host: &str) -> DirectoryRecord {
    serde_json::from_value(json!({
        "domain": TEST_DOMAIN,
        "distinguished_name": format!("CN={},OU=Workstations,DC=testlab,DC=local", sam),
        "attributes": {
            "samaccountname": [format!("{}$", sam)],
            "samaccounttype": ["805306369"],
            "dnshostname": [host]
        }
    }))
    .expect("fixture record should deserialize")
}

/// Record with no recognizable identity; resolution yields nothing.
pub fn unresolvable_record(cn: &str) -> DirectoryRecord {
    serde_json::from_value(json!({
        "domain": TEST_DOMAIN,
        "distinguished_name": format!("CN={},DC=testlab,DC=local", cn),
        "attributes": {}
    }))
    .expect("fixture record should deserialize")
}
