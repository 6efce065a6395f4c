//! Snapshot-backed directory provider.
//!
//! Serves searches, entity resolution, and domain metadata from a JSON
//! export of the directory. The export carries the domain list (with SIDs
//! and controller host names) and pre-filtered object records, so this
//! provider never needs a directory protocol client. The controller-locator
//! query is answered from the domain metadata; every other query streams
//! the matching domain's records.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::constants::DC_LOCATOR_FILTER;
use crate::directory::search::{
    DirectorySearcher, DomainLister, EntityResolver, SearchRequest,
};
use crate::models::{DirectoryRecord, ObjectKind, ResolvedEntity};

/// One domain in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEntry {
    pub name: String,
    pub sid: String,
    #[serde(default)]
    pub controllers: Vec<String>,
}

/// Root of the snapshot file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    pub domains: Vec<DomainEntry>,
    #[serde(default)]
    pub records: Vec<DirectoryRecord>,
}

#[derive(Clone)]
pub struct SnapshotDirectory {
    snapshot: DirectorySnapshot,
}

impl SnapshotDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        let snapshot: DirectorySnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;

        info!(
            "Loaded directory snapshot: {} domains, {} records",
            snapshot.domains.len(),
            snapshot.records.len()
        );
        Ok(SnapshotDirectory { snapshot })
    }

    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        SnapshotDirectory { snapshot }
    }

    fn controller_records(&self, domain: &str) -> Vec<DirectoryRecord> {
        let base_dn = domain_to_dn(domain);
        self.snapshot
            .domains
            .iter()
            .filter(|entry| entry.name.eq_ignore_ascii_case(domain))
            .flat_map(|entry| entry.controllers.iter())
            .map(|host| {
                let mut record = DirectoryRecord {
                    domain: domain.to_string(),
                    distinguished_name: format!(
                        "CN={},OU=Domain Controllers,{}",
                        host, base_dn
                    ),
                    ..Default::default()
                };
                record
                    .attributes
                    .insert("dnshostname".to_string(), vec![host.clone()]);
                record
            })
            .collect()
    }
}

impl DirectorySearcher for SnapshotDirectory {
    fn search<'a>(
        &'a self,
        request: &SearchRequest<'_>,
    ) -> Result<Box<dyn Iterator<Item = DirectoryRecord> + Send + 'a>> {
        if request.filter == DC_LOCATOR_FILTER {
            return Ok(Box::new(self.controller_records(request.domain).into_iter()));
        }

        let domain = request.domain.to_string();
        let base = request.base.map(|b| b.to_uppercase());
        let results = self
            .snapshot
            .records
            .iter()
            .filter(move |record| record.domain.eq_ignore_ascii_case(&domain))
            .filter(move |record| match &base {
                Some(base_dn) => record
                    .distinguished_name
                    .to_uppercase()
                    .ends_with(base_dn),
                None => true,
            })
            .cloned();
        Ok(Box::new(results))
    }
}

impl EntityResolver for SnapshotDirectory {
    fn resolve(&self, record: &DirectoryRecord) -> Option<ResolvedEntity> {
        resolve_record(record)
    }
}

impl DomainLister for SnapshotDirectory {
    fn domains(&self) -> Result<Vec<String>> {
        Ok(self
            .snapshot
            .domains
            .iter()
            .map(|entry| entry.name.clone())
            .collect())
    }

    fn domain_sid(&self, domain: &str) -> Option<String> {
        self.snapshot
            .domains
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(domain))
            .map(|entry| entry.sid.clone())
    }
}

fn classify(record: &DirectoryRecord) -> ObjectKind {
    if let Some(value) = record.attr("samaccounttype") {
        return ObjectKind::from_sam_account_type(value);
    }
    let category_is_gpo = record
        .attr("objectcategory")
        .map(|c| c.to_lowercase().contains("grouppolicycontainer"))
        .unwrap_or(false);
    if category_is_gpo {
        return ObjectKind::Gpo;
    }
    for class in record.attr_values("objectclass") {
        match class.to_lowercase().as_str() {
            "domain" | "domaindns" => return ObjectKind::Domain,
            "organizationalunit" => return ObjectKind::Ou,
            "grouppolicycontainer" => return ObjectKind::Gpo,
            _ => {}
        }
    }
    ObjectKind::Unknown
}

fn resolve_record(record: &DirectoryRecord) -> Option<ResolvedEntity> {
    let kind = classify(record);
    let sid = record.attr("objectsid").unwrap_or_default().to_string();

    let network_name = match kind {
        ObjectKind::Computer => match record.attr("dnshostname") {
            Some(host) => host.to_string(),
            None => {
                let sam = record.attr("samaccountname")?;
                format!("{}.{}", sam.trim_end_matches('$'), record.domain).to_lowercase()
            }
        },
        ObjectKind::Domain => record.domain.to_uppercase(),
        ObjectKind::Gpo | ObjectKind::Ou => {
            let name = record.attr("name").or_else(|| record.attr("displayname"))?;
            format!("{}@{}", name, record.domain).to_uppercase()
        }
        ObjectKind::User | ObjectKind::Group => {
            let sam = record.attr("samaccountname")?;
            format!("{}@{}", sam, record.domain).to_uppercase()
        }
        ObjectKind::Unknown => return None,
    };

    Some(ResolvedEntity {
        kind,
        network_name,
        sid,
    })
}

fn domain_to_dn(domain: &str) -> String {
    domain
        .split('.')
        .map(|part| format!("DC={}", part))
        .collect::<Vec<_>>()
        .join(",")
}
