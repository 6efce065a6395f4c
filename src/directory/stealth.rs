//! Stealth target derivation.
//!
//! A stealth pass contacts only the hosts users already touch: file servers
//! referenced by home directory, profile path, and logon script attributes.
//! Target hosts come out of the UNC paths in those attributes.

use std::collections::HashSet;

use anyhow::Result;
use lazy_static::lazy_static;
use log::info;
use regex::Regex;

use crate::directory::context::DirectoryContext;
use crate::directory::search::SearchRequest;
use crate::models::{ObjectKind, ResolvedEntity};

lazy_static! {
    /// Host component of a UNC path
    static ref UNC_HOST: Regex = Regex::new(r"^\\\\([^\\]+)\\").unwrap();
}

const PATH_ATTRS: [&str; 3] = ["homedirectory", "scriptpath", "profilepath"];

const STEALTH_FILTER: &str =
    "(&(samAccountType=805306368)(|(homedirectory=*)(scriptpath=*)(profilepath=*)))";

/// Hosts referenced by user path attributes, deduplicated without case.
pub fn stealth_targets(context: &DirectoryContext, domain: &str) -> Result<Vec<ResolvedEntity>> {
    let request = SearchRequest::subtree(STEALTH_FILTER, &PATH_ATTRS, domain);

    let mut seen: HashSet<String> = HashSet::new();
    let mut targets = Vec::new();
    for record in context.search(&request)? {
        for attr in PATH_ATTRS {
            if let Some(host) = record.attr(attr).and_then(unc_host) {
                if seen.insert(host.to_uppercase()) {
                    targets.push(ResolvedEntity {
                        kind: ObjectKind::Computer,
                        network_name: host,
                        sid: String::new(),
                    });
                }
            }
        }
    }

    info!("Derived {} stealth targets for {}", targets.len(), domain);
    Ok(targets)
}

fn unc_host(path: &str) -> Option<String> {
    UNC_HOST
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|host| host.as_str().to_string())
}
