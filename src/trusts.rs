//! Domain trust enumeration and decoding.
//!
//! One native call per domain, made against a controller located through
//! the directory. Decoding is a pure function of the record's two
//! bitmasks; everything that can go wrong before decoding resolves to "no
//! trusts visible", which is a valid terminal state rather than an error.

use anyhow::Result;
use log::{debug, info, warn};

use crate::constants::{
    TRUST_ATTRIB_NON_TRANSITIVE, TRUST_FLAG_DIRECT_INBOUND, TRUST_FLAG_DIRECT_OUTBOUND,
    TRUST_FLAG_IN_FOREST, TRUST_FLAG_TREE_ROOT,
};
use crate::directory::DirectoryContext;
use crate::models::{DomainTrustEdge, TrustDirection, TrustKind};
use crate::windows::{self, TrustRecord};

/// Native trust enumeration seam.
pub trait TrustEnumerator: Send + Sync {
    fn enumerate(&self, controller: &str) -> Result<Vec<TrustRecord>>;
}

/// Production implementation over the platform boundary.
pub struct NetApiTrustEnumerator;

impl TrustEnumerator for NetApiTrustEnumerator {
    fn enumerate(&self, controller: &str) -> Result<Vec<TrustRecord>> {
        windows::enumerate_domain_trusts(controller)
    }
}

pub struct TrustGraphBuilder {
    enumerator: Box<dyn TrustEnumerator>,
}

impl TrustGraphBuilder {
    pub fn new() -> Self {
        TrustGraphBuilder {
            enumerator: Box::new(NetApiTrustEnumerator),
        }
    }

    pub fn with_enumerator(enumerator: Box<dyn TrustEnumerator>) -> Self {
        TrustGraphBuilder { enumerator }
    }

    /// Trust edges visible from `domain`. A domain without a locatable
    /// controller, or whose enumeration call fails, yields nothing.
    pub fn enumerate_trusts(&self, ctx: &DirectoryContext, domain: &str) -> Vec<DomainTrustEdge> {
        let controller = match ctx.find_domain_controller(domain) {
            Ok(Some(controller)) => controller,
            Ok(None) => {
                debug!("No controller advertised for {}; skipping trusts", domain);
                return Vec::new();
            }
            Err(err) => {
                warn!("Controller lookup for {} failed: {:#}", domain, err);
                return Vec::new();
            }
        };

        let records = match self.enumerator.enumerate(&controller) {
            Ok(records) => records,
            Err(err) => {
                warn!("Trust enumeration against {} failed: {:#}", controller, err);
                return Vec::new();
            }
        };

        let edges: Vec<DomainTrustEdge> = records
            .iter()
            .filter_map(|record| decode_trust(domain, record))
            .collect();
        info!("Found {} trusts for {}", edges.len(), domain);
        edges
    }
}

impl Default for TrustGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes one enumeration record. Tree-root records reference the domain
/// itself and decode to nothing.
pub fn decode_trust(source_domain: &str, record: &TrustRecord) -> Option<DomainTrustEdge> {
    if record.flags & TRUST_FLAG_TREE_ROOT != 0 {
        return None;
    }

    let inbound = record.flags & TRUST_FLAG_DIRECT_INBOUND != 0;
    let outbound = record.flags & TRUST_FLAG_DIRECT_OUTBOUND != 0;
    let direction = if inbound && outbound {
        TrustDirection::Bidirectional
    } else if inbound {
        TrustDirection::Inbound
    } else {
        TrustDirection::Outbound
    };

    let kind = if record.flags & TRUST_FLAG_IN_FOREST != 0 {
        TrustKind::ParentChild
    } else {
        TrustKind::External
    };

    Some(DomainTrustEdge {
        source_domain: source_domain.to_string(),
        target_domain: record.domain_name.clone(),
        direction,
        kind,
        transitive: record.attributes & TRUST_ATTRIB_NON_TRANSITIVE == 0,
    })
}
