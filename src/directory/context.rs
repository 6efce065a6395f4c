//! The directory context bundles the three directory collaborators and is
//! passed by reference everywhere directory access is needed. Constructed
//! once per run; nothing in this crate reaches the directory any other way.

use anyhow::{anyhow, Context, Result};
use log::debug;

use crate::constants::DC_LOCATOR_FILTER;
use crate::directory::search::{
    DirectorySearcher, DomainLister, EntityResolver, SearchRequest, SearchScope,
};
use crate::models::{DirectoryRecord, ResolvedEntity};

pub struct DirectoryContext {
    searcher: Box<dyn DirectorySearcher>,
    resolver: Box<dyn EntityResolver>,
    domains: Box<dyn DomainLister>,
}

impl DirectoryContext {
    pub fn new(
        searcher: Box<dyn DirectorySearcher>,
        resolver: Box<dyn EntityResolver>,
        domains: Box<dyn DomainLister>,
    ) -> Self {
        DirectoryContext {
            searcher,
            resolver,
            domains,
        }
    }

    pub fn search<'a>(
        &'a self,
        request: &SearchRequest<'_>,
    ) -> Result<Box<dyn Iterator<Item = DirectoryRecord> + Send + 'a>> {
        self.searcher.search(request)
    }

    pub fn resolve(&self, record: &DirectoryRecord) -> Option<ResolvedEntity> {
        self.resolver.resolve(record)
    }

    /// Domains one full pass covers: the override when given, otherwise
    /// everything the lister knows about.
    pub fn domains_for_run(&self, domain_override: Option<&str>) -> Result<Vec<String>> {
        if let Some(domain) = domain_override {
            return Ok(vec![domain.to_string()]);
        }
        let domains = self
            .domains
            .domains()
            .context("Failed to enumerate domains")?;
        if domains.is_empty() {
            return Err(anyhow!("No domains available to enumerate"));
        }
        Ok(domains)
    }

    pub fn domain_sid(&self, domain: &str) -> Option<String> {
        self.domains.domain_sid(domain)
    }

    /// One controller host for the domain, or `None` when the directory
    /// does not advertise any.
    pub fn find_domain_controller(&self, domain: &str) -> Result<Option<String>> {
        let request = SearchRequest {
            filter: DC_LOCATOR_FILTER,
            scope: SearchScope::Subtree,
            attributes: &["dnshostname"],
            domain,
            base: None,
        };
        let mut results = self.searcher.search(&request)?;
        let controller = results
            .next()
            .and_then(|record| record.attr("dnshostname").map(str::to_string));
        match &controller {
            Some(host) => debug!("Using domain controller {} for {}", host, domain),
            None => debug!("No domain controller found for {}", domain),
        }
        Ok(controller)
    }
}
