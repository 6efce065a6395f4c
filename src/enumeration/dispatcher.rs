//! Per-domain run orchestration.
//!
//! One domain runs to completion before the next starts: workers joined,
//! ACL accumulator drained, final status emitted, sink finished. The file
//! sink keys open files by edge kind, so two domains must never write
//! concurrently.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam::channel::{self, Sender};
use log::{debug, info, warn};

use crate::collectors::{CollectError, CollectorSet};
use crate::constants::INPUT_QUEUE_CAPACITY;
use crate::directory::{
    gpo_container_query, query_for_method, stealth_targets, DirectoryContext, SearchRequest,
    SearchScope,
};
use crate::enumeration::dispatch::{process_entry, EntryContext};
use crate::enumeration::looper::run_collection_loop;
use crate::enumeration::statistics::RunStatistics;
use crate::enumeration::status::StatusReporter;
use crate::enumeration::workers::{WorkerPool, WorkerShared};
use crate::models::{CollectionMethod, DirectoryRecord, OutputEdge};
use crate::options::{EnumerationOptions, OutputTarget};
use crate::probe::LivenessProbe;
use crate::sinks::{spawn_sink, FileSink, OutputSink, RestSink};
use crate::trusts::TrustGraphBuilder;

pub struct CollectionDispatcher {
    directory: Arc<DirectoryContext>,
    collectors: Arc<CollectorSet>,
    probe: Arc<dyn LivenessProbe>,
    trusts: TrustGraphBuilder,
    statistics: Arc<RunStatistics>,
    options: EnumerationOptions,
}

impl CollectionDispatcher {
    pub fn new(
        directory: DirectoryContext,
        collectors: CollectorSet,
        probe: Box<dyn LivenessProbe>,
        trusts: TrustGraphBuilder,
        options: EnumerationOptions,
    ) -> Self {
        CollectionDispatcher {
            directory: Arc::new(directory),
            collectors: Arc::new(collectors),
            probe: Arc::from(probe),
            trusts,
            statistics: Arc::new(RunStatistics::new()),
            options,
        }
    }

    pub fn statistics(&self) -> Arc<RunStatistics> {
        self.statistics.clone()
    }

    /// Runs the configured collection, repeating passes for the looping
    /// method.
    pub fn run(&self) -> Result<()> {
        if self.options.method == CollectionMethod::SessionLoop {
            run_collection_loop(self.options.loop_interval, self.options.loop_end, || {
                self.run_pass()
            })
        } else {
            self.run_pass()
        }
    }

    /// One full pass over every domain in scope.
    pub fn run_pass(&self) -> Result<()> {
        for domain in self
            .directory
            .domains_for_run(self.options.domain.as_deref())?
        {
            if self.options.stealth {
                self.run_domain_direct(&domain)?;
            } else {
                self.run_domain_pooled(&domain)?;
            }
        }
        Ok(())
    }

    fn run_domain_pooled(&self, domain: &str) -> Result<()> {
        info!(
            "Starting {} collection for {} with {} workers",
            self.options.method, domain, self.options.threads
        );
        let started = Instant::now();
        self.statistics.reset();
        let domain_sid = self.directory.domain_sid(domain);

        let (output_tx, output_rx) = channel::unbounded();
        let sink_handle = spawn_sink(self.make_sink()?, output_rx)?;

        if self.options.method.seeds_trusts() {
            self.seed_trusts(domain, &output_tx);
            if self.options.method == CollectionMethod::Trusts {
                drop(output_tx);
                join_sink(sink_handle)?;
                self.log_domain_summary("collection", domain, started);
                return Ok(());
            }
        }

        let (input_tx, input_rx) = channel::bounded(INPUT_QUEUE_CAPACITY);
        let shared = WorkerShared {
            method: self.options.method,
            domain: domain.to_string(),
            domain_sid,
            directory: self.directory.clone(),
            collectors: self.collectors.clone(),
            probe: self.probe.clone(),
            statistics: self.statistics.clone(),
            ou_filter: self.options.ou.clone(),
            exclude_dc: self.options.exclude_dc,
        };
        let pool = WorkerPool::spawn(
            self.options.threads,
            input_rx,
            output_tx.clone(),
            shared,
        )?;
        let reporter =
            StatusReporter::start(self.options.status_interval, self.statistics.clone())?;

        let stream_result = self.stream_entries(domain, &input_tx);
        drop(input_tx);
        let pool_result = pool.join();

        if self.options.method == CollectionMethod::Acl {
            for edge in self.collectors.acls.drain_accumulated() {
                let _ = output_tx.send(OutputEdge::AclEntry(edge));
            }
        }
        reporter.finish();
        drop(output_tx);
        let sink_result = join_sink(sink_handle);

        pool_result?;
        stream_result?;
        sink_result?;

        self.log_domain_summary("collection", domain, started);
        Ok(())
    }

    fn run_domain_direct(&self, domain: &str) -> Result<()> {
        info!(
            "Starting stealth {} collection for {}",
            self.options.method, domain
        );
        let started = Instant::now();
        self.statistics.reset();
        let domain_sid = self.directory.domain_sid(domain);

        let (output_tx, output_rx) = channel::unbounded();
        let sink_handle = spawn_sink(self.make_sink()?, output_rx)?;

        let collect_result = self.direct_collect(domain, domain_sid.as_deref(), &output_tx);

        if self.options.method == CollectionMethod::Acl {
            for edge in self.collectors.acls.drain_accumulated() {
                let _ = output_tx.send(OutputEdge::AclEntry(edge));
            }
        }
        drop(output_tx);
        let sink_result = join_sink(sink_handle);

        collect_result?;
        sink_result?;

        self.log_domain_summary("stealth collection", domain, started);
        Ok(())
    }

    fn direct_collect(
        &self,
        domain: &str,
        domain_sid: Option<&str>,
        output: &Sender<OutputEdge>,
    ) -> Result<()> {
        match self.options.method {
            CollectionMethod::ObjectProps
            | CollectionMethod::Group
            | CollectionMethod::Acl
            | CollectionMethod::GpoLocalGroup => {
                self.direct_sweep(self.options.method, domain, domain_sid, output)
            }
            CollectionMethod::Session | CollectionMethod::SessionLoop => {
                self.direct_stealth_sessions(domain, output)
            }
            CollectionMethod::LoggedOn => self.direct_stealth_logons(domain, output),
            CollectionMethod::ComputerOnly => {
                self.direct_stealth_sessions(domain, output)?;
                self.direct_gpo_admins(domain, output)
            }
            CollectionMethod::Default => {
                self.direct_stealth_sessions(domain, output)?;
                self.direct_gpo_admins(domain, output)?;
                self.direct_sweep(CollectionMethod::Group, domain, domain_sid, output)
            }
            CollectionMethod::Trusts => {
                self.seed_trusts(domain, output);
                Ok(())
            }
            CollectionMethod::LocalGroup => {
                warn!("Local group collection touches every computer; it has no stealth pass");
                Ok(())
            }
        }
    }

    /// Single-threaded equivalent of a pooled pass: same query, same
    /// per-entry steps, calling thread only.
    fn direct_sweep(
        &self,
        method: CollectionMethod,
        domain: &str,
        domain_sid: Option<&str>,
        output: &Sender<OutputEdge>,
    ) -> Result<()> {
        let query = query_for_method(method);
        let request = SearchRequest::subtree(query.filter, query.attributes, domain);
        let ctx = EntryContext {
            method,
            domain,
            domain_sid,
            collectors: self.collectors.as_ref(),
            probe: self.probe.as_ref(),
            statistics: self.statistics.as_ref(),
            ou_filter: None,
            exclude_dc: self.options.exclude_dc,
        };
        let mut emit = |edge| {
            let _ = output.send(edge);
        };
        for record in self.directory.search(&request)? {
            match self.directory.resolve(&record) {
                Some(entity) => process_entry(&ctx, &record, &entity, &mut emit)?,
                None => debug!("Skipping unresolvable object {}", record.distinguished_name),
            }
            self.statistics.entry_processed();
        }
        Ok(())
    }

    fn direct_stealth_sessions(&self, domain: &str, output: &Sender<OutputEdge>) -> Result<()> {
        let targets = stealth_targets(&self.directory, domain)?;
        info!(
            "Collecting sessions from {} high-traffic hosts",
            targets.len()
        );
        for target in targets {
            if self.probe.is_alive(&target.network_name) {
                match self
                    .collectors
                    .sessions
                    .net_sessions(&target.network_name, domain)
                {
                    Ok(sessions) => {
                        for edge in sessions {
                            let _ = output.send(OutputEdge::Session(edge));
                        }
                    }
                    Err(CollectError::Timeout) => self.statistics.host_timed_out(),
                    Err(CollectError::Failed(err)) => return Err(err),
                }
            } else {
                self.statistics.host_unreachable();
            }
            self.statistics.entry_processed();
        }
        Ok(())
    }

    fn direct_stealth_logons(&self, domain: &str, output: &Sender<OutputEdge>) -> Result<()> {
        let targets = stealth_targets(&self.directory, domain)?;
        info!(
            "Collecting logons from {} high-traffic hosts",
            targets.len()
        );
        for target in targets {
            if self.probe.is_alive(&target.network_name) {
                for result in [
                    self.collectors
                        .sessions
                        .logged_on(&target.network_name, domain),
                    self.collectors
                        .sessions
                        .registry_logged_on(&target.network_name),
                ] {
                    match result {
                        Ok(sessions) => {
                            for edge in sessions {
                                let _ = output.send(OutputEdge::Session(edge));
                            }
                        }
                        Err(CollectError::Timeout) => self.statistics.host_timed_out(),
                        Err(CollectError::Failed(err)) => return Err(err),
                    }
                }
            } else {
                self.statistics.host_unreachable();
            }
            self.statistics.entry_processed();
        }
        Ok(())
    }

    /// Admin rights pushed through policy containers; no host contact.
    fn direct_gpo_admins(&self, domain: &str, output: &Sender<OutputEdge>) -> Result<()> {
        let query = gpo_container_query();
        let request = SearchRequest::subtree(query.filter, query.attributes, domain);
        for record in self.directory.search(&request)? {
            match self.collectors.gpo_admins.gpo_admins(&record, domain) {
                Ok(admins) => {
                    for edge in admins {
                        let _ = output.send(OutputEdge::LocalAdmin(edge));
                    }
                }
                Err(CollectError::Timeout) => self.statistics.host_timed_out(),
                Err(CollectError::Failed(err)) => return Err(err),
            }
            self.statistics.entry_processed();
        }
        Ok(())
    }

    /// Streams the method's search results into the input queue, blocking
    /// while workers lag.
    fn stream_entries(&self, domain: &str, input: &Sender<DirectoryRecord>) -> Result<()> {
        let query = query_for_method(self.options.method);
        let base = if self.options.method.ou_scoped() {
            self.options.ou.as_deref()
        } else {
            None
        };
        let request = SearchRequest {
            filter: query.filter,
            scope: SearchScope::Subtree,
            attributes: query.attributes,
            domain,
            base,
        };
        let mut streamed = 0usize;
        for record in self.directory.search(&request)? {
            if input.send(record).is_err() {
                // Every worker exited early; the cause surfaces at join.
                warn!("Input queue closed while the search was still streaming");
                break;
            }
            streamed += 1;
        }
        debug!("Streamed {} directory objects for {}", streamed, domain);
        Ok(())
    }

    fn seed_trusts(&self, domain: &str, output: &Sender<OutputEdge>) {
        for trust in self.trusts.enumerate_trusts(&self.directory, domain) {
            let _ = output.send(OutputEdge::DomainTrust(trust));
        }
    }

    fn make_sink(&self) -> Result<Box<dyn OutputSink>> {
        match &self.options.target {
            OutputTarget::Directory(path) => Ok(Box::new(FileSink::new(path)?)),
            OutputTarget::Remote {
                url,
                username,
                password,
            } => Ok(Box::new(RestSink::connect(url, username, password)?)),
        }
    }

    fn log_domain_summary(&self, label: &str, domain: &str, started: Instant) {
        info!(
            "Finished {} for {} in {:.2?}",
            label,
            domain,
            started.elapsed()
        );
        info!(
            "{} objects processed, {} hosts unreachable, {} host calls timed out",
            self.statistics.processed(),
            self.statistics.unreachable(),
            self.statistics.timed_out()
        );
    }
}

fn join_sink(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("Output sink thread panicked")),
    }
}
