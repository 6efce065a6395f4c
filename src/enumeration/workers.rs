//! The worker pool draining the bounded input queue.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use crossbeam::channel::{Receiver, Sender};
use log::debug;

use crate::collectors::CollectorSet;
use crate::directory::DirectoryContext;
use crate::enumeration::dispatch::{process_entry, EntryContext};
use crate::enumeration::statistics::RunStatistics;
use crate::models::{CollectionMethod, DirectoryRecord, OutputEdge};
use crate::probe::LivenessProbe;

/// State one domain pass shares across its workers. Cloning hands each
/// worker its own handles onto the same underlying collaborators.
#[derive(Clone)]
pub struct WorkerShared {
    pub method: CollectionMethod,
    pub domain: String,
    pub domain_sid: Option<String>,
    pub directory: Arc<DirectoryContext>,
    pub collectors: Arc<CollectorSet>,
    pub probe: Arc<dyn LivenessProbe>,
    pub statistics: Arc<RunStatistics>,
    pub ou_filter: Option<String>,
    pub exclude_dc: bool,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<Result<()>>>,
}

impl WorkerPool {
    /// Spawns `count` named workers over the shared input and output ends.
    pub fn spawn(
        count: usize,
        input: Receiver<DirectoryRecord>,
        output: Sender<OutputEdge>,
        shared: WorkerShared,
    ) -> Result<WorkerPool> {
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let shared = shared.clone();
            let input = input.clone();
            let output = output.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{}", index))
                .spawn(move || worker_loop(shared, input, output))
                .with_context(|| format!("Failed to spawn worker {}", index))?;
            handles.push(handle);
        }
        Ok(WorkerPool { handles })
    }

    /// Blocks until every worker has drained the input queue. Workers are
    /// not cancelled on failure; the first error surfaces after all of
    /// them finish.
    pub fn join(self) -> Result<()> {
        let mut first_error = None;
        for handle in self.handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                Err(_) => {
                    if first_error.is_none() {
                        first_error = Some(anyhow!("Worker thread panicked"));
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn worker_loop(
    shared: WorkerShared,
    input: Receiver<DirectoryRecord>,
    output: Sender<OutputEdge>,
) -> Result<()> {
    let ctx = EntryContext {
        method: shared.method,
        domain: &shared.domain,
        domain_sid: shared.domain_sid.as_deref(),
        collectors: shared.collectors.as_ref(),
        probe: shared.probe.as_ref(),
        statistics: shared.statistics.as_ref(),
        ou_filter: shared.ou_filter.as_deref(),
        exclude_dc: shared.exclude_dc,
    };
    for record in input.iter() {
        match shared.directory.resolve(&record) {
            Some(entity) => {
                // A closed output channel means the sink already stopped;
                // its error surfaces when the sink thread is joined.
                let mut emit = |edge| {
                    let _ = output.send(edge);
                };
                process_entry(&ctx, &record, &entity, &mut emit)?;
            }
            None => debug!(
                "Skipping unresolvable object {}",
                record.distinguished_name
            ),
        }
        shared.statistics.entry_processed();
    }
    Ok(())
}
