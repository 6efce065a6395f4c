//! Output sinks and the consumer thread that drives them.
//!
//! Exactly one sink is active per run. Workers push edges into an
//! unbounded channel; the sink thread drains it and the sink's `finish`
//! runs after the channel closes, so nothing received is left unwritten.

use anyhow::{Context, Result};
use crossbeam::channel::Receiver;
use std::thread::{self, JoinHandle};

use crate::models::OutputEdge;

/// File-backed edge output
pub mod file;

/// Batched statement submission to a remote endpoint
pub mod rest;

pub use file::FileSink;
pub use rest::{HttpTransport, RestSink, RestTransport};

/// Common sink contract. `receive` only mutates internal accumulators;
/// `finish` flushes and releases everything.
pub trait OutputSink: Send {
    fn receive(&mut self, edge: OutputEdge) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Starts the sink consumer thread. The join result is the sink's overall
/// outcome; a sink error ends consumption immediately and surfaces there.
pub fn spawn_sink(
    mut sink: Box<dyn OutputSink>,
    rx: Receiver<OutputEdge>,
) -> Result<JoinHandle<Result<()>>> {
    let handle = thread::Builder::new()
        .name("output-sink".to_string())
        .spawn(move || {
            for edge in rx.iter() {
                sink.receive(edge)?;
            }
            sink.finish()
        })
        .context("Failed to spawn output sink thread")?;
    Ok(handle)
}
