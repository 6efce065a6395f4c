//! The concurrent collection pipeline.
//!
//! A run walks each domain in turn. Per domain, the dispatcher streams
//! directory records into a bounded queue, a pool of named workers applies
//! the method's per-entry steps, and every produced edge flows through an
//! unbounded queue into the single sink thread:
//!
//! ```text
//! search ──▶ input queue ──▶ worker-0..N ──▶ output queue ──▶ output-sink
//!                                 │
//!                                 └── RunStatistics ◀── status-reporter
//! ```
//!
//! The domain only completes once the workers have joined, the ACL
//! accumulator has drained, and the sink has finished.

/// Per-entry step table keyed by collection method.
pub mod dispatch;
/// Per-domain orchestration and strategy selection.
pub mod dispatcher;
/// Pass repetition for the session-loop method.
pub mod looper;
/// Shared atomic counters.
pub mod statistics;
/// Periodic progress reporting.
pub mod status;
/// The named worker pool.
pub mod workers;

pub use dispatch::{process_entry, EntryContext};
pub use dispatcher::CollectionDispatcher;
pub use looper::run_collection_loop;
pub use statistics::RunStatistics;
pub use status::StatusReporter;
pub use workers::{WorkerPool, WorkerShared};
