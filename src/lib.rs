//! # adgraph-collector
//!
//! A multi-threaded Active Directory relationship collector written in Rust.
//!
//! ## Overview
//!
//! adgraph-collector walks a directory snapshot and the hosts it describes,
//! emitting the relationship edges an attack-path graph is built from: group
//! memberships, account properties, interactive and network sessions, local
//! administrator rights, policy-pushed administrator rights, discretionary
//! ACL grants, and inter-domain trusts.
//!
//! ## Features
//!
//! - **Method-keyed collection**: one switch selects which edge families a
//!   run gathers, from attribute-only sweeps to full host contact
//! - **Bounded pipeline**: a directory search streams entries into a bounded
//!   queue drained by a worker pool; a dedicated sink thread serializes all
//!   output
//! - **Live host enumeration**: session, logon, and local group collection
//!   against each reachable computer, with per-host timeouts
//! - **Stealth strategy**: a single-threaded pass that touches only
//!   high-traffic hosts inferred from user path attributes
//! - **Session looping**: periodic re-collection of volatile session data
//!   until a deadline
//! - **File or remote output**: per-edge-kind CSV files, or batched JSON to
//!   a REST endpoint
//!
//! ## Usage
//!
//! ### Basic Collection
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//!
//! use adgraph_collector::collectors::CollectorSet;
//! use adgraph_collector::directory::{DirectoryContext, SnapshotDirectory};
//! use adgraph_collector::enumeration::CollectionDispatcher;
//! use adgraph_collector::models::CollectionMethod;
//! use adgraph_collector::options::EnumerationOptions;
//! use adgraph_collector::probe::TcpProbe;
//! use adgraph_collector::trusts::TrustGraphBuilder;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Load the directory snapshot
//! let snapshot = SnapshotDirectory::load(Path::new("directory.json"))?;
//! let directory = DirectoryContext::new(
//!     Box::new(snapshot.clone()),
//!     Box::new(snapshot.clone()),
//!     Box::new(snapshot),
//! );
//!
//! // Run the default sweep into ./output
//! let options =
//!     EnumerationOptions::to_directory(CollectionMethod::Default, PathBuf::from("output"));
//! let dispatcher = CollectionDispatcher::new(
//!     directory,
//!     CollectorSet::live(),
//!     Box::new(TcpProbe::new()),
//!     TrustGraphBuilder::new(),
//!     options,
//! );
//! dispatcher.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Core data models shared across the pipeline
//! - [`directory`]: Directory search, entity resolution, and domain listing
//! - [`collectors`]: Edge collection implementations
//! - [`probe`]: Host liveness probing
//! - [`trusts`]: Trust attribute decoding and trust edge construction
//! - [`sinks`]: File and remote output sinks
//! - [`enumeration`]: The worker pool, dispatch table, and run orchestration
//! - [`options`]: Validated run options
//! - [`windows`]: Platform boundary for session, logon, and group APIs
//! - [`constants`]: Application-wide constants
//!
//! ## Safety
//!
//! This crate uses `unsafe` code only inside the [`windows`] platform
//! boundary, where NetAPI and registry calls hand back buffers that must be
//! read and freed by hand. Off Windows those modules compile to fakes and
//! the crate contains no `unsafe` at all.

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models shared across the pipeline
pub mod models;

/// Platform boundary for session, logon, and group enumeration APIs
pub mod windows;

/// Directory search, entity resolution, and domain listing
pub mod directory;

/// Edge collection implementations
pub mod collectors;

/// Host liveness probing
pub mod probe;

/// Trust attribute decoding and trust edge construction
pub mod trusts;

/// File and remote output sinks
pub mod sinks;

/// The worker pool, dispatch table, and run orchestration
pub mod enumeration;

/// Validated run options
pub mod options;

/// Application constants and tuning values
pub mod constants;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
