//! Immutable run options, resolved from the command line before anything
//! else starts.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::constants::{DEFAULT_LOOP_INTERVAL_MINS, DEFAULT_STATUS_INTERVAL_MS};
use crate::models::CollectionMethod;

/// Where collected edges go.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// Append delimited files under this directory.
    Directory(PathBuf),
    /// Stream statement batches to a remote endpoint.
    Remote {
        url: String,
        username: String,
        password: String,
    },
}

#[derive(Debug, Clone)]
pub struct EnumerationOptions {
    pub method: CollectionMethod,
    /// Worker count for the pooled strategy.
    pub threads: usize,
    /// Restricts the run to one domain instead of every known domain.
    pub domain: Option<String>,
    /// Subtree the computer-centric methods narrow their searches to.
    pub ou: Option<String>,
    pub exclude_dc: bool,
    /// Selects the direct strategy.
    pub stealth: bool,
    pub status_interval: Duration,
    pub loop_interval: Duration,
    /// Absolute end of session looping; `None` loops until terminated.
    pub loop_end: Option<DateTime<Local>>,
    pub target: OutputTarget,
}

impl EnumerationOptions {
    /// Baseline options for one method writing into a directory. Callers
    /// adjust fields from here; the command line layer builds the full
    /// struct itself.
    pub fn to_directory(method: CollectionMethod, directory: PathBuf) -> Self {
        EnumerationOptions {
            method,
            threads: 1,
            domain: None,
            ou: None,
            exclude_dc: false,
            stealth: false,
            status_interval: Duration::from_millis(DEFAULT_STATUS_INTERVAL_MS),
            loop_interval: Duration::from_secs(DEFAULT_LOOP_INTERVAL_MINS * 60),
            loop_end: None,
            target: OutputTarget::Directory(directory),
        }
    }
}
