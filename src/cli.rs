use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Local;
use clap::Parser;

use crate::constants::{DEFAULT_LOOP_INTERVAL_MINS, DEFAULT_STATUS_INTERVAL_MS};
use crate::models::CollectionMethod;
use crate::options::{EnumerationOptions, OutputTarget};

/// Command-line arguments for the collector.
///
/// Options fall into four groups: what to collect (method, domain, OU
/// narrowing), how to collect it (workers, stealth, DC exclusion, loop
/// timing), where the directory data comes from (snapshot file), and where
/// the edges go (output directory or remote endpoint).
#[derive(Parser, Debug)]
#[clap(
    name = "adgraph-collector",
    about = "Active Directory relationship and trust edge collector"
)]
pub struct Args {
    /// Collection method to run (default: the combined default sweep)
    #[clap(short, long, value_enum)]
    pub method: Option<CollectionMethod>,

    /// Path to the directory snapshot file
    #[clap(short, long)]
    pub snapshot: PathBuf,

    /// Number of enumeration workers (default: logical CPU count)
    #[clap(short, long)]
    pub threads: Option<usize>,

    /// Restrict enumeration to a single domain
    #[clap(short, long)]
    pub domain: Option<String>,

    /// Narrow computer-centric collection to this OU subtree
    #[clap(long)]
    pub ou: Option<String>,

    /// Skip session collection on domain controllers
    #[clap(long)]
    pub exclude_dc: bool,

    /// Single-threaded low-noise strategy against high-traffic hosts only
    #[clap(long)]
    pub stealth: bool,

    /// Milliseconds between status reports
    #[clap(long, default_value_t = DEFAULT_STATUS_INTERVAL_MS)]
    pub status_interval: u64,

    /// Minutes between session-loop passes
    #[clap(long, default_value_t = DEFAULT_LOOP_INTERVAL_MINS)]
    pub loop_time: u64,

    /// Stop session looping this many minutes after startup
    #[clap(long)]
    pub max_loop_time: Option<u64>,

    /// Directory the edge files are written to
    #[clap(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Remote endpoint URI; replaces file output when set
    #[clap(long)]
    pub uri: Option<String>,

    /// Remote endpoint user name
    #[clap(long)]
    pub user: Option<String>,

    /// Remote endpoint password
    #[clap(long)]
    pub pass: Option<String>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validates the raw arguments into the immutable run options.
    pub fn to_options(&self) -> Result<EnumerationOptions> {
        let target = match &self.uri {
            Some(uri) => match (&self.user, &self.pass) {
                (Some(user), Some(pass)) => OutputTarget::Remote {
                    url: uri.clone(),
                    username: user.clone(),
                    password: pass.clone(),
                },
                _ => bail!("--uri requires both --user and --pass"),
            },
            None => OutputTarget::Directory(self.output.clone()),
        };

        let loop_end = self
            .max_loop_time
            .map(|minutes| Local::now() + chrono::Duration::minutes(minutes as i64));

        Ok(EnumerationOptions {
            method: self.method.unwrap_or(CollectionMethod::Default),
            threads: self.threads.unwrap_or_else(num_cpus::get).max(1),
            domain: self.domain.clone(),
            ou: self.ou.clone(),
            exclude_dc: self.exclude_dc,
            stealth: self.stealth,
            status_interval: Duration::from_millis(self.status_interval),
            loop_interval: Duration::from_secs(self.loop_time * 60),
            loop_end,
            target,
        })
    }
}
