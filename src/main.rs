use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod cli;
mod models;
mod windows;
mod directory;
mod collectors;
mod probe;
mod trusts;
mod sinks;
mod enumeration;
mod options;
mod constants;

#[cfg(test)]
mod test_utils;

use cli::Args;
use collectors::CollectorSet;
use directory::{DirectoryContext, SnapshotDirectory};
use enumeration::CollectionDispatcher;
use options::{EnumerationOptions, OutputTarget};
use probe::TcpProbe;
use trusts::TrustGraphBuilder;

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.verbose)?;

    let options = args.to_options()?;
    log_run_banner(&options)?;

    let directory = load_directory(&args)?;
    let dispatcher = CollectionDispatcher::new(
        directory,
        CollectorSet::live(),
        Box::new(TcpProbe::new()),
        TrustGraphBuilder::new(),
        options,
    );
    dispatcher.run()?;

    info!("Collection completed successfully");
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Log what this run is going to do before any directory work starts
fn log_run_banner(options: &EnumerationOptions) -> Result<()> {
    let hostname = hostname::get()
        .map_err(|e| anyhow!("Failed to get hostname: {}", e))?
        .to_string_lossy()
        .to_string();

    info!(
        "adgraph-collector {} starting on {}",
        env!("CARGO_PKG_VERSION"),
        hostname
    );

    let target = match &options.target {
        OutputTarget::Directory(path) => format!("directory {}", path.display()),
        OutputTarget::Remote { url, .. } => format!("endpoint {}", url),
    };
    if options.stealth {
        info!("Method: {} (stealth), output: {}", options.method, target);
    } else {
        info!(
            "Method: {}, workers: {}, output: {}",
            options.method, options.threads, target
        );
    }
    Ok(())
}

/// Load the snapshot and wire it in as all three directory collaborators
fn load_directory(args: &Args) -> Result<DirectoryContext> {
    let snapshot = SnapshotDirectory::load(&args.snapshot)?;
    Ok(DirectoryContext::new(
        Box::new(snapshot.clone()),
        Box::new(snapshot.clone()),
        Box::new(snapshot),
    ))
}
