//! Periodic progress reporting for long enumeration runs.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use log::{info, warn};
use sysinfo::{Pid, ProcessExt, System, SystemExt};

use crate::enumeration::statistics::RunStatistics;

/// Background timer that logs a progress line at a fixed interval. The
/// interval restarts after each report, and `finish` always emits one
/// last report so short runs still produce a final count.
pub struct StatusReporter {
    stop_tx: Sender<()>,
    handle: JoinHandle<ReporterState>,
}

impl StatusReporter {
    pub fn start(interval: Duration, statistics: Arc<RunStatistics>) -> Result<StatusReporter> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let mut state = ReporterState::new(statistics);
        let handle = thread::Builder::new()
            .name("status-reporter".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => state.report(),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                state
            })
            .context("Failed to spawn status reporter thread")?;
        Ok(StatusReporter { stop_tx, handle })
    }

    /// Stops the timer and emits the final report.
    pub fn finish(self) {
        drop(self.stop_tx);
        match self.handle.join() {
            Ok(mut state) => state.report(),
            Err(_) => warn!("Status reporter thread panicked"),
        }
    }
}

struct ReporterState {
    statistics: Arc<RunStatistics>,
    started: Instant,
    last_count: usize,
    system: System,
    pid: Option<Pid>,
}

impl ReporterState {
    fn new(statistics: Arc<RunStatistics>) -> ReporterState {
        ReporterState {
            statistics,
            started: Instant::now(),
            last_count: 0,
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    fn report(&mut self) {
        let count = self.statistics.processed();
        let delta = count.saturating_sub(self.last_count);
        self.last_count = count;
        let rate = count as u64 / self.started.elapsed().as_secs().max(1);
        info!("{}", format_status(count, delta, rate, self.memory_mb()));
    }

    fn memory_mb(&mut self) -> u64 {
        match self.pid {
            Some(pid) => {
                self.system.refresh_process(pid);
                self.system
                    .process(pid)
                    .map(|process| process.memory() / 1024 / 1024)
                    .unwrap_or(0)
            }
            None => 0,
        }
    }
}

fn format_status(count: usize, delta: usize, rate: u64, memory_mb: u64) -> String {
    format!(
        "Status: {} objects enumerated (+{} {}/s, {} MB RAM in use)",
        count, delta, rate, memory_mb
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_status_line() {
        assert_eq!(
            format_status(1203, 203, 40, 18),
            "Status: 1203 objects enumerated (+203 40/s, 18 MB RAM in use)"
        );
    }

    #[test]
    fn test_reporter_stops_on_finish() {
        let statistics = Arc::new(RunStatistics::new());
        let reporter =
            StatusReporter::start(Duration::from_millis(10), statistics.clone()).expect("start");
        for _ in 0..5 {
            statistics.entry_processed();
        }
        thread::sleep(Duration::from_millis(35));
        reporter.finish();
        assert_eq!(statistics.processed(), 5);
    }

    #[test]
    fn test_delta_tracks_growth_between_reports() {
        let statistics = Arc::new(RunStatistics::new());
        let mut state = ReporterState::new(statistics.clone());
        statistics.entry_processed();
        statistics.entry_processed();
        state.report();
        assert_eq!(state.last_count, 2);

        statistics.entry_processed();
        state.report();
        assert_eq!(state.last_count, 3);
    }
}
