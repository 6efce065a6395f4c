//! Pass repetition for the session-loop method.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local};
use log::info;

/// Repeats `pass` until the optional end time is reached. The end time is
/// checked after each pass and again after each sleep, so an end time
/// already in the past still yields exactly one pass and never sleeps.
/// Without an end time the loop runs until the process is terminated.
pub fn run_collection_loop<F>(
    interval: Duration,
    end: Option<DateTime<Local>>,
    mut pass: F,
) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let started = Instant::now();
    let mut passes = 0usize;
    loop {
        pass()?;
        passes += 1;
        if expired(end) {
            break;
        }
        info!(
            "Pass {} complete; next session sweep in {} minutes",
            passes,
            interval.as_secs() / 60
        );
        thread::sleep(interval);
        if expired(end) {
            break;
        }
    }
    info!(
        "Session loop finished after {} passes in {:.2?}",
        passes,
        started.elapsed()
    );
    Ok(())
}

fn expired(end: Option<DateTime<Local>>) -> bool {
    match end {
        Some(end) => Local::now() >= end,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_past_end_time_runs_exactly_one_pass_without_sleeping() {
        let end = Local::now() - chrono::Duration::minutes(5);
        let mut passes = 0;
        let started = Instant::now();

        run_collection_loop(Duration::from_secs(60), Some(end), || {
            passes += 1;
            Ok(())
        })
        .expect("loop should finish");

        assert_eq!(passes, 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_loop_repeats_until_the_end_time() {
        let end = Local::now() + chrono::Duration::milliseconds(200);
        let mut passes = 0;

        run_collection_loop(Duration::from_millis(10), Some(end), || {
            passes += 1;
            Ok(())
        })
        .expect("loop should finish");

        assert!(passes >= 2, "expected repeated passes, got {}", passes);
    }

    #[test]
    fn test_pass_error_stops_the_loop() {
        let mut passes = 0;
        let result = run_collection_loop(Duration::from_millis(10), None, || {
            passes += 1;
            Err(anyhow!("directory unavailable"))
        });

        assert!(result.is_err());
        assert_eq!(passes, 1);
    }
}
