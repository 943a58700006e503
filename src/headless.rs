use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{info, warn};

use crate::app::App;
use crate::error;
use crate::sampler::TickSample;
use crate::series::Timestamped;
use crate::util::{format_ms, format_rps, format_tokens_per_sec};

// upper bound on one sleep so Ctrl-C is noticed promptly
const MAX_SLEEP: Duration = Duration::from_millis(100);

pub fn shutdown_flag() -> anyhow::Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;
    Ok(running)
}

pub fn format_tick(tick: &TickSample) -> String {
    format!(
        "{}  p50 {:>9}  p95 {:>9}  p99 {:>9}  {:>13}  {:>10}",
        tick.latency.time_label(),
        format_ms(tick.latency.p50),
        format_ms(tick.latency.p95),
        format_ms(tick.latency.p99),
        format_tokens_per_sec(tick.throughput.tokens),
        format_rps(tick.requests.requests),
    )
}

/// Sleep before the next attempt: none after a sample, up to the deadline
/// while waiting, a full slice after a failure.
fn pause_after(
    outcome: &error::Result<Option<TickSample>>,
    until_due: Option<Duration>,
) -> Option<Duration> {
    match outcome {
        Ok(Some(_)) => None,
        Ok(None) => Some(until_due.unwrap_or(MAX_SLEEP).min(MAX_SLEEP)),
        Err(_) => Some(MAX_SLEEP),
    }
}

/// Runs the sampling loop without a terminal UI, writing one line per tick
/// until `max_ticks` samples were produced or `running` is cleared.
pub fn run(
    mut app: App,
    max_ticks: Option<u64>,
    running: &AtomicBool,
    out: &mut impl Write,
) -> io::Result<App> {
    app.start(Instant::now());

    while running.load(Ordering::SeqCst) {
        if max_ticks.is_some_and(|max| app.driver.ticks() >= max) {
            break;
        }
        let now = Instant::now();
        let outcome = app.on_tick(now);
        match &outcome {
            Ok(Some(tick)) => writeln!(out, "{}", format_tick(tick))?,
            Ok(None) => {}
            Err(err) => warn!(%err, invalid_argument = err.is_invalid_argument(), "tick failed"),
        }
        if let Some(wait) = pause_after(&outcome, app.driver.timeout(now)) {
            thread::sleep(wait);
        }
    }

    app.shutdown();
    info!(ticks = app.driver.ticks(), "headless run finished");
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ConsoleError;

    #[test]
    fn stops_after_requested_ticks() {
        let config = Config {
            tick_rate_ms: 5,
            seed: Some(1),
            ..Config::default()
        };
        let running = AtomicBool::new(true);
        let mut out = Vec::new();

        let app = run(App::new(&config), Some(3), &running, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().all(|l| l.contains("tok/s") && l.contains("req/s")));
        assert_eq!(app.store.latency().len(), 3);
        assert!(!app.driver.is_running());
    }

    #[test]
    fn failed_tick_backs_off() {
        let failed: error::Result<Option<TickSample>> =
            Err(ConsoleError::UnknownSeries("gpu".to_string()));
        assert_eq!(pause_after(&failed, Some(Duration::ZERO)), Some(MAX_SLEEP));
        assert_eq!(pause_after(&failed, None), Some(MAX_SLEEP));

        assert_eq!(pause_after(&Ok(None), Some(Duration::from_millis(30))), Some(Duration::from_millis(30)));
        assert_eq!(pause_after(&Ok(None), Some(Duration::from_secs(5))), Some(MAX_SLEEP));
    }

    #[test]
    fn cleared_flag_stops_immediately() {
        let running = AtomicBool::new(false);
        let mut out = Vec::new();
        let app = run(App::new(&Config::default()), None, &running, &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(app.driver.ticks(), 0);
    }
}
