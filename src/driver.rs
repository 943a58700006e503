use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, trace};

use crate::control::ControlState;
use crate::error::Result;
use crate::sampler::{self, TickSample, UniformSource};
use crate::series::SeriesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Running { next_due: Instant },
}

/// Periodic sampling clock. Owns only the deadline; the control state,
/// store and random source are lent to `fire` for the length of one tick.
#[derive(Debug)]
pub struct TickDriver {
    period: Duration,
    state: DriverState,
    ticks: u64,
    last_stamp: Option<DateTime<Local>>,
}

impl TickDriver {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: DriverState::Stopped,
            ticks: 0,
            last_stamp: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), DriverState::Running { .. })
    }

    /// Ticks fired since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        debug!(period_ms = self.period.as_millis() as u64, "tick driver running");
        self.state = DriverState::Running {
            next_due: now + self.period,
        };
    }

    /// Cancels the clock. Later calls to `fire` produce nothing.
    pub fn stop(&mut self) {
        if self.is_running() {
            debug!(ticks = self.ticks, "tick driver stopped");
        }
        self.state = DriverState::Stopped;
    }

    /// Restarts the period from `now`. Used after a control change so the
    /// next sample is a full period away and reads the new state.
    pub fn rearm(&mut self, now: Instant) {
        if let DriverState::Running { next_due } = &mut self.state {
            *next_due = now + self.period;
            trace!("tick driver re-armed");
        }
    }

    pub fn due(&self, now: Instant) -> bool {
        match self.state {
            DriverState::Running { next_due } => now >= next_due,
            DriverState::Stopped => false,
        }
    }

    /// How long the event loop may block before the next tick is due.
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        match self.state {
            DriverState::Running { next_due } => {
                Some(next_due.checked_duration_since(now).unwrap_or(Duration::ZERO))
            }
            DriverState::Stopped => None,
        }
    }

    /// One tick: read control, sample, append to every series. Missed
    /// periods are not backfilled; the next deadline is a full period
    /// after `now`.
    pub fn fire(
        &mut self,
        now: Instant,
        at: DateTime<Local>,
        control: &ControlState,
        store: &mut SeriesStore,
        source: &mut impl UniformSource,
    ) -> Result<Option<TickSample>> {
        if !self.is_running() {
            return Ok(None);
        }

        // wall clock may step backwards; keep labels ordered
        let at = self.last_stamp.map_or(at, |last| last.max(at));
        let tick = sampler::sample(control, at, source);
        store.push_tick(tick)?;

        self.last_stamp = Some(at);
        self.ticks += 1;
        self.state = DriverState::Running {
            next_due: now + self.period,
        };
        trace!(
            tick = self.ticks,
            p50 = tick.latency.p50,
            tokens = tick.throughput.tokens,
            requests = tick.requests.requests,
            "sampled"
        );
        Ok(Some(tick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_SAMPLES;
    use crate::sampler::testing::ScriptedSource;
    use crate::sampler::{ACTIVE_TOKENS_RANGE, IDLE_TOKENS_RANGE};
    use crate::series::Timestamped;
    use chrono::Duration as ChronoDuration;

    const PERIOD: Duration = Duration::from_millis(1000);

    struct Harness {
        driver: TickDriver,
        control: ControlState,
        store: SeriesStore,
        source: ScriptedSource,
        now: Instant,
        base: DateTime<Local>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                driver: TickDriver::new(PERIOD),
                control: ControlState::default(),
                store: SeriesStore::new(),
                source: ScriptedSource::new(vec![0.1, 0.4, 0.7, 0.9, 0.3]),
                now: Instant::now(),
                base: Local::now(),
            }
        }

        /// Advances one period and fires; tick `n` is stamped base + n seconds.
        fn tick(&mut self) -> Option<TickSample> {
            self.now += PERIOD;
            let at = self.base + ChronoDuration::seconds(self.driver.ticks() as i64 + 1);
            self.driver
                .fire(self.now, at, &self.control, &mut self.store, &mut self.source)
                .unwrap()
        }

        fn lens(&self) -> [usize; 3] {
            [
                self.store.latency().len(),
                self.store.throughput().len(),
                self.store.requests().len(),
            ]
        }
    }

    #[test]
    fn stopped_driver_produces_nothing() {
        let mut h = Harness::new();
        assert_eq!(h.driver.state(), DriverState::Stopped);
        assert!(h.tick().is_none());
        assert_eq!(h.lens(), [0, 0, 0]);
        assert_eq!(h.driver.timeout(h.now), None);
    }

    #[test]
    fn series_stay_aligned_while_running() {
        let mut h = Harness::new();
        h.driver.start(h.now);
        for n in 1..=25usize {
            h.tick().unwrap();
            let expected = n.min(MAX_SAMPLES);
            assert_eq!(h.lens(), [expected; 3]);
        }
        for i in 0..MAX_SAMPLES {
            let at = h.store.latency().get(i).unwrap().at;
            assert_eq!(h.store.throughput().get(i).unwrap().at, at);
            assert_eq!(h.store.requests().get(i).unwrap().at, at);
        }
    }

    #[test]
    fn twenty_one_ticks_evict_the_first() {
        let mut h = Harness::new();
        h.driver.start(h.now);
        for _ in 0..21 {
            h.tick();
        }
        assert_eq!(h.lens(), [20, 20, 20]);
        let second = h.base + ChronoDuration::seconds(2);
        assert_eq!(h.store.latency().first().unwrap().at, second);
        assert_eq!(
            h.store.requests().first().unwrap().time_label(),
            second.format("%H:%M:%S").to_string()
        );
    }

    #[test]
    fn toggle_takes_effect_on_next_tick() {
        let mut h = Harness::new();
        h.driver.start(h.now);
        let idle = h.tick().unwrap();
        assert!(IDLE_TOKENS_RANGE.contains(&idle.throughput.tokens));

        h.control.toggle_generating();
        h.driver.rearm(h.now);
        let active = h.tick().unwrap();
        assert!(ACTIVE_TOKENS_RANGE.contains(&active.throughput.tokens));

        // earlier samples are not recomputed
        assert_eq!(h.store.throughput().first().unwrap().tokens, idle.throughput.tokens);
    }

    #[test]
    fn stop_cancels_future_ticks() {
        let mut h = Harness::new();
        h.driver.start(h.now);
        h.tick();
        h.driver.stop();
        assert!(!h.driver.due(h.now + PERIOD * 5));
        assert!(h.tick().is_none());
        assert_eq!(h.lens(), [1, 1, 1]);
    }

    #[test]
    fn rearm_restarts_period() {
        let mut driver = TickDriver::new(PERIOD);
        let t0 = Instant::now();
        driver.start(t0);
        assert!(!driver.due(t0 + Duration::from_millis(999)));
        assert!(driver.due(t0 + PERIOD));

        let t1 = t0 + Duration::from_millis(600);
        driver.rearm(t1);
        assert!(!driver.due(t0 + PERIOD));
        assert_eq!(driver.timeout(t0 + PERIOD), Some(Duration::from_millis(600)));
        assert!(driver.due(t1 + PERIOD));
    }

    #[test]
    fn late_tick_does_not_backfill() {
        let mut h = Harness::new();
        h.driver.start(h.now);
        h.now += PERIOD * 4;
        assert!(h.driver.due(h.now));
        h.tick();
        assert_eq!(h.lens(), [1, 1, 1]);
        assert!(!h.driver.due(h.now));
    }

    #[test]
    fn backwards_clock_keeps_labels_ordered() {
        let mut h = Harness::new();
        h.driver.start(h.now);
        let later = h.base + ChronoDuration::seconds(10);
        h.driver
            .fire(h.now, later, &h.control, &mut h.store, &mut h.source)
            .unwrap();
        h.driver
            .fire(h.now, h.base, &h.control, &mut h.store, &mut h.source)
            .unwrap();
        assert_eq!(h.store.latency().last().unwrap().at, later);
    }
}
