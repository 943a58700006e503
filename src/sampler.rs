use std::ops::Range;

use chrono::{DateTime, Local};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::control::ControlState;
use crate::series::{LatencySample, RequestSample, ThroughputSample};

pub const P50_RANGE: Range<f64> = 50.0..80.0;
pub const P95_RANGE: Range<f64> = 120.0..160.0;
pub const P99_RANGE: Range<f64> = 180.0..230.0;
pub const ACTIVE_TOKENS_RANGE: Range<f64> = 800.0..1200.0;
pub const IDLE_TOKENS_RANGE: Range<f64> = 100.0..150.0;
pub const IDLE_REQUESTS_RANGE: Range<f64> = 0.0..2.0;
pub const REQUEST_JITTER: f64 = 5.0;

/// Source of uniform draws in a half-open range.
pub trait UniformSource {
    fn uniform(&mut self, range: Range<f64>) -> f64;
}

/// Production source backed by `rand`.
pub struct RandSource<R = StdRng> {
    rng: R,
}

impl RandSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> UniformSource for RandSource<R> {
    fn uniform(&mut self, range: Range<f64>) -> f64 {
        self.rng.gen_range(range)
    }
}

/// One sample per series, all stamped with the same instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSample {
    pub latency: LatencySample,
    pub throughput: ThroughputSample,
    pub requests: RequestSample,
}

/// Synthesizes the samples for one tick. Draws happen in a fixed order
/// (p50, p95, p99, tokens, requests).
pub fn sample(
    control: &ControlState,
    at: DateTime<Local>,
    source: &mut impl UniformSource,
) -> TickSample {
    let latency = LatencySample {
        at,
        p50: source.uniform(P50_RANGE),
        p95: source.uniform(P95_RANGE),
        p99: source.uniform(P99_RANGE),
    };

    let tokens = if control.is_generating() {
        source.uniform(ACTIVE_TOKENS_RANGE)
    } else {
        source.uniform(IDLE_TOKENS_RANGE)
    };

    let requests = if control.is_generating() {
        let rate = f64::from(control.request_rate());
        source.uniform(rate..rate + REQUEST_JITTER)
    } else {
        source.uniform(IDLE_REQUESTS_RANGE)
    };

    TickSample {
        latency,
        throughput: ThroughputSample { at, tokens },
        requests: RequestSample { at, requests },
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Replays fixed fractions of each requested range, cycling when
    /// exhausted.
    pub struct ScriptedSource {
        fractions: Vec<f64>,
        next: usize,
    }

    impl ScriptedSource {
        pub fn new(fractions: Vec<f64>) -> Self {
            assert!(!fractions.is_empty());
            assert!(fractions.iter().all(|f| (0.0..1.0).contains(f)));
            Self { fractions, next: 0 }
        }
    }

    impl UniformSource for ScriptedSource {
        fn uniform(&mut self, range: Range<f64>) -> f64 {
            let f = self.fractions[self.next % self.fractions.len()];
            self.next += 1;
            range.start + (range.end - range.start) * f
        }
    }
}
