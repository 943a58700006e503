use std::{collections::VecDeque, fmt, str::FromStr};

use chrono::{DateTime, Local};
use tracing::trace;

use crate::constants::{MAX_SAMPLES, TIME_LABEL_FORMAT};
use crate::error::{ConsoleError, Result};
use crate::sampler::TickSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesId {
    Latency,
    Throughput,
    Requests,
}

impl SeriesId {
    pub const ALL: [SeriesId; 3] = [SeriesId::Latency, SeriesId::Throughput, SeriesId::Requests];

    pub fn name(self) -> &'static str {
        match self {
            SeriesId::Latency => "latency",
            SeriesId::Throughput => "throughput",
            SeriesId::Requests => "requests",
        }
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SeriesId {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        SeriesId::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConsoleError::UnknownSeries(s.to_string()))
    }
}

pub trait Timestamped {
    fn at(&self) -> DateTime<Local>;

    fn time_label(&self) -> String {
        self.at().format(TIME_LABEL_FORMAT).to_string()
    }
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySample {
    pub at: DateTime<Local>,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Generated tokens per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    pub at: DateTime<Local>,
    pub tokens: f64,
}

/// Requests per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestSample {
    pub at: DateTime<Local>,
    pub requests: f64,
}

impl Timestamped for LatencySample {
    fn at(&self) -> DateTime<Local> {
        self.at
    }
}

impl Timestamped for ThroughputSample {
    fn at(&self) -> DateTime<Local> {
        self.at
    }
}

impl Timestamped for RequestSample {
    fn at(&self) -> DateTime<Local> {
        self.at
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Latency(LatencySample),
    Throughput(ThroughputSample),
    Requests(RequestSample),
}

impl Sample {
    pub fn series(&self) -> SeriesId {
        match self {
            Sample::Latency(_) => SeriesId::Latency,
            Sample::Throughput(_) => SeriesId::Throughput,
            Sample::Requests(_) => SeriesId::Requests,
        }
    }
}

/// Fixed-capacity FIFO window. The oldest sample is evicted once a push
/// would take the length past capacity.
#[derive(Debug, Clone)]
pub struct Series<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T> Series<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Appends `sample`, returning the evicted one if the window was full.
    pub fn push(&mut self, sample: T) -> Option<T> {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.samples.iter()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.samples.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&T> {
        self.samples.back()
    }
}

/// Borrowed view of whichever series an append went to.
#[derive(Debug, Clone, Copy)]
pub enum SeriesView<'a> {
    Latency(&'a Series<LatencySample>),
    Throughput(&'a Series<ThroughputSample>),
    Requests(&'a Series<RequestSample>),
}

impl SeriesView<'_> {
    pub fn id(&self) -> SeriesId {
        match self {
            SeriesView::Latency(_) => SeriesId::Latency,
            SeriesView::Throughput(_) => SeriesId::Throughput,
            SeriesView::Requests(_) => SeriesId::Requests,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeriesView::Latency(s) => s.len(),
            SeriesView::Throughput(s) => s.len(),
            SeriesView::Requests(s) => s.len(),
        }
    }
}

/// Owns the three telemetry series. They only ever grow together through
/// `push_tick`, so indices line up across series.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    latency: Series<LatencySample>,
    throughput: Series<ThroughputSample>,
    requests: Series<RequestSample>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SAMPLES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            latency: Series::new(capacity),
            throughput: Series::new(capacity),
            requests: Series::new(capacity),
        }
    }

    pub fn append(&mut self, id: SeriesId, sample: Sample) -> Result<SeriesView<'_>> {
        let evicted = match (id, sample) {
            (SeriesId::Latency, Sample::Latency(s)) => self.latency.push(s).is_some(),
            (SeriesId::Throughput, Sample::Throughput(s)) => self.throughput.push(s).is_some(),
            (SeriesId::Requests, Sample::Requests(s)) => self.requests.push(s).is_some(),
            (series, sample) => {
                return Err(ConsoleError::SeriesMismatch {
                    series,
                    sample: sample.series(),
                })
            }
        };
        if evicted {
            trace!(series = %id, "evicted oldest sample");
        }
        Ok(self.view(id))
    }

    pub fn push_tick(&mut self, tick: TickSample) -> Result<()> {
        for sample in [
            Sample::Latency(tick.latency),
            Sample::Throughput(tick.throughput),
            Sample::Requests(tick.requests),
        ] {
            let view = self.append(sample.series(), sample)?;
            trace!(series = %view.id(), len = view.len(), "appended");
        }
        Ok(())
    }

    pub fn view(&self, id: SeriesId) -> SeriesView<'_> {
        match id {
            SeriesId::Latency => SeriesView::Latency(&self.latency),
            SeriesId::Throughput => SeriesView::Throughput(&self.throughput),
            SeriesId::Requests => SeriesView::Requests(&self.requests),
        }
    }

    pub fn latency(&self) -> &Series<LatencySample> {
        &self.latency
    }

    pub fn throughput(&self) -> &Series<ThroughputSample> {
        &self.throughput
    }

    pub fn requests(&self) -> &Series<RequestSample> {
        &self.requests
    }
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn throughput_at(base: DateTime<Local>, secs: i64, tokens: f64) -> Sample {
        Sample::Throughput(ThroughputSample {
            at: base + Duration::seconds(secs),
            tokens,
        })
    }

    #[test]
    fn series_evicts_front_once_full() {
        let mut series = Series::new(3);
        assert_eq!(series.push(1), None);
        assert_eq!(series.push(2), None);
        assert_eq!(series.push(3), None);
        assert_eq!(series.push(4), Some(1));
        assert_eq!(series.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn append_past_capacity_shifts_window() {
        let base = Local::now();
        let mut store = SeriesStore::new();
        for i in 0..MAX_SAMPLES as i64 {
            store
                .append(SeriesId::Throughput, throughput_at(base, i, i as f64))
                .unwrap();
        }
        let second = *store.throughput().get(1).unwrap();

        let view = store
            .append(SeriesId::Throughput, throughput_at(base, 99, 99.0))
            .unwrap();
        assert_eq!(view.id(), SeriesId::Throughput);
        assert_eq!(view.len(), MAX_SAMPLES);

        let series = store.throughput();
        assert_eq!(series.first(), Some(&second));
        assert!(series.iter().all(|s| s.tokens != 0.0));
        assert_eq!(series.last().map(|s| s.tokens), Some(99.0));
    }

    #[test]
    fn append_rejects_mismatched_sample() {
        let mut store = SeriesStore::new();
        let err = store
            .append(SeriesId::Latency, throughput_at(Local::now(), 0, 1.0))
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(store.latency().is_empty());
        assert!(store.throughput().is_empty());
    }

    #[test]
    fn series_id_parses_known_names_only() {
        assert_eq!("latency".parse::<SeriesId>().unwrap(), SeriesId::Latency);
        assert_eq!(" Requests ".parse::<SeriesId>().unwrap(), SeriesId::Requests);
        let err = "memory".parse::<SeriesId>().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn time_label_uses_clock_format() {
        let at = Local::now();
        let sample = RequestSample { at, requests: 1.0 };
        assert_eq!(sample.time_label(), at.format("%H:%M:%S").to_string());
    }

    proptest! {
        #[test]
        fn length_never_exceeds_capacity(pushes in 0usize..80, capacity in 1usize..30) {
            let mut series = Series::new(capacity);
            for i in 0..pushes {
                series.push(i);
                prop_assert!(series.len() <= capacity);
            }
            prop_assert_eq!(series.len(), pushes.min(capacity));
            if pushes > 0 {
                prop_assert_eq!(series.last().copied(), Some(pushes - 1));
                prop_assert_eq!(series.first().copied(), Some(pushes.saturating_sub(capacity)));
            }
        }
    }
}
