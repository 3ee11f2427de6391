//! Runtime monitoring: bounded metric time series with a flow band, a
//! sampling monitor feeding them, and a rule coverage tracker.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::constants::{
    DEFAULT_FLOW_LOWER, DEFAULT_FLOW_UPPER, DEFAULT_MAX_SAMPLES, DEFAULT_SAMPLING_INTERVAL,
    MIN_SAMPLES,
};
use crate::engine::Metrics;
use crate::events::{RuleFired, RuleSink};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

/// Time series for one normalized metric. Keeps at most `max_samples`,
/// dropping the oldest first.
#[derive(Clone, Debug)]
pub struct MetricSeries {
    pub metric: String,
    /// Inclusive flow band in [0, 1].
    pub lower: f64,
    pub upper: f64,
    max_samples: usize,
    samples: VecDeque<Sample>,
}

impl MetricSeries {
    pub fn new(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
            lower: DEFAULT_FLOW_LOWER,
            upper: DEFAULT_FLOW_UPPER,
            max_samples: DEFAULT_MAX_SAMPLES,
            samples: VecDeque::new(),
        }
    }

    pub fn with_band(mut self, lower: f64, upper: f64) -> Self {
        self.lower = lower.clamp(0.0, 1.0);
        self.upper = upper.clamp(0.0, 1.0);
        self
    }

    /// Capacity, floored at [`MIN_SAMPLES`].
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(MIN_SAMPLES);
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
        self
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn add_sample(&mut self, time: f64, value: f64) {
        self.samples.push_back(Sample { time, value });
        if self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Last value, or 0 when empty.
    pub fn last_value(&self) -> f64 {
        self.samples.back().map_or(0.0, |s| s.value)
    }

    /// Last timestamp, or 0 when empty.
    pub fn last_time(&self) -> f64 {
        self.samples.back().map_or(0.0, |s| s.time)
    }

    /// Share of samples inside `[lower, upper]`, 0 when empty.
    pub fn flow_ratio(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let in_flow = self
            .samples
            .iter()
            .filter(|s| s.value >= self.lower && s.value <= self.upper)
            .count();
        in_flow as f64 / self.samples.len() as f64
    }
}

/// Samples normalized metrics into their series on a fixed interval.
/// Metrics without a series are ignored. An interval of 0 samples every call.
#[derive(Clone, Debug)]
pub struct MetricsMonitor {
    interval: f64,
    next_due: f64,
    series: HashMap<String, MetricSeries>,
}

impl MetricsMonitor {
    /// Series with an empty metric name are skipped; all series start empty.
    pub fn new(series: impl IntoIterator<Item = MetricSeries>) -> Self {
        let series = series
            .into_iter()
            .filter(|s| !s.metric.is_empty())
            .map(|mut s| {
                s.clear();
                (s.metric.clone(), s)
            })
            .collect();
        Self {
            interval: DEFAULT_SAMPLING_INTERVAL,
            next_due: f64::NEG_INFINITY,
            series,
        }
    }

    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.interval = seconds.max(0.0);
        self
    }

    /// Record `normalized` at `now` if a sample is due. Returns whether it
    /// sampled.
    pub fn sample(&mut self, now: f64, normalized: &Metrics) -> bool {
        if self.interval > 0.0 && now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;

        for (name, &value) in normalized {
            if let Some(series) = self.series.get_mut(name) {
                series.add_sample(now, value);
            }
        }
        true
    }

    pub fn series(&self, metric: &str) -> Option<&MetricSeries> {
        self.series.get(metric)
    }

    /// Series sorted by metric name.
    pub fn all_series(&self) -> Vec<&MetricSeries> {
        let mut all: Vec<&MetricSeries> = self.series.values().collect();
        all.sort_by(|a, b| a.metric.cmp(&b.metric));
        all
    }
}

/// Rule coverage per cycle and over the whole run.
///
/// `latest` holds only the activations of the most recent cycle; it is
/// cleared when a new cycle begins. `hits` counts firings across cycles.
#[derive(Clone, Debug, Default)]
pub struct RuleCoverageTracker {
    latest: BTreeMap<usize, f64>,
    hits: BTreeMap<usize, u64>,
    cycles: u64,
}

impl RuleCoverageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_activations(&self) -> &BTreeMap<usize, f64> {
        &self.latest
    }

    pub fn hits(&self, rule: usize) -> u64 {
        self.hits.get(&rule).copied().unwrap_or(0)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Rules in `0..rule_count` that never fired.
    pub fn never_fired(&self, rule_count: usize) -> Vec<usize> {
        (0..rule_count)
            .filter(|r| !self.hits.contains_key(r))
            .collect()
    }
}

impl RuleSink for RuleCoverageTracker {
    fn begin_cycle(&mut self) {
        self.latest.clear();
        self.cycles += 1;
    }

    fn rule_fired(&mut self, event: RuleFired) {
        self.latest.insert(event.rule, event.activation);
        *self.hits.entry(event.rule).or_insert(0) += 1;
    }
}
