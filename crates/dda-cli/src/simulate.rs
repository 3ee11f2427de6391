//! Offline run of the adjustment loop against synthetic metrics.
//!
//! Every metric the rules read is driven by a seeded random walk over
//! `[0, 100]`, so a given seed always yields the same session.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use dda_core::constants::{DEFAULT_FLOW_LOWER, DEFAULT_FLOW_UPPER};
use dda_core::{
    AdjustmentHandler, Channel, Controller, FuzzyConfig, FuzzyEngine, MetricData, MetricSeries,
    MetricsMonitor, Metrics, RuleCoverageTracker, RuleFired,
};
use dda_store::{CycleRecord, SessionLog, Settings};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// Simulated clock step per controller tick, in seconds.
pub const TICK_SECONDS: f64 = 0.1;

const WALK_MIN: f64 = 0.0;
const WALK_MAX: f64 = 100.0;
const WALK_STEP: f64 = 8.0;

/// Metrics read by rule conditions, in order of first use.
pub fn input_metrics(config: &FuzzyConfig) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for rule in &config.rules {
        for condition in &rule.conditions {
            if !names.contains(&condition.variable) {
                names.push(condition.variable.clone());
            }
        }
    }
    names
}

pub struct RandomWalk {
    rng: SmallRng,
    levels: Vec<(String, f64)>,
}

impl RandomWalk {
    pub fn new(metrics: &[String], seed: u64) -> Self {
        let mid = (WALK_MIN + WALK_MAX) / 2.0;
        Self {
            rng: SmallRng::seed_from_u64(seed),
            levels: metrics.iter().map(|m| (m.clone(), mid)).collect(),
        }
    }
}

impl Channel for RandomWalk {
    fn metrics(&mut self) -> Vec<MetricData> {
        self.levels
            .iter_mut()
            .map(|(name, level)| {
                let step = self.rng.random_range(-WALK_STEP..=WALK_STEP);
                *level = (*level + step).clamp(WALK_MIN, WALK_MAX);
                MetricData::new(name, *level, WALK_MIN, WALK_MAX)
            })
            .collect()
    }
}

/// Keeps the most recent deltas handed to it.
#[derive(Debug, Default)]
pub struct LatestAdjustments {
    pub applied: u64,
    pub deltas: Metrics,
}

impl AdjustmentHandler for LatestAdjustments {
    fn apply_adjustments(&mut self, deltas: &Metrics) {
        self.applied += 1;
        for (name, value) in deltas {
            self.deltas.insert(name.clone(), *value);
        }
    }
}

pub struct SimOptions {
    pub cycles: u64,
    pub seed: u64,
}

#[derive(Debug)]
pub struct SimulationReport {
    pub cycles: u64,
    pub rule_count: usize,
    pub flow: Vec<(String, f64)>,
    /// (rule index, cycles it fired in)
    pub coverage: Vec<(usize, u64)>,
    pub never_fired: Vec<usize>,
    pub last_deltas: BTreeMap<String, f64>,
}

/// Settings-driven monitor. Without `[[series]]` entries every input
/// metric is watched with the default flow band.
fn build_monitor(settings: &Settings, metrics: &[String]) -> MetricsMonitor {
    if !settings.series.is_empty() {
        return settings.monitor();
    }
    MetricsMonitor::new(metrics.iter().map(|m| {
        MetricSeries::new(m)
            .with_band(DEFAULT_FLOW_LOWER, DEFAULT_FLOW_UPPER)
            .with_max_samples(settings.max_samples)
    }))
    .with_interval(settings.sampling_interval)
}

/// Run `opts.cycles` evaluations. When `log` is given every cycle is
/// recorded under that session.
pub fn run(
    config: FuzzyConfig,
    settings: &Settings,
    opts: &SimOptions,
    log: Option<(&SessionLog, Uuid)>,
) -> Result<SimulationReport> {
    let metrics = input_metrics(&config);
    let rule_count = config.rules.len();
    let mut monitor = build_monitor(settings, &metrics);

    let tracker = Arc::new(Mutex::new(RuleCoverageTracker::new()));
    let adjustments = Arc::new(Mutex::new(LatestAdjustments::default()));

    let mut controller =
        Controller::new(FuzzyEngine::new(config)).with_interval(settings.evaluation_interval);
    controller.add_channel(RandomWalk::new(&metrics, opts.seed));
    controller.add_handler(Arc::clone(&adjustments));
    controller.subscribe_rules(Arc::clone(&tracker));

    tracing::info!(
        cycles = opts.cycles,
        seed = opts.seed,
        metrics = metrics.len(),
        "starting simulation"
    );

    let mut done = 0u64;
    let mut tick = 0u64;
    while done < opts.cycles {
        let now = tick as f64 * TICK_SECONDS;
        tick += 1;
        let Some(evaluation) = controller.tick(now) else {
            continue;
        };
        done += 1;
        monitor.sample(evaluation.time, &evaluation.normalized);

        if let Some((session_log, session)) = log {
            let activations: Vec<RuleFired> = tracker
                .lock()
                .map_err(|_| anyhow!("rule tracker lock poisoned"))?
                .latest_activations()
                .iter()
                .map(|(&rule, &activation)| RuleFired { rule, activation })
                .collect();
            session_log
                .record_cycle(
                    session,
                    &CycleRecord {
                        time: evaluation.time,
                        normalized: &evaluation.normalized,
                        deltas: &evaluation.deltas,
                        activations: &activations,
                    },
                )
                .with_context(|| format!("failed to record cycle {done}"))?;
        }
    }

    let tracker = tracker
        .lock()
        .map_err(|_| anyhow!("rule tracker lock poisoned"))?;
    let adjustments = adjustments
        .lock()
        .map_err(|_| anyhow!("adjustment lock poisoned"))?;
    tracing::debug!(applied = adjustments.applied, "simulation finished");

    Ok(SimulationReport {
        cycles: done,
        rule_count,
        flow: monitor
            .all_series()
            .into_iter()
            .map(|s| (s.metric.clone(), s.flow_ratio()))
            .collect(),
        coverage: (0..rule_count)
            .map(|rule| (rule, tracker.hits(rule)))
            .collect(),
        never_fired: tracker.never_fired(rule_count),
        last_deltas: adjustments
            .deltas
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect(),
    })
}
