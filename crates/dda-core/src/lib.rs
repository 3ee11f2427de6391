//! Dynamic difficulty adjustment engine.
//!
//! Normalized gameplay metrics go in, corrective deltas come out. The core is
//! a Mamdani fuzzy inference engine: triangular/trapezoidal membership,
//! sequential min/max rule chains, max aggregation and 51-point centroid
//! defuzzification. Around it sit the runtime pieces a host needs: metric
//! channels, an interval-driven controller, and monitoring.
//!
//! Zero I/O: configuration loading and persistence live in `dda-store`.

pub mod aggregate;
pub mod channel;
pub mod compiled;
pub mod config;
pub mod constants;
pub mod controller;
pub mod defuzzify;
pub mod engine;
pub mod events;
pub mod membership;
pub mod monitor;
pub mod rules;

pub use aggregate::{Aggregated, Contributions, aggregate};
pub use channel::{Channel, ChannelRegistry, MetricData, MetricSnapshot, normalize};
pub use compiled::{CompiledConfig, SlotRef};
pub use config::{ActionRef, Condition, ConfigIssue, FuzzyConfig, Rule, Term, Variable};
pub use constants::{DEFUZZ_STEPS, EPSILON};
pub use controller::{AdjustmentHandler, Controller, Evaluation};
pub use defuzzify::{defuzzify, defuzzify_terms};
pub use engine::{DecisionEngine, FuzzyEngine, Metrics};
pub use events::{RecordingSink, RuleBroadcast, RuleFired, RuleSink, SubscriberId};
pub use membership::membership;
pub use monitor::{MetricSeries, MetricsMonitor, RuleCoverageTracker, Sample};
pub use rules::{evaluate_rules, rule_activation};
