//! The adjustment loop: collect metrics, evaluate, hand deltas to handlers.

use std::sync::{Arc, Mutex};

use crate::channel::{Channel, ChannelRegistry};
use crate::constants::DEFAULT_EVALUATION_INTERVAL;
use crate::engine::{DecisionEngine, Metrics};
use crate::events::{RuleBroadcast, RuleSink, SubscriberId};

/// Consumer of engine output. Missing keys in `deltas` mean "no change".
pub trait AdjustmentHandler {
    fn apply_adjustments(&mut self, deltas: &Metrics);
}

impl<H: AdjustmentHandler> AdjustmentHandler for Arc<Mutex<H>> {
    fn apply_adjustments(&mut self, deltas: &Metrics) {
        if let Ok(mut handler) = self.lock() {
            handler.apply_adjustments(deltas);
        }
    }
}

/// Everything produced by one evaluation cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub time: f64,
    pub raw: Metrics,
    pub normalized: Metrics,
    pub deltas: Metrics,
}

type PostEvaluationHook = Box<dyn FnMut(&Evaluation) + Send>;

/// Drives an engine from registered channels on a fixed interval.
///
/// An interval of 0 evaluates on every tick. Otherwise a tick evaluates only
/// once `now` reaches the due time set by the previous evaluation.
pub struct Controller {
    engine: Box<dyn DecisionEngine>,
    registry: ChannelRegistry,
    handlers: Vec<Box<dyn AdjustmentHandler + Send>>,
    rule_sinks: RuleBroadcast<'static>,
    post_evaluation: Vec<PostEvaluationHook>,
    interval: f64,
    next_due: f64,
}

impl Controller {
    pub fn new(engine: impl DecisionEngine + 'static) -> Self {
        Self::from_boxed(Box::new(engine))
    }

    pub fn from_boxed(engine: Box<dyn DecisionEngine>) -> Self {
        Self {
            engine,
            registry: ChannelRegistry::new(),
            handlers: Vec::new(),
            rule_sinks: RuleBroadcast::new(),
            post_evaluation: Vec::new(),
            interval: DEFAULT_EVALUATION_INTERVAL,
            next_due: f64::NEG_INFINITY,
        }
    }

    /// Seconds between evaluations. Negative values are treated as 0.
    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.interval = seconds.max(0.0);
        self
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn engine(&self) -> &dyn DecisionEngine {
        self.engine.as_ref()
    }

    pub fn add_channel(&mut self, channel: impl Channel + Send + 'static) {
        self.registry.register(channel);
    }

    pub fn add_handler(&mut self, handler: impl AdjustmentHandler + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn subscribe_rules(&mut self, sink: impl RuleSink + Send + 'static) -> SubscriberId {
        self.rule_sinks.subscribe(sink)
    }

    pub fn unsubscribe_rules(&mut self, id: SubscriberId) -> bool {
        self.rule_sinks.unsubscribe(id)
    }

    /// Called with every evaluation, before handlers run.
    pub fn on_post_evaluation(&mut self, hook: impl FnMut(&Evaluation) + Send + 'static) {
        self.post_evaluation.push(Box::new(hook));
    }

    /// Advance to `now` (seconds). Evaluates if due and returns the cycle.
    pub fn tick(&mut self, now: f64) -> Option<Evaluation> {
        if self.interval > 0.0 && now < self.next_due {
            return None;
        }
        self.next_due = now + self.interval;
        Some(self.evaluate_now(now))
    }

    /// Run one cycle regardless of the interval.
    pub fn evaluate_now(&mut self, now: f64) -> Evaluation {
        let snapshot = self.registry.collect();
        let deltas = self
            .engine
            .evaluate_observed(&snapshot.normalized, &mut self.rule_sinks);

        tracing::debug!(
            time = now,
            metrics = snapshot.normalized.len(),
            deltas = deltas.len(),
            "evaluation cycle"
        );

        let evaluation = Evaluation {
            time: now,
            raw: snapshot.raw,
            normalized: snapshot.normalized,
            deltas,
        };

        for hook in &mut self.post_evaluation {
            hook(&evaluation);
        }
        for handler in &mut self.handlers {
            handler.apply_adjustments(&evaluation.deltas);
        }

        evaluation
    }
}
