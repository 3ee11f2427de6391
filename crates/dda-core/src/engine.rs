//! Decision engines: `evaluate(normalized metrics) -> deltas`.
//!
//! [`FuzzyEngine`] runs the full pipeline on each call:
//! fuzzify → rules → aggregate → defuzzify. It keeps no state between calls;
//! every table is allocated fresh, so one engine can serve concurrent
//! callers through a shared reference.

use std::collections::{BTreeMap, HashMap};

use crate::aggregate::aggregate;
use crate::compiled::CompiledConfig;
use crate::config::FuzzyConfig;
use crate::defuzzify::defuzzify_terms;
use crate::events::RuleSink;
use crate::rules::evaluate_rules;

/// Metric or action name → value in [0, 1].
pub type Metrics = HashMap<String, f64>;

/// Capability shared by every decision engine variant.
///
/// Output keys are the adjusted action variables. A missing key means "no
/// change", never zero.
pub trait DecisionEngine: Send + Sync {
    fn evaluate(&self, inputs: &Metrics) -> Metrics;

    /// Like [`evaluate`](Self::evaluate), reporting rule activations to
    /// `sink`. Engines without rules report nothing.
    fn evaluate_observed(&self, inputs: &Metrics, sink: &mut dyn RuleSink) -> Metrics {
        sink.begin_cycle();
        self.evaluate(inputs)
    }
}

/// Mamdani fuzzy engine over a fixed [`FuzzyConfig`].
#[derive(Clone, Debug)]
pub struct FuzzyEngine {
    compiled: CompiledConfig,
}

impl FuzzyEngine {
    pub fn new(config: FuzzyConfig) -> Self {
        let compiled = CompiledConfig::new(config);
        tracing::debug!(
            variables = compiled.config().variables.len(),
            rules = compiled.rules().len(),
            slots = compiled.slot_count(),
            "fuzzy engine ready"
        );
        Self { compiled }
    }

    pub fn config(&self) -> &FuzzyConfig {
        self.compiled.config()
    }

    pub fn compiled(&self) -> &CompiledConfig {
        &self.compiled
    }

    fn infer(&self, inputs: &Metrics, mut sink: Option<&mut dyn RuleSink>) -> Metrics {
        if let Some(sink) = sink.as_deref_mut() {
            sink.begin_cycle();
        }

        let fuzzified = self.compiled.fuzzify(inputs);
        let contributions = evaluate_rules(self.compiled.rules(), &fuzzified, sink);
        let aggregated = aggregate(&contributions);

        // Term activations grouped per output variable, index-aligned with its terms
        let variables = &self.compiled.config().variables;
        let mut alphas: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
        for (slot, activation) in aggregated.iter() {
            let at = self.compiled.slot_ref(slot);
            alphas
                .entry(at.variable)
                .or_insert_with(|| vec![0.0; variables[at.variable].terms.len()])[at.term] =
                activation;
        }

        let outputs: Metrics = alphas
            .into_iter()
            .map(|(vi, term_alphas)| {
                let var = &variables[vi];
                (var.name.clone(), defuzzify_terms(&var.terms, &term_alphas))
            })
            .collect();

        tracing::debug!(
            inputs = inputs.len(),
            contributions = contributions.len(),
            outputs = outputs.len(),
            "fuzzy evaluation"
        );
        outputs
    }
}

impl From<FuzzyConfig> for FuzzyEngine {
    fn from(config: FuzzyConfig) -> Self {
        Self::new(config)
    }
}

impl DecisionEngine for FuzzyEngine {
    fn evaluate(&self, inputs: &Metrics) -> Metrics {
        self.infer(inputs, None)
    }

    fn evaluate_observed(&self, inputs: &Metrics, sink: &mut dyn RuleSink) -> Metrics {
        self.infer(inputs, Some(sink))
    }
}
