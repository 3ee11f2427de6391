//! Rule evaluation: fold each rule's conditions into one activation and
//! record its actions as contributions.
//!
//! Conditions combine strictly left to right with the running activation:
//! `max` when the condition is OR-combined, `min` otherwise. There is no
//! operator precedence.

use crate::aggregate::Contributions;
use crate::compiled::CompiledRule;
use crate::events::{RuleFired, RuleSink};

/// Activation of one rule given the fuzzified slot table. Unresolved
/// conditions read as 0. A rule without conditions never activates.
pub fn rule_activation(rule: &CompiledRule, fuzzified: &[f64]) -> f64 {
    let mut conditions = rule.conditions.iter();
    let Some(first) = conditions.next() else {
        return 0.0;
    };

    let degree = |slot: Option<usize>| slot.and_then(|s| fuzzified.get(s).copied()).unwrap_or(0.0);

    conditions.fold(degree(first.slot), |activation, cond| {
        let mu = degree(cond.slot);
        if cond.combine_with_or {
            activation.max(mu)
        } else {
            activation.min(mu)
        }
    })
}

/// Evaluate every rule in configuration order. Rules with positive
/// activation are reported to `sink` and contribute their activation to
/// each of their action slots.
pub fn evaluate_rules(
    rules: &[CompiledRule],
    fuzzified: &[f64],
    mut sink: Option<&mut dyn RuleSink>,
) -> Contributions {
    let mut contributions = Contributions::new();

    for (index, rule) in rules.iter().enumerate() {
        let activation = rule_activation(rule, fuzzified);
        if activation > 0.0 {
            tracing::trace!(rule = index, activation, "rule fired");
            if let Some(sink) = sink.as_deref_mut() {
                sink.rule_fired(RuleFired {
                    rule: index,
                    activation,
                });
            }
            for &slot in &rule.actions {
                contributions.push(slot, activation);
            }
        }
    }

    contributions
}
