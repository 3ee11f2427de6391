//! Name resolution done once per configuration.
//!
//! Every (variable, term) pair gets a flat slot index so the per-call tables
//! (fuzzified values, contributions, aggregated activations) are plain
//! vectors instead of string-keyed maps. References that do not resolve stay
//! `None` and evaluate as zero activation.

use std::collections::HashMap;

use crate::config::FuzzyConfig;
use crate::membership::membership;

/// (variable index, term index) pair into [`FuzzyConfig::variables`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub variable: usize,
    pub term: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompiledCondition {
    /// Resolved slot, or `None` when the variable or term does not exist.
    pub slot: Option<usize>,
    pub combine_with_or: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompiledRule {
    pub conditions: Vec<CompiledCondition>,
    /// Resolved action slots. Unresolved actions are dropped here.
    pub actions: Vec<usize>,
}

/// A [`FuzzyConfig`] plus its slot layout and resolved rules.
#[derive(Clone, Debug)]
pub struct CompiledConfig {
    config: FuzzyConfig,
    /// First declaration wins when a name is repeated. Output variables are
    /// looked up here.
    variable_index: HashMap<String, usize>,
    /// (variable, label) → slot for conditions. Inputs are keyed by name and
    /// label, so the last declaration wins.
    condition_index: HashMap<(String, String), usize>,
    /// Start of each variable's slots in the flat table.
    offsets: Vec<usize>,
    slots: Vec<SlotRef>,
    rules: Vec<CompiledRule>,
}

impl CompiledConfig {
    pub fn new(config: FuzzyConfig) -> Self {
        let mut variable_index = HashMap::with_capacity(config.variables.len());
        let mut condition_index = HashMap::new();
        let mut offsets = Vec::with_capacity(config.variables.len());
        let mut slots = Vec::new();

        for (vi, var) in config.variables.iter().enumerate() {
            variable_index.entry(var.name.clone()).or_insert(vi);
            offsets.push(slots.len());
            for (ti, term) in var.terms.iter().enumerate() {
                condition_index.insert((var.name.clone(), term.label.clone()), slots.len());
                slots.push(SlotRef {
                    variable: vi,
                    term: ti,
                });
            }
        }

        let mut compiled = Self {
            config,
            variable_index,
            condition_index,
            offsets,
            slots,
            rules: Vec::new(),
        };

        let rules = compiled
            .config
            .rules
            .iter()
            .map(|rule| CompiledRule {
                conditions: rule
                    .conditions
                    .iter()
                    .map(|c| CompiledCondition {
                        slot: compiled.resolve(&c.variable, &c.term),
                        combine_with_or: c.combine_with_or,
                    })
                    .collect(),
                actions: rule
                    .actions
                    .iter()
                    .flat_map(|a| compiled.action_slots(&a.variable, &a.term))
                    .collect(),
            })
            .collect();
        compiled.rules = rules;
        compiled
    }

    pub fn config(&self) -> &FuzzyConfig {
        &self.config
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_ref(&self, slot: usize) -> SlotRef {
        self.slots[slot]
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variable_index.get(name).copied()
    }

    /// Slot a condition on `variable.term` reads. When a name or label is
    /// declared more than once the last declaration wins.
    pub fn resolve(&self, variable: &str, term: &str) -> Option<usize> {
        self.condition_index
            .get(&(variable.to_string(), term.to_string()))
            .copied()
    }

    /// Slots an action on `variable.term` activates: every term labelled
    /// `term` in the first variable named `variable`. Empty when nothing
    /// matches.
    pub fn action_slots(&self, variable: &str, term: &str) -> Vec<usize> {
        let Some(vi) = self.variable_index(variable) else {
            return Vec::new();
        };
        let offset = self.offsets[vi];
        self.config.variables[vi]
            .terms
            .iter()
            .enumerate()
            .filter(|(_, t)| t.label == term)
            .map(|(ti, _)| offset + ti)
            .collect()
    }

    /// Fuzzification: μ for every term of every variable present in `inputs`.
    /// Slots of absent variables stay 0. A NaN or infinite input counts as
    /// absent.
    pub fn fuzzify(&self, inputs: &HashMap<String, f64>) -> Vec<f64> {
        let mut values = vec![0.0; self.slots.len()];
        for (vi, var) in self.config.variables.iter().enumerate() {
            let Some(&x) = inputs.get(&var.name) else {
                continue;
            };
            if !x.is_finite() {
                tracing::debug!(variable = %var.name, "skipping non-finite input");
                continue;
            }
            let offset = self.offsets[vi];
            for (ti, term) in var.terms.iter().enumerate() {
                values[offset + ti] = membership(x, &term.points);
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionRef, Condition, Rule, Term, Variable};

    fn config() -> FuzzyConfig {
        FuzzyConfig::new(
            vec![
                Variable::new(
                    "Health",
                    vec![
                        Term::new("Low", &[0.0, 0.0, 0.5]),
                        Term::new("High", &[0.5, 1.0, 1.0]),
                    ],
                ),
                Variable::new(
                    "Spawn",
                    vec![
                        Term::new("Low", &[0.0, 0.0, 0.5]),
                        Term::new("High", &[0.5, 1.0, 1.0]),
                    ],
                ),
                Variable::new("Health", vec![Term::new("Shadow", &[0.0, 0.5, 1.0])]),
            ],
            vec![Rule::new(
                vec![Condition::is("Health", "Low"), Condition::or("Ghost", "Low")],
                vec![ActionRef::new("Spawn", "High"), ActionRef::new("Spawn", "Mid")],
            )],
        )
    }

    #[test]
    fn test_slot_layout() {
        let compiled = CompiledConfig::new(config());
        assert_eq!(compiled.slot_count(), 5);
        assert_eq!(compiled.resolve("Health", "High"), Some(1));
        assert_eq!(compiled.resolve("Spawn", "Low"), Some(2));
        assert_eq!(
            compiled.slot_ref(3),
            SlotRef {
                variable: 1,
                term: 1
            }
        );
    }

    #[test]
    fn test_duplicate_variable_names() {
        let compiled = CompiledConfig::new(config());
        // outputs go to the first declaration
        assert_eq!(compiled.variable_index("Health"), Some(0));
        assert!(compiled.action_slots("Health", "Shadow").is_empty());
        // conditions see every declaration, last one wins
        assert_eq!(compiled.resolve("Health", "Shadow"), Some(4));
        assert_eq!(compiled.resolve("Health", "Low"), Some(0));
    }

    #[test]
    fn test_repeated_labels() {
        let compiled = CompiledConfig::new(FuzzyConfig::new(
            vec![Variable::new(
                "Diff",
                vec![
                    Term::new("Extreme", &[0.0, 0.0, 0.2]),
                    Term::new("Mid", &[0.2, 0.5, 0.8]),
                    Term::new("Extreme", &[0.8, 1.0, 1.0]),
                ],
            )],
            vec![Rule::new(
                vec![Condition::is("Diff", "Extreme")],
                vec![ActionRef::new("Diff", "Extreme")],
            )],
        ));
        assert_eq!(compiled.action_slots("Diff", "Extreme"), vec![0, 2]);
        assert_eq!(compiled.resolve("Diff", "Extreme"), Some(2));
        assert_eq!(compiled.rules()[0].actions, vec![0, 2]);
        assert_eq!(compiled.rules()[0].conditions[0].slot, Some(2));
    }

    #[test]
    fn test_unresolved_references() {
        let compiled = CompiledConfig::new(config());
        let rule = &compiled.rules()[0];
        assert_eq!(rule.conditions[0].slot, Some(0));
        assert_eq!(rule.conditions[1].slot, None);
        assert!(rule.conditions[1].combine_with_or);
        assert_eq!(rule.actions, vec![3]);
    }

    #[test]
    fn test_fuzzify_skips_absent_variables() {
        let compiled = CompiledConfig::new(config());
        let inputs = HashMap::from([("Health".to_string(), 0.25)]);
        let values = compiled.fuzzify(&inputs);
        assert_eq!(values.len(), 5);
        assert!((values[0] - 0.5).abs() < 1e-12);
        assert_eq!(values[1], 0.0);
        assert_eq!(&values[2..4], &[0.0, 0.0]);
        // the second "Health" reads the same input
        assert!((values[4] - 0.5).abs() < 1e-12);
    }
}
