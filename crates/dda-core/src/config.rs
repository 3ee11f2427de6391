//! Fuzzy configuration model: variables with named terms, and rules made of
//! ordered conditions and actions.
//!
//! The serde shape matches the JSON files authored for the engine:
//! top-level `variables` and `rules` arrays, terms as `{label, points}`, and
//! conditions carrying a `useOrWithPrev` flag (`combineWithOr` is accepted
//! too).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A linguistic term: a label and its 3-point (triangle) or 4-point
/// (trapezoid) membership shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub label: String,
    pub points: Vec<f64>,
}

impl Term {
    pub fn new(label: &str, points: &[f64]) -> Self {
        Self {
            label: label.to_string(),
            points: points.to_vec(),
        }
    }
}

/// A fuzzy variable. Used as an input when referenced by conditions, as an
/// output when referenced by actions; a variable may be both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub terms: Vec<Term>,
}

impl Variable {
    pub fn new(name: &str, terms: Vec<Term>) -> Self {
        Self {
            name: name.to_string(),
            terms,
        }
    }

    pub fn term(&self, label: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.label == label)
    }
}

/// One antecedent of a rule: `variable IS term`.
///
/// `combine_with_or` selects OR (max) instead of AND (min) when folding this
/// condition into the running activation. Ignored on a rule's first condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub variable: String,
    pub term: String,
    #[serde(rename = "useOrWithPrev", alias = "combineWithOr", default)]
    pub combine_with_or: bool,
}

impl Condition {
    /// An AND-combined condition.
    pub fn is(variable: &str, term: &str) -> Self {
        Self {
            variable: variable.to_string(),
            term: term.to_string(),
            combine_with_or: false,
        }
    }

    /// An OR-combined condition.
    pub fn or(variable: &str, term: &str) -> Self {
        Self {
            combine_with_or: true,
            ..Self::is(variable, term)
        }
    }
}

/// A consequent: this rule votes for pushing `variable` toward `term`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRef {
    pub variable: String,
    pub term: String,
}

impl ActionRef {
    pub fn new(variable: &str, term: &str) -> Self {
        Self {
            variable: variable.to_string(),
            term: term.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<ActionRef>,
}

impl Rule {
    pub fn new(conditions: Vec<Condition>, actions: Vec<ActionRef>) -> Self {
        Self {
            conditions,
            actions,
        }
    }
}

/// Complete engine configuration. Built once by a loader and treated as
/// immutable by every engine holding it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl FuzzyConfig {
    pub fn new(variables: Vec<Variable>, rules: Vec<Rule>) -> Self {
        Self { variables, rules }
    }

    /// First variable declared with `name`.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Well-formedness report. Evaluation never depends on this: a config with
    /// issues still evaluates, degrading unresolved or malformed parts to 0.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let mut names = HashSet::new();
        for var in &self.variables {
            if !names.insert(var.name.as_str()) {
                issues.push(ConfigIssue::DuplicateVariable {
                    variable: var.name.clone(),
                });
            }

            let mut labels = HashSet::new();
            for term in &var.terms {
                if !labels.insert(term.label.as_str()) {
                    issues.push(ConfigIssue::DuplicateTerm {
                        variable: var.name.clone(),
                        term: term.label.clone(),
                    });
                }
                check_points(&var.name, term, &mut issues);
            }
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.conditions.is_empty() {
                issues.push(ConfigIssue::EmptyConditions { rule: index });
            }
            if rule.actions.is_empty() {
                issues.push(ConfigIssue::EmptyActions { rule: index });
            }
            let refs = rule
                .conditions
                .iter()
                .map(|c| (c.variable.as_str(), c.term.as_str()))
                .chain(
                    rule.actions
                        .iter()
                        .map(|a| (a.variable.as_str(), a.term.as_str())),
                );
            for (variable, term) in refs {
                match self.variable(variable) {
                    None => issues.push(ConfigIssue::UnknownVariable {
                        rule: index,
                        variable: variable.to_string(),
                    }),
                    Some(var) if var.term(term).is_none() => {
                        issues.push(ConfigIssue::UnknownTerm {
                            rule: index,
                            variable: variable.to_string(),
                            term: term.to_string(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        issues
    }
}

fn check_points(variable: &str, term: &Term, issues: &mut Vec<ConfigIssue>) {
    let points = &term.points;
    if !(3..=4).contains(&points.len()) {
        issues.push(ConfigIssue::PointCount {
            variable: variable.to_string(),
            term: term.label.clone(),
            count: points.len(),
        });
        return;
    }
    if points.windows(2).any(|w| w[0] > w[1]) {
        issues.push(ConfigIssue::NonMonotonic {
            variable: variable.to_string(),
            term: term.label.clone(),
        });
    }
    if points.iter().any(|p| !(0.0..=1.0).contains(p)) {
        issues.push(ConfigIssue::OutOfRange {
            variable: variable.to_string(),
            term: term.label.clone(),
        });
    }
}

/// A well-formedness problem found by [`FuzzyConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigIssue {
    DuplicateVariable { variable: String },
    DuplicateTerm { variable: String, term: String },
    PointCount { variable: String, term: String, count: usize },
    NonMonotonic { variable: String, term: String },
    OutOfRange { variable: String, term: String },
    EmptyConditions { rule: usize },
    EmptyActions { rule: usize },
    UnknownVariable { rule: usize, variable: String },
    UnknownTerm { rule: usize, variable: String, term: String },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::DuplicateVariable { variable } => {
                write!(f, "variable '{variable}' is declared more than once")
            }
            ConfigIssue::DuplicateTerm { variable, term } => {
                write!(f, "term '{variable}.{term}' is declared more than once")
            }
            ConfigIssue::PointCount {
                variable,
                term,
                count,
            } => write!(f, "term '{variable}.{term}' has {count} points, expected 3 or 4"),
            ConfigIssue::NonMonotonic { variable, term } => {
                write!(f, "term '{variable}.{term}' points are not non-decreasing")
            }
            ConfigIssue::OutOfRange { variable, term } => {
                write!(f, "term '{variable}.{term}' has points outside [0, 1]")
            }
            ConfigIssue::EmptyConditions { rule } => write!(f, "rule {rule} has no conditions"),
            ConfigIssue::EmptyActions { rule } => write!(f, "rule {rule} has no actions"),
            ConfigIssue::UnknownVariable { rule, variable } => {
                write!(f, "rule {rule} references unknown variable '{variable}'")
            }
            ConfigIssue::UnknownTerm {
                rule,
                variable,
                term,
            } => write!(f, "rule {rule} references unknown term '{variable}.{term}'"),
        }
    }
}
