//! Centroid defuzzification over a fixed 51-point sampling of [0, 1].
//!
//! Each activated term's output set is clipped to its activation, the
//! clipped sets are unioned with `max`, and the centroid of the union is
//! approximated by a weighted mean over the samples. The sample count is
//! part of the numeric contract: a finer grid changes results.

use std::collections::HashMap;

use crate::config::Term;
use crate::constants::DEFUZZ_STEPS;
use crate::membership::membership;

/// Crisp value for a variable whose terms are activated per `activations`
/// (term label → activation). Terms without an entry contribute nothing.
/// Returns 0 when the aggregated set is empty at every sample.
pub fn defuzzify(terms: &[Term], activations: &HashMap<String, f64>) -> f64 {
    let alphas: Vec<f64> = terms
        .iter()
        .map(|t| activations.get(&t.label).copied().unwrap_or(0.0))
        .collect();
    defuzzify_terms(terms, &alphas)
}

/// Index-aligned form: `alphas[i]` is the activation of `terms[i]`, 0 for
/// terms that were not activated.
pub fn defuzzify_terms(terms: &[Term], alphas: &[f64]) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for i in 0..=DEFUZZ_STEPS {
        let z = i as f64 / DEFUZZ_STEPS as f64;
        let mu = terms
            .iter()
            .zip(alphas)
            .filter(|&(_, &alpha)| alpha > 0.0)
            .map(|(term, &alpha)| alpha.min(membership(z, &term.points)))
            .fold(0.0, f64::max);
        numerator += mu * z;
        denominator += mu;
    }

    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
