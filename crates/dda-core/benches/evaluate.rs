use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dda_core::{
    ActionRef, Condition, DecisionEngine, FuzzyConfig, FuzzyEngine, Metrics, Rule, Term, Variable,
};

fn three_terms(name: &str) -> Variable {
    Variable::new(
        name,
        vec![
            Term::new("Low", &[0.0, 0.0, 0.4]),
            Term::new("Mid", &[0.2, 0.4, 0.6, 0.8]),
            Term::new("High", &[0.6, 1.0, 1.0]),
        ],
    )
}

/// 8 inputs × 3 terms, 4 outputs, one rule per (input, term) pair.
fn build_engine() -> FuzzyEngine {
    let inputs: Vec<String> = (0..8).map(|i| format!("in{i}")).collect();
    let outputs: Vec<String> = (0..4).map(|i| format!("out{i}")).collect();

    let mut variables: Vec<Variable> = inputs.iter().map(|n| three_terms(n)).collect();
    variables.extend(outputs.iter().map(|n| three_terms(n)));

    let labels = ["Low", "Mid", "High"];
    let mut rules = Vec::new();
    for (i, input) in inputs.iter().enumerate() {
        for (t, label) in labels.iter().enumerate() {
            let next = &inputs[(i + 1) % inputs.len()];
            rules.push(Rule::new(
                vec![
                    Condition::is(input, label),
                    Condition::or(next, labels[(t + 1) % 3]),
                ],
                vec![ActionRef::new(&outputs[i % outputs.len()], labels[2 - t])],
            ));
        }
    }

    FuzzyEngine::new(FuzzyConfig::new(variables, rules))
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = build_engine();
    let metrics: Metrics = (0..8)
        .map(|i| (format!("in{i}"), (i as f64 * 0.13) % 1.0))
        .collect();

    c.bench_function("evaluate_8x3_24_rules", |b| {
        b.iter(|| engine.evaluate(black_box(&metrics)))
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
