//! Output aggregation: the activation of an output term is the maximum over
//! every rule that voted for it. Terms whose maximum is not positive are
//! dropped.

/// Contribution lists keyed by output slot, in the order rules recorded them.
#[derive(Clone, Debug, Default)]
pub struct Contributions {
    entries: Vec<(usize, f64)>,
}

impl Contributions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, slot: usize, activation: f64) {
        self.entries.push((slot, activation));
    }

    /// Contribution list of one slot.
    pub fn for_slot(&self, slot: usize) -> impl Iterator<Item = f64> + '_ {
        self.entries
            .iter()
            .filter(move |(s, _)| *s == slot)
            .map(|&(_, a)| a)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-slot aggregated activations. Only strictly positive entries are kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregated {
    /// (slot, activation) sorted by slot.
    entries: Vec<(usize, f64)>,
}

impl Aggregated {
    pub fn get(&self, slot: usize) -> Option<f64> {
        self.entries
            .binary_search_by_key(&slot, |&(s, _)| s)
            .ok()
            .map(|i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Max-composition of contributions.
pub fn aggregate(contributions: &Contributions) -> Aggregated {
    let mut sorted = contributions.entries.clone();
    sorted.sort_by_key(|&(slot, _)| slot);

    let mut entries: Vec<(usize, f64)> = Vec::new();
    for (slot, activation) in sorted {
        match entries.last_mut() {
            Some((last, max)) if *last == slot => *max = max.max(activation),
            _ => entries.push((slot, activation)),
        }
    }
    entries.retain(|&(_, max)| max > 0.0);

    Aggregated { entries }
}
