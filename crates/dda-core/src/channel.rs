//! Metric gathering boundary: channels report raw values with their current
//! range, the registry normalizes them into [0, 1] for the engine.

use crate::engine::Metrics;

/// One raw metric reading with its current dynamic range.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricData {
    pub key: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricData {
    pub fn new(key: &str, value: f64, min: f64, max: f64) -> Self {
        Self {
            key: key.to_string(),
            value,
            min,
            max,
        }
    }

    pub fn normalized(&self) -> f64 {
        normalize(self.value, self.min, self.max)
    }
}

/// Source of gameplay metrics.
pub trait Channel {
    fn metrics(&mut self) -> Vec<MetricData>;
}

/// `(value - min) / (max - min)` clamped to [0, 1]. A zero-width or inverted
/// range normalizes to 0.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range > 0.0 {
        ((value - min) / range).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Raw and normalized metrics collected in one pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricSnapshot {
    pub raw: Metrics,
    pub normalized: Metrics,
}

/// Ordered set of channels. When two channels report the same key the later
/// channel wins.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: Vec<Box<dyn Channel + Send>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: impl Channel + Send + 'static) {
        self.channels.push(Box::new(channel));
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn collect(&mut self) -> MetricSnapshot {
        let mut snapshot = MetricSnapshot::default();
        for channel in &mut self.channels {
            for m in channel.metrics() {
                let norm = m.normalized();
                snapshot.raw.insert(m.key.clone(), m.value);
                snapshot.normalized.insert(m.key, norm);
            }
        }
        snapshot
    }
}
