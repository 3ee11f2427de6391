/// Tolerance for the "approximately equal" point comparisons in membership
/// shapes (shoulder detection and the triangle apex).
pub const EPSILON: f64 = 1e-6;

/// Number of intervals the [0, 1] output domain is split into for centroid
/// defuzzification. Sampling visits `DEFUZZ_STEPS + 1` points.
pub const DEFUZZ_STEPS: usize = 50;

/// Default evaluation interval in seconds for the controller loop.
pub const DEFAULT_EVALUATION_INTERVAL: f64 = 0.5;

/// Default sampling interval in seconds for the metrics monitor.
pub const DEFAULT_SAMPLING_INTERVAL: f64 = 0.1;

/// Default capacity of a metric series before the oldest samples are dropped.
pub const DEFAULT_MAX_SAMPLES: usize = 500;

/// Smallest capacity a metric series accepts.
pub const MIN_SAMPLES: usize = 10;

/// Default lower bound of the flow band.
pub const DEFAULT_FLOW_LOWER: f64 = 0.4;

/// Default upper bound of the flow band.
pub const DEFAULT_FLOW_UPPER: f64 = 0.6;
