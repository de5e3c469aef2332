pub const FEATURE_EPSILON: f64 = 1e-6;
pub const VARIANCE_THRESHOLD: f64 = 1e-6;
pub const PRUNE_ALPHA: f64 = 0.01;
pub const MAX_DEPTH_LIMIT: usize = 64;
pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const DEFAULT_MIN_SAMPLES_SPLIT: usize = 2;
pub const DEFAULT_MIN_SAMPLES_LEAF: usize = 1;
