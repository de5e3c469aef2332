// Modules
pub mod constants;
pub mod criterion;
pub mod data;
pub mod errors;
pub mod metric;
pub mod model;
pub mod node;
pub mod prune;
pub mod splitter;
pub mod store;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use crate::criterion::{SplitCriterion, TreeType};
pub use crate::data::{FeatureType, FeatureValue, TargetValue};
pub use crate::errors::TreeError;
pub use crate::metric::Metric;
pub use crate::model::config::{ModelConfig, ModelIO};
pub use crate::model::core::DecisionTree;
pub use crate::prune::PruningMethod;
