//! Model Configuration
//!
//! Size limits and stopping rules fixed when a model is created, plus the
//! JSON IO trait shared by the configuration and the model.
use crate::constants::{DEFAULT_MAX_DEPTH, DEFAULT_MIN_SAMPLES_LEAF, DEFAULT_MIN_SAMPLES_SPLIT, MAX_DEPTH_LIMIT};
use crate::errors::TreeError;
use crate::utils::{validate_positive_usize_parameter, validate_usize_parameter};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}
fn default_min_samples_split() -> usize {
    DEFAULT_MIN_SAMPLES_SPLIT
}
fn default_min_samples_leaf() -> usize {
    DEFAULT_MIN_SAMPLES_LEAF
}

/// Configuration for a `DecisionTree`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Number of features of every sample.
    pub n_features: usize,
    /// Capacity of the sample store.
    pub max_samples: usize,
    /// Maximum depth of the tree, the root being at depth 0.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Nodes with fewer samples are not split.
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    /// Minimum number of samples on each side of a split.
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
}

impl ModelConfig {
    pub fn new(n_features: usize, max_samples: usize) -> Self {
        ModelConfig {
            n_features,
            max_samples,
            max_depth: DEFAULT_MAX_DEPTH,
            min_samples_split: DEFAULT_MIN_SAMPLES_SPLIT,
            min_samples_leaf: DEFAULT_MIN_SAMPLES_LEAF,
        }
    }

    /// Set the maximum depth.
    /// * `max_depth` - Must lie in `1..=64`.
    pub fn set_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum node size that may still be split.
    /// * `min_samples_split` - Must be at least 2.
    pub fn set_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples per leaf.
    pub fn set_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        validate_positive_usize_parameter(self.n_features, "n_features")?;
        validate_positive_usize_parameter(self.max_samples, "max_samples")?;
        validate_usize_parameter(self.max_depth, 1, MAX_DEPTH_LIMIT, "max_depth")?;
        validate_usize_parameter(self.min_samples_split, 2, usize::MAX, "min_samples_split")?;
        validate_positive_usize_parameter(self.min_samples_leaf, "min_samples_leaf")?;
        Ok(())
    }
}

/// IO
pub trait ModelIO: Serialize + DeserializeOwned + Sized {
    /// Dump as a json object
    fn json_dump(&self) -> Result<String, TreeError> {
        serde_json::to_string(self).map_err(|e| TreeError::UnableToWrite(e.to_string()))
    }

    /// Load from a json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, TreeError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| TreeError::UnableToRead(e.to_string()))
    }
}

impl ModelIO for ModelConfig {}
