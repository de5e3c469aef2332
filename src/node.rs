use crate::criterion::NodeStats;
use crate::data::{FeatureValue, TargetValue};
use crate::splitter::SplitInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub enum NodeType {
    Root,
    Left,
    Right,
}

/// A tree node. Every node carries the statistics and prediction of the
/// samples that reached it during the build, so collapsing a subtree only
/// requires flipping `is_leaf` and dropping the children.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Node {
    pub num: usize,
    pub depth: usize,
    pub node_type: NodeType,
    pub parent_node: usize,
    pub is_leaf: bool,
    pub split_feature: usize,
    pub split_value: Option<FeatureValue>,
    pub split_gain: f64,
    pub left_child: usize,
    pub right_child: usize,
    pub n_samples: usize,
    pub impurity: f64,
    pub prediction: TargetValue,
    pub class_probabilities: Option<Vec<(String, f64)>>,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
}

impl Node {
    /// Create a leaf from the node statistics.
    pub fn new(num: usize, depth: usize, node_type: NodeType, parent_node: usize, stats: NodeStats) -> Self {
        Node {
            num,
            depth,
            node_type,
            parent_node,
            is_leaf: true,
            split_feature: 0,
            split_value: None,
            split_gain: 0.0,
            left_child: 0,
            right_child: 0,
            n_samples: stats.n_samples,
            impurity: stats.impurity,
            prediction: stats.prediction,
            class_probabilities: stats.class_probabilities,
            mean: stats.mean,
            variance: stats.variance,
        }
    }

    /// Update all the info that is needed if this node is a parent node.
    pub fn make_parent_node(&mut self, split_info: &SplitInfo, left_child: usize, right_child: usize) {
        self.is_leaf = false;
        self.split_feature = split_info.split_feature;
        self.split_value = Some(split_info.split_value.clone());
        self.split_gain = split_info.split_gain;
        self.left_child = left_child;
        self.right_child = right_child;
    }

    /// Turn the node back into a leaf, keeping its own prediction.
    pub fn make_leaf_node(&mut self) {
        self.is_leaf = true;
        self.split_value = None;
        self.split_gain = 0.0;
        self.left_child = 0;
        self.right_child = 0;
    }

    /// Get the child that should be traveled down, given a feature vector.
    /// Returns `None` on a leaf or when the split feature is missing from the vector.
    pub fn get_child_idx(&self, features: &[FeatureValue]) -> Option<usize> {
        if self.is_leaf {
            return None;
        }
        let threshold = self.split_value.as_ref()?;
        let value = features.get(self.split_feature)?;
        if value.goes_left(threshold) {
            Some(self.left_child)
        } else {
            Some(self.right_child)
        }
    }

    /// Probability of `label` among the classification samples of this node.
    pub fn class_probability(&self, label: &str) -> f64 {
        self.class_probabilities
            .as_ref()
            .and_then(|p| p.iter().find(|(l, _)| l == label).map(|(_, p)| *p))
            .unwrap_or(0.0)
    }

    /// Render the node, naming the split feature with `feature_name`.
    pub fn describe(&self, feature_name: &str) -> String {
        match (&self.split_value, self.is_leaf) {
            (Some(threshold), false) => format!(
                "{}:[{} {} {}] yes={},no={},gain={:.4},impurity={:.4},samples={}",
                self.num,
                feature_name,
                threshold.split_operator(),
                threshold,
                self.left_child,
                self.right_child,
                self.split_gain,
                self.impurity,
                self.n_samples
            ),
            _ => format!(
                "{}:leaf={},impurity={:.4},samples={}",
                self.num, self.prediction, self.impurity, self.n_samples
            ),
        }
    }
}

impl fmt::Display for Node {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.describe(&self.split_feature.to_string()))
    }
}
