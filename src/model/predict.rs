//! Prediction Methods
//!
//! Typed prediction wrappers, batch prediction, class probabilities and
//! decision paths. All of them are read-only and degrade to empty or default
//! values on an untrained model or a malformed feature vector.
use crate::data::{fan_out, FeatureValue, TargetValue};
use crate::model::core::DecisionTree;
use crate::node::Node;

impl DecisionTree {
    fn deciding_node(&self, features: &[FeatureValue]) -> Option<&Node> {
        if features.len() != self.cfg.n_features {
            return None;
        }
        self.tree.as_ref()?.predict_node(features)
    }

    /// Predict a single feature vector.
    ///
    /// `None` when the model is untrained or `features` has the wrong length.
    pub fn predict(&self, features: &[FeatureValue]) -> Option<TargetValue> {
        self.deciding_node(features).map(|n| n.prediction.clone())
    }

    /// Predicted label, or an empty string when there is no class prediction.
    pub fn predict_class(&self, features: &[FeatureValue]) -> String {
        match self.predict(features) {
            Some(TargetValue::Classification(label)) => label,
            _ => String::new(),
        }
    }

    /// Predicted value, or 0.0 when there is no regression prediction.
    pub fn predict_regression(&self, features: &[FeatureValue]) -> f64 {
        self.predict(features).and_then(|p| p.value()).unwrap_or(0.0)
    }

    /// Predict from raw numeric and categorical streams, filled according to the
    /// configured feature types.
    pub fn predict_mixed(&self, numeric: &[f64], categorical: &[&str]) -> Option<TargetValue> {
        let features = fan_out(&self.store.feature_types(), numeric, categorical).ok()?;
        self.predict(&features)
    }

    pub fn predict_class_mixed(&self, numeric: &[f64], categorical: &[&str]) -> String {
        match self.predict_mixed(numeric, categorical) {
            Some(TargetValue::Classification(label)) => label,
            _ => String::new(),
        }
    }

    pub fn predict_regression_mixed(&self, numeric: &[f64], categorical: &[&str]) -> f64 {
        self.predict_mixed(numeric, categorical)
            .and_then(|p| p.value())
            .unwrap_or(0.0)
    }

    /// Predict many rows, optionally in parallel. Output order follows `rows`.
    ///
    /// * `rows` - Feature vectors, rows of the wrong length predict `None`.
    /// * `parallel` - Spread rows over the rayon pool.
    pub fn predict_batch(&self, rows: &[Vec<FeatureValue>], parallel: bool) -> Vec<Option<TargetValue>> {
        let Some(tree) = &self.tree else {
            return vec![None; rows.len()];
        };
        tree.predict(rows, parallel)
            .into_iter()
            .zip(rows)
            .map(|(p, row)| if row.len() == self.cfg.n_features { p } else { None })
            .collect()
    }

    /// Class distribution of the node reached by `features`, in first-seen label order.
    pub fn class_probabilities(&self, features: &[FeatureValue]) -> Vec<(String, f64)> {
        self.deciding_node(features)
            .and_then(|n| n.class_probabilities.clone())
            .unwrap_or_default()
    }

    /// Share of the predicted class at the deciding node. 1.0 for regression
    /// predictions, 0.0 when there is no prediction.
    pub fn prediction_confidence(&self, features: &[FeatureValue]) -> f64 {
        match self.deciding_node(features) {
            Some(node) => match &node.prediction {
                TargetValue::Classification(label) => node.class_probability(label),
                TargetValue::Regression(_) => 1.0,
            },
            None => 0.0,
        }
    }

    /// Node ids visited from the root to the deciding node.
    pub fn decision_path(&self, features: &[FeatureValue]) -> Vec<usize> {
        match &self.tree {
            Some(tree) if features.len() == self.cfg.n_features => tree.decision_path(features),
            _ => Vec::new(),
        }
    }
}
