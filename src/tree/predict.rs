use crate::data::{FeatureValue, TargetValue};
use crate::node::Node;
use crate::tree::tree::Tree;
use rayon::prelude::*;

impl Tree {
    /// Walk from the root to the node that decides `features`.
    ///
    /// The walk stops early at an internal node whose child is missing, or whose
    /// split feature is absent from `features`.
    pub fn predict_node(&self, features: &[FeatureValue]) -> Option<&Node> {
        let mut node = self.nodes.get(&0)?;
        loop {
            if node.is_leaf {
                return Some(node);
            }
            match node.get_child_idx(features).and_then(|idx| self.nodes.get(&idx)) {
                Some(child) => node = child,
                None => return Some(node),
            }
        }
    }

    pub fn predict_row(&self, features: &[FeatureValue]) -> Option<TargetValue> {
        self.predict_node(features).map(|n| n.prediction.clone())
    }

    /// Node ids visited from the root to the deciding node.
    pub fn decision_path(&self, features: &[FeatureValue]) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = self.nodes.get(&0);
        while let Some(node) = current {
            path.push(node.num);
            current = node.get_child_idx(features).and_then(|idx| self.nodes.get(&idx));
        }
        path
    }

    fn predict_single_threaded(&self, rows: &[Vec<FeatureValue>]) -> Vec<Option<TargetValue>> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    fn predict_parallel(&self, rows: &[Vec<FeatureValue>]) -> Vec<Option<TargetValue>> {
        rows.par_iter().map(|row| self.predict_row(row)).collect()
    }

    /// Predict every row, optionally on the rayon pool. Output order follows `rows`.
    pub fn predict(&self, rows: &[Vec<FeatureValue>], parallel: bool) -> Vec<Option<TargetValue>> {
        if parallel {
            self.predict_parallel(rows)
        } else {
            self.predict_single_threaded(rows)
        }
    }
}
