use crate::constants::PRUNE_ALPHA;
use crate::data::{TargetValue, TrainingSample};
use crate::errors::TreeError;
use crate::tree::tree::Tree;
use crate::utils::items_to_strings;
use hashbrown::HashMap;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PruningMethod {
    #[default]
    None,
    /// Collapse subtrees whose leaf impurity does not beat the node's own by `PRUNE_ALPHA`.
    CostComplexity,
    /// Collapse subtrees that do not lower the training loss of the samples they route.
    ReducedError,
}

impl FromStr for PruningMethod {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(PruningMethod::None),
            "CostComplexity" => Ok(PruningMethod::CostComplexity),
            "ReducedError" => Ok(PruningMethod::ReducedError),
            _ => Err(TreeError::ParseString(
                s.to_string(),
                "PruningMethod".to_string(),
                items_to_strings(vec!["None", "CostComplexity", "ReducedError"]),
            )),
        }
    }
}

impl Display for PruningMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            PruningMethod::None => "None",
            PruningMethod::CostComplexity => "CostComplexity",
            PruningMethod::ReducedError => "ReducedError",
        };
        write!(f, "{}", s)
    }
}

/// Loss of predicting `prediction` for a sample whose target is `target`.
fn sample_loss(target: &TargetValue, prediction: &TargetValue) -> f64 {
    match (target, prediction) {
        (TargetValue::Classification(a), TargetValue::Classification(b)) => {
            if a == b {
                0.0
            } else {
                1.0
            }
        }
        (TargetValue::Regression(a), TargetValue::Regression(b)) => (a - b).powi(2),
        _ => 1.0,
    }
}

impl Tree {
    /// Simplify the tree in place. Never adds nodes or depth.
    pub fn prune(&mut self, method: PruningMethod, samples: &[TrainingSample]) {
        let old_length = self.nodes.len();
        match method {
            PruningMethod::None => return,
            PruningMethod::CostComplexity => self.prune_cost_complexity(PRUNE_ALPHA),
            PruningMethod::ReducedError => self.prune_reduced_error(samples),
        }
        self.refresh_stats();
        info!("Pruned nodes ({}): {} -> {}", method, old_length, self.nodes.len());
    }

    /// Single bottom-up pass. Children are settled before their parent is tested.
    pub fn prune_cost_complexity(&mut self, alpha: f64) {
        for node_idx in self.post_order_internal() {
            let Some(node) = self.nodes.get(&node_idx) else {
                continue;
            };
            let leaf_complexity = node.impurity;
            let subtree_complexity = self.leaf_impurity_sum(node_idx);
            if subtree_complexity + alpha >= leaf_complexity {
                self.collapse(node_idx);
            }
        }
    }

    /// Bottom-up over nodes whose children are both leaves.
    pub fn prune_reduced_error(&mut self, samples: &[TrainingSample]) {
        // Routing does not change when descendants are collapsed.
        let mut routed: HashMap<usize, Vec<usize>> = HashMap::new();
        for (i, sample) in samples.iter().enumerate() {
            for node_idx in self.decision_path(&sample.features) {
                routed.entry(node_idx).or_default().push(i);
            }
        }

        for node_idx in self.post_order_internal() {
            let Some(node) = self.nodes.get(&node_idx) else {
                continue;
            };
            let children_are_leaves = [node.left_child, node.right_child]
                .iter()
                .all(|c| self.nodes.get(c).map_or(true, |n| n.is_leaf));
            if !children_are_leaves {
                continue;
            }
            let Some(index) = routed.get(&node_idx) else {
                self.collapse(node_idx);
                continue;
            };

            let mut loss_before = 0.0;
            let mut loss_after = 0.0;
            for &i in index {
                let sample = &samples[i];
                if let Some(prediction) = self.predict_row(&sample.features) {
                    loss_before += sample_loss(&sample.target, &prediction);
                }
                loss_after += sample_loss(&sample.target, &node.prediction);
            }
            if loss_after <= loss_before {
                self.collapse(node_idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::SplitCriterion;
    use crate::data::{EncodedTargets, FeatureType, FeatureValue};
    use crate::splitter::BinarySplitter;
    use crate::tree::tree::TreeParams;

    fn samples(rows: &[(f64, &str)]) -> Vec<TrainingSample> {
        rows.iter()
            .enumerate()
            .map(|(i, (x, l))| {
                TrainingSample::new(i, vec![FeatureValue::Numeric(*x)], TargetValue::Classification(l.to_string()))
            })
            .collect()
    }

    fn fit(samples: &[TrainingSample]) -> Tree {
        let targets = EncodedTargets::from_samples(samples);
        let splitter = BinarySplitter::new(SplitCriterion::Gini, 1, vec![FeatureType::Numeric]);
        let mut tree = Tree::new();
        tree.fit(
            samples,
            &targets,
            &splitter,
            &TreeParams {
                max_depth: 10,
                min_samples_split: 2,
            },
        )
        .unwrap();
        tree
    }

    fn noisy() -> Vec<TrainingSample> {
        samples(&[
            (1.0, "A"),
            (2.0, "A"),
            (3.0, "A"),
            (4.0, "B"),
            (5.0, "A"),
            (6.0, "A"),
            (7.0, "B"),
            (8.0, "B"),
            (9.0, "A"),
            (10.0, "B"),
            (11.0, "B"),
            (12.0, "B"),
        ])
    }

    #[test]
    fn test_pruning_method_parse() {
        assert_eq!("ReducedError".parse::<PruningMethod>().unwrap(), PruningMethod::ReducedError);
        assert!("Aggressive".parse::<PruningMethod>().is_err());
        assert_eq!(PruningMethod::default(), PruningMethod::None);
    }

    #[test]
    fn test_prune_none_is_noop() {
        let data = noisy();
        let mut tree = fit(&data);
        let before = tree.clone();
        tree.prune(PruningMethod::None, &data);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_cost_complexity_never_grows() {
        let data = noisy();
        let mut tree = fit(&data);
        let (nodes, depth) = (tree.node_count(), tree.max_depth());
        tree.prune(PruningMethod::CostComplexity, &data);
        assert!(tree.node_count() <= nodes);
        assert!(tree.max_depth() <= depth);
        assert_eq!(tree.nodes.len(), tree.node_count());
        assert_eq!(tree.n_leaves, tree.leaf_count());
    }

    #[test]
    fn test_cost_complexity_collapses_to_root() {
        // Pure leaves sum to zero impurity, so an alpha above the root impurity removes every split.
        let data = noisy();
        let mut tree = fit(&data);
        let root_prediction = tree.root().unwrap().prediction.clone();
        tree.prune_cost_complexity(1.0);
        tree.refresh_stats();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.root().unwrap().prediction, root_prediction);
        assert_eq!(tree.depth, 0);
    }

    #[test]
    fn test_cost_complexity_keeps_clean_split() {
        let data = samples(&[(1.0, "A"), (1.0, "A"), (1.0, "A"), (9.0, "B"), (9.0, "B"), (9.0, "B")]);
        let mut tree = fit(&data);
        tree.prune(PruningMethod::CostComplexity, &data);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_reduced_error_never_grows() {
        let data = noisy();
        let mut tree = fit(&data);
        let (nodes, depth) = (tree.node_count(), tree.max_depth());
        tree.prune(PruningMethod::ReducedError, &data);
        assert!(tree.node_count() <= nodes);
        assert!(tree.max_depth() <= depth);
    }

    #[test]
    fn test_reduced_error_keeps_useful_split() {
        let data = samples(&[(1.0, "A"), (1.0, "A"), (1.0, "A"), (9.0, "B"), (9.0, "B"), (9.0, "B")]);
        let mut tree = fit(&data);
        tree.prune(PruningMethod::ReducedError, &data);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_reduced_error_collapses_on_unseen_data() {
        let data = samples(&[(1.0, "A"), (1.0, "A"), (9.0, "B"), (9.0, "B")]);
        let mut tree = fit(&data);
        // Everything now says "A": the split no longer helps.
        let validation = samples(&[(1.0, "A"), (9.0, "A")]);
        let root_prediction = tree.root().unwrap().prediction.clone();
        tree.prune(PruningMethod::ReducedError, &validation);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.root().unwrap().prediction, root_prediction);
    }

    #[test]
    fn test_sample_loss() {
        let a = TargetValue::Classification("a".to_string());
        let b = TargetValue::Classification("b".to_string());
        assert_eq!(sample_loss(&a, &a), 0.0);
        assert_eq!(sample_loss(&a, &b), 1.0);
        assert_eq!(sample_loss(&TargetValue::Regression(1.0), &TargetValue::Regression(3.0)), 4.0);
        assert_eq!(sample_loss(&a, &TargetValue::Regression(3.0)), 1.0);
    }
}
