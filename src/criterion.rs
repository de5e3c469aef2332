//! Impurity criteria and node statistics.
use crate::constants::VARIANCE_THRESHOLD;
use crate::data::{EncodedTargets, Target, TargetValue, TrainingSample};
use crate::errors::TreeError;
use crate::utils::{items_to_strings, mean, median, variance};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitCriterion {
    /// Pick from the composition of the training set.
    #[default]
    Auto,
    Gini,
    Entropy,
    MeanSquaredError,
    MeanAbsoluteError,
}

impl SplitCriterion {
    /// Replace `Auto` with the default criterion of the tree type.
    pub fn resolve(self, tree_type: TreeType) -> SplitCriterion {
        match self {
            SplitCriterion::Auto => tree_type.default_criterion(),
            c => c,
        }
    }
}

impl FromStr for SplitCriterion {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Auto" => Ok(SplitCriterion::Auto),
            "Gini" => Ok(SplitCriterion::Gini),
            "Entropy" => Ok(SplitCriterion::Entropy),
            "MeanSquaredError" => Ok(SplitCriterion::MeanSquaredError),
            "MeanAbsoluteError" => Ok(SplitCriterion::MeanAbsoluteError),
            _ => Err(TreeError::ParseString(
                s.to_string(),
                "SplitCriterion".to_string(),
                items_to_strings(vec!["Auto", "Gini", "Entropy", "MeanSquaredError", "MeanAbsoluteError"]),
            )),
        }
    }
}

impl Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SplitCriterion::Auto => "Auto",
            SplitCriterion::Gini => "Gini",
            SplitCriterion::Entropy => "Entropy",
            SplitCriterion::MeanSquaredError => "MeanSquaredError",
            SplitCriterion::MeanAbsoluteError => "MeanAbsoluteError",
        };
        write!(f, "{}", s)
    }
}

/// Composition of the training targets.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum TreeType {
    Classification,
    Regression,
    Mixed,
}

impl TreeType {
    /// Scan the samples once. Returns `None` for an empty set.
    pub fn detect(samples: &[TrainingSample]) -> Option<TreeType> {
        let n_class = samples.iter().filter(|s| s.target.is_classification()).count();
        match (n_class, samples.len() - n_class) {
            (0, 0) => None,
            (_, 0) => Some(TreeType::Classification),
            (0, _) => Some(TreeType::Regression),
            _ => Some(TreeType::Mixed),
        }
    }

    pub fn default_criterion(&self) -> SplitCriterion {
        match self {
            TreeType::Classification | TreeType::Mixed => SplitCriterion::Gini,
            TreeType::Regression => SplitCriterion::MeanSquaredError,
        }
    }
}

impl Display for TreeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TreeType::Classification => "Classification",
            TreeType::Regression => "Regression",
            TreeType::Mixed => "Mixed",
        };
        write!(f, "{}", s)
    }
}

/// Class counts over `index`, as `(class id, count)` in first-encountered order.
pub fn class_counts(targets: &EncodedTargets, index: &[usize]) -> Vec<(usize, usize)> {
    let mut slots: HashMap<usize, usize> = HashMap::new();
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &i in index {
        if let Target::Class(c) = targets.targets[i] {
            match slots.get(&c) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    slots.insert(c, counts.len());
                    counts.push((c, 1));
                }
            }
        }
    }
    counts
}

pub fn regression_values(targets: &EncodedTargets, index: &[usize]) -> Vec<f64> {
    index
        .iter()
        .filter_map(|&i| match targets.targets[i] {
            Target::Value(v) => Some(v),
            Target::Class(_) => None,
        })
        .collect()
}

pub fn gini(counts: &[(usize, usize)]) -> f64 {
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    if total == 0 {
        return 0.0;
    }
    let sum_sq: f64 = counts
        .iter()
        .map(|(_, c)| {
            let p = *c as f64 / total as f64;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

pub fn entropy(counts: &[(usize, usize)]) -> f64 {
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|(_, c)| *c > 0)
        .map(|(_, c)| {
            let p = *c as f64 / total as f64;
            -p * p.log2()
        })
        .sum::<f64>()
        .max(0.0)
}

/// Mean squared deviation from the mean.
pub fn mean_squared_error(values: &[f64]) -> f64 {
    variance(values)
}

/// Mean absolute deviation from the median.
pub fn mean_absolute_error(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = median(values);
    values.iter().map(|v| (v - m).abs()).sum::<f64>() / values.len() as f64
}

/// Impurity of the samples in `index` under `criterion`.
///
/// `Auto` must have been resolved beforehand; it is treated as Gini here.
pub fn impurity(criterion: SplitCriterion, targets: &EncodedTargets, index: &[usize]) -> f64 {
    match criterion {
        SplitCriterion::Gini | SplitCriterion::Auto => gini(&class_counts(targets, index)),
        SplitCriterion::Entropy => entropy(&class_counts(targets, index)),
        SplitCriterion::MeanSquaredError => mean_squared_error(&regression_values(targets, index)),
        SplitCriterion::MeanAbsoluteError => mean_absolute_error(&regression_values(targets, index)),
    }
}

/// Whether the samples share one label, or carry near-constant regression values.
pub fn is_homogeneous(targets: &EncodedTargets, index: &[usize]) -> bool {
    let Some(&first) = index.first() else {
        return true;
    };
    match targets.targets[first] {
        Target::Class(c) => index.iter().all(|&i| targets.targets[i] == Target::Class(c)),
        Target::Value(_) => {
            let values = regression_values(targets, index);
            values.len() == index.len() && variance(&values) < VARIANCE_THRESHOLD
        }
    }
}

/// Statistics of the samples reaching a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStats {
    pub n_samples: usize,
    pub impurity: f64,
    pub prediction: TargetValue,
    pub class_probabilities: Option<Vec<(String, f64)>>,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
}

impl NodeStats {
    pub fn compute(criterion: SplitCriterion, targets: &EncodedTargets, index: &[usize]) -> Self {
        let counts = class_counts(targets, index);
        let values = regression_values(targets, index);

        let n_class: usize = counts.iter().map(|(_, c)| c).sum();
        let class_probabilities = if counts.is_empty() {
            None
        } else {
            Some(
                counts
                    .iter()
                    .map(|(id, c)| (targets.labels.label(*id).to_string(), *c as f64 / n_class as f64))
                    .collect(),
            )
        };
        let (node_mean, node_variance) = if values.is_empty() {
            (None, None)
        } else {
            (Some(mean(&values)), Some(variance(&values)))
        };

        let prediction = match majority_class(&counts) {
            Some(id) => TargetValue::Classification(targets.labels.label(id).to_string()),
            None => TargetValue::Regression(node_mean.unwrap_or(0.0)),
        };

        NodeStats {
            n_samples: index.len(),
            impurity: impurity(criterion, targets, index),
            prediction,
            class_probabilities,
            mean: node_mean,
            variance: node_variance,
        }
    }
}

/// Most frequent class, ties broken by first-encountered order.
fn majority_class(counts: &[(usize, usize)]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for &(id, c) in counts {
        match best {
            Some((_, best_count)) if c <= best_count => {}
            _ => best = Some((id, c)),
        }
    }
    best.map(|(id, _)| id)
}
