//! Splitter
//!
//! Exhaustive search for the best binary split of a node.
use crate::criterion::{impurity, SplitCriterion};
use crate::data::{EncodedTargets, FeatureType, FeatureValue, TrainingSample};
use crate::utils::approx_eq;
use hashbrown::HashSet;
use log::debug;

/// The winning split of a node, with the partition it induces.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitInfo {
    pub split_feature: usize,
    pub split_value: FeatureValue,
    pub split_gain: f64,
    pub left_index: Vec<usize>,
    pub right_index: Vec<usize>,
}

pub trait Splitter {
    fn get_criterion(&self) -> SplitCriterion;
    fn get_min_samples_leaf(&self) -> usize;
    /// Find the split with the strictly greatest impurity gain, or `None` when
    /// no candidate leaves at least `min_samples_leaf` samples on both sides.
    fn best_split(
        &self,
        samples: &[TrainingSample],
        targets: &EncodedTargets,
        index: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitInfo>;
}

/// Tries every threshold between adjacent distinct ordered values and every
/// distinct categorical or binary value, feature by feature.
pub struct BinarySplitter {
    pub criterion: SplitCriterion,
    pub min_samples_leaf: usize,
    pub feature_types: Vec<FeatureType>,
}

impl BinarySplitter {
    pub fn new(criterion: SplitCriterion, min_samples_leaf: usize, feature_types: Vec<FeatureType>) -> Self {
        BinarySplitter {
            criterion,
            min_samples_leaf,
            feature_types,
        }
    }

    /// Candidate thresholds of `feature` over the samples in `index`, in evaluation order.
    ///
    /// Only values whose variant matches the configured feature type are considered.
    pub fn candidate_thresholds(&self, feature: usize, samples: &[TrainingSample], index: &[usize]) -> Vec<FeatureValue> {
        let values = index.iter().map(|&i| &samples[i].features[feature]);
        match self.feature_types[feature] {
            FeatureType::Numeric => {
                let mut v: Vec<f64> = values
                    .filter_map(|f| match f {
                        FeatureValue::Numeric(x) => Some(*x),
                        _ => None,
                    })
                    .collect();
                v.sort_by(|a, b| a.total_cmp(b));
                let mut distinct: Vec<f64> = Vec::with_capacity(v.len());
                for x in v {
                    match distinct.last() {
                        Some(last) if approx_eq(*last, x) => {}
                        _ => distinct.push(x),
                    }
                }
                distinct
                    .windows(2)
                    .map(|w| FeatureValue::Numeric((w[0] + w[1]) / 2.0))
                    .collect()
            }
            FeatureType::Ordinal => {
                let mut v: Vec<i64> = values
                    .filter_map(|f| match f {
                        FeatureValue::Ordinal(x) => Some(*x),
                        _ => None,
                    })
                    .collect();
                v.sort();
                v.dedup();
                // The floored midpoint induces the same partition as the exact one.
                // Widened so that values at opposite ends of the range cannot overflow.
                v.windows(2)
                    .map(|w| FeatureValue::Ordinal((w[0] as i128 + w[1] as i128).div_euclid(2) as i64))
                    .collect()
            }
            FeatureType::Categorical => {
                let mut seen: HashSet<&str> = HashSet::new();
                let mut distinct = Vec::new();
                for f in values {
                    if let FeatureValue::Categorical(s) = f {
                        if seen.insert(s.as_str()) {
                            distinct.push(f.clone());
                        }
                    }
                }
                distinct
            }
            FeatureType::Binary => {
                let mut distinct: Vec<FeatureValue> = Vec::with_capacity(2);
                for f in values {
                    if matches!(f, FeatureValue::Binary(_)) && !distinct.iter().any(|d| d.matches(f)) {
                        distinct.push(f.clone());
                    }
                }
                distinct
            }
        }
    }

    fn evaluate_split(
        &self,
        feature: usize,
        threshold: &FeatureValue,
        samples: &[TrainingSample],
        targets: &EncodedTargets,
        index: &[usize],
        parent_impurity: f64,
    ) -> Option<(f64, Vec<usize>, Vec<usize>)> {
        let (left, right) = partition(samples, index, feature, threshold);
        if left.len() < self.min_samples_leaf || right.len() < self.min_samples_leaf {
            return None;
        }
        let n = index.len() as f64;
        let left_impurity = impurity(self.criterion, targets, &left);
        let right_impurity = impurity(self.criterion, targets, &right);
        let weighted = (left.len() as f64 * left_impurity + right.len() as f64 * right_impurity) / n;
        Some((parent_impurity - weighted, left, right))
    }
}

impl Splitter for BinarySplitter {
    fn get_criterion(&self) -> SplitCriterion {
        self.criterion
    }

    fn get_min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    fn best_split(
        &self,
        samples: &[TrainingSample],
        targets: &EncodedTargets,
        index: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitInfo> {
        let mut best: Option<SplitInfo> = None;
        for feature in 0..self.feature_types.len() {
            for threshold in self.candidate_thresholds(feature, samples, index) {
                let Some((gain, left, right)) =
                    self.evaluate_split(feature, &threshold, samples, targets, index, parent_impurity)
                else {
                    continue;
                };
                let better = match &best {
                    Some(b) => gain > b.split_gain,
                    None => true,
                };
                if better {
                    best = Some(SplitInfo {
                        split_feature: feature,
                        split_value: threshold,
                        split_gain: gain,
                        left_index: left,
                        right_index: right,
                    });
                }
            }
        }
        if let Some(b) = &best {
            debug!(
                "best split on feature {} {} {} with gain {:.6} ({} / {})",
                b.split_feature,
                b.split_value.split_operator(),
                b.split_value,
                b.split_gain,
                b.left_index.len(),
                b.right_index.len()
            );
        }
        best
    }
}

/// Split `index` into the samples that go left of `threshold` and the rest, keeping order.
pub fn partition(
    samples: &[TrainingSample],
    index: &[usize],
    feature: usize,
    threshold: &FeatureValue,
) -> (Vec<usize>, Vec<usize>) {
    index
        .iter()
        .copied()
        .partition(|&i| samples[i].features[feature].goes_left(threshold))
}
