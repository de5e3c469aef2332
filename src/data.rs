//! Data
//!
//! Feature and target value types, training samples, and the encoded target
//! view consumed by the impurity and split routines.
use crate::errors::TreeError;
use crate::utils::{approx_eq, items_to_strings};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Kind of a feature column. Controls split candidates and input fan-out.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureType {
    /// Continuous values, split with `<=` thresholds.
    #[default]
    Numeric,
    /// Unordered labels, split with equality.
    Categorical,
    /// Ordered integers, split with `<=` thresholds.
    Ordinal,
    /// Booleans, split with equality.
    Binary,
}

impl FromStr for FeatureType {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Numeric" => Ok(FeatureType::Numeric),
            "Categorical" => Ok(FeatureType::Categorical),
            "Ordinal" => Ok(FeatureType::Ordinal),
            "Binary" => Ok(FeatureType::Binary),
            _ => Err(TreeError::ParseString(
                s.to_string(),
                "FeatureType".to_string(),
                items_to_strings(vec!["Numeric", "Categorical", "Ordinal", "Binary"]),
            )),
        }
    }
}

impl Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            FeatureType::Numeric => "Numeric",
            FeatureType::Categorical => "Categorical",
            FeatureType::Ordinal => "Ordinal",
            FeatureType::Binary => "Binary",
        };
        write!(f, "{}", s)
    }
}

/// A single feature value.
///
/// Comparisons are only defined between values of the same variant. Values of
/// different variants are neither equal nor ordered.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
    Ordinal(i64),
    Binary(bool),
}

impl FeatureValue {
    /// Same-variant equality, numeric values within the feature tolerance.
    pub fn matches(&self, other: &FeatureValue) -> bool {
        match (self, other) {
            (FeatureValue::Numeric(a), FeatureValue::Numeric(b)) => approx_eq(*a, *b),
            (FeatureValue::Ordinal(a), FeatureValue::Ordinal(b)) => a == b,
            (FeatureValue::Categorical(a), FeatureValue::Categorical(b)) => a == b,
            (FeatureValue::Binary(a), FeatureValue::Binary(b)) => a == b,
            _ => false,
        }
    }

    /// Same-variant `<=`, only defined for numeric and ordinal values.
    pub fn is_at_most(&self, other: &FeatureValue) -> bool {
        match (self, other) {
            (FeatureValue::Numeric(a), FeatureValue::Numeric(b)) => a <= b || approx_eq(*a, *b),
            (FeatureValue::Ordinal(a), FeatureValue::Ordinal(b)) => a <= b,
            _ => false,
        }
    }

    /// Routing rule for a split on `threshold`: `<=` for ordered values,
    /// equality for categorical and binary values.
    pub fn goes_left(&self, threshold: &FeatureValue) -> bool {
        match threshold {
            FeatureValue::Numeric(_) | FeatureValue::Ordinal(_) => self.is_at_most(threshold),
            FeatureValue::Categorical(_) | FeatureValue::Binary(_) => self.matches(threshold),
        }
    }

    /// The comparison operator used when this value is a split threshold.
    pub fn split_operator(&self) -> &'static str {
        match self {
            FeatureValue::Numeric(_) | FeatureValue::Ordinal(_) => "<=",
            FeatureValue::Categorical(_) | FeatureValue::Binary(_) => "==",
        }
    }
}

impl Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeatureValue::Numeric(v) => write!(f, "{:.4}", v),
            FeatureValue::Categorical(v) => write!(f, "{}", v),
            FeatureValue::Ordinal(v) => write!(f, "{}", v),
            FeatureValue::Binary(v) => write!(f, "{}", v),
        }
    }
}

/// Target of a training sample, or the prediction of a node.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum TargetValue {
    Classification(String),
    Regression(f64),
}

impl TargetValue {
    pub fn label(&self) -> Option<&str> {
        match self {
            TargetValue::Classification(l) => Some(l.as_str()),
            TargetValue::Regression(_) => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            TargetValue::Classification(_) => None,
            TargetValue::Regression(v) => Some(*v),
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, TargetValue::Classification(_))
    }
}

impl Display for TargetValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TargetValue::Classification(l) => write!(f, "{}", l),
            TargetValue::Regression(v) => write!(f, "{:.4}", v),
        }
    }
}

/// A labeled example. Never mutated after creation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrainingSample {
    pub id: usize,
    pub features: Vec<FeatureValue>,
    pub target: TargetValue,
}

impl TrainingSample {
    pub fn new(id: usize, features: Vec<FeatureValue>, target: TargetValue) -> Self {
        TrainingSample { id, features, target }
    }
}

/// Fan raw numeric and categorical streams out into typed feature slots.
///
/// Features are filled in index order. Numeric, ordinal and binary features
/// consume the next numeric input, categorical features the next categorical
/// input. Ordinal values are truncated, binary values are `true` when non-zero.
pub fn fan_out(types: &[FeatureType], numeric: &[f64], categorical: &[&str]) -> Result<Vec<FeatureValue>, TreeError> {
    let mut numeric_iter = numeric.iter();
    let mut categorical_iter = categorical.iter();
    let mut features = Vec::with_capacity(types.len());
    for (i, feature_type) in types.iter().enumerate() {
        let value = match feature_type {
            FeatureType::Categorical => {
                let v = categorical_iter.next().ok_or(TreeError::InputExhausted(i))?;
                FeatureValue::Categorical(v.to_string())
            }
            _ => {
                let v = *numeric_iter.next().ok_or(TreeError::InputExhausted(i))?;
                match feature_type {
                    FeatureType::Ordinal => FeatureValue::Ordinal(v as i64),
                    FeatureType::Binary => FeatureValue::Binary(v != 0.0),
                    _ => FeatureValue::Numeric(v),
                }
            }
        };
        features.push(value);
    }
    Ok(features)
}

/// Dense integer ids for class labels, assigned in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct LabelInterner {
    ids: HashMap<String, usize>,
    labels: Vec<String>,
}

impl LabelInterner {
    pub fn new() -> Self {
        LabelInterner::default()
    }

    pub fn intern(&mut self, label: &str) -> usize {
        if let Some(id) = self.ids.get(label) {
            return *id;
        }
        let id = self.labels.len();
        self.ids.insert(label.to_string(), id);
        self.labels.push(label.to_string());
        id
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.ids.get(label).copied()
    }

    pub fn label(&self, id: usize) -> &str {
        &self.labels[id]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Target of a sample, with class labels replaced by interned ids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Class(usize),
    Value(f64),
}

/// Targets of a full training set, indexed like the samples.
#[derive(Debug, Clone)]
pub struct EncodedTargets {
    pub targets: Vec<Target>,
    pub labels: LabelInterner,
}

impl EncodedTargets {
    pub fn from_samples(samples: &[TrainingSample]) -> Self {
        let mut labels = LabelInterner::new();
        let targets = samples
            .iter()
            .map(|s| match &s.target {
                TargetValue::Classification(l) => Target::Class(labels.intern(l)),
                TargetValue::Regression(v) => Target::Value(*v),
            })
            .collect();
        EncodedTargets { targets, labels }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_value_comparisons() {
        let a = FeatureValue::Numeric(1.0);
        let b = FeatureValue::Numeric(1.0 + 1e-9);
        assert!(a.matches(&b));
        assert!(b.is_at_most(&a));
        assert!(FeatureValue::Ordinal(2).is_at_most(&FeatureValue::Ordinal(3)));
        assert!(!FeatureValue::Ordinal(4).is_at_most(&FeatureValue::Ordinal(3)));
        assert!(FeatureValue::Categorical("red".to_string()).matches(&FeatureValue::Categorical("red".to_string())));
        assert!(FeatureValue::Binary(true).matches(&FeatureValue::Binary(true)));
    }

    #[test]
    fn test_mixed_variants_not_comparable() {
        let n = FeatureValue::Numeric(1.0);
        let o = FeatureValue::Ordinal(1);
        assert!(!n.matches(&o));
        assert!(!n.is_at_most(&o));
        assert!(!o.goes_left(&n));
        assert!(!FeatureValue::Binary(true).goes_left(&FeatureValue::Categorical("true".to_string())));
    }

    #[test]
    fn test_goes_left() {
        assert!(FeatureValue::Numeric(2.0).goes_left(&FeatureValue::Numeric(2.5)));
        assert!(!FeatureValue::Numeric(3.0).goes_left(&FeatureValue::Numeric(2.5)));
        let red = FeatureValue::Categorical("red".to_string());
        assert!(red.goes_left(&FeatureValue::Categorical("red".to_string())));
        assert!(!red.goes_left(&FeatureValue::Categorical("blue".to_string())));
    }

    #[test]
    fn test_fan_out() {
        let types = [
            FeatureType::Numeric,
            FeatureType::Categorical,
            FeatureType::Ordinal,
            FeatureType::Binary,
        ];
        let features = fan_out(&types, &[1.5, 3.9, 0.0], &["warm"]).unwrap();
        assert_eq!(
            features,
            vec![
                FeatureValue::Numeric(1.5),
                FeatureValue::Categorical("warm".to_string()),
                FeatureValue::Ordinal(3),
                FeatureValue::Binary(false),
            ]
        );
    }

    #[test]
    fn test_fan_out_exhausted() {
        let types = [FeatureType::Numeric, FeatureType::Categorical];
        assert_eq!(fan_out(&types, &[1.0], &[]), Err(TreeError::InputExhausted(1)));
        assert_eq!(fan_out(&types, &[], &["a"]), Err(TreeError::InputExhausted(0)));
    }

    #[test]
    fn test_feature_type_parse() {
        assert_eq!("Ordinal".parse::<FeatureType>().unwrap(), FeatureType::Ordinal);
        assert!("Text".parse::<FeatureType>().is_err());
        assert_eq!(FeatureType::Binary.to_string(), "Binary");
    }

    #[test]
    fn test_encoded_targets() {
        let samples = vec![
            TrainingSample::new(0, vec![], TargetValue::Classification("b".to_string())),
            TrainingSample::new(1, vec![], TargetValue::Regression(2.0)),
            TrainingSample::new(2, vec![], TargetValue::Classification("a".to_string())),
            TrainingSample::new(3, vec![], TargetValue::Classification("b".to_string())),
        ];
        let encoded = EncodedTargets::from_samples(&samples);
        assert_eq!(
            encoded.targets,
            vec![Target::Class(0), Target::Value(2.0), Target::Class(1), Target::Class(0)]
        );
        assert_eq!(encoded.labels.label(1), "a");
        assert_eq!(encoded.labels.get("b"), Some(0));
        assert_eq!(encoded.labels.len(), 2);
    }
}
