//! Sample Store
//!
//! Bounded collection of labeled training samples together with the
//! per-feature metadata (type, display name, categorical vocabulary).
use crate::data::{FeatureType, FeatureValue, TargetValue, TrainingSample};
use crate::errors::TreeError;
use serde::{Deserialize, Serialize};

/// Metadata describing a single feature column.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FeatureMeta {
    pub feature_type: FeatureType,
    pub name: String,
    pub categories: Vec<String>,
}

impl FeatureMeta {
    fn with_index(index: usize) -> Self {
        FeatureMeta {
            feature_type: FeatureType::Numeric,
            name: format!("feature_{}", index),
            categories: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SampleStore {
    capacity: usize,
    features: Vec<FeatureMeta>,
    samples: Vec<TrainingSample>,
    next_id: usize,
}

impl SampleStore {
    pub fn new(n_features: usize, capacity: usize) -> Self {
        SampleStore {
            capacity,
            features: (0..n_features).map(FeatureMeta::with_index).collect(),
            samples: Vec::with_capacity(capacity),
            next_id: 0,
        }
    }

    /// Add a sample, returning its identifier. The store is left untouched on failure.
    pub fn add(&mut self, features: Vec<FeatureValue>, target: TargetValue) -> Result<usize, TreeError> {
        if self.is_full() {
            return Err(TreeError::StoreFull(self.capacity));
        }
        if features.len() != self.n_features() {
            return Err(TreeError::FeatureCountMismatch(self.n_features(), features.len()));
        }
        let id = self.next_id;
        self.samples.push(TrainingSample::new(id, features, target));
        self.next_id += 1;
        Ok(id)
    }

    /// Remove the sample at `index`, shifting later samples down.
    pub fn remove(&mut self, index: usize) -> Result<TrainingSample, TreeError> {
        if index >= self.samples.len() {
            return Err(TreeError::SampleOutOfRange(index, self.samples.len()));
        }
        Ok(self.samples.remove(index))
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next_id = 0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&TrainingSample> {
        self.samples.get(index)
    }

    /// Number of classification samples carrying `label`.
    pub fn count_by_label(&self, label: &str) -> usize {
        self.samples.iter().filter(|s| s.target.label() == Some(label)).count()
    }

    pub fn features(&self) -> &[FeatureMeta] {
        &self.features
    }

    pub fn feature_types(&self) -> Vec<FeatureType> {
        self.features.iter().map(|f| f.feature_type).collect()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// Mutable access to the metadata of one feature.
    pub fn feature_mut(&mut self, index: usize) -> Result<&mut FeatureMeta, TreeError> {
        let n_features = self.features.len();
        self.features
            .get_mut(index)
            .ok_or(TreeError::FeatureOutOfRange(index, n_features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(x: f64) -> Vec<FeatureValue> {
        vec![FeatureValue::Numeric(x), FeatureValue::Categorical("a".to_string())]
    }

    #[test]
    fn test_add_until_full() {
        let mut store = SampleStore::new(2, 2);
        assert_eq!(store.add(features(1.0), TargetValue::Regression(1.0)), Ok(0));
        assert_eq!(store.add(features(2.0), TargetValue::Regression(2.0)), Ok(1));
        let before = store.samples().to_vec();
        assert_eq!(
            store.add(features(3.0), TargetValue::Regression(3.0)),
            Err(TreeError::StoreFull(2))
        );
        assert_eq!(store.samples(), &before[..]);
        assert!(store.is_full());
    }

    #[test]
    fn test_add_wrong_length() {
        let mut store = SampleStore::new(2, 5);
        let err = store
            .add(vec![FeatureValue::Numeric(1.0)], TargetValue::Regression(1.0))
            .unwrap_err();
        assert_eq!(err, TreeError::FeatureCountMismatch(2, 1));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = SampleStore::new(2, 5);
        for i in 0..3 {
            store
                .add(features(i as f64), TargetValue::Classification(format!("c{}", i % 2)))
                .unwrap();
        }
        assert_eq!(store.count_by_label("c0"), 2);
        let removed = store.remove(1).unwrap();
        assert_eq!(removed.id, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().id, 2);
        assert_eq!(store.remove(7), Err(TreeError::SampleOutOfRange(7, 2)));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.add(features(0.0), TargetValue::Regression(0.0)), Ok(0));
    }

    #[test]
    fn test_feature_metadata() {
        let mut store = SampleStore::new(2, 5);
        assert_eq!(store.feature_names(), vec!["feature_0".to_string(), "feature_1".to_string()]);
        store.feature_mut(1).unwrap().feature_type = FeatureType::Categorical;
        assert_eq!(store.feature_types(), vec![FeatureType::Numeric, FeatureType::Categorical]);
        assert_eq!(store.feature_mut(2).unwrap_err(), TreeError::FeatureOutOfRange(2, 2));
    }
}
