use crate::data::FeatureType;
use crate::errors::TreeError;
use crate::model::core::DecisionTree;

impl DecisionTree {
    // Set methods for feature metadata

    /// Set the type of a feature.
    /// * `index` - Index of the feature.
    /// * `feature_type` - Controls split candidates and how mixed input is fanned out.
    pub fn set_feature_type(&mut self, index: usize, feature_type: FeatureType) -> Result<(), TreeError> {
        self.guard()?;
        let result = self.store.feature_mut(index).map(|f| f.feature_type = feature_type);
        self.latch(result)
    }

    /// Set the display name of a feature, used in tree dumps.
    pub fn set_feature_name(&mut self, index: usize, name: &str) -> Result<(), TreeError> {
        self.guard()?;
        let result = self.store.feature_mut(index).map(|f| f.name = name.to_string());
        self.latch(result)
    }

    /// Set the categorical vocabulary of a feature. Duplicates are dropped,
    /// first occurrence kept.
    pub fn set_categorical_values(&mut self, index: usize, values: &[&str]) -> Result<(), TreeError> {
        self.guard()?;
        let mut categories: Vec<String> = Vec::with_capacity(values.len());
        for v in values {
            if !categories.iter().any(|c| c == v) {
                categories.push(v.to_string());
            }
        }
        let result = self.store.feature_mut(index).map(|f| f.categories = categories);
        self.latch(result)
    }
}
