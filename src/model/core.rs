use crate::criterion::{SplitCriterion, TreeType};
use crate::data::{fan_out, EncodedTargets, FeatureValue, TargetValue, TrainingSample};
use crate::errors::TreeError;
use crate::model::config::{ModelConfig, ModelIO};
use crate::node::Node;
use crate::prune::PruningMethod;
use crate::splitter::BinarySplitter;
use crate::store::{FeatureMeta, SampleStore};
use crate::tree::tree::{Tree, TreeParams};
use crate::utils::fmt_vec_output;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Decision tree model over mixed feature and target types.
///
/// Every mutating operation returns a `Result`. A failure is also latched in
/// the model, and while it is latched further mutations are refused with
/// `TreeError::ErrorPending` until `clear_error` or `clear` is called.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTree {
    pub cfg: ModelConfig,
    pub(crate) store: SampleStore,
    /// Criterion requested on the last training run.
    pub criterion: SplitCriterion,
    /// Criterion actually used, `Auto` resolved.
    pub active_criterion: SplitCriterion,
    pub tree_type: Option<TreeType>,
    pub pruning: PruningMethod,
    pub tree: Option<Tree>,
    pub feature_importance: Vec<f64>,
    #[serde(skip)]
    error: Option<TreeError>,
}

impl DecisionTree {
    /// Create an empty model. Fails when the configuration is invalid.
    ///
    /// * `cfg` - Feature count, sample capacity and stopping rules.
    pub fn new(cfg: ModelConfig) -> Result<Self, TreeError> {
        cfg.validate()?;
        Ok(DecisionTree {
            store: SampleStore::new(cfg.n_features, cfg.max_samples),
            feature_importance: vec![0.0; cfg.n_features],
            cfg,
            criterion: SplitCriterion::Auto,
            active_criterion: SplitCriterion::Auto,
            tree_type: None,
            pruning: PruningMethod::None,
            tree: None,
            error: None,
        })
    }

    pub(crate) fn guard(&self) -> Result<(), TreeError> {
        match &self.error {
            Some(e) => Err(TreeError::ErrorPending(e.to_string())),
            None => Ok(()),
        }
    }

    /// Record a failure so later mutations are refused.
    pub(crate) fn latch<T>(&mut self, result: Result<T, TreeError>) -> Result<T, TreeError> {
        if let Err(e) = &result {
            warn!("{}", e);
            self.error = Some(e.clone());
        }
        result
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&TreeError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Add a sample and return its identifier.
    pub fn add_sample(&mut self, features: Vec<FeatureValue>, target: TargetValue) -> Result<usize, TreeError> {
        self.guard()?;
        let result = self.store.add(features, target);
        self.latch(result)
    }

    pub fn add_classification_sample(&mut self, features: Vec<FeatureValue>, label: &str) -> Result<usize, TreeError> {
        self.add_sample(features, TargetValue::Classification(label.to_string()))
    }

    pub fn add_regression_sample(&mut self, features: Vec<FeatureValue>, value: f64) -> Result<usize, TreeError> {
        self.add_sample(features, TargetValue::Regression(value))
    }

    /// Add a sample from raw numeric and categorical streams, filled according
    /// to the configured feature types.
    pub fn add_sample_mixed(
        &mut self,
        numeric: &[f64],
        categorical: &[&str],
        target: TargetValue,
    ) -> Result<usize, TreeError> {
        self.guard()?;
        let features = fan_out(&self.store.feature_types(), numeric, categorical);
        let features = self.latch(features)?;
        self.add_sample(features, target)
    }

    /// Remove the sample at `index`. The trained tree is dropped.
    pub fn remove_sample(&mut self, index: usize) -> Result<TrainingSample, TreeError> {
        self.guard()?;
        let result = self.store.remove(index);
        let removed = self.latch(result)?;
        self.reset();
        Ok(removed)
    }

    /// Remove all samples and the tree, keeping configuration and feature metadata.
    pub fn clear(&mut self) {
        self.store.clear();
        self.reset();
        self.error = None;
    }

    fn reset(&mut self) {
        self.tree = None;
        self.tree_type = None;
        self.feature_importance = vec![0.0; self.cfg.n_features];
    }

    pub fn sample_count(&self) -> usize {
        self.store.len()
    }

    pub fn sample_count_by_label(&self, label: &str) -> usize {
        self.store.count_by_label(label)
    }

    pub fn samples(&self) -> &[TrainingSample] {
        self.store.samples()
    }

    pub fn features(&self) -> &[FeatureMeta] {
        self.store.features()
    }

    /// Build a tree over all stored samples, replacing any previous one.
    ///
    /// * `criterion` - Impurity measure, `Auto` picks one from the target types.
    /// * `pruning` - Simplification applied after the build.
    pub fn train(&mut self, criterion: SplitCriterion, pruning: PruningMethod) -> Result<(), TreeError> {
        self.guard()?;
        self.reset();
        self.criterion = criterion;
        self.pruning = pruning;
        let result = self.fit_tree();
        self.latch(result)
    }

    fn fit_tree(&mut self) -> Result<(), TreeError> {
        let start = Instant::now();
        let samples = self.store.samples();
        let tree_type = TreeType::detect(samples)
            .ok_or(TreeError::InsufficientSamples(0, self.cfg.min_samples_split))?;
        let active_criterion = self.criterion.resolve(tree_type);
        info!(
            "Training a {} tree on {} samples with {} criterion.",
            tree_type,
            samples.len(),
            active_criterion
        );

        let targets = EncodedTargets::from_samples(samples);
        let splitter = BinarySplitter::new(active_criterion, self.cfg.min_samples_leaf, self.store.feature_types());
        let params = TreeParams {
            max_depth: self.cfg.max_depth,
            min_samples_split: self.cfg.min_samples_split,
        };
        let mut tree = Tree::new();
        tree.fit(samples, &targets, &splitter, &params)?;
        tree.prune(self.pruning, samples);

        self.feature_importance = tree.calculate_feature_importance(self.cfg.n_features);
        info!(
            "Finished training a tree with {} nodes, {} leaves and depth {} in {} ms.",
            tree.node_count(),
            tree.leaf_count(),
            tree.max_depth(),
            start.elapsed().as_millis()
        );
        self.tree_type = Some(tree_type);
        self.active_criterion = active_criterion;
        self.tree = Some(tree);
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.tree.is_some()
    }

    pub fn node_count(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.node_count())
    }

    pub fn leaf_count(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.leaf_count())
    }

    pub fn depth(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.max_depth())
    }

    pub fn get_node(&self, node_idx: usize) -> Option<&Node> {
        self.tree.as_ref()?.nodes.get(&node_idx)
    }

    /// One line description of a node, naming its split feature.
    pub fn node_summary(&self, node_idx: usize) -> Option<String> {
        let node = self.get_node(node_idx)?;
        let name = self
            .store
            .features()
            .get(node.split_feature)
            .map_or_else(|| node.split_feature.to_string(), |f| f.name.clone());
        Some(node.describe(&name))
    }

    pub fn feature_importance(&self) -> &[f64] {
        &self.feature_importance
    }

    pub fn summary(&self) -> String {
        let mut r = String::new();
        r += format!("samples: {}/{}\n", self.store.len(), self.store.capacity()).as_str();
        for (i, meta) in self.store.features().iter().enumerate() {
            r += format!("feature {}: {} ({})", i, meta.name, meta.feature_type).as_str();
            if !meta.categories.is_empty() {
                r += format!(" [{}]", meta.categories.join(", ")).as_str();
            }
            r += "\n";
        }
        match (&self.tree, self.tree_type) {
            (Some(tree), Some(tree_type)) => {
                r += format!(
                    "tree: {}, criterion: {}, pruning: {}\n",
                    tree_type, self.active_criterion, self.pruning
                )
                .as_str();
                r += format!(
                    "nodes: {}, leaves: {}, depth: {}\n",
                    tree.node_count(),
                    tree.leaf_count(),
                    tree.max_depth()
                )
                .as_str();
                r += format!("importance: [{}]\n", fmt_vec_output(&self.feature_importance)).as_str();
            }
            _ => r += "tree: untrained\n",
        }
        if let Some(e) = &self.error {
            r += format!("error: {}\n", e).as_str();
        }
        r
    }
}

impl DecisionTree {
    /// Cross-check the parts of a deserialized model against its configuration.
    fn check_consistency(&self) -> Result<(), String> {
        self.cfg.validate().map_err(|e| e.to_string())?;
        let n_features = self.cfg.n_features;
        if self.store.n_features() != n_features {
            return Err(format!(
                "store describes {} features, configuration {}",
                self.store.n_features(),
                n_features
            ));
        }
        if self.store.capacity() != self.cfg.max_samples || self.store.len() > self.cfg.max_samples {
            return Err(format!(
                "store holds {} of {} samples, configuration allows {}",
                self.store.len(),
                self.store.capacity(),
                self.cfg.max_samples
            ));
        }
        if let Some(s) = self.store.samples().iter().find(|s| s.features.len() != n_features) {
            return Err(format!("sample {} has {} features", s.id, s.features.len()));
        }
        if self.feature_importance.len() != n_features {
            return Err(format!("{} feature importances", self.feature_importance.len()));
        }
        if let Some(tree) = &self.tree {
            tree.check_structure(n_features, self.cfg.max_depth)?;
        }
        Ok(())
    }
}

impl ModelIO for DecisionTree {
    /// Load from a json string, rejecting dumps whose tree or metadata are inconsistent.
    fn from_json(json_str: &str) -> Result<Self, TreeError> {
        let model: DecisionTree =
            serde_json::from_str(json_str).map_err(|e| TreeError::UnableToRead(e.to_string()))?;
        model.check_consistency().map_err(TreeError::UnableToRead)?;
        Ok(model)
    }
}

impl fmt::Display for DecisionTree {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.tree {
            Some(tree) => write!(f, "{}", tree.render(&self.store.feature_names())),
            None => write!(f, "untrained"),
        }
    }
}

#[cfg(test)]
mod decision_tree_test {
    use super::*;
    use crate::data::FeatureType;
    use approx::assert_relative_eq;

    fn toy_model() -> DecisionTree {
        let mut model = DecisionTree::new(ModelConfig::new(1, 20)).unwrap();
        for (x, l) in [(1.0, "A"), (1.0, "A"), (1.0, "A"), (9.0, "B"), (9.0, "B"), (9.0, "B")] {
            model
                .add_classification_sample(vec![FeatureValue::Numeric(x)], l)
                .unwrap();
        }
        model
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(DecisionTree::new(ModelConfig::new(0, 10)).is_err());
        assert!(DecisionTree::new(ModelConfig::new(2, 10).set_max_depth(0)).is_err());
        assert!(DecisionTree::new(ModelConfig::new(2, 10).set_min_samples_split(1)).is_err());
    }

    #[test]
    fn test_train_toy() {
        let mut model = toy_model();
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        println!("{}", model);
        assert_eq!(model.tree_type, Some(TreeType::Classification));
        assert_eq!(model.active_criterion, SplitCriterion::Gini);
        assert_eq!(model.node_count(), 3);
        assert_eq!(model.leaf_count(), 2);
        assert_eq!(model.depth(), 1);
        let root = model.get_node(0).unwrap();
        match root.split_value {
            Some(FeatureValue::Numeric(t)) => assert!(t > 1.0 && t < 9.0),
            ref other => panic!("unexpected threshold {:?}", other),
        }
        assert_eq!(model.feature_importance(), &[1.0]);
        assert!(model.summary().contains("nodes: 3, leaves: 2, depth: 1"));
        assert!(model.node_summary(0).unwrap().starts_with("0:[feature_0 <= 5.0000]"));
        assert!(model.node_summary(7).is_none());
    }

    #[test]
    fn test_constant_regression_root_is_leaf() {
        let mut model = DecisionTree::new(ModelConfig::new(1, 20)).unwrap();
        for x in 0..6 {
            model
                .add_regression_sample(vec![FeatureValue::Numeric(x as f64)], 4.2)
                .unwrap();
        }
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        assert_eq!(model.active_criterion, SplitCriterion::MeanSquaredError);
        assert_eq!(model.node_count(), 1);
        assert_eq!(model.feature_importance(), &[0.0]);
        assert_relative_eq!(model.predict_regression(&[FeatureValue::Numeric(100.0)]), 4.2);
    }

    #[test]
    fn test_capacity_is_sticky() {
        let mut model = DecisionTree::new(ModelConfig::new(1, 2)).unwrap();
        model.add_regression_sample(vec![FeatureValue::Numeric(1.0)], 1.0).unwrap();
        model.add_regression_sample(vec![FeatureValue::Numeric(2.0)], 2.0).unwrap();
        let err = model
            .add_regression_sample(vec![FeatureValue::Numeric(3.0)], 3.0)
            .unwrap_err();
        assert_eq!(err, TreeError::StoreFull(2));
        assert_eq!(model.sample_count(), 2);
        assert!(model.has_error());
        assert_eq!(model.error_message(), Some(TreeError::StoreFull(2).to_string()));

        // Refused until cleared.
        assert!(matches!(
            model.train(SplitCriterion::Auto, PruningMethod::None),
            Err(TreeError::ErrorPending(_))
        ));
        model.clear_error();
        assert!(model.train(SplitCriterion::Auto, PruningMethod::None).is_ok());
    }

    #[test]
    fn test_wrong_feature_count() {
        let mut model = DecisionTree::new(ModelConfig::new(2, 5)).unwrap();
        let err = model
            .add_classification_sample(vec![FeatureValue::Numeric(1.0)], "A")
            .unwrap_err();
        assert_eq!(err, TreeError::FeatureCountMismatch(2, 1));
        assert_eq!(model.sample_count(), 0);
    }

    #[test]
    fn test_train_insufficient_samples() {
        let mut model = DecisionTree::new(ModelConfig::new(1, 5).set_min_samples_split(3)).unwrap();
        assert_eq!(
            model.train(SplitCriterion::Auto, PruningMethod::None),
            Err(TreeError::InsufficientSamples(0, 3))
        );
        model.clear();
        assert!(!model.has_error());
        model.add_classification_sample(vec![FeatureValue::Numeric(1.0)], "A").unwrap();
        assert_eq!(
            model.train(SplitCriterion::Auto, PruningMethod::None),
            Err(TreeError::InsufficientSamples(1, 3))
        );
        assert!(!model.is_trained());
        assert_eq!(model.predict(&[FeatureValue::Numeric(1.0)]), None);
    }

    #[test]
    fn test_clear_keeps_metadata() {
        let mut model = toy_model();
        model.set_feature_name(0, "temperature").unwrap();
        model.train(SplitCriterion::Entropy, PruningMethod::None).unwrap();
        model.clear();
        assert_eq!(model.sample_count(), 0);
        assert!(!model.is_trained());
        assert_eq!(model.features()[0].name, "temperature");
        assert_eq!(model.add_classification_sample(vec![FeatureValue::Numeric(1.0)], "A"), Ok(0));
    }

    #[test]
    fn test_remove_sample_drops_tree() {
        let mut model = toy_model();
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        let removed = model.remove_sample(0).unwrap();
        assert_eq!(removed.id, 0);
        assert_eq!(model.sample_count(), 5);
        assert_eq!(model.sample_count_by_label("A"), 2);
        assert!(!model.is_trained());
        assert!(matches!(model.remove_sample(10), Err(TreeError::SampleOutOfRange(10, 5))));
        assert!(model.has_error());
    }

    #[test]
    fn test_mixed_targets() {
        let mut model = DecisionTree::new(ModelConfig::new(2, 20)).unwrap();
        model.set_feature_type(1, FeatureType::Categorical).unwrap();
        for i in 0..4 {
            model
                .add_sample_mixed(&[i as f64], &["cold"], TargetValue::Regression(i as f64))
                .unwrap();
            model
                .add_sample_mixed(&[i as f64], &["hot"], TargetValue::Classification("fan".to_string()))
                .unwrap();
        }
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        assert_eq!(model.tree_type, Some(TreeType::Mixed));
        assert_eq!(model.active_criterion, SplitCriterion::Gini);
        assert_eq!(model.predict_class_mixed(&[0.0], &["hot"]), "fan");
        assert_eq!(
            model.add_sample_mixed(&[], &["hot"], TargetValue::Regression(1.0)),
            Err(TreeError::InputExhausted(0))
        );
    }

    #[test]
    fn test_retrain_is_deterministic() {
        let mut model = toy_model();
        model.add_classification_sample(vec![FeatureValue::Numeric(5.0)], "B").unwrap();
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        let first = model.to_string();
        let rows: Vec<Vec<FeatureValue>> = (0..12).map(|i| vec![FeatureValue::Numeric(i as f64)]).collect();
        let preds = model.predict_batch(&rows, false);
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        assert_eq!(model.to_string(), first);
        assert_eq!(model.predict_batch(&rows, true), preds);
    }

    #[test]
    fn test_model_io_json() {
        let mut model = toy_model();
        model.set_feature_name(0, "x").unwrap();
        model.train(SplitCriterion::Auto, PruningMethod::CostComplexity).unwrap();
        let json = model.json_dump().unwrap();
        let loaded = DecisionTree::from_json(&json).unwrap();
        assert_eq!(loaded.cfg, model.cfg);
        assert_eq!(loaded.tree, model.tree);
        assert_eq!(loaded.sample_count(), 6);
        assert_eq!(loaded.features()[0].name, "x");
        assert_eq!(loaded.pruning, PruningMethod::CostComplexity);
        assert_eq!(loaded.to_string(), model.to_string());
        assert!(!loaded.has_error());
    }

    #[test]
    fn test_model_io_rejects_inconsistent_dumps() {
        let mut model = toy_model();
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        let json = model.json_dump().unwrap();
        assert!(json.contains(r#""left_child":1"#));

        let looped = json.replacen(r#""left_child":1"#, r#""left_child":0"#, 1);
        assert!(matches!(DecisionTree::from_json(&looped), Err(TreeError::UnableToRead(_))));

        let widened = json.replacen(r#""n_features":1"#, r#""n_features":2"#, 1);
        assert!(matches!(DecisionTree::from_json(&widened), Err(TreeError::UnableToRead(_))));

        let shallow = json.replacen(r#""max_depth":10"#, r#""max_depth":1"#, 1);
        assert!(DecisionTree::from_json(&shallow).is_ok());
        let invalid = json.replacen(r#""max_depth":10"#, r#""max_depth":0"#, 1);
        assert!(matches!(DecisionTree::from_json(&invalid), Err(TreeError::UnableToRead(_))));
    }

    #[test]
    fn test_train_extreme_ordinals() {
        let mut model = DecisionTree::new(ModelConfig::new(1, 10)).unwrap();
        model.set_feature_type(0, FeatureType::Ordinal).unwrap();
        model.add_classification_sample(vec![FeatureValue::Ordinal(i64::MIN)], "A").unwrap();
        model.add_classification_sample(vec![FeatureValue::Ordinal(i64::MAX)], "B").unwrap();
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        assert_eq!(model.get_node(0).unwrap().split_value, Some(FeatureValue::Ordinal(-1)));
        assert_eq!(model.predict_class(&[FeatureValue::Ordinal(i64::MIN)]), "A");
        assert_eq!(model.predict_class(&[FeatureValue::Ordinal(i64::MAX)]), "B");
        assert_eq!(model.predict_class(&[FeatureValue::Ordinal(0)]), "B");
    }

    #[test]
    fn test_train_huge_min_samples_leaf() {
        let cfg = ModelConfig::new(1, 10).set_min_samples_leaf(usize::MAX / 2 + 1);
        let mut model = DecisionTree::new(cfg).unwrap();
        model.add_classification_sample(vec![FeatureValue::Numeric(1.0)], "A").unwrap();
        model.add_classification_sample(vec![FeatureValue::Numeric(2.0)], "B").unwrap();
        model.train(SplitCriterion::Auto, PruningMethod::None).unwrap();
        assert_eq!(model.node_count(), 1);
    }
}
