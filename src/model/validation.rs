use crate::data::{TargetValue, TrainingSample};
use crate::errors::TreeError;
use crate::metric::{metric_callables, Metric};
use crate::model::core::DecisionTree;
use crate::utils::validate_usize_parameter;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

impl DecisionTree {
    /// Score the model on `samples`.
    ///
    /// Accuracy only looks at classification samples, the error metrics only
    /// at regression samples. 0.0 when untrained or nothing is comparable.
    pub fn evaluate(&self, samples: &[TrainingSample], metric: Metric) -> f64 {
        if self.tree.is_none() {
            return 0.0;
        }
        let (metric_fn, _) = metric_callables(&metric);
        let y: Vec<TargetValue> = samples.iter().map(|s| s.target.clone()).collect();
        let yhat: Vec<Option<TargetValue>> = samples.iter().map(|s| self.predict(&s.features)).collect();
        metric_fn(&y, &yhat)
    }

    /// Accuracy on the stored training samples.
    pub fn evaluate_accuracy(&self) -> f64 {
        self.evaluate(self.store.samples(), Metric::Accuracy)
    }

    /// Mean `metric` over `folds` train/test splits of the stored samples.
    ///
    /// Samples are shuffled with `seed`; the last fold takes the remainder.
    /// Each fold trains a fresh model with this model's configuration, feature
    /// metadata, criterion and pruning method. This model is left untouched.
    pub fn cross_validate(&self, folds: usize, metric: Metric, seed: u64) -> Result<f64, TreeError> {
        self.guard()?;
        let n = self.store.len();
        validate_usize_parameter(folds, 2, n, "folds")?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);

        let samples = self.store.samples();
        let fold_size = n / folds;
        let mut total = 0.0;
        for fold in 0..folds {
            let test_start = fold * fold_size;
            let test_end = if fold == folds - 1 { n } else { test_start + fold_size };

            let mut fold_model = self.clone();
            fold_model.clear();
            let mut test = Vec::with_capacity(test_end - test_start);
            for (i, &idx) in indices.iter().enumerate() {
                let sample = &samples[idx];
                if (test_start..test_end).contains(&i) {
                    test.push(sample.clone());
                } else {
                    fold_model.add_sample(sample.features.clone(), sample.target.clone())?;
                }
            }
            fold_model.train(self.criterion, self.pruning)?;
            let score = fold_model.evaluate(&test, metric);
            info!("fold {}: {} {:.4} on {} samples", fold, metric, score, test.len());
            total += score;
        }
        Ok(total / folds as f64)
    }
}
