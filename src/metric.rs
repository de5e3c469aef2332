use crate::data::TargetValue;
use crate::errors::TreeError;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

pub type MetricFn = fn(&[TargetValue], &[Option<TargetValue>]) -> f64;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Accuracy,
    RootMeanSquaredError,
    MeanAbsoluteError,
}

impl FromStr for Metric {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accuracy" => Ok(Metric::Accuracy),
            "RootMeanSquaredError" => Ok(Metric::RootMeanSquaredError),
            "MeanAbsoluteError" => Ok(Metric::MeanAbsoluteError),
            _ => Err(TreeError::ParseString(
                s.to_string(),
                "Metric".to_string(),
                items_to_strings(vec!["Accuracy", "RootMeanSquaredError", "MeanAbsoluteError"]),
            )),
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Metric::Accuracy => "Accuracy",
            Metric::RootMeanSquaredError => "RootMeanSquaredError",
            Metric::MeanAbsoluteError => "MeanAbsoluteError",
        };
        write!(f, "{}", s)
    }
}

pub fn metric_callables(metric_type: &Metric) -> (MetricFn, bool) {
    match metric_type {
        Metric::Accuracy => (AccuracyMetric::calculate_metric, AccuracyMetric::maximize()),
        Metric::RootMeanSquaredError => (
            RootMeanSquaredErrorMetric::calculate_metric,
            RootMeanSquaredErrorMetric::maximize(),
        ),
        Metric::MeanAbsoluteError => (
            MeanAbsoluteErrorMetric::calculate_metric,
            MeanAbsoluteErrorMetric::maximize(),
        ),
    }
}

pub trait EvaluationMetric {
    fn calculate_metric(y: &[TargetValue], yhat: &[Option<TargetValue>]) -> f64;
    fn maximize() -> bool;
}

pub struct AccuracyMetric {}
impl EvaluationMetric for AccuracyMetric {
    fn calculate_metric(y: &[TargetValue], yhat: &[Option<TargetValue>]) -> f64 {
        accuracy(y, yhat)
    }
    fn maximize() -> bool {
        true
    }
}

pub struct RootMeanSquaredErrorMetric {}
impl EvaluationMetric for RootMeanSquaredErrorMetric {
    fn calculate_metric(y: &[TargetValue], yhat: &[Option<TargetValue>]) -> f64 {
        root_mean_squared_error(y, yhat)
    }
    fn maximize() -> bool {
        false
    }
}

pub struct MeanAbsoluteErrorMetric {}
impl EvaluationMetric for MeanAbsoluteErrorMetric {
    fn calculate_metric(y: &[TargetValue], yhat: &[Option<TargetValue>]) -> f64 {
        mean_absolute_error(y, yhat)
    }
    fn maximize() -> bool {
        false
    }
}

/// Share of classification targets whose prediction carries the same label.
/// Targets with a missing or numeric prediction count as wrong.
pub fn accuracy(y: &[TargetValue], yhat: &[Option<TargetValue>]) -> f64 {
    let mut total = 0;
    let mut correct = 0;
    for (y_, yhat_) in y.iter().zip(yhat) {
        if let TargetValue::Classification(label) = y_ {
            total += 1;
            if yhat_.as_ref().and_then(|p| p.label()) == Some(label.as_str()) {
                correct += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

/// Regression targets paired with numeric predictions; everything else is skipped.
fn regression_pairs<'a>(
    y: &'a [TargetValue],
    yhat: &'a [Option<TargetValue>],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    y.iter()
        .zip(yhat)
        .filter_map(|(y_, yhat_)| Some((y_.value()?, yhat_.as_ref()?.value()?)))
}

pub fn root_mean_squared_error(y: &[TargetValue], yhat: &[Option<TargetValue>]) -> f64 {
    let (res, n) = regression_pairs(y, yhat).fold((0.0, 0usize), |(s, n), (a, b)| (s + (a - b).powi(2), n + 1));
    if n == 0 {
        0.0
    } else {
        (res / n as f64).sqrt()
    }
}

pub fn mean_absolute_error(y: &[TargetValue], yhat: &[Option<TargetValue>]) -> f64 {
    let (res, n) = regression_pairs(y, yhat).fold((0.0, 0usize), |(s, n), (a, b)| (s + (a - b).abs(), n + 1));
    if n == 0 {
        0.0
    } else {
        res / n as f64
    }
}
