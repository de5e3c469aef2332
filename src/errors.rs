//! Errors
//!
//! Custom error types used throughout the `mixtree` crate.
use thiserror::Error;

/// Errors that can occur while configuring, filling, training or serializing a tree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// The sample store already holds its configured capacity.
    #[error("Training data full, capacity is {0} samples.")]
    StoreFull(usize),
    /// First value is the expected feature count, second is what was passed.
    #[error("Expected {0} feature values, but {1} were provided.")]
    FeatureCountMismatch(usize, usize),
    /// The numeric or categorical input stream ran out while filling this feature.
    #[error("Input stream exhausted while filling feature {0}.")]
    InputExhausted(usize),
    /// First value is the index, second is the number of features.
    #[error("Feature index {0} is out of range for {1} features.")]
    FeatureOutOfRange(usize, usize),
    /// First value is the index, second is the number of stored samples.
    #[error("Sample index {0} is out of range for {1} samples.")]
    SampleOutOfRange(usize, usize),
    /// First value is the available sample count, second is the required minimum.
    #[error("Not enough training data, {0} samples available but {1} required.")]
    InsufficientSamples(usize, usize),
    /// The recursive build could not produce a tree.
    #[error("Unable to build tree: {0}")]
    BuildFailed(String),
    /// Unable to serialize the model.
    #[error("Unable to write model: {0}")]
    UnableToWrite(String),
    /// Unable to deserialize the model.
    #[error("Unable to read model: {0}")]
    UnableToRead(String),
    /// A previous error is latched and has not been cleared yet.
    #[error("Operation refused, unresolved error: {0}")]
    ErrorPending(String),
}
