//! Error types for niivue-rs.

use thiserror::Error;

use crate::protocol::ModelId;

/// The main error type for niivue-rs operations.
#[derive(Error, Debug)]
pub enum NiivueError {
    /// A write-once field (`id` or `path`) already holds a different value.
    #[error("{field} of {model} is immutable once set (current {current:?}, attempted {attempted:?})")]
    ImmutableField {
        model: &'static str,
        field: &'static str,
        current: String,
        attempted: String,
    },

    /// A colormap specification was not a mapping.
    #[error("colormap must be a mapping with R, G, B, A and I keys")]
    ColormapNotObject,

    /// A required colormap channel is missing.
    #[error("colormap is missing required key '{0}'")]
    MissingColormapKey(&'static str),

    /// A colormap channel is not a list of numbers.
    #[error("colormap key '{key}' must be a list of numbers (bad element at index {index:?})")]
    ColormapNotNumeric {
        key: &'static str,
        /// `None` when the value is not a list at all.
        index: Option<usize>,
    },

    /// Colormap channels differ in length.
    #[error("colormap key '{key}' has {actual} entries, expected {expected}")]
    ColormapLengthMismatch {
        key: &'static str,
        expected: usize,
        actual: usize,
    },

    /// `min` or `max` is present but not a number.
    #[error("colormap key '{0}' must be a number")]
    ColormapBoundNotNumeric(&'static str),

    /// `labels` does not match the channel length.
    #[error("colormap labels has {actual} entries, expected {expected}")]
    ColormapLabelsLength { expected: usize, actual: usize },

    /// `labels` contains a non-string element, or is not a list.
    #[error("colormap labels must be a list of strings (bad element at index {0:?})")]
    ColormapLabelNotString(Option<usize>),

    /// Gamma is not a finite number.
    #[error("gamma must be a finite number, got {0}")]
    InvalidGamma(f64),

    /// An RGBA color does not have four components.
    #[error("{option} must have 4 components, got {actual}")]
    ColorLength { option: String, actual: usize },

    /// An RGBA component is outside `[0, 1]`.
    #[error("{option} component {index} must be within [0, 1], got {value}")]
    ColorComponent {
        option: String,
        index: usize,
        value: f64,
    },

    /// A configuration value violates its option contract.
    #[error("invalid value for option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    /// No volume with the given id exists.
    #[error("volume with id '{0}' not found")]
    VolumeNotFound(String),

    /// No mesh with the given id exists.
    #[error("mesh with id '{0}' not found")]
    MeshNotFound(String),

    /// A remote state update carried a value of the wrong shape.
    #[error("malformed update of {model}.{field}: {reason}")]
    MalformedUpdate {
        model: &'static str,
        field: String,
        reason: String,
    },

    /// A state update addressed a model this widget does not own.
    #[error("model '{0}' not found")]
    ModelNotFound(ModelId),

    /// An inbound custom message named an event outside the catalog.
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// An inbound event payload did not have the expected shape.
    #[error("malformed '{event}' payload: {reason}")]
    MalformedEvent { event: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for niivue-rs operations.
pub type Result<T> = std::result::Result<T, NiivueError>;
