use crate::dimension::DimType;
use thiserror::Error;

/// Errors from the host-side point-cloud model.
#[derive(Error, Debug)]
pub enum PointError {
    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),

    #[error("dimension index {0} out of range for layout")]
    DimensionIndex(usize),

    #[error("point index {index} out of range for view of {count} points")]
    PointIndex { index: usize, count: usize },

    #[error("value of {actual} bytes does not fit dimension '{name}' ({expected} bytes)")]
    ValueSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("dimension '{name}' has type {stored} but was accessed as {requested}")]
    TypeMismatch {
        name: String,
        stored: DimType,
        requested: DimType,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
