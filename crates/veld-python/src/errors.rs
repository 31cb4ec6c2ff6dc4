use thiserror::Error;
use veld_points::{BaseKind, PointError};

/// Errors that can occur while bridging into the embedded interpreter.
///
/// Guest-side failures (compile errors, unhandled exceptions, JSON decode
/// failures) carry the interpreter's formatted traceback so the pipeline can
/// surface it to the script author.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to compile script module '{module}': {traceback}")]
    Compile { module: String, traceback: String },

    #[error("unable to find entry function '{0}' in module")]
    MissingEntryFunction(String),

    #[error("entry point '{0}' is not callable")]
    NotCallable(String),

    #[error("no script has been compiled")]
    NotCompiled,

    #[error("only two arguments -- ins and outs -- can be passed (entry function declares {declared})")]
    Arity { declared: usize },

    #[error("unable to set module global '{name}': {reason}")]
    Binding { name: String, reason: String },

    #[error("script execution failed: {traceback}")]
    Execution { traceback: String },

    #[error("entry function return value is not a boolean")]
    NonBooleanResult,

    #[error("output variable '{0}' not found")]
    MissingOutput(String),

    #[error("output variable '{0}' is not an array")]
    NotAnArray(String),

    #[error("output array for '{name}' has element size {actual} but dimension '{name}' has byte size {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("output array for '{name}' has {actual} elements but the unit of work has {expected} points")]
    ShortOutput {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("output array for '{name}' holds {actual} values but the dimension type is {expected}")]
    KindMismatch {
        name: String,
        expected: BaseKind,
        actual: String,
    },

    #[error("failed to decode JSON: {traceback}")]
    JsonDecode { traceback: String },

    #[error("failed to initialize the embedded interpreter: {0}")]
    Initialization(String),

    #[error("point cloud access failed: {0}")]
    Point(#[from] PointError),

    #[error("Python error: {0}")]
    Python(String),
}

/// Generic conversion for incidental guest-API failures (dict writes, attr
/// reads). Loses the traceback; call sites where the traceback matters go
/// through `environment::format_traceback` instead.
impl From<pyo3::PyErr> for BridgeError {
    fn from(err: pyo3::PyErr) -> Self {
        BridgeError::Python(format!("{}", err))
    }
}
