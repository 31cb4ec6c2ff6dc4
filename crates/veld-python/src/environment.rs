//! Embedded interpreter lifecycle and type mapping
//!
//! The interpreter is a single process-wide resource. [`Environment::get`]
//! initializes it exactly once behind a `OnceCell`; every later call into the
//! guest runtime goes through `Python::attach`, which acquires the
//! interpreter lock and serializes guest execution across all invocations in
//! the process.
//!
//! This module also owns the table mapping host attribute types to guest
//! array element descriptors. Insertion and extraction both consult the same
//! table, so the size/kind contract is consistent in both directions.

use crate::errors::BridgeError;
use once_cell::sync::OnceCell;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use tracing::debug;
use veld_points::{BaseKind, DimType};

/// Handle to the initialized embedded interpreter.
pub struct Environment {
    version: (u8, u8),
}

static ENVIRONMENT: OnceCell<Result<Environment, BridgeError>> = OnceCell::new();

impl Environment {
    /// Get or initialize the interpreter singleton.
    pub fn get() -> Result<&'static Environment, BridgeError> {
        match ENVIRONMENT.get_or_init(Environment::initialize) {
            Ok(env) => Ok(env),
            Err(e) => Err(BridgeError::Initialization(format!("{}", e))),
        }
    }

    /// Version of the embedded interpreter as (major, minor).
    pub fn python_version(&self) -> (u8, u8) {
        self.version
    }

    fn initialize() -> Result<Environment, BridgeError> {
        let start_time = std::time::Instant::now();

        pyo3::Python::initialize();

        let version = pyo3::Python::attach(|py| {
            let sys = PyModule::import(py, "sys")
                .map_err(|e| BridgeError::Initialization(format!("failed to import sys: {}", e)))?;
            let version_info = sys.getattr("version_info").map_err(|e| {
                BridgeError::Initialization(format!("failed to get version_info: {}", e))
            })?;
            let major = version_info
                .getattr("major")
                .and_then(|v| v.extract::<u8>())
                .map_err(|e| BridgeError::Initialization(format!("failed to read major: {}", e)))?;
            let minor = version_info
                .getattr("minor")
                .and_then(|v| v.extract::<u8>())
                .map_err(|e| BridgeError::Initialization(format!("failed to read minor: {}", e)))?;
            Ok::<(u8, u8), BridgeError>((major, minor))
        })?;

        debug!(
            "interpreter {}.{} initialized in {:?}",
            version.0,
            version.1,
            start_time.elapsed()
        );

        Ok(Environment { version })
    }

    /// Guest array element descriptor for a host attribute type.
    ///
    /// Total over [`DimType`]; typecodes are the stdlib `array` module's.
    pub fn array_descriptor(dtype: DimType) -> ArrayDescriptor {
        let typecode = match dtype {
            DimType::I8 => 'b',
            DimType::I16 => 'h',
            DimType::I32 => 'i',
            DimType::I64 => 'q',
            DimType::U8 => 'B',
            DimType::U16 => 'H',
            DimType::U32 => 'I',
            DimType::U64 => 'Q',
            DimType::F32 => 'f',
            DimType::F64 => 'd',
        };
        ArrayDescriptor {
            typecode,
            size: dtype.size(),
            kind: dtype.kind(),
        }
    }
}

/// Element descriptor of a guest-side array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDescriptor {
    /// `array` module typecode.
    pub typecode: char,
    /// Element size in bytes.
    pub size: usize,
    /// Base kind implied by the typecode.
    pub kind: BaseKind,
}

/// Base kind of an `array` module typecode, if it denotes a numeric element.
pub fn kind_of_typecode(typecode: char) -> Option<BaseKind> {
    match typecode {
        'b' | 'h' | 'i' | 'l' | 'q' => Some(BaseKind::Signed),
        'B' | 'H' | 'I' | 'L' | 'Q' => Some(BaseKind::Unsigned),
        'f' | 'd' => Some(BaseKind::Floating),
        _ => None,
    }
}

/// Render a guest exception with its traceback for error messages.
pub(crate) fn format_traceback(py: Python<'_>, err: &PyErr) -> String {
    let rendered = format!("{}", err);
    match err.traceback(py) {
        Some(tb) => match tb.format() {
            Ok(text) => format!("{}{}", text, rendered),
            Err(_) => rendered,
        },
        None => rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_table_is_consistent() {
        for dtype in DimType::all() {
            let desc = Environment::array_descriptor(dtype);
            assert_eq!(desc.size, dtype.size(), "size for {}", dtype);
            assert_eq!(desc.kind, dtype.kind(), "kind for {}", dtype);
            assert_eq!(
                kind_of_typecode(desc.typecode),
                Some(dtype.kind()),
                "typecode '{}' for {}",
                desc.typecode,
                dtype
            );
        }
    }

    #[test]
    fn unicode_typecode_has_no_kind() {
        assert_eq!(kind_of_typecode('u'), None);
        assert_eq!(kind_of_typecode('x'), None);
    }
}
