//! Script invocation and argument marshaling
//!
//! An [`Invocation`] owns one compiled script and the per-run state needed to
//! hand a unit of work to it: the `ins`/`outs` dictionaries, the staged
//! attribute buffers, and the module globals (`metadata`, `schema`,
//! `spatialreference`, `pdalargs`) the script can read.
//!
//! One invocation is reused across many buffers: `compile` once, then
//! `begin` / `execute` / `end` per unit of work. All guest handles are
//! `Py<..>` owned references; every slot has a single acquire/release path
//! and is dropped under the interpreter lock.

use crate::environment::{format_traceback, kind_of_typecode, Environment};
use crate::errors::BridgeError;
use crate::script::Script;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes, PyDict, PyModule, PyTuple};
use std::ffi::CString;
use std::time::Instant;
use tracing::debug;
use veld_points::{DimType, Dimension, Metadata, PointError, PointView};

/// Executes one user script against point buffers.
pub struct Invocation {
    script: Script,
    module: Option<Py<PyModule>>,
    function: Option<Py<PyAny>>,
    vars_in: Option<Py<PyDict>>,
    vars_out: Option<Py<PyDict>>,
    script_args: Option<Py<PyTuple>>,
    script_result: Option<Py<PyAny>>,
    input_arrays: Vec<Py<PyAny>>,
    staging: Vec<Vec<u8>>,
    metadata_obj: Option<Py<PyAny>>,
    schema_obj: Option<Py<PyAny>>,
    srs_obj: Option<Py<PyAny>>,
    kwargs_obj: Option<Py<PyAny>>,
}

impl Invocation {
    /// Create an invocation for `script`. Initializes the embedded
    /// interpreter if this is the first bridge use in the process.
    pub fn new(script: Script) -> Result<Self, BridgeError> {
        Environment::get()?;
        let mut invocation = Self {
            script,
            module: None,
            function: None,
            vars_in: None,
            vars_out: None,
            script_args: None,
            script_result: None,
            input_arrays: Vec::new(),
            staging: Vec::new(),
            metadata_obj: None,
            schema_obj: None,
            srs_obj: None,
            kwargs_obj: None,
        };
        invocation.reset_arguments()?;
        Ok(invocation)
    }

    /// Compile the script source and load it as a module, resolving the
    /// entry function.
    ///
    /// Re-compiling replaces the previously loaded module.
    pub fn compile(&mut self) -> Result<(), BridgeError> {
        Environment::get()?;
        Python::attach(|py| {
            let start = Instant::now();
            let source = new_cstring(self.script.source(), self.script.module())?;
            let filename = new_cstring(&format!("{}.py", self.script.module()), self.script.module())?;
            let module_name = new_cstring(self.script.module(), self.script.module())?;

            let module = PyModule::from_code(
                py,
                source.as_c_str(),
                filename.as_c_str(),
                module_name.as_c_str(),
            )
            .map_err(|e| BridgeError::Compile {
                module: self.script.module().to_string(),
                traceback: format_traceback(py, &e),
            })?;

            let function = module
                .getattr(self.script.function())
                .map_err(|_| BridgeError::MissingEntryFunction(self.script.function().to_string()))?;
            if !function.is_callable() {
                return Err(BridgeError::NotCallable(self.script.function().to_string()));
            }

            self.function = Some(function.unbind());
            self.module = Some(module.unbind());
            debug!(
                "compiled script module '{}' in {:?}",
                self.script.module(),
                start.elapsed()
            );
            Ok(())
        })
    }

    /// Release all per-run argument state and allocate fresh, empty
    /// `ins`/`outs` mappings. Safe to call repeatedly; the compiled module
    /// survives.
    pub fn reset_arguments(&mut self) -> Result<(), BridgeError> {
        Python::attach(|py| {
            self.release_run_state(py);
            self.vars_in = Some(PyDict::new(py).unbind());
            self.vars_out = Some(PyDict::new(py).unbind());
            Ok(())
        })
    }

    /// Wrap one staged attribute buffer as a guest array and bind it into
    /// the `ins` mapping under `name`, overwriting any prior entry.
    ///
    /// `data` must hold exactly `count` elements of `dtype`; the buffer
    /// stays owned by the caller.
    pub fn insert_argument(
        &mut self,
        name: &str,
        data: &[u8],
        dtype: DimType,
        count: usize,
    ) -> Result<(), BridgeError> {
        let descriptor = Environment::array_descriptor(dtype);
        if data.len() != descriptor.size * count {
            return Err(BridgeError::Point(PointError::ValueSize {
                name: name.to_string(),
                expected: descriptor.size * count,
                actual: data.len(),
            }));
        }

        Python::attach(|py| {
            let (vars_in, _) = self.bound_args(py)?;
            let array_module = PyModule::import(py, "array")?;
            let array = array_module
                .getattr("array")?
                .call1((descriptor.typecode.to_string(),))?;
            array.call_method1("frombytes", (PyBytes::new(py, data),))?;
            vars_in.set_item(name, &array)?;
            self.input_arrays.push(array.unbind());
            Ok(())
        })
    }

    /// Run the entry function against the current argument set.
    ///
    /// Returns `Ok(true)` on a `True` result and `Ok(false)` when the script
    /// itself signals failure; any raise inside the script, a wrong arity or
    /// a non-boolean result is an error.
    pub fn execute(&mut self) -> Result<bool, BridgeError> {
        Python::attach(|py| {
            let module = match &self.module {
                Some(module) => module.bind(py).clone(),
                None => return Err(BridgeError::NotCompiled),
            };
            let function = match &self.function {
                Some(function) => function.bind(py).clone(),
                None => return Err(BridgeError::NotCompiled),
            };
            let (vars_in, vars_out) = self.bound_args(py)?;

            let declared = entry_arity(py, &function)?;
            if declared == 0 || declared > 2 {
                return Err(BridgeError::Arity { declared });
            }
            let args = if declared == 2 {
                PyTuple::new(py, [vars_in.as_any().clone(), vars_out.as_any().clone()])?
            } else {
                PyTuple::new(py, [vars_in.as_any().clone()])?
            };
            self.script_args = Some(args.clone().unbind());

            let bindings: [(&str, Option<&Py<PyAny>>); 4] = [
                ("metadata", self.metadata_obj.as_ref()),
                ("schema", self.schema_obj.as_ref()),
                ("spatialreference", self.srs_obj.as_ref()),
                ("pdalargs", self.kwargs_obj.as_ref()),
            ];
            for (name, slot) in bindings {
                if let Some(obj) = slot {
                    module.setattr(name, obj.bind(py)).map_err(|e| BridgeError::Binding {
                        name: name.to_string(),
                        reason: format!("{}", e),
                    })?;
                }
            }

            let call_start = Instant::now();
            let result = function.call(args, None).map_err(|e| BridgeError::Execution {
                traceback: format_traceback(py, &e),
            })?;
            debug!(
                "entry function '{}' returned in {:?}",
                self.script.function(),
                call_start.elapsed()
            );

            self.script_result = Some(result.clone().unbind());
            if !result.is_instance_of::<PyBool>() {
                return Err(BridgeError::NonBooleanResult);
            }
            let succeeded = result.extract::<bool>()?;

            // The script may have rebound the module-level metadata; carry
            // the current binding forward for end() to attach.
            if module.hasattr("metadata")? {
                self.metadata_obj = Some(module.getattr("metadata")?.unbind());
            }

            Ok(succeeded)
        })
    }

    /// Look up an output array and validate it against the dimension type,
    /// returning its contiguous byte contents.
    pub fn extract_result(&self, name: &str, dtype: DimType) -> Result<Vec<u8>, BridgeError> {
        Python::attach(|py| {
            let (_, vars_out) = self.bound_args(py)?;
            let value = vars_out
                .get_item(name)?
                .ok_or_else(|| BridgeError::MissingOutput(name.to_string()))?;

            let array_type = PyModule::import(py, "array")?.getattr("array")?;
            if !value.is_instance(&array_type)? {
                return Err(BridgeError::NotAnArray(name.to_string()));
            }

            let descriptor = Environment::array_descriptor(dtype);
            let itemsize: usize = value.getattr("itemsize")?.extract()?;
            if itemsize != descriptor.size {
                return Err(BridgeError::SizeMismatch {
                    name: name.to_string(),
                    expected: descriptor.size,
                    actual: itemsize,
                });
            }

            let typecode: String = value.getattr("typecode")?.extract()?;
            let typecode = typecode.chars().next().unwrap_or(' ');
            match kind_of_typecode(typecode) {
                Some(kind) if kind == descriptor.kind => {}
                Some(kind) => {
                    return Err(BridgeError::KindMismatch {
                        name: name.to_string(),
                        expected: descriptor.kind,
                        actual: kind.to_string(),
                    })
                }
                None => {
                    return Err(BridgeError::KindMismatch {
                        name: name.to_string(),
                        expected: descriptor.kind,
                        actual: format!("typecode '{}'", typecode),
                    })
                }
            }

            Ok(value.call_method0("tobytes")?.extract::<Vec<u8>>()?)
        })
    }

    /// Names of every variable the script bound into `outs`.
    pub fn output_names(&self) -> Result<Vec<String>, BridgeError> {
        Python::attach(|py| {
            let (_, vars_out) = self.bound_args(py)?;
            let mut names = Vec::new();
            for key in vars_out.keys() {
                if let Ok(name) = key.extract::<String>() {
                    names.push(name);
                }
            }
            Ok(names)
        })
    }

    /// Whether the script bound an output under `name`.
    pub fn has_output_variable(&self, name: &str) -> Result<bool, BridgeError> {
        Python::attach(|py| {
            let (_, vars_out) = self.bound_args(py)?;
            Ok(vars_out.contains(name)?)
        })
    }

    /// Stage one unit of work in: copy every attribute column into a staging
    /// buffer, bind the buffers as input arrays, and publish the `metadata`,
    /// `schema` and `spatialreference` globals derived from the view.
    pub fn begin(&mut self, view: &PointView, metadata: &Metadata) -> Result<(), BridgeError> {
        self.reset_arguments()?;

        let count = view.point_count();
        for (dim_index, dim) in view.layout().dims().iter().enumerate() {
            let size = dim.dtype.size();
            let mut data = vec![0u8; size * count];
            for index in 0..count {
                let value = view.raw(dim_index, index)?;
                data[index * size..(index + 1) * size].copy_from_slice(value);
            }
            self.insert_argument(&dim.name, &data, dim.dtype, count)?;
            self.staging.push(data);
        }
        debug!(
            "staged {} dimensions of {} points",
            view.layout().len(),
            count
        );

        let metadata_json = metadata.to_json_string()?;
        let schema_json =
            serde_json::to_string(&view.layout().schema()).map_err(PointError::from)?;
        let srs_json = view.spatial_reference().to_value().to_string();

        Python::attach(|py| {
            self.metadata_obj = Some(load_json(py, &metadata_json)?);
            self.schema_obj = Some(load_json(py, &schema_json)?);
            self.srs_obj = Some(load_json(py, &srs_json)?);
            Ok(())
        })
    }

    /// Stage one unit of work out: copy every output array the script
    /// produced back into the view, release the staging buffers, and attach
    /// the script's metadata onto the pipeline metadata tree.
    ///
    /// Dimensions the script did not bind into `outs` are left untouched.
    pub fn end(&mut self, view: &mut PointView, metadata: &mut Metadata) -> Result<(), BridgeError> {
        let copied = self.copy_outputs(view);
        // Staging buffers die with the unit of work, copied or not.
        self.staging.clear();
        copied?;

        if let Some(obj) = &self.metadata_obj {
            let text = Python::attach(|py| {
                let json_module = PyModule::import(py, "json")?;
                let dumps = json_module.getattr("dumps")?;
                Ok::<String, BridgeError>(dumps.call1((obj.bind(py),))?.extract::<String>()?)
            })?;
            let value: serde_json::Value =
                serde_json::from_str(&text).map_err(|e| BridgeError::JsonDecode {
                    traceback: format!("{}", e),
                })?;
            metadata.merge(&value);
        }
        Ok(())
    }

    /// Parse `json_text` with the guest's JSON facility and install it as
    /// the `pdalargs` global for subsequent runs.
    ///
    /// A failed parse leaves the prior value in place.
    pub fn set_kwargs(&mut self, json_text: &str) -> Result<(), BridgeError> {
        let parsed = Python::attach(|py| load_json(py, json_text))?;
        self.kwargs_obj = Some(parsed);
        Ok(())
    }

    /// Release every guest handle this invocation holds, compiled module
    /// included. Idempotent; also runs on drop.
    pub fn cleanup(&mut self) {
        Python::attach(|py| {
            self.release_run_state(py);
            drop(self.metadata_obj.take());
            drop(self.schema_obj.take());
            drop(self.srs_obj.take());
            drop(self.kwargs_obj.take());
            drop(self.function.take());
            drop(self.module.take());
        });
    }

    // Handles must be dropped while attached to the interpreter; the unused
    // token proves that. Order: dicts and result before the argument tuple
    // that references them, input arrays after.
    fn release_run_state(&mut self, _py: Python<'_>) {
        drop(self.vars_in.take());
        drop(self.vars_out.take());
        drop(self.script_result.take());
        drop(self.script_args.take());
        self.input_arrays.clear();
        self.staging.clear();
    }

    fn bound_args<'py>(
        &self,
        py: Python<'py>,
    ) -> Result<(Bound<'py, PyDict>, Bound<'py, PyDict>), BridgeError> {
        let vars_in = self
            .vars_in
            .as_ref()
            .ok_or_else(not_reset)?
            .bind(py)
            .clone();
        let vars_out = self
            .vars_out
            .as_ref()
            .ok_or_else(not_reset)?
            .bind(py)
            .clone();
        Ok((vars_in, vars_out))
    }

    fn copy_outputs(&self, view: &mut PointView) -> Result<(), BridgeError> {
        let names = self.output_names()?;
        let dims: Vec<Dimension> = view.layout().dims().to_vec();
        let count = view.point_count();

        for (dim_index, dim) in dims.iter().enumerate() {
            if !names.iter().any(|n| n == &dim.name) {
                continue;
            }
            let size = dim.dtype.size();
            let data = self.extract_result(&dim.name, dim.dtype)?;
            if data.len() < size * count {
                return Err(BridgeError::ShortOutput {
                    name: dim.name.clone(),
                    expected: count,
                    actual: data.len() / size,
                });
            }
            for index in 0..count {
                view.set_raw(dim_index, index, &data[index * size..(index + 1) * size])?;
            }
        }
        Ok(())
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn not_reset() -> BridgeError {
    BridgeError::Python("argument set not initialized; call reset_arguments first".to_string())
}

fn new_cstring(text: &str, module: &str) -> Result<CString, BridgeError> {
    CString::new(text).map_err(|_| BridgeError::Compile {
        module: module.to_string(),
        traceback: "source contains an interior NUL byte".to_string(),
    })
}

/// Number of parameters the entry function declares.
fn entry_arity(py: Python<'_>, function: &Bound<'_, PyAny>) -> Result<usize, BridgeError> {
    let inspect = PyModule::import(py, "inspect")?;
    let signature = inspect.getattr("signature")?.call1((function,))?;
    let parameters = signature.getattr("parameters")?;
    Ok(parameters.len()?)
}

/// Decode JSON text through the guest's `json.loads`, returning an owned
/// handle to the resulting object.
fn load_json(py: Python<'_>, text: &str) -> Result<Py<PyAny>, BridgeError> {
    let decode_err = |e: PyErr| BridgeError::JsonDecode {
        traceback: format_traceback(py, &e),
    };
    let json_module = PyModule::import(py, "json").map_err(decode_err)?;
    let loads = json_module.getattr("loads").map_err(decode_err)?;
    let value = loads.call1((text,)).map_err(decode_err)?;
    Ok(value.unbind())
}
