//! Per-view driver around an invocation
//!
//! `ScriptStage` is the loop a pipeline stage performs for each buffer:
//! stage in, run, stage out. It compiles the script once and reuses the
//! invocation across views.

use crate::errors::BridgeError;
use crate::invocation::Invocation;
use crate::script::Script;
use tracing::debug;
use veld_points::{Metadata, PointView};

pub struct ScriptStage {
    invocation: Invocation,
}

impl ScriptStage {
    /// Build and compile a stage for `script`.
    pub fn new(script: Script) -> Result<Self, BridgeError> {
        let mut invocation = Invocation::new(script)?;
        invocation.compile()?;
        Ok(Self { invocation })
    }

    /// Forward user keyword arguments to the script's `pdalargs` global.
    pub fn set_kwargs(&mut self, json_text: &str) -> Result<(), BridgeError> {
        self.invocation.set_kwargs(json_text)
    }

    /// Process one unit of work.
    ///
    /// Returns `Ok(false)` without touching the view when the script signals
    /// failure by returning `False`; the staged buffers are released either
    /// way.
    pub fn run(&mut self, view: &mut PointView, metadata: &mut Metadata) -> Result<bool, BridgeError> {
        self.invocation.begin(view, metadata)?;
        let succeeded = self.invocation.execute()?;
        if !succeeded {
            debug!("script reported failure; discarding staged outputs");
            self.invocation.reset_arguments()?;
            return Ok(false);
        }
        self.invocation.end(view, metadata)?;
        Ok(true)
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn invocation_mut(&mut self) -> &mut Invocation {
        &mut self.invocation
    }
}
