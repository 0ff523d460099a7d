// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON automation scripts.
//
// A script names the component to activate and a list of steps, each a get,
// set or call over a dotted member path relative to that component:
//
//     { "component": "Excel.Application",
//       "steps": [ { "op": "set", "path": "Visible", "value": true },
//                  { "op": "call", "path": "Workbooks().Add", "args": ["Budget"] },
//                  { "op": "get", "path": "ActiveWorkbook.Name" } ] }

use std::path::Path;
use std::sync::Arc;

use combridge_core::config::BridgeConfig;
use combridge_core::error::Result;
use combridge_dispatch::host;
use combridge_dispatch::{ComObject, HostValue};
use combridge_native::NativeRuntime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Prog id activated as the root of every path.
    pub component: String,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ScriptStep {
    Get {
        path: String,
    },
    Set {
        path: String,
        value: serde_json::Value,
    },
    Call {
        path: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
}

impl ScriptStep {
    pub fn op(&self) -> &'static str {
        match self {
            ScriptStep::Get { .. } => "get",
            ScriptStep::Set { .. } => "set",
            ScriptStep::Call { .. } => "call",
        }
    }

    pub fn path(&self) -> &str {
        match self {
            ScriptStep::Get { path } | ScriptStep::Set { path, .. } | ScriptStep::Call { path, .. } => {
                path
            }
        }
    }

    fn apply(&self, root: &ComObject) -> Result<HostValue> {
        match self {
            ScriptStep::Get { path } => host::get_path(root, path),
            ScriptStep::Set { path, value } => {
                host::set_path(root, path, HostValue::try_from(value.clone())?)?;
                Ok(HostValue::Absent)
            }
            ScriptStep::Call { path, args } => {
                let args = args
                    .iter()
                    .cloned()
                    .map(HostValue::try_from)
                    .collect::<Result<Vec<_>>>()?;
                host::call_path(root, path, &args)
            }
        }
    }
}

/// What one step produced.
#[derive(Debug)]
pub struct StepOutcome {
    pub op: &'static str,
    pub path: String,
    pub value: HostValue,
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.value.is_absent() {
            write!(f, "{} {}", self.op, self.path)
        } else {
            write!(f, "{} {} = {}", self.op, self.path, self.value)
        }
    }
}

impl Script {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path.as_ref())?)
    }

    /// Activate the component and run every step in order, stopping at the
    /// first failure.
    #[instrument(skip_all, fields(component = %self.component, steps = self.steps.len()))]
    pub fn run(
        &self,
        runtime: Arc<dyn NativeRuntime>,
        config: &BridgeConfig,
    ) -> Result<Vec<StepOutcome>> {
        let root = ComObject::activate_with(runtime, &self.component, config)?;
        info!(root = %root, "component ready");

        let mut outcomes = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            debug!(op = step.op(), path = step.path(), "running step");
            let value = step.apply(&root)?;
            outcomes.push(StepOutcome {
                op: step.op(),
                path: step.path().to_string(),
                value,
            });
        }
        Ok(outcomes)
    }
}
