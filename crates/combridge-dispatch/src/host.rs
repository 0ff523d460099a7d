// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-facing dynamic object surface.
//
// A scripting host sees every node as something it can read members from,
// assign members on and call. The path helpers walk dotted expressions such as
// `Workbooks().Item` relative to a root, where a trailing `()` on a segment
// invokes that member without arguments.

use combridge_core::error::{BridgeError, Result};

use crate::marshal::HostValue;
use crate::object::ComObject;

/// Member access as a dynamic language runtime performs it.
pub trait DynamicObject {
    fn get_member(&self, name: &str) -> Result<HostValue>;

    fn set_member(&self, name: &str, value: HostValue) -> Result<()>;

    /// Invoke this object with positional arguments.
    fn call(&self, args: &[HostValue]) -> Result<HostValue>;

    /// Dotted location used in error messages.
    fn path(&self) -> String;
}

impl DynamicObject for ComObject {
    fn get_member(&self, name: &str) -> Result<HostValue> {
        ComObject::get_member(self, name)
    }

    fn set_member(&self, name: &str, value: HostValue) -> Result<()> {
        ComObject::set_member(self, name, value)
    }

    fn call(&self, args: &[HostValue]) -> Result<HostValue> {
        self.invoke(args)
    }

    fn path(&self) -> String {
        ComObject::path(self)
    }
}

/// One segment of a member path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    /// `Name`: read the member.
    Member(&'a str),
    /// `Name()`: read the member, then invoke it with no arguments.
    Call(&'a str),
}

impl<'a> Step<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Step::Member(name) | Step::Call(name) => *name,
        }
    }

    /// Split a dotted path into steps. The empty path has no steps.
    pub fn parse_path(path: &'a str) -> Result<Vec<Step<'a>>> {
        if path.trim().is_empty() {
            return Ok(Vec::new());
        }
        path.split('.')
            .map(|segment| {
                let segment = segment.trim();
                let (name, call) = match segment.strip_suffix("()") {
                    Some(name) => (name, true),
                    None => (segment, false),
                };
                let valid = !name.is_empty()
                    && name.chars().all(|c| c.is_alphanumeric() || c == '_');
                if !valid {
                    return Err(BridgeError::InvalidPath(path.to_string()));
                }
                Ok(if call { Step::Call(name) } else { Step::Member(name) })
            })
            .collect()
    }
}

fn member_path(object: &dyn DynamicObject, name: &str) -> String {
    format!("{}.{name}", object.path())
}

fn take_step(object: &dyn DynamicObject, step: Step<'_>) -> Result<HostValue> {
    let value = object.get_member(step.name())?;
    match step {
        Step::Member(_) => Ok(value),
        Step::Call(name) => value
            .into_object()
            .ok_or_else(|| BridgeError::InvalidInvocationTarget {
                path: member_path(object, name),
            })?
            .invoke(&[]),
    }
}

fn walk(root: &dyn DynamicObject, steps: &[Step<'_>]) -> Result<HostValue> {
    let Some((last, init)) = steps.split_last() else {
        return Err(BridgeError::InvalidPath(String::new()));
    };
    let mut current: Option<ComObject> = None;
    for step in init {
        let object: &dyn DynamicObject = match &current {
            Some(object) => object,
            None => root,
        };
        let next = take_step(object, *step)?;
        let path = member_path(object, step.name());
        current = Some(
            next.into_object()
                .ok_or(BridgeError::NotAnObject { path })?,
        );
    }
    match &current {
        Some(object) => take_step(object, *last),
        None => take_step(root, *last),
    }
}

/// Split off the final member name; everything before it must resolve to a
/// component.
fn walk_to_parent<'a>(
    root: &dyn DynamicObject,
    path: &'a str,
) -> Result<(Option<ComObject>, Step<'a>)> {
    let steps = Step::parse_path(path)?;
    let Some((last, init)) = steps.split_last() else {
        return Err(BridgeError::InvalidPath(path.to_string()));
    };
    if init.is_empty() {
        return Ok((None, *last));
    }
    let parent = walk(root, init)?.into_object().ok_or_else(|| {
        let walked: Vec<&str> = init.iter().map(Step::name).collect();
        BridgeError::NotAnObject {
            path: format!("{}.{}", root.path(), walked.join(".")),
        }
    })?;
    Ok((Some(parent), *last))
}

/// Evaluate a dotted path relative to `root`. The empty path yields `root`.
pub fn get_path(root: &ComObject, path: &str) -> Result<HostValue> {
    let steps = Step::parse_path(path)?;
    if steps.is_empty() {
        return Ok(HostValue::Object(root.clone()));
    }
    walk(root, &steps)
}

/// Assign the member named by the last segment of `path`.
pub fn set_path(root: &ComObject, path: &str, value: HostValue) -> Result<()> {
    let (parent, last) = walk_to_parent(root, path)?;
    let Step::Member(name) = last else {
        return Err(BridgeError::InvalidPath(path.to_string()));
    };
    match parent {
        Some(parent) => parent.set_member(name, value),
        None => root.set_member(name, value),
    }
}

/// Call the member named by the last segment of `path` with `args`.
pub fn call_path(root: &ComObject, path: &str, args: &[HostValue]) -> Result<HostValue> {
    let (parent, last) = walk_to_parent(root, path)?;
    let parent = parent.as_ref().unwrap_or(root);
    let target = parent
        .get_member(last.name())?
        .into_object()
        .ok_or_else(|| BridgeError::InvalidInvocationTarget {
            path: member_path(parent, last.name()),
        })?;
    target.call(args)
}
