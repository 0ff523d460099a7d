// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Navigable object tree over late-bound components.
//
// A `ComObject` is one step of a dotted access path. Nodes are built on demand
// for every member access. A node either owns a live dispatcher (a component)
// or is a placeholder that captures a pending method call on its parent. Each
// child keeps the dispatcher it was read from, so it can be invoked however
// long its ancestors live.
//
// Whether a name is a field or a method is not known up front. `get_member`
// probes with a property read and falls back to a placeholder when the read
// fails or comes back empty; the outcome of the first successful operation is
// recorded in a classification map shared by the whole tree.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use combridge_core::config::BridgeConfig;
use combridge_core::error::{BridgeError, Result};
use combridge_core::types::{MemberKind, RawHandle, Variant};
use combridge_native::NativeRuntime;
use tracing::{debug, instrument};

use crate::dispatcher::Dispatcher;
use crate::marshal::{self, HostValue, Marshalled};

/// Field/method classification shared by every node under one root.
///
/// First successful classification wins; later records never overwrite it.
#[derive(Debug, Clone, Default)]
pub struct MemberKinds(Arc<Mutex<HashMap<String, MemberKind>>>);

impl MemberKinds {
    pub fn get(&self, name: &str) -> MemberKind {
        self.lock().get(name).copied().unwrap_or(MemberKind::Unknown)
    }

    /// Record `kind` for `name` unless already classified. Returns the
    /// classification in effect afterwards.
    pub fn record(&self, name: &str, kind: MemberKind) -> MemberKind {
        *self.lock().entry(name.to_string()).or_insert(kind)
    }

    /// `Ok` if `name` is unclassified or classified as `expected`; otherwise
    /// the conflicting classification.
    pub fn check(&self, name: &str, expected: MemberKind) -> std::result::Result<(), MemberKind> {
        match self.get(name) {
            MemberKind::Unknown => Ok(()),
            actual if actual == expected => Ok(()),
            actual => Err(actual),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MemberKind>> {
        self.0.lock().unwrap_or_else(|p| p.into_inner())
    }
}

struct Node {
    name: String,
    /// Dotted root-to-node path, fixed at creation.
    path: String,
    /// Dispatcher of the node this one was read from; the target of
    /// `invoke`. `None` for roots and for children of placeholders.
    owner: Option<Arc<Dispatcher>>,
    /// `None` for a placeholder awaiting `invoke`.
    dispatcher: Option<Arc<Dispatcher>>,
    kinds: MemberKinds,
}

/// One node of the dynamic object tree.
///
/// Nodes never reference other nodes. A child shares its parent's dispatcher
/// so it stays callable after the parent node is dropped. Cloning is cheap
/// and shares the node. A tree and the native instance behind it take one
/// call at a time: callers that need parallelism activate separate components
/// per thread.
#[derive(Clone)]
pub struct ComObject {
    node: Arc<Node>,
}

impl ComObject {
    /// Activate `prog_id` and wrap it as a root node, using default settings.
    pub fn activate(runtime: Arc<dyn NativeRuntime>, prog_id: &str) -> Result<Self> {
        Self::activate_with(runtime, prog_id, &BridgeConfig::default())
    }

    #[instrument(skip_all, fields(prog_id = %prog_id))]
    pub fn activate_with(
        runtime: Arc<dyn NativeRuntime>,
        prog_id: &str,
        config: &BridgeConfig,
    ) -> Result<Self> {
        let dispatcher = Dispatcher::activate(runtime, prog_id, config)?;
        Ok(Self::from_dispatcher(prog_id, dispatcher))
    }

    /// Root node over an existing dispatcher.
    pub fn from_dispatcher(name: &str, dispatcher: Dispatcher) -> Self {
        Self {
            node: Arc::new(Node {
                name: name.to_string(),
                path: name.to_string(),
                owner: None,
                dispatcher: Some(Arc::new(dispatcher)),
                kinds: MemberKinds::default(),
            }),
        }
    }

    fn child(&self, name: String, dispatcher: Option<Dispatcher>) -> Self {
        Self {
            node: Arc::new(Node {
                path: format!("{}.{name}", self.node.path),
                name,
                owner: self.node.dispatcher.clone(),
                dispatcher: dispatcher.map(Arc::new),
                kinds: self.node.kinds.clone(),
            }),
        }
    }

    fn placeholder(&self, name: &str) -> HostValue {
        HostValue::Object(self.child(name.to_string(), None))
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// True for a placeholder that only captures a pending call.
    pub fn is_callable(&self) -> bool {
        self.node.dispatcher.is_none()
    }

    /// Native handle of the component this node holds, if any.
    pub fn raw_handle(&self) -> Option<RawHandle> {
        self.node.dispatcher.as_deref().map(Dispatcher::handle)
    }

    pub fn kinds(&self) -> &MemberKinds {
        &self.node.kinds
    }

    pub fn classification(&self, name: &str) -> MemberKind {
        self.node.kinds.get(name)
    }

    /// Dotted path from the root to this node, e.g. `Excel.Application.Visible`.
    pub fn path(&self) -> String {
        self.node.path.clone()
    }

    fn dispatcher(&self) -> Result<&Dispatcher> {
        self.node
            .dispatcher
            .as_deref()
            .ok_or_else(|| BridgeError::NotAnObject { path: self.path() })
    }

    fn require_kind(&self, name: &str, expected: MemberKind) -> Result<()> {
        self.node
            .kinds
            .check(name, expected)
            .map_err(|actual| BridgeError::ClassificationConflict {
                path: self.path(),
                name: name.to_string(),
                expected,
                actual,
            })
    }

    /// Read a member. Fields yield their value (components become child
    /// nodes); anything that does not read as a field yields a placeholder
    /// to be invoked.
    pub fn get_member(&self, name: &str) -> Result<HostValue> {
        let dispatcher = self.dispatcher()?;
        let id = dispatcher.resolve(name).map_err(|e| e.at(&self.path()))?;

        if self.node.kinds.get(name) == MemberKind::Method {
            return Ok(self.placeholder(name));
        }

        let value = match dispatcher.get_property(id) {
            Ok(Variant::Empty) => {
                debug!(path = %self.path(), name, "empty property read, treating as method");
                return Ok(self.placeholder(name));
            }
            Ok(value) => value,
            Err(err) => {
                debug!(path = %self.path(), name, error = %err, "property read failed, treating as method");
                return Ok(self.placeholder(name));
            }
        };

        let result = self.to_host(dispatcher, value, name.to_string())?;
        self.node.kinds.record(name, MemberKind::Field);
        Ok(result)
    }

    /// Write a field. Fails if `name` is already known to be a method.
    pub fn set_member(&self, name: &str, value: HostValue) -> Result<()> {
        let dispatcher = self.dispatcher()?;
        let id = dispatcher.resolve(name).map_err(|e| e.at(&self.path()))?;
        self.require_kind(name, MemberKind::Field)?;

        let native = marshal::to_native(&value)?;
        dispatcher
            .set_property(id, native)
            .map_err(|e| e.at(&self.path()))?;
        self.node.kinds.record(name, MemberKind::Field);
        Ok(())
    }

    /// Call this node on the dispatcher it was read from.
    ///
    /// A placeholder performs a method call. A node holding a component
    /// performs a parameterised property read (`Item(2)`). The result is a
    /// child of this node named `name()`.
    pub fn invoke(&self, args: &[HostValue]) -> Result<HostValue> {
        let path = self.path();
        let owner = self
            .node
            .owner
            .as_deref()
            .ok_or_else(|| BridgeError::InvalidInvocationTarget { path: path.clone() })?;

        let name = self.name();
        let kind = if self.is_callable() {
            MemberKind::Method
        } else {
            MemberKind::Field
        };
        self.require_kind(name, kind)?;

        let id = owner.resolve(name).map_err(|e| e.at(&path))?;
        let native_args = args
            .iter()
            .map(marshal::to_native)
            .collect::<Result<Vec<_>>>()?;

        let value = match kind {
            MemberKind::Method => owner.invoke(id, &native_args),
            _ => owner.get_indexed(id, &native_args),
        }
        .map_err(|e| e.at(&path))?;

        let result = self.to_host(owner, value, format!("{name}()"))?;
        self.node.kinds.record(name, kind);
        Ok(result)
    }

    /// Marshal a value read through `origin`; components become children of
    /// this node named `name`.
    fn to_host(&self, origin: &Dispatcher, value: Variant, name: String) -> Result<HostValue> {
        match marshal::from_native(origin, value, &name)? {
            Marshalled::Value(v) => Ok(v),
            Marshalled::Component(dispatcher) => {
                Ok(HostValue::Object(self.child(name, Some(dispatcher))))
            }
        }
    }
}

impl PartialEq for ComObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl std::fmt::Display for ComObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComObject({})", self.path())
    }
}

impl std::fmt::Debug for ComObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComObject")
            .field("path", &self.path())
            .field("handle", &self.raw_handle())
            .finish()
    }
}
