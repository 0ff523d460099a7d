// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Late-binding dispatcher over one native component handle.
//
// Owns the handle (released exactly once, on drop) and an append-only cache
// of member name -> dispatch id. The cache is safe to resolve into from many
// threads; the handle itself must only see one call at a time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use combridge_core::config::BridgeConfig;
use combridge_core::error::{BridgeError, Result};
use combridge_core::types::{DispId, DispatchKind, LocaleId, RawHandle, Variant};
use combridge_native::traits::{CallTransport, NativeActivation, NativeRuntime};
use tracing::{debug, instrument, trace, warn};

/// Exclusive owner of one native component handle.
pub struct Dispatcher {
    runtime: Arc<dyn NativeRuntime>,
    handle: RawHandle,
    /// Prog id or member name this handle was obtained through.
    label: String,
    locale: LocaleId,
    trace_calls: bool,
    ids: RwLock<HashMap<String, DispId>>,
}

impl Dispatcher {
    /// Activate a new instance of `prog_id`.
    #[instrument(skip_all, fields(prog_id = %prog_id))]
    pub fn activate(
        runtime: Arc<dyn NativeRuntime>,
        prog_id: &str,
        config: &BridgeConfig,
    ) -> Result<Self> {
        let handle = runtime
            .activate(prog_id)
            .map_err(|status| BridgeError::ActivationFailed {
                prog_id: prog_id.to_string(),
                status,
            })?;
        debug!(%handle, runtime = runtime.runtime_name(), "component activated");
        Ok(Self::from_raw(runtime, handle, prog_id, config))
    }

    /// Take ownership of a handle obtained elsewhere. The caller transfers one
    /// reference; it is released when the dispatcher drops.
    pub fn from_raw(
        runtime: Arc<dyn NativeRuntime>,
        handle: RawHandle,
        label: &str,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            runtime,
            handle,
            label: label.to_string(),
            locale: config.locale(),
            trace_calls: config.trace_native_calls,
            ids: RwLock::new(HashMap::new()),
        }
    }

    /// Adopt a handle returned by a call on this dispatcher, inheriting its
    /// runtime and settings.
    pub fn adopt(&self, handle: RawHandle, label: &str) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
            handle,
            label: label.to_string(),
            locale: self.locale,
            trace_calls: self.trace_calls,
            ids: RwLock::new(HashMap::new()),
        }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn runtime(&self) -> &Arc<dyn NativeRuntime> {
        &self.runtime
    }

    /// Number of names currently cached.
    pub fn cached_ids(&self) -> usize {
        self.ids.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Resolve `name` to its dispatch id, asking the native side at most once
    /// per name (modulo racing first lookups, which agree anyway).
    pub fn resolve(&self, name: &str) -> Result<DispId> {
        if let Some(id) = self
            .ids
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(name)
            .copied()
        {
            trace!(label = %self.label, name, %id, "dispatch id cache hit");
            return Ok(id);
        }

        let id = self
            .runtime
            .get_id_of_name(self.handle, name, self.locale)
            .map_err(|status| BridgeError::UnresolvedMember {
                path: self.label.clone(),
                name: name.to_string(),
                status,
            })?;

        let mut ids = self.ids.write().unwrap_or_else(|p| p.into_inner());
        let id = *ids.entry(name.to_string()).or_insert(id);
        debug!(label = %self.label, name, %id, "dispatch id resolved");
        Ok(id)
    }

    pub fn get_property(&self, id: DispId) -> Result<Variant> {
        self.call(DispatchKind::PropertyGet, id, &[])
    }

    /// Parameterised property read, e.g. `Item(1)`.
    pub fn get_indexed(&self, id: DispId, args: &[Variant]) -> Result<Variant> {
        self.call(DispatchKind::PropertyGet, id, args)
    }

    pub fn set_property(&self, id: DispId, value: Variant) -> Result<()> {
        self.call(DispatchKind::PropertyPut, id, std::slice::from_ref(&value))
            .map(|_| ())
    }

    pub fn invoke(&self, id: DispId, args: &[Variant]) -> Result<Variant> {
        self.call(DispatchKind::Method, id, args)
    }

    fn call(&self, kind: DispatchKind, id: DispId, args: &[Variant]) -> Result<Variant> {
        if self.trace_calls {
            debug!(label = %self.label, handle = %self.handle, ?kind, %id, argc = args.len(), "native call");
        }
        self.runtime
            .invoke(self.handle, kind, id, args)
            .map_err(|status| {
                trace!(label = %self.label, ?kind, %id, %status, "native call failed");
                BridgeError::NativeCallFailed {
                    path: self.label.clone(),
                    status,
                }
            })
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        match self.runtime.release(self.handle) {
            Ok(()) => trace!(label = %self.label, handle = %self.handle, "handle released"),
            Err(status) => {
                warn!(label = %self.label, handle = %self.handle, %status, "handle release failed")
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("label", &self.label)
            .field("handle", &self.handle)
            .field("cached_ids", &self.cached_ids())
            .finish()
    }
}
