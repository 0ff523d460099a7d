// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the native automation layer.
//
// The bridge never touches a component's memory layout. Everything goes
// through these calls, which map one-to-one onto CoCreateInstance, AddRef,
// Release, GetIDsOfNames and Invoke on a real IDispatch implementation.

use combridge_core::types::{DispId, DispatchKind, LocaleId, NativeStatus, RawHandle, Variant};

/// Component activation and reference counting.
///
/// Implementations must be shareable across threads, but callers serialize
/// all calls that target one handle. Every method blocks until the native
/// side answers.
pub trait NativeActivation: Send + Sync {
    /// Create a new instance of the component registered under `prog_id`.
    /// The returned handle carries one reference owned by the caller.
    ///
    /// Unknown names fail with `NativeStatus::REGDB_E_CLASSNOTREG`.
    fn activate(&self, prog_id: &str) -> Result<RawHandle, NativeStatus>;

    /// Take an additional reference on `handle`.
    fn add_ref(&self, handle: RawHandle) -> Result<(), NativeStatus>;

    /// Drop one reference. The instance is destroyed with its last reference.
    fn release(&self, handle: RawHandle) -> Result<(), NativeStatus>;
}

/// Synchronous dispatch transport.
pub trait CallTransport: Send + Sync {
    /// Resolve a member name to its dispatch id on `handle`.
    fn get_id_of_name(
        &self,
        handle: RawHandle,
        name: &str,
        locale: LocaleId,
    ) -> Result<DispId, NativeStatus>;

    /// Perform one call. `args` are positional, first argument first.
    ///
    /// A `Variant::Dispatch` in the result carries a reference owned by the
    /// caller. Dispatch values in `args` are borrowed for the call only.
    fn invoke(
        &self,
        handle: RawHandle,
        kind: DispatchKind,
        id: DispId,
        args: &[Variant],
    ) -> Result<Variant, NativeStatus>;
}

/// Everything the bridge needs from the native side.
pub trait NativeRuntime: NativeActivation + CallTransport {
    /// Human-readable runtime name (e.g. "Simulated automation").
    fn runtime_name(&self) -> &str;
}
