// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// combridge: Native automation runtime abstractions.
//
// The traits in `traits` describe the two external collaborators the bridge
// depends on: component activation/lifetime and the dispatch call transport.
// `simulated` implements both in memory so the bridge runs on any platform.

pub mod simulated;
pub mod traits;

use std::sync::Arc;

pub use simulated::SimulatedRuntime;
pub use traits::{CallTransport, NativeActivation, NativeRuntime};

/// Returns the runtime used when no native implementation is linked in.
///
/// RETURNS: the in-memory spreadsheet automation model. Real IDispatch
/// transports implement `NativeRuntime` outside this workspace.
pub fn default_runtime() -> Arc<dyn NativeRuntime> {
    Arc::new(SimulatedRuntime::office())
}
