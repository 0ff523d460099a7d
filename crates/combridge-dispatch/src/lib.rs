// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// combridge: Late-binding access to automation components.
//
// `dispatcher` owns native handles and caches dispatch ids, `marshal` converts
// between host and native values, `object` builds the navigable node tree and
// `host` exposes it through the dynamic-object surface.

pub mod dispatcher;
pub mod host;
pub mod marshal;
pub mod object;

pub use dispatcher::Dispatcher;
pub use host::{DynamicObject, Step};
pub use marshal::{HostValue, Marshalled};
pub use object::{ComObject, MemberKinds};
