// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory automation runtime for desktop/CI builds and tests.
//
// Components are described by `ClassDef`s (properties, computed getters and
// methods) and instantiated into reference-counted instances addressed by
// `RawHandle`. Dispatch ids are the 1-based member index within the class, so
// they are stable for an instance's lifetime. Status codes follow the COM
// conventions a real IDispatch transport would report.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use combridge_core::types::{DispId, DispatchKind, LocaleId, NativeStatus, RawHandle, Variant};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::traits::{CallTransport, NativeActivation, NativeRuntime};

/// Body of a simulated method or computed property.
pub type MemberFn =
    Arc<dyn Fn(&mut SimContext<'_>, &[Variant]) -> Result<Variant, NativeStatus> + Send + Sync>;

enum MemberDef {
    /// Stored value, optionally writable.
    Property { initial: Variant, writable: bool },
    /// Read-only value computed on each read, may take index arguments.
    Getter(MemberFn),
    /// Callable only with `DispatchKind::Method`.
    Method(MemberFn),
}

/// Description of a simulated component class.
pub struct ClassDef {
    prog_id: String,
    creatable: bool,
    members: Vec<(String, MemberDef)>,
}

impl ClassDef {
    pub fn prog_id(&self) -> &str {
        &self.prog_id
    }

    fn member_index(&self, name: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|(member, _)| member.eq_ignore_ascii_case(name))
    }
}

/// Builder for [`ClassDef`].
pub struct ClassBuilder {
    def: ClassDef,
}

impl ClassBuilder {
    pub fn new(prog_id: impl Into<String>) -> Self {
        Self {
            def: ClassDef {
                prog_id: prog_id.into(),
                creatable: true,
                members: Vec::new(),
            },
        }
    }

    /// Instances can only be created by other members, not activated by name.
    pub fn internal(mut self) -> Self {
        self.def.creatable = false;
        self
    }

    /// Writable stored property. A non-empty `initial` also fixes its type.
    pub fn property(mut self, name: &str, initial: Variant) -> Self {
        self.def.members.push((
            name.to_string(),
            MemberDef::Property {
                initial,
                writable: true,
            },
        ));
        self
    }

    pub fn readonly(mut self, name: &str, value: Variant) -> Self {
        self.def.members.push((
            name.to_string(),
            MemberDef::Property {
                initial: value,
                writable: false,
            },
        ));
        self
    }

    pub fn getter<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut SimContext<'_>, &[Variant]) -> Result<Variant, NativeStatus>
            + Send
            + Sync
            + 'static,
    {
        self.def
            .members
            .push((name.to_string(), MemberDef::Getter(Arc::new(f))));
        self
    }

    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut SimContext<'_>, &[Variant]) -> Result<Variant, NativeStatus>
            + Send
            + Sync
            + 'static,
    {
        self.def
            .members
            .push((name.to_string(), MemberDef::Method(Arc::new(f))));
        self
    }

    pub fn build(self) -> ClassDef {
        self.def
    }
}

struct Instance {
    id: Uuid,
    class: Arc<ClassDef>,
    refs: u32,
    /// Declared properties plus hidden storage used by member bodies.
    props: HashMap<String, Variant>,
    items: Vec<Variant>,
}

#[derive(Default)]
struct State {
    classes: HashMap<String, Arc<ClassDef>>,
    instances: HashMap<u64, Instance>,
    next_handle: u64,
}

impl State {
    fn create(&mut self, prog_id: &str) -> Result<RawHandle, NativeStatus> {
        let class = self
            .classes
            .get(&prog_id.to_ascii_lowercase())
            .cloned()
            .ok_or(NativeStatus::REGDB_E_CLASSNOTREG)?;

        let props = class
            .members
            .iter()
            .filter_map(|(name, def)| match def {
                MemberDef::Property { initial, .. } => Some((name.clone(), initial.clone())),
                _ => None,
            })
            .collect();

        self.next_handle += 1;
        let handle = RawHandle(self.next_handle);
        let id = Uuid::new_v4();
        debug!(%handle, %id, prog_id = %class.prog_id, "simulated instance created");
        self.instances.insert(
            handle.0,
            Instance {
                id,
                class,
                refs: 1,
                props,
                items: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn instance(&self, handle: RawHandle) -> Result<&Instance, NativeStatus> {
        self.instances.get(&handle.0).ok_or(NativeStatus::E_HANDLE)
    }

    fn instance_mut(&mut self, handle: RawHandle) -> Result<&mut Instance, NativeStatus> {
        self.instances.get_mut(&handle.0).ok_or(NativeStatus::E_HANDLE)
    }

    fn add_ref(&mut self, handle: RawHandle) -> Result<(), NativeStatus> {
        self.instance_mut(handle)?.refs += 1;
        Ok(())
    }

    /// Take a reference for any component carried by `value`.
    fn retain(&mut self, value: &Variant) -> Result<Variant, NativeStatus> {
        if let Some(handle) = value.as_dispatch() {
            self.add_ref(handle)?;
        }
        Ok(value.clone())
    }

    fn release(&mut self, handle: RawHandle) -> Result<(), NativeStatus> {
        let mut pending = vec![handle];
        let mut first = true;
        while let Some(next) = pending.pop() {
            let instance = match self.instances.get_mut(&next.0) {
                Some(instance) => instance,
                None if first => return Err(NativeStatus::E_HANDLE),
                None => continue,
            };
            first = false;
            instance.refs -= 1;
            if instance.refs > 0 {
                continue;
            }
            if let Some(dead) = self.instances.remove(&next.0) {
                debug!(handle = %next, id = %dead.id, "simulated instance destroyed");
                pending.extend(
                    dead.props
                        .values()
                        .chain(dead.items.iter())
                        .filter_map(Variant::as_dispatch),
                );
            }
        }
        Ok(())
    }
}

/// Access to runtime state from inside a member body.
pub struct SimContext<'a> {
    state: &'a mut State,
    this: RawHandle,
}

impl SimContext<'_> {
    /// Handle of the instance the member was invoked on.
    pub fn this(&self) -> RawHandle {
        self.this
    }

    /// Stored value on this instance; `Empty` when unset. No reference is taken.
    pub fn get(&self, key: &str) -> Variant {
        self.get_on(self.this, key)
    }

    pub fn get_on(&self, handle: RawHandle, key: &str) -> Variant {
        self.state
            .instances
            .get(&handle.0)
            .and_then(|i| i.props.get(key))
            .cloned()
            .unwrap_or(Variant::Empty)
    }

    /// Store `value` on this instance, taking over any reference it carries.
    pub fn set(&mut self, key: &str, value: Variant) -> Result<(), NativeStatus> {
        let this = self.this;
        self.set_on(this, key, value)
    }

    pub fn set_on(&mut self, handle: RawHandle, key: &str, value: Variant) -> Result<(), NativeStatus> {
        let old = self
            .state
            .instance_mut(handle)?
            .props
            .insert(key.to_string(), value);
        if let Some(old) = old.as_ref().and_then(Variant::as_dispatch) {
            self.state.release(old)?;
        }
        Ok(())
    }

    /// Add a reference to a component carried by `value` and return a copy.
    pub fn retain(&mut self, value: &Variant) -> Result<Variant, NativeStatus> {
        self.state.retain(value)
    }

    /// Create an instance of any registered class, creatable or not.
    pub fn create(&mut self, prog_id: &str) -> Result<RawHandle, NativeStatus> {
        self.state.create(prog_id)
    }

    pub fn items(&self) -> &[Variant] {
        self.state
            .instances
            .get(&self.this.0)
            .map(|i| i.items.as_slice())
            .unwrap_or(&[])
    }

    /// Append to this instance's item list, taking over any reference.
    pub fn push_item(&mut self, value: Variant) -> Result<(), NativeStatus> {
        let this = self.this;
        self.state.instance_mut(this)?.items.push(value);
        Ok(())
    }
}

#[derive(Default)]
struct Stats {
    resolutions: HashMap<String, usize>,
    calls: HashMap<DispatchKind, usize>,
}

/// Snapshot of one live instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    pub id: Uuid,
    pub prog_id: String,
    pub refs: u32,
}

/// Reference-counted in-memory implementation of [`NativeRuntime`].
#[derive(Default)]
pub struct SimulatedRuntime {
    state: Mutex<State>,
    stats: Mutex<Stats>,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime preloaded with the spreadsheet model (see [`office_classes`]).
    pub fn office() -> Self {
        let runtime = Self::new();
        for class in office_classes() {
            runtime.register(class);
        }
        runtime
    }

    /// Register (or replace) a class under its prog id.
    pub fn register(&self, class: ClassDef) {
        debug!(prog_id = %class.prog_id, members = class.members.len(), "class registered");
        self.state()
            .classes
            .insert(class.prog_id.to_ascii_lowercase(), Arc::new(class));
    }

    /// Number of native name resolutions performed for exactly `name`.
    pub fn resolution_count(&self, name: &str) -> usize {
        self.stats().resolutions.get(name).copied().unwrap_or(0)
    }

    /// Number of `invoke` round-trips of the given kind, successful or not.
    pub fn call_count(&self, kind: DispatchKind) -> usize {
        self.stats().calls.get(&kind).copied().unwrap_or(0)
    }

    pub fn live_instances(&self) -> usize {
        self.state().instances.len()
    }

    pub fn instance_info(&self, handle: RawHandle) -> Option<InstanceInfo> {
        self.state().instances.get(&handle.0).map(|i| InstanceInfo {
            id: i.id,
            prog_id: i.class.prog_id.clone(),
            refs: i.refs,
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stats(&self) -> MutexGuard<'_, Stats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NativeRuntime for SimulatedRuntime {
    fn runtime_name(&self) -> &str {
        "Simulated automation"
    }
}

impl NativeActivation for SimulatedRuntime {
    fn activate(&self, prog_id: &str) -> Result<RawHandle, NativeStatus> {
        let mut state = self.state();
        let creatable = state
            .classes
            .get(&prog_id.to_ascii_lowercase())
            .is_some_and(|c| c.creatable);
        if !creatable {
            warn!(prog_id, "activation of unregistered class");
            return Err(NativeStatus::REGDB_E_CLASSNOTREG);
        }
        state.create(prog_id)
    }

    fn add_ref(&self, handle: RawHandle) -> Result<(), NativeStatus> {
        self.state().add_ref(handle)
    }

    fn release(&self, handle: RawHandle) -> Result<(), NativeStatus> {
        self.state().release(handle)
    }
}

impl CallTransport for SimulatedRuntime {
    fn get_id_of_name(
        &self,
        handle: RawHandle,
        name: &str,
        _locale: LocaleId,
    ) -> Result<DispId, NativeStatus> {
        *self
            .stats()
            .resolutions
            .entry(name.to_string())
            .or_default() += 1;

        let state = self.state();
        let index = state
            .instance(handle)?
            .class
            .member_index(name)
            .ok_or(NativeStatus::DISP_E_UNKNOWNNAME)?;
        Ok(DispId(index as i32 + 1))
    }

    fn invoke(
        &self,
        handle: RawHandle,
        kind: DispatchKind,
        id: DispId,
        args: &[Variant],
    ) -> Result<Variant, NativeStatus> {
        *self.stats().calls.entry(kind).or_default() += 1;

        let mut state = self.state();
        let class = state.instance(handle)?.class.clone();
        let (name, def) = id
            .0
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| class.members.get(i))
            .ok_or(NativeStatus::DISP_E_MEMBERNOTFOUND)?;
        trace!(%handle, member = %name, ?kind, argc = args.len(), "simulated invoke");

        match (kind, def) {
            (DispatchKind::PropertyGet, MemberDef::Property { .. }) => {
                if !args.is_empty() {
                    return Err(NativeStatus::DISP_E_BADPARAMCOUNT);
                }
                let value = state
                    .instance(handle)?
                    .props
                    .get(name)
                    .cloned()
                    .unwrap_or(Variant::Empty);
                state.retain(&value)
            }
            // Computed properties also answer method calls, as parameterised
            // properties do on IDispatch.
            (DispatchKind::PropertyGet | DispatchKind::Method, MemberDef::Getter(f))
            | (DispatchKind::Method, MemberDef::Method(f)) => {
                let mut ctx = SimContext {
                    state: &mut state,
                    this: handle,
                };
                f(&mut ctx, args)
            }
            (
                DispatchKind::PropertyPut,
                MemberDef::Property {
                    initial,
                    writable: true,
                },
            ) => {
                let [value] = args else {
                    return Err(NativeStatus::DISP_E_BADPARAMCOUNT);
                };
                if !initial.is_empty() && initial.vartype() != value.vartype() {
                    return Err(NativeStatus::DISP_E_TYPEMISMATCH);
                }
                let value = state.retain(value)?;
                let mut ctx = SimContext {
                    state: &mut state,
                    this: handle,
                };
                ctx.set(name, value)?;
                Ok(Variant::Empty)
            }
            _ => Err(NativeStatus::DISP_E_MEMBERNOTFOUND),
        }
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet model
// ---------------------------------------------------------------------------

/// Hidden storage key for the application's workbook collection.
const WORKBOOKS_KEY: &str = "#workbooks";
/// Hidden counter used to name new workbooks.
const CREATED_KEY: &str = "#created";

fn as_i64(value: &Variant) -> Option<i64> {
    match *value {
        Variant::I8(v) => Some(v.into()),
        Variant::I16(v) => Some(v.into()),
        Variant::I32(v) => Some(v.into()),
        Variant::I64(v) => Some(v),
        _ => None,
    }
}

/// Collection sizes are reported as `I32`, as automation collections do.
fn count(len: usize) -> Result<Variant, NativeStatus> {
    i32::try_from(len)
        .map(Variant::I32)
        .map_err(|_| NativeStatus::DISP_E_OVERFLOW)
}

fn as_f64(value: &Variant) -> Option<f64> {
    match *value {
        Variant::F32(v) => Some(v.into()),
        Variant::F64(v) => Some(v),
        _ => as_i64(value).map(|v| v as f64),
    }
}

/// Classes of the simulated spreadsheet application.
///
/// `Excel.Application` exposes `Visible`, `Caption`, `Version`,
/// `DecimalSeparator`, `StatusBar` (empty), `ActiveWorkbook`, and the methods
/// `Workbooks()`, `Sum(..)` and `Quit()`. The collection returned by
/// `Workbooks()` has `Count`, `Item(index|name)` and `Add([name])`.
pub fn office_classes() -> Vec<ClassDef> {
    let application = ClassBuilder::new("Excel.Application")
        .property("Visible", Variant::Bool(false))
        .property("Caption", Variant::String("Microsoft Excel".into()))
        .readonly("Version", Variant::String("16.0".into()))
        .readonly("DecimalSeparator", Variant::Char(u16::from(b'.')))
        .property("StatusBar", Variant::Empty)
        .method("Workbooks", |ctx, args| {
            if !args.is_empty() {
                return Err(NativeStatus::DISP_E_BADPARAMCOUNT);
            }
            let mut books = ctx.get(WORKBOOKS_KEY);
            if books.is_empty() {
                books = Variant::Dispatch(ctx.create("Excel.Workbooks")?);
                ctx.set(WORKBOOKS_KEY, books.clone())?;
            }
            ctx.retain(&books)
        })
        .getter("ActiveWorkbook", |ctx, args| {
            if !args.is_empty() {
                return Err(NativeStatus::DISP_E_BADPARAMCOUNT);
            }
            let Some(books) = ctx.get(WORKBOOKS_KEY).as_dispatch() else {
                return Ok(Variant::Empty);
            };
            let last = ctx
                .state
                .instance(books)?
                .items
                .last()
                .cloned()
                .unwrap_or(Variant::Empty);
            ctx.retain(&last)
        })
        .method("Sum", |_ctx, args| {
            if args.is_empty() {
                return Err(NativeStatus::DISP_E_BADPARAMCOUNT);
            }
            args.iter()
                .map(|a| as_f64(a).ok_or(NativeStatus::DISP_E_TYPEMISMATCH))
                .sum::<Result<f64, _>>()
                .map(Variant::F64)
        })
        .method("Quit", |_ctx, _args| Ok(Variant::Empty))
        .build();

    let workbooks = ClassBuilder::new("Excel.Workbooks")
        .internal()
        .getter("Count", |ctx, args| {
            if !args.is_empty() {
                return Err(NativeStatus::DISP_E_BADPARAMCOUNT);
            }
            count(ctx.items().len())
        })
        .getter("Item", |ctx, args| {
            let [key] = args else {
                return Err(NativeStatus::DISP_E_BADPARAMCOUNT);
            };
            let found = match key {
                Variant::String(name) => ctx
                    .items()
                    .iter()
                    .find(|item| {
                        item.as_dispatch().is_some_and(|h| {
                            matches!(ctx.get_on(h, "Name"), Variant::String(n) if n.eq_ignore_ascii_case(name))
                        })
                    })
                    .cloned(),
                other => {
                    let index = as_i64(other).ok_or(NativeStatus::DISP_E_TYPEMISMATCH)?;
                    usize::try_from(index - 1)
                        .ok()
                        .and_then(|i| ctx.items().get(i))
                        .cloned()
                }
            };
            let found = found.ok_or(NativeStatus::DISP_E_BADINDEX)?;
            ctx.retain(&found)
        })
        .method("Add", |ctx, args| {
            let created = as_i64(&ctx.get(CREATED_KEY)).unwrap_or(0) + 1;
            ctx.set(CREATED_KEY, Variant::I64(created))?;
            let name = match args {
                [] => format!("Book{created}"),
                [Variant::String(name)] => name.clone(),
                [_] => return Err(NativeStatus::DISP_E_TYPEMISMATCH),
                _ => return Err(NativeStatus::DISP_E_BADPARAMCOUNT),
            };
            let book = ctx.create("Excel.Workbook")?;
            ctx.set_on(book, "Name", Variant::String(name))?;
            let stored = ctx.retain(&Variant::Dispatch(book))?;
            ctx.push_item(stored)?;
            Ok(Variant::Dispatch(book))
        })
        .build();

    let workbook = ClassBuilder::new("Excel.Workbook")
        .internal()
        .property("Name", Variant::String(String::new()))
        .property("Saved", Variant::Bool(true))
        .method("Save", |ctx, _args| {
            ctx.set("Saved", Variant::Bool(true))?;
            Ok(Variant::Empty)
        })
        .method("Close", |_ctx, _args| Ok(Variant::Empty))
        .build();

    vec![application, workbooks, workbook]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(runtime: &SimulatedRuntime, handle: RawHandle, name: &str) -> DispId {
        runtime
            .get_id_of_name(handle, name, LocaleId::USER_DEFAULT)
            .expect("resolve")
    }

    #[test]
    fn unknown_prog_id_is_not_registered() {
        let runtime = SimulatedRuntime::office();
        assert_eq!(
            runtime.activate("Word.Application"),
            Err(NativeStatus::REGDB_E_CLASSNOTREG)
        );
    }

    #[test]
    fn internal_classes_cannot_be_activated() {
        let runtime = SimulatedRuntime::office();
        assert_eq!(
            runtime.activate("Excel.Workbooks"),
            Err(NativeStatus::REGDB_E_CLASSNOTREG)
        );
    }

    #[test]
    fn names_resolve_case_insensitively() {
        let runtime = SimulatedRuntime::office();
        let app = runtime.activate("excel.application").expect("activate");
        assert_eq!(id(&runtime, app, "Visible"), id(&runtime, app, "VISIBLE"));
        assert_eq!(
            runtime.get_id_of_name(app, "NoSuchThing", LocaleId::USER_DEFAULT),
            Err(NativeStatus::DISP_E_UNKNOWNNAME)
        );
        assert_eq!(runtime.resolution_count("Visible"), 1);
    }

    #[test]
    fn property_put_checks_type() {
        let runtime = SimulatedRuntime::office();
        let app = runtime.activate("Excel.Application").expect("activate");
        let visible = id(&runtime, app, "Visible");

        runtime
            .invoke(app, DispatchKind::PropertyPut, visible, &[Variant::Bool(true)])
            .expect("put");
        assert_eq!(
            runtime.invoke(app, DispatchKind::PropertyGet, visible, &[]),
            Ok(Variant::Bool(true))
        );
        assert_eq!(
            runtime.invoke(app, DispatchKind::PropertyPut, visible, &[Variant::I32(1)]),
            Err(NativeStatus::DISP_E_TYPEMISMATCH)
        );
    }

    #[test]
    fn methods_reject_property_get() {
        let runtime = SimulatedRuntime::office();
        let app = runtime.activate("Excel.Application").expect("activate");
        let workbooks = id(&runtime, app, "Workbooks");
        assert_eq!(
            runtime.invoke(app, DispatchKind::PropertyGet, workbooks, &[]),
            Err(NativeStatus::DISP_E_MEMBERNOTFOUND)
        );
        let version = id(&runtime, app, "Version");
        assert_eq!(
            runtime.invoke(app, DispatchKind::PropertyPut, version, &[Variant::String("1".into())]),
            Err(NativeStatus::DISP_E_MEMBERNOTFOUND)
        );
    }

    #[test]
    fn out_of_range_dispatch_ids_are_rejected() {
        let runtime = SimulatedRuntime::office();
        let app = runtime.activate("Excel.Application").expect("activate");
        for id in [DispId(i32::MIN), DispId(0), DispId(-1), DispId(i32::MAX)] {
            assert_eq!(
                runtime.invoke(app, DispatchKind::PropertyGet, id, &[]),
                Err(NativeStatus::DISP_E_MEMBERNOTFOUND),
                "{id}"
            );
        }
    }

    #[test]
    fn oversized_counts_overflow() {
        assert_eq!(count(3), Ok(Variant::I32(3)));
        assert_eq!(count(i32::MAX as usize), Ok(Variant::I32(i32::MAX)));
        assert_eq!(count(i32::MAX as usize + 1), Err(NativeStatus::DISP_E_OVERFLOW));
    }

    #[test]
    fn collection_add_and_item() {
        let runtime = SimulatedRuntime::office();
        let app = runtime.activate("Excel.Application").expect("activate");
        let books = runtime
            .invoke(app, DispatchKind::Method, id(&runtime, app, "Workbooks"), &[])
            .expect("workbooks")
            .as_dispatch()
            .expect("dispatch");

        let add = id(&runtime, books, "Add");
        let first = runtime
            .invoke(books, DispatchKind::Method, add, &[])
            .expect("add")
            .as_dispatch()
            .expect("book");
        runtime
            .invoke(books, DispatchKind::Method, add, &[Variant::String("Budget".into())])
            .expect("add named");

        let count = id(&runtime, books, "Count");
        assert_eq!(
            runtime.invoke(books, DispatchKind::PropertyGet, count, &[]),
            Ok(Variant::I32(2))
        );

        let item = id(&runtime, books, "Item");
        let by_index = runtime
            .invoke(books, DispatchKind::PropertyGet, item, &[Variant::I32(1)])
            .expect("item 1");
        assert_eq!(by_index, Variant::Dispatch(first));
        assert!(runtime
            .invoke(books, DispatchKind::PropertyGet, item, &[Variant::String("budget".into())])
            .is_ok());
        assert_eq!(
            runtime.invoke(books, DispatchKind::PropertyGet, item, &[Variant::I32(3)]),
            Err(NativeStatus::DISP_E_BADINDEX)
        );
    }

    #[test]
    fn release_cascades_through_owned_references() {
        let runtime = SimulatedRuntime::office();
        let app = runtime.activate("Excel.Application").expect("activate");
        let books = runtime
            .invoke(app, DispatchKind::Method, id(&runtime, app, "Workbooks"), &[])
            .expect("workbooks")
            .as_dispatch()
            .expect("dispatch");
        let book = runtime
            .invoke(books, DispatchKind::Method, id(&runtime, books, "Add"), &[])
            .expect("add")
            .as_dispatch()
            .expect("book");
        assert_eq!(runtime.live_instances(), 3);
        assert_eq!(runtime.instance_info(book).map(|i| i.refs), Some(2));

        runtime.release(book).expect("release book");
        runtime.release(books).expect("release books");
        assert_eq!(runtime.live_instances(), 3);

        runtime.release(app).expect("release app");
        assert_eq!(runtime.live_instances(), 0);
        assert_eq!(runtime.release(app), Err(NativeStatus::E_HANDLE));
    }

    #[test]
    fn sum_rejects_non_numeric_arguments() {
        let runtime = SimulatedRuntime::office();
        let app = runtime.activate("Excel.Application").expect("activate");
        let sum = id(&runtime, app, "Sum");
        assert_eq!(
            runtime.invoke(app, DispatchKind::Method, sum, &[Variant::I32(2), Variant::F64(0.5)]),
            Ok(Variant::F64(2.5))
        );
        assert_eq!(
            runtime.invoke(app, DispatchKind::Method, sum, &[Variant::String("x".into())]),
            Err(NativeStatus::DISP_E_TYPEMISMATCH)
        );
        assert_eq!(runtime.call_count(DispatchKind::Method), 2);
    }
}
