// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: native values, dispatch identifiers, and status codes.

use serde::{Deserialize, Serialize};

/// Opaque reference to a live native component instance.
///
/// Only meaningful to the runtime that issued it. A handle received inside a
/// [`Variant::Dispatch`] from a native call carries one reference that the
/// receiver must adopt (and eventually release).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawHandle(pub u64);

impl std::fmt::Display for RawHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-instance member token used in place of a name for native calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispId(pub i32);

impl std::fmt::Display for DispId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locale under which member names are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocaleId(pub u32);

impl LocaleId {
    pub const USER_DEFAULT: LocaleId = LocaleId(0x0400);
    pub const SYSTEM_DEFAULT: LocaleId = LocaleId(0x0800);
}

impl Default for LocaleId {
    fn default() -> Self {
        Self::USER_DEFAULT
    }
}

/// HRESULT-style status reported by the native layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeStatus(pub i32);

impl NativeStatus {
    pub const S_OK: NativeStatus = NativeStatus(0);
    pub const E_INVALIDARG: NativeStatus = NativeStatus(0x8007_0057_u32 as i32);
    pub const E_HANDLE: NativeStatus = NativeStatus(0x8007_0006_u32 as i32);
    pub const DISP_E_MEMBERNOTFOUND: NativeStatus = NativeStatus(0x8002_0003_u32 as i32);
    pub const DISP_E_TYPEMISMATCH: NativeStatus = NativeStatus(0x8002_0005_u32 as i32);
    pub const DISP_E_UNKNOWNNAME: NativeStatus = NativeStatus(0x8002_0006_u32 as i32);
    pub const DISP_E_BADINDEX: NativeStatus = NativeStatus(0x8002_000B_u32 as i32);
    pub const DISP_E_BADPARAMCOUNT: NativeStatus = NativeStatus(0x8002_000E_u32 as i32);
    pub const DISP_E_OVERFLOW: NativeStatus = NativeStatus(0x8002_000A_u32 as i32);
    pub const REGDB_E_CLASSNOTREG: NativeStatus = NativeStatus(0x8004_0154_u32 as i32);

    pub fn is_success(&self) -> bool {
        self.0 >= 0
    }

    /// Symbolic name for well-known codes.
    pub fn name(&self) -> Option<&'static str> {
        Some(match *self {
            Self::S_OK => "S_OK",
            Self::E_INVALIDARG => "E_INVALIDARG",
            Self::E_HANDLE => "E_HANDLE",
            Self::DISP_E_MEMBERNOTFOUND => "DISP_E_MEMBERNOTFOUND",
            Self::DISP_E_TYPEMISMATCH => "DISP_E_TYPEMISMATCH",
            Self::DISP_E_UNKNOWNNAME => "DISP_E_UNKNOWNNAME",
            Self::DISP_E_BADINDEX => "DISP_E_BADINDEX",
            Self::DISP_E_BADPARAMCOUNT => "DISP_E_BADPARAMCOUNT",
            Self::DISP_E_OVERFLOW => "DISP_E_OVERFLOW",
            Self::REGDB_E_CLASSNOTREG => "REGDB_E_CLASSNOTREG",
            _ => return None,
        })
    }
}

impl std::fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0 as u32)
    }
}

/// How a dispatch id is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchKind {
    PropertyGet,
    PropertyPut,
    Method,
}

/// Learned classification of a member name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    /// Not yet observed in a successful operation.
    Unknown,
    Field,
    Method,
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MemberKind::Unknown => "UNKNOWN",
            MemberKind::Field => "FIELD",
            MemberKind::Method => "METHOD",
        })
    }
}

// VARTYPE tags for the variants modelled by `Variant`.
pub const VT_EMPTY: u16 = 0;
pub const VT_I2: u16 = 2;
pub const VT_I4: u16 = 3;
pub const VT_R4: u16 = 4;
pub const VT_R8: u16 = 5;
pub const VT_DATE: u16 = 7;
pub const VT_BSTR: u16 = 8;
pub const VT_DISPATCH: u16 = 9;
pub const VT_BOOL: u16 = 11;
pub const VT_I1: u16 = 16;
pub const VT_UI2: u16 = 18;
pub const VT_I8: u16 = 20;

/// Native tagged-union value exchanged with the call transport.
///
/// `Empty` is a distinguished sentinel, never equal to a typed zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    Empty,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// A single UTF-16 code unit.
    Char(u16),
    /// OLE automation date: days since 1899-12-30, time as the fraction.
    Date(f64),
    String(String),
    Dispatch(RawHandle),
    /// A VARTYPE this bridge does not model (arrays, decimals, ...).
    Unknown(u16),
}

impl Variant {
    /// The VARTYPE tag of the active variant.
    pub fn vartype(&self) -> u16 {
        match self {
            Variant::Empty => VT_EMPTY,
            Variant::Bool(_) => VT_BOOL,
            Variant::I8(_) => VT_I1,
            Variant::I16(_) => VT_I2,
            Variant::I32(_) => VT_I4,
            Variant::I64(_) => VT_I8,
            Variant::F32(_) => VT_R4,
            Variant::F64(_) => VT_R8,
            Variant::Char(_) => VT_UI2,
            Variant::Date(_) => VT_DATE,
            Variant::String(_) => VT_BSTR,
            Variant::Dispatch(_) => VT_DISPATCH,
            Variant::Unknown(vt) => *vt,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Component reference carried by this value, if any.
    pub fn as_dispatch(&self) -> Option<RawHandle> {
        match self {
            Variant::Dispatch(h) => Some(*h),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_displays_as_hex() {
        assert_eq!(NativeStatus::DISP_E_UNKNOWNNAME.to_string(), "0x80020006");
        assert_eq!(NativeStatus::S_OK.to_string(), "0x00000000");
    }

    #[test]
    fn failure_codes_are_not_success() {
        assert!(NativeStatus::S_OK.is_success());
        assert!(!NativeStatus::DISP_E_MEMBERNOTFOUND.is_success());
        assert_eq!(
            NativeStatus::REGDB_E_CLASSNOTREG.name(),
            Some("REGDB_E_CLASSNOTREG")
        );
        assert_eq!(NativeStatus(0x8000_4005_u32 as i32).name(), None);
    }

    #[test]
    fn empty_is_distinct_from_typed_zero() {
        assert_ne!(Variant::Empty, Variant::I32(0));
        assert_ne!(Variant::Empty, Variant::String(String::new()));
        assert_ne!(Variant::Empty, Variant::Bool(false));
        assert!(Variant::Empty.is_empty());
        assert!(!Variant::I64(0).is_empty());
    }

    #[test]
    fn vartype_tags() {
        assert_eq!(Variant::Empty.vartype(), VT_EMPTY);
        assert_eq!(Variant::Bool(true).vartype(), VT_BOOL);
        assert_eq!(Variant::String("x".into()).vartype(), VT_BSTR);
        assert_eq!(Variant::Dispatch(RawHandle(3)).vartype(), VT_DISPATCH);
        assert_eq!(Variant::Unknown(14).vartype(), 14);
    }

    #[test]
    fn member_kind_display() {
        assert_eq!(MemberKind::Field.to_string(), "FIELD");
        assert_eq!(MemberKind::Method.to_string(), "METHOD");
        assert_eq!(MemberKind::Unknown.to_string(), "UNKNOWN");
    }
}
