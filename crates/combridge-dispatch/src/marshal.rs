// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Value marshalling between native variants and host values.
//
// Conversions are pure: the only state touched is the runtime reference
// adopted when a native value carries a component.

use chrono::{NaiveDate, NaiveDateTime};
use combridge_core::error::{BridgeError, Result};
use combridge_core::types::Variant;

use crate::dispatcher::Dispatcher;
use crate::object::ComObject;

const MS_PER_DAY: i64 = 86_400_000;

/// OLE automation dates are valid for years 100 through 9999.
const OA_DATE_MIN: f64 = -657_435.0;
const OA_DATE_MAX: f64 = 2_958_466.0;

/// A dynamically-typed value as seen by the host scripting environment.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// No value. Distinct from every typed zero and from the empty string.
    Absent,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// Any other host integer (unsigned or pointer-width), widened on the way in.
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Date(NaiveDateTime),
    String(String),
    Object(ComObject),
}

impl HostValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, HostValue::Absent)
    }

    pub fn as_object(&self) -> Option<&ComObject> {
        match self {
            HostValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<ComObject> {
        match self {
            HostValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl std::fmt::Display for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostValue::Absent => f.write_str("<absent>"),
            HostValue::Bool(v) => write!(f, "{v}"),
            HostValue::I8(v) => write!(f, "{v}"),
            HostValue::I16(v) => write!(f, "{v}"),
            HostValue::I32(v) => write!(f, "{v}"),
            HostValue::I64(v) => write!(f, "{v}"),
            HostValue::U64(v) => write!(f, "{v}"),
            HostValue::F32(v) => write!(f, "{v}"),
            HostValue::F64(v) => write!(f, "{v}"),
            HostValue::Char(v) => write!(f, "'{v}'"),
            HostValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            HostValue::String(v) => write!(f, "{v:?}"),
            HostValue::Object(obj) => write!(f, "{obj}"),
        }
    }
}

macro_rules! host_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for HostValue {
            fn from(value: $ty) -> Self {
                HostValue::$variant(value.into())
            }
        })*
    };
}

host_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U64,
    u16 => U64,
    u32 => U64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    NaiveDateTime => Date,
    String => String,
    &str => String,
    ComObject => Object,
}

impl From<usize> for HostValue {
    fn from(value: usize) -> Self {
        HostValue::U64(value as u64)
    }
}

impl From<isize> for HostValue {
    fn from(value: isize) -> Self {
        HostValue::I64(value as i64)
    }
}

impl TryFrom<serde_json::Value> for HostValue {
    type Error = BridgeError;

    /// JSON scalars map onto host values; arrays and objects have no native
    /// representation.
    fn try_from(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;
        match value {
            Json::Null => Ok(HostValue::Absent),
            Json::Bool(b) => Ok(HostValue::Bool(b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(HostValue::I64(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(HostValue::U64(u))
                } else {
                    n.as_f64()
                        .map(HostValue::F64)
                        .ok_or_else(|| BridgeError::UnsupportedValue(n.to_string()))
                }
            }
            Json::String(s) => Ok(HostValue::String(s)),
            other @ (Json::Array(_) | Json::Object(_)) => {
                Err(BridgeError::UnsupportedValue(other.to_string()))
            }
        }
    }
}

/// Result of converting a native value for the host.
#[derive(Debug)]
pub enum Marshalled {
    Value(HostValue),
    /// A component reference, adopted into its own dispatcher.
    Component(Dispatcher),
}

/// Convert a host value into its native variant.
pub fn to_native(value: &HostValue) -> Result<Variant> {
    Ok(match value {
        HostValue::Absent => Variant::Empty,
        HostValue::Bool(v) => Variant::Bool(*v),
        HostValue::I8(v) => Variant::I8(*v),
        HostValue::I16(v) => Variant::I16(*v),
        HostValue::I32(v) => Variant::I32(*v),
        HostValue::I64(v) => Variant::I64(*v),
        HostValue::F32(v) => Variant::F32(*v),
        HostValue::F64(v) => Variant::F64(*v),
        HostValue::Char(c) => {
            let mut units = [0u16; 2];
            match *c.encode_utf16(&mut units) {
                [unit] => Variant::Char(unit),
                _ => {
                    return Err(BridgeError::UnsupportedValue(format!(
                        "character {c:?} needs more than one UTF-16 unit"
                    )));
                }
            }
        }
        HostValue::Date(dt) => Variant::Date(to_oa_date(*dt)?),
        HostValue::String(s) => Variant::String(s.clone()),
        HostValue::U64(v) => Variant::I64(i64::try_from(*v).map_err(|_| {
            BridgeError::UnsupportedValue(format!("{v} does not fit a 64-bit integer"))
        })?),
        HostValue::Object(obj) => match obj.raw_handle() {
            Some(handle) => Variant::Dispatch(handle),
            None => {
                return Err(BridgeError::UnsupportedValue(format!(
                    "{obj} is a pending call, not a component"
                )));
            }
        },
    })
}

/// Convert a native variant for the host.
///
/// A component reference is adopted by a new dispatcher sharing `origin`'s
/// runtime and settings and labelled `label`.
pub fn from_native(origin: &Dispatcher, value: Variant, label: &str) -> Result<Marshalled> {
    let host = match value {
        Variant::Empty => HostValue::Absent,
        Variant::Bool(v) => HostValue::Bool(v),
        Variant::I8(v) => HostValue::I8(v),
        Variant::I16(v) => HostValue::I16(v),
        Variant::I32(v) => HostValue::I32(v),
        Variant::I64(v) => HostValue::I64(v),
        Variant::F32(v) => HostValue::F32(v),
        Variant::F64(v) => HostValue::F64(v),
        Variant::Char(unit) => HostValue::Char(char::from_u32(u32::from(unit)).ok_or_else(
            || BridgeError::UnsupportedValue(format!("unpaired UTF-16 surrogate {unit:#06x}")),
        )?),
        Variant::Date(days) => HostValue::Date(from_oa_date(days)?),
        Variant::String(s) => HostValue::String(s),
        Variant::Dispatch(handle) => return Ok(Marshalled::Component(origin.adopt(handle, label))),
        Variant::Unknown(vt) => {
            return Err(BridgeError::UnsupportedValue(format!("native VARTYPE {vt}")));
        }
    };
    Ok(Marshalled::Value(host))
}

fn oa_epoch() -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| BridgeError::UnsupportedValue("OLE date epoch".into()))
}

/// Encode a timestamp as an OLE automation date (millisecond precision).
///
/// Before the epoch the integer part counts days backwards while the fraction
/// still counts time forward, so 1899-12-29 06:00 is -1.25.
pub fn to_oa_date(dt: NaiveDateTime) -> Result<f64> {
    let total_ms = (dt - oa_epoch()?).num_milliseconds();
    let days = total_ms.div_euclid(MS_PER_DAY);
    let fraction = total_ms.rem_euclid(MS_PER_DAY) as f64 / MS_PER_DAY as f64;
    let oa = if days >= 0 {
        days as f64 + fraction
    } else {
        days as f64 - fraction
    };
    if !(OA_DATE_MIN..OA_DATE_MAX).contains(&oa) {
        return Err(BridgeError::UnsupportedValue(format!(
            "date {dt} is outside the OLE automation range"
        )));
    }
    Ok(oa)
}

/// Decode an OLE automation date.
pub fn from_oa_date(oa: f64) -> Result<NaiveDateTime> {
    if !oa.is_finite() || !(OA_DATE_MIN..OA_DATE_MAX).contains(&oa) {
        return Err(BridgeError::UnsupportedValue(format!("OLE date {oa}")));
    }
    let days = oa.trunc();
    let fraction = (oa - days).abs();
    let ms = days as i64 * MS_PER_DAY + (fraction * MS_PER_DAY as f64).round() as i64;
    oa_epoch()?
        .checked_add_signed(chrono::Duration::milliseconds(ms))
        .ok_or_else(|| BridgeError::UnsupportedValue(format!("OLE date {oa}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use combridge_core::BridgeConfig;
    use combridge_native::{NativeActivation, NativeRuntime, SimulatedRuntime};

    use super::*;

    fn date(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(h, min, s))
            .expect("valid date")
    }

    fn origin() -> (Arc<SimulatedRuntime>, Dispatcher) {
        let runtime = Arc::new(SimulatedRuntime::office());
        let dyn_runtime: Arc<dyn NativeRuntime> = runtime.clone();
        let dispatcher =
            Dispatcher::activate(dyn_runtime, "Excel.Application", &BridgeConfig::default())
                .expect("activate");
        (runtime, dispatcher)
    }

    fn round_trip(origin: &Dispatcher, value: HostValue) -> HostValue {
        let native = to_native(&value).expect("to native");
        match from_native(origin, native, "value").expect("from native") {
            Marshalled::Value(v) => v,
            Marshalled::Component(_) => panic!("unexpected component"),
        }
    }

    #[test]
    fn primitives_round_trip() {
        let (_runtime, origin) = origin();
        let samples = vec![
            HostValue::Bool(false),
            HostValue::Bool(true),
            HostValue::I8(0),
            HostValue::I8(i8::MIN),
            HostValue::I8(i8::MAX),
            HostValue::I16(-1),
            HostValue::I16(i16::MAX),
            HostValue::I32(0),
            HostValue::I32(i32::MIN),
            HostValue::I64(-42),
            HostValue::I64(i64::MAX),
            HostValue::F32(-0.5),
            HostValue::F32(f32::MAX),
            HostValue::F64(0.0),
            HostValue::F64(-1e300),
            HostValue::Char('x'),
            HostValue::Char('\u{FFFD}'),
            HostValue::String(String::new()),
            HostValue::String("Grüße".into()),
            HostValue::Date(date(1899, 12, 30, 0, 0, 0)),
            HostValue::Date(date(2024, 2, 29, 13, 45, 30)),
            HostValue::Date(date(1899, 12, 29, 6, 0, 0)),
            HostValue::Date(date(1850, 7, 4, 23, 59, 59)),
            HostValue::Absent,
        ];
        for value in samples {
            assert_eq!(round_trip(&origin, value.clone()), value);
        }
    }

    #[test]
    fn absent_maps_to_empty_not_zero() {
        assert_eq!(to_native(&HostValue::Absent).expect("absent"), Variant::Empty);
        assert_eq!(to_native(&HostValue::I32(0)).expect("zero"), Variant::I32(0));
    }

    #[test]
    fn other_integers_widen_to_i64() {
        assert_eq!(to_native(&HostValue::from(7u8)).expect("u8"), Variant::I64(7));
        assert_eq!(to_native(&HostValue::from(9usize)).expect("usize"), Variant::I64(9));
        assert_eq!(to_native(&HostValue::from(-3isize)).expect("isize"), Variant::I64(-3));
        assert!(matches!(
            to_native(&HostValue::U64(u64::MAX)),
            Err(BridgeError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn astral_characters_are_unsupported() {
        assert!(matches!(
            to_native(&HostValue::Char('😀')),
            Err(BridgeError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn unknown_native_tags_are_unsupported() {
        let (_runtime, origin) = origin();
        assert!(matches!(
            from_native(&origin, Variant::Unknown(14), "x"),
            Err(BridgeError::UnsupportedValue(msg)) if msg.contains("14")
        ));
        assert!(matches!(
            from_native(&origin, Variant::Char(0xD800), "x"),
            Err(BridgeError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn oa_dates_match_known_values() {
        assert_eq!(to_oa_date(date(1899, 12, 30, 0, 0, 0)).expect("epoch"), 0.0);
        assert_eq!(to_oa_date(date(1900, 1, 1, 12, 0, 0)).expect("noon"), 2.5);
        assert_eq!(to_oa_date(date(1899, 12, 29, 6, 0, 0)).expect("before"), -1.25);
        assert_eq!(from_oa_date(-1.25).expect("decode"), date(1899, 12, 29, 6, 0, 0));
        assert!(from_oa_date(f64::NAN).is_err());
        assert!(from_oa_date(1e9).is_err());
    }

    #[test]
    fn dispatch_values_are_adopted() {
        let (runtime, origin) = origin();
        let handle = runtime.activate("Excel.Application").expect("activate");
        match from_native(&origin, Variant::Dispatch(handle), "Other").expect("adopt") {
            Marshalled::Component(d) => {
                assert_eq!(d.handle(), handle);
                assert_eq!(d.label(), "Other");
            }
            Marshalled::Value(v) => panic!("expected component, got {v}"),
        }
        // Dropping the adopted dispatcher released the second instance.
        assert_eq!(runtime.live_instances(), 1);
    }

    #[test]
    fn json_scalars_convert() {
        use serde_json::json;
        assert_eq!(HostValue::try_from(json!(null)).expect("null"), HostValue::Absent);
        assert_eq!(HostValue::try_from(json!(true)).expect("bool"), HostValue::Bool(true));
        assert_eq!(HostValue::try_from(json!(-5)).expect("int"), HostValue::I64(-5));
        assert_eq!(
            HostValue::try_from(json!(u64::MAX)).expect("u64"),
            HostValue::U64(u64::MAX)
        );
        assert_eq!(HostValue::try_from(json!(1.5)).expect("float"), HostValue::F64(1.5));
        assert_eq!(
            HostValue::try_from(json!("Book1")).expect("str"),
            HostValue::String("Book1".into())
        );
        assert!(matches!(
            HostValue::try_from(json!([1, 2])),
            Err(BridgeError::UnsupportedValue(msg)) if msg == "[1,2]"
        ));
    }
}
