use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Touch value written on insert and on read; the sweeper counts it down.
pub(crate) const TOUCH_LIVE: u8 = 1;

/// A stored payload.
///
/// Closed sum over the numeric kinds the arithmetic update supports, plus
/// opaque string and byte branches. Opaque payloads are `Arc`-backed: a
/// lookup hands out a shared handle, never a copy of the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
}

impl Value {
    /// Apply a floating-point delta to a numeric payload.
    ///
    /// The delta is narrowed to the payload's own kind first (saturating
    /// float-to-int conversion, as `as` casts do), then added with wrapping
    /// integer arithmetic. Non-numeric payloads yield `None`.
    pub(crate) fn numeric_add(&self, n: f64) -> Option<Value> {
        let updated = match *self {
            Value::I8(v) => Value::I8(v.wrapping_add(n as i8)),
            Value::I16(v) => Value::I16(v.wrapping_add(n as i16)),
            Value::I32(v) => Value::I32(v.wrapping_add(n as i32)),
            Value::I64(v) => Value::I64(v.wrapping_add(n as i64)),
            Value::U8(v) => Value::U8(v.wrapping_add(n as u8)),
            Value::U16(v) => Value::U16(v.wrapping_add(n as u16)),
            Value::U32(v) => Value::U32(v.wrapping_add(n as u32)),
            Value::U64(v) => Value::U64(v.wrapping_add(n as u64)),
            Value::F32(v) => Value::F32(v + n as f32),
            Value::F64(v) => Value::F64(v + n),
            Value::Str(_) | Value::Bytes(_) => return None,
        };
        Some(updated)
    }

    /// Borrow the payload as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the payload as raw bytes, if it is the opaque byte kind.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($variant:ident: $ty:ty),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        })*
    };
}

value_from! {
    I8: i8, I16: i16, I32: i32, I64: i64,
    U8: u8, U16: u16, U32: u32, U64: u64,
    F32: f32, F64: f64,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Arc::from(v.as_str()))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Arc::from(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Arc::from(v.as_slice()))
    }
}

/// One cache entry. Owned by exactly one bucket at a time.
///
/// `touch` is the only field the sweeper reads. Lookups store `TOUCH_LIVE`
/// into it under a *read* lock; that relaxed byte store is benign because
/// every racing writer stores the same value, and the sweeper's clear and
/// decrement run under the bucket's write lock.
#[derive(Debug)]
pub(crate) struct Item {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: Value,
    pub(crate) touch: AtomicU8,
}

impl Item {
    pub(crate) fn new(key: &[u8], value: Value) -> Self {
        Self {
            key: Box::from(key),
            value,
            touch: AtomicU8::new(TOUCH_LIVE),
        }
    }

    pub(crate) fn refresh(&self) {
        self.touch.store(TOUCH_LIVE, Ordering::Relaxed);
    }

    pub(crate) fn touch_value(&self) -> u8 {
        self.touch.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_add_dispatches_on_kind() {
        assert_eq!(Value::I32(5).numeric_add(2.0), Some(Value::I32(7)));
        assert_eq!(Value::U8(250).numeric_add(10.0), Some(Value::U8(4)));
        assert_eq!(Value::F64(1.5).numeric_add(0.25), Some(Value::F64(1.75)));
        assert_eq!(Value::I64(-3).numeric_add(-2.0), Some(Value::I64(-5)));
    }

    #[test]
    fn numeric_add_truncates_toward_zero_for_integers() {
        assert_eq!(Value::I32(0).numeric_add(2.9), Some(Value::I32(2)));
        assert_eq!(Value::I32(0).numeric_add(-2.9), Some(Value::I32(-2)));
    }

    #[test]
    fn numeric_add_rejects_opaque_payloads() {
        assert_eq!(Value::from("abc").numeric_add(1.0), None);
        assert_eq!(Value::from(&b"raw"[..]).numeric_add(1.0), None);
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(7i16), Value::I16(7));
        assert_eq!(Value::from("s").as_str(), Some("s"));
        assert_eq!(Value::from(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn new_items_start_live() {
        let item = Item::new(b"k", Value::U64(1));
        assert_eq!(item.touch_value(), TOUCH_LIVE);
    }
}
