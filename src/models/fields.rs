//! Typed access to fields of raw JSON records

use serde_json::{Map, Value};

/// Outcome of reading one field from a raw record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<T> {
    Missing,
    /// Present but not a number (or not an integer where one is required);
    /// an explicit `null` counts as present
    Invalid,
    Value(T),
}

impl<T> Field<T> {
    pub fn or_default(self, default: T) -> Field<T> {
        match self {
            Field::Missing => Field::Value(default),
            other => other,
        }
    }
}

/// Read a finite floating-point field.
pub fn float(record: &Map<String, Value>, key: &str) -> Field<f64> {
    match record.get(key) {
        None => Field::Missing,
        Some(value) => match value.as_f64() {
            Some(number) if number.is_finite() => Field::Value(number),
            _ => Field::Invalid,
        },
    }
}

/// Read an integer field. Integral floats such as `60.0` are accepted,
/// fractional ones are not.
pub fn integer(record: &Map<String, Value>, key: &str) -> Field<i64> {
    match record.get(key) {
        None => Field::Missing,
        Some(value) => {
            if let Some(number) = value.as_i64() {
                return Field::Value(number);
            }
            match value.as_f64() {
                Some(number)
                    if number.fract() == 0.0
                        && number >= i64::MIN as f64
                        && number <= i64::MAX as f64 =>
                {
                    Field::Value(number as i64)
                }
                _ => Field::Invalid,
            }
        }
    }
}
