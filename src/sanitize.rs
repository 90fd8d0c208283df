//! Numeric sanitization for outer serialization
//!
//! RPC results keep the daemon's fixed-point decimals verbatim (the crate
//! enables serde_json's `arbitrary_precision`). Serializers that only
//! understand IEEE floats need them converted first.

use serde_json::{Number, Value};

/// Recursively convert every non-integer numeric leaf to an `f64`.
///
/// Strings, booleans, null and integers are left untouched, as is the
/// shape of every object and array. Applying it twice gives the same
/// result as applying it once.
pub fn to_float_safe(value: &Value) -> Value {
    match value {
        Value::Number(n) if is_high_precision(n) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_float_safe(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_float_safe).collect()),
        other => other.clone(),
    }
}

fn is_high_precision(n: &Number) -> bool {
    !n.is_i64() && !n.is_u64()
}
