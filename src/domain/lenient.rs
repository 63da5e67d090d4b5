//! Forgiving field deserializers for semi-structured feed records.
//!
//! A missing, null, empty or mistyped field never fails deserialization of the
//! surrounding record; it collapses to the field's neutral value instead.

use super::{Decimal, ReferenceSnapshot, Side};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn raw<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Option::<Value>::deserialize(deserializer)
}

/// Non-empty string. Numbers are stringified, everything else is missing.
pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(raw(d)?.and_then(|v| match v {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Non-negative integer from a number or a numeric string.
pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(raw(d)?.and_then(|v| value_to_u64(&v)))
}

fn value_to_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x") {
                u64::from_str_radix(hex, 16).ok()
            } else {
                s.parse::<u64>().ok()
            }
        }
        _ => None,
    }
}

/// Decimal defaulting to zero.
pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    Ok(raw(d)?
        .and_then(|v| Decimal::from_json(&v))
        .unwrap_or_default())
}

pub fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
    Ok(raw(d)?.and_then(|v| Decimal::from_json(&v)))
}

pub fn opt_side<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Side>, D::Error> {
    Ok(raw(d)?.and_then(|v| v.as_str().and_then(Side::parse)))
}

pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(raw(d)?.and_then(|v| match v {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }))
}

/// Keep the raw value unless it is null.
pub fn opt_raw<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Ok(raw(d)?.filter(|v| !v.is_null()))
}

/// A reference snapshot is only kept if it is a JSON object.
pub fn opt_snapshot<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<ReferenceSnapshot>, D::Error> {
    Ok(raw(d)?.and_then(|v| match v {
        Value::Object(_) => serde_json::from_value(v).ok(),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_u64() {
        assert_eq!(value_to_u64(&json!(5)), Some(5));
        assert_eq!(value_to_u64(&json!(5.0)), Some(5));
        assert_eq!(value_to_u64(&json!("12")), Some(12));
        assert_eq!(value_to_u64(&json!("0x1f")), Some(31));
        assert_eq!(value_to_u64(&json!(-1)), None);
        assert_eq!(value_to_u64(&json!(1.5)), None);
        assert_eq!(value_to_u64(&json!("")), None);
    }
}
