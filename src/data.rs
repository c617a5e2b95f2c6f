use std::fmt;

use serde_json::Value as JsonValue;

/// A single table cell. Missing/unparseable cells are represented as
/// `None` at the row level, so `Value` itself only carries present data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::String(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Converts a JSON scalar into a cell. Nested arrays/objects are kept as
/// their serialized text so later passes can re-parse them (see
/// `sniff::expand_embedded_rows`).
pub fn json_to_cell(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(Value::String(b.to_string())),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Integer(i))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        JsonValue::String(s) => Some(Value::String(s.clone())),
        other => Some(Value::String(other.to_string())),
    }
}

/// Best-effort float coercion. String cells are trimmed and parsed;
/// failure yields `None` rather than an error.
pub fn coerce_float(value: &Value) -> Option<Value> {
    match value {
        Value::Float(_) | Value::Integer(_) => Some(value.clone()),
        Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Float),
    }
}

/// Best-effort year coercion to an integer. Accepts integral floats
/// (e.g. "2013.0") the way a lenient numeric cast would.
pub fn coerce_year(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(_) => Some(value.clone()),
        Value::Float(f) if f.fract() == 0.0 => Some(Value::Integer(*f as i64)),
        Value::Float(_) => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Some(Value::Integer(i));
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 => Some(Value::Integer(f as i64)),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_to_cell_maps_scalars() {
        assert_eq!(json_to_cell(&json!(null)), None);
        assert_eq!(json_to_cell(&json!(42)), Some(Value::Integer(42)));
        assert_eq!(json_to_cell(&json!(1.5)), Some(Value::Float(1.5)));
        assert_eq!(
            json_to_cell(&json!("abc")),
            Some(Value::String("abc".to_string()))
        );
        assert_eq!(
            json_to_cell(&json!(true)),
            Some(Value::String("true".to_string()))
        );
    }

    #[test]
    fn json_to_cell_serializes_nested_structures() {
        let cell = json_to_cell(&json!({"a": 1})).unwrap();
        assert_eq!(cell, Value::String("{\"a\":1}".to_string()));
    }

    #[test]
    fn coerce_float_handles_strings_and_garbage() {
        assert_eq!(
            coerce_float(&Value::String(" 3.25 ".to_string())),
            Some(Value::Float(3.25))
        );
        assert_eq!(coerce_float(&Value::String("n/a".to_string())), None);
        assert_eq!(coerce_float(&Value::Integer(7)), Some(Value::Integer(7)));
    }

    #[test]
    fn coerce_year_accepts_integral_floats_only() {
        assert_eq!(
            coerce_year(&Value::String("2013".to_string())),
            Some(Value::Integer(2013))
        );
        assert_eq!(
            coerce_year(&Value::String("2013.0".to_string())),
            Some(Value::Integer(2013))
        );
        assert_eq!(coerce_year(&Value::Float(2013.5)), None);
        assert_eq!(coerce_year(&Value::String("Q01".to_string())), None);
    }

    #[test]
    fn float_display_keeps_trailing_decimal() {
        assert_eq!(Value::Float(12.0).as_display(), "12.0");
        assert_eq!(Value::Float(3.2).as_display(), "3.2");
        assert_eq!(Value::Integer(12).as_display(), "12");
    }
}
