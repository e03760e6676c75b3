//! JSON projection of value trees.
//!
//! Binary strings render as `0x`-prefixed hex text. Integer-keyed tables
//! render as objects whose keys are the decimal indexes. Doubles that JSON
//! cannot carry (NaN, infinities) render as `null`. Object member order is
//! kept in both directions.

use super::{KeyRef, PackableNumber, PackableString, PackableTable, PackableValue, TableKey};
use serde_json::{Map, Number, Value};

/// Project a value into JSON.
pub fn to_json(value: &PackableValue) -> Value {
    match value {
        PackableValue::Boolean(b) => Value::Bool(*b),
        PackableValue::Number(PackableNumber::Long(v)) => Value::Number((*v).into()),
        PackableValue::Number(PackableNumber::Double(v)) => {
            Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null)
        }
        PackableValue::String(s) if s.is_utf8() => Value::String(s.as_str().into_owned()),
        PackableValue::String(s) => Value::String(format!("0x{}", hex::encode(s.as_bytes()))),
        PackableValue::Table(t) => {
            let mut object = Map::with_capacity(t.len());
            for (key, value) in t.iter() {
                let key = match key {
                    KeyRef::Int(k) => k.to_string(),
                    KeyRef::Str(k) => k.to_string(),
                };
                object.insert(key, to_json(value));
            }
            Value::Object(object)
        }
    }
}

/// Build a value tree from JSON. `null` is absent and is dropped inside
/// containers; arrays become integer-keyed tables indexed from 0.
pub fn from_json(json: &Value) -> Option<PackableValue> {
    match json {
        Value::Null => None,
        Value::Bool(b) => Some(PackableValue::Boolean(*b)),
        Value::Number(n) => Some(PackableValue::Number(match n.as_i64() {
            Some(v) => PackableNumber::Long(v),
            None => PackableNumber::Double(n.as_f64().unwrap_or(f64::NAN)),
        })),
        Value::String(s) => Some(PackableValue::String(PackableString::new(s.as_str()))),
        Value::Array(items) => {
            let table: PackableTable = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| from_json(item).map(|v| (TableKey::Int(i as i64), v)))
                .collect();
            Some(PackableValue::Table(table))
        }
        Value::Object(object) => {
            let table: PackableTable = object
                .iter()
                .filter_map(|(k, item)| from_json(item).map(|v| (TableKey::Str(k.clone()), v)))
                .collect();
            Some(PackableValue::Table(table))
        }
    }
}
