// src/table/flatten.rs

use serde_json::Value;

/// Flatten one JSON object into `(dotted.key, leaf)` pairs, keeping key order.
///
/// Nested objects are walked and their keys joined with `.`; arrays and
/// scalars are leaves. A non-object input yields no pairs.
pub fn flatten_record(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    if let Value::Object(map) = value {
        for (k, v) in map {
            flatten_into(k.clone(), v, &mut out);
        }
    }
    out
}

fn flatten_into(prefix: String, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten_into(format!("{}.{}", prefix, k), v, out);
            }
        }
        leaf => out.push((prefix, leaf.clone())),
    }
}

/// Render a leaf as a table cell: strings verbatim, `null` as missing,
/// everything else as compact JSON text.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
