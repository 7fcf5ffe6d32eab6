// src/response.rs
//
// Defaulting navigation into raw e-Stat responses. Nothing here fails:
// absent or oddly-shaped structure reads as an empty result.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// One observation: axis codes under `@`-prefixed keys, the literal under `$`.
pub type ValueRecord = Map<String, Value>;

pub const STATS_DATA_TABLE_INF: &[&str] = &["GET_STATS_DATA", "STATISTICAL_DATA", "TABLE_INF"];
pub const STATS_DATA_CLASS_OBJ: &[&str] =
    &["GET_STATS_DATA", "STATISTICAL_DATA", "CLASS_INF", "CLASS_OBJ"];
pub const STATS_DATA_VALUE: &[&str] = &["GET_STATS_DATA", "STATISTICAL_DATA", "DATA_INF", "VALUE"];
pub const STATS_LIST_TABLE_INF: &[&str] = &["GET_STATS_LIST", "DATALIST_INF", "TABLE_INF"];
pub const META_TABLE_INF: &[&str] = &["GET_META_INFO", "METADATA_INF", "TABLE_INF"];
pub const META_CLASS_OBJ: &[&str] = &["GET_META_INFO", "METADATA_INF", "CLASS_INF", "CLASS_OBJ"];

const ROOTS: &[&str] = &["GET_STATS_DATA", "GET_STATS_LIST", "GET_META_INFO"];

/// One code on an axis, e.g. `{"@code": "13000", "@name": "東京都", "@level": "2"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassCode {
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "@name", default)]
    pub label: String,
    #[serde(rename = "@level", default)]
    pub level: Option<String>,
    #[serde(rename = "@unit", default)]
    pub unit: Option<String>,
    #[serde(rename = "@parentCode", default)]
    pub parent_code: Option<String>,
}

/// The codes and human-readable name of one classification axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    pub axis_id: String,
    pub axis_name: String,
    pub codes: Vec<ClassCode>,
}

impl ClassDefinition {
    /// Parse one `CLASS_OBJ` element. Objects without a string `@id` are rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let axis_id = value.get("@id")?.as_str()?.to_string();
        let axis_name = value
            .get("@name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let codes = as_records(value.get("CLASS"))
            .into_iter()
            .filter_map(|c| match serde_json::from_value::<ClassCode>(c) {
                Ok(code) => Some(code),
                Err(e) => {
                    trace!(axis = %axis_id, error = %e, "skipping malformed CLASS entry");
                    None
                }
            })
            .collect();
        Some(Self {
            axis_id,
            axis_name,
            codes,
        })
    }

    /// Column key this axis occupies in value records (`@` + axis id).
    pub fn value_key(&self) -> String {
        format!("@{}", self.axis_id)
    }

    /// Label for `code` on this axis.
    ///
    /// Separate lookup only; remapping relabels column headers and leaves
    /// the cells as raw codes.
    pub fn label_for(&self, code: &str) -> Option<&str> {
        self.codes
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.label.as_str())
    }
}

/// The `RESULT` header every e-Stat response carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    pub status: u32,
    pub error_msg: String,
    pub date: Option<DateTime<FixedOffset>>,
}

impl ApiResult {
    /// Statuses from 100 upward are request errors; below that the body is usable.
    pub fn is_error(&self) -> bool {
        self.status >= 100
    }
}

/// Coerce a node into a list of elements.
///
/// The API returns a bare object instead of a one-element array when there
/// is exactly one result, so: array → its elements, object → one element,
/// anything else (or absent) → empty.
pub fn as_records(node: Option<&Value>) -> Vec<Value> {
    match node {
        Some(Value::Array(items)) => items.clone(),
        Some(obj @ Value::Object(_)) => vec![obj.clone()],
        _ => Vec::new(),
    }
}

/// Walk `path` through nested objects; `None` as soon as a key is missing.
pub fn navigate<'a>(response: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(response, |node, key| node.get(*key))
}

/// Elements found at `path`, normalized by [`as_records`].
pub fn records_at(response: &Value, path: &[&str]) -> Vec<Value> {
    let records = as_records(navigate(response, path));
    if records.is_empty() {
        debug!(path = %path.join("."), "no records");
    }
    records
}

/// `TABLE_INF` of a statistics-data response.
pub fn extract_table_info(response: &Value) -> Vec<Value> {
    records_at(response, STATS_DATA_TABLE_INF)
}

/// `TABLE_INF` of a table-list response.
pub fn extract_list_table_info(response: &Value) -> Vec<Value> {
    records_at(response, STATS_LIST_TABLE_INF)
}

/// `TABLE_INF` of a metadata response.
pub fn extract_meta_table_info(response: &Value) -> Vec<Value> {
    records_at(response, META_TABLE_INF)
}

fn class_definitions_at(response: &Value, path: &[&str]) -> Vec<ClassDefinition> {
    records_at(response, path)
        .iter()
        .filter_map(|v| {
            let def = ClassDefinition::from_value(v);
            if def.is_none() {
                debug!("skipping CLASS_OBJ without @id");
            }
            def
        })
        .collect()
}

/// `CLASS_OBJ` entries of a statistics-data response.
pub fn extract_class_definitions(response: &Value) -> Vec<ClassDefinition> {
    class_definitions_at(response, STATS_DATA_CLASS_OBJ)
}

/// `CLASS_OBJ` entries of a metadata response.
pub fn extract_meta_class_definitions(response: &Value) -> Vec<ClassDefinition> {
    class_definitions_at(response, META_CLASS_OBJ)
}

/// `VALUE` rows of a statistics-data response. Non-object elements are dropped.
pub fn extract_value_records(response: &Value) -> Vec<ValueRecord> {
    records_at(response, STATS_DATA_VALUE)
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// The class definition whose `@id` equals `axis_id` exactly.
pub fn extract_class_definition_by_axis(response: &Value, axis_id: &str) -> Option<ClassDefinition> {
    find_axis(extract_class_definitions(response), axis_id)
}

pub(crate) fn find_axis(defs: Vec<ClassDefinition>, axis_id: &str) -> Option<ClassDefinition> {
    defs.into_iter().find(|d| d.axis_id == axis_id)
}

/// The `RESULT` header under whichever root key the response has.
pub fn result_header(response: &Value) -> Option<ApiResult> {
    let result = ROOTS
        .iter()
        .find_map(|root| navigate(response, &[*root, "RESULT"]))?;

    // STATUS arrives as a number, but tolerate a numeric string
    let status = match result.get("STATUS")? {
        Value::Number(n) => n.as_u64()? as u32,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let error_msg = result
        .get("ERROR_MSG")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let date = result
        .get("DATE")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok());

    Some(ApiResult {
        status,
        error_msg,
        date,
    })
}

/// Start position of the next page, when the server truncated the result.
pub fn next_key(response: &Value) -> Option<String> {
    [
        &["GET_STATS_DATA", "STATISTICAL_DATA", "RESULT_INF", "NEXT_KEY"][..],
        &["GET_STATS_LIST", "DATALIST_INF", "RESULT_INF", "NEXT_KEY"][..],
    ]
    .iter()
    .find_map(|path| navigate(response, path))
    .and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
