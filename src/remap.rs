// src/remap.rs

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::config::Lang;
use crate::response::{ClassDefinition, ValueRecord};
use crate::table::Table;

/// Key the units field uses in value records.
pub const UNIT_KEY: &str = "@unit";
/// Key the literal observation uses in value records.
pub const VALUE_KEY: &str = "$";
/// Name of the optional leading table-id column.
pub const STATS_DATA_ID_COLUMN: &str = "statsDataId";

/// Fixed headers substituted for `@unit` and `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapLabels {
    pub unit: String,
    pub value: String,
}

impl Default for RemapLabels {
    fn default() -> Self {
        Self {
            unit: "単位".to_string(),
            value: "値".to_string(),
        }
    }
}

impl RemapLabels {
    pub fn english() -> Self {
        Self {
            unit: "unit".to_string(),
            value: "value".to_string(),
        }
    }

    /// Labels matching the response language.
    pub fn for_lang(lang: Lang) -> Self {
        match lang {
            Lang::Japanese => Self::default(),
            Lang::English => Self::english(),
        }
    }
}

/// `@<axis_id>` → axis name for every class definition, plus the two fixed entries.
pub fn build_column_mapping(
    classes: &[ClassDefinition],
    labels: &RemapLabels,
) -> HashMap<String, String> {
    let mut mapping: HashMap<String, String> = classes
        .iter()
        .map(|c| (c.value_key(), c.axis_name.clone()))
        .collect();
    mapping.insert(UNIT_KEY.to_string(), labels.unit.clone());
    mapping.insert(VALUE_KEY.to_string(), labels.value.clone());
    mapping
}

/// Flatten `records` into a table and relabel its headers from `classes`.
///
/// Only headers change: cells keep their raw codes. Keys with no mapping
/// pass through unchanged. An empty `records` gives an empty table with no
/// columns.
pub fn remap_value_records(
    classes: &[ClassDefinition],
    records: &[ValueRecord],
    labels: &RemapLabels,
) -> Table {
    let rows: Vec<Value> = records.iter().cloned().map(Value::Object).collect();
    let mut table = Table::from_records(&rows);

    let mapping = build_column_mapping(classes, labels);
    let unmapped: Vec<&str> = table
        .columns()
        .iter()
        .filter(|c| !mapping.contains_key(c.as_str()))
        .map(String::as_str)
        .collect();
    if !unmapped.is_empty() {
        debug!(?unmapped, "columns without a class definition keep their key");
    }

    table.rename_columns(&mapping);
    table
}

/// [`remap_value_records`] with a leading `statsDataId` column holding `stats_data_id`.
pub fn remap_value_records_with_id(
    stats_data_id: &str,
    classes: &[ClassDefinition],
    records: &[ValueRecord],
    labels: &RemapLabels,
) -> Table {
    let mut table = remap_value_records(classes, records, labels);
    table.insert_column(0, STATS_DATA_ID_COLUMN, Some(stats_data_id.to_string()));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ClassCode;
    use serde_json::json;

    fn class(id: &str, name: &str) -> ClassDefinition {
        ClassDefinition {
            axis_id: id.to_string(),
            axis_name: name.to_string(),
            codes: vec![ClassCode {
                code: "001".into(),
                label: "Men".into(),
                level: None,
                unit: None,
                parent_code: None,
            }],
        }
    }

    fn record(v: Value) -> ValueRecord {
        match v {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_category_unit_value_are_relabeled() {
        let classes = vec![class("cat01", "Category")];
        let records = vec![record(json!({"@cat01": "001", "@unit": "people", "$": "12345"}))];

        let t = remap_value_records(&classes, &records, &RemapLabels::english());

        assert_eq!(t.columns(), &["Category", "unit", "value"]);
        assert_eq!(t.len(), 1);
        // cells stay raw codes
        assert_eq!(t.get(0, "Category"), Some("001"));
        assert_eq!(t.get(0, "unit"), Some("people"));
        assert_eq!(t.get(0, "value"), Some("12345"));
    }

    #[test]
    fn test_default_labels_are_japanese() {
        let records = vec![record(json!({"@unit": "人", "$": "10"}))];
        let t = remap_value_records(&[], &records, &RemapLabels::default());
        assert_eq!(t.columns(), &["単位", "値"]);
    }

    #[test]
    fn test_unmatched_axis_keys_pass_through() {
        let classes = vec![class("cat01", "Category")];
        let records = vec![record(
            json!({"@cat01": "001", "@area": "13000", "@tab": "020", "$": "7"}),
        )];

        let t = remap_value_records(&classes, &records, &RemapLabels::english());
        assert_eq!(t.columns(), &["Category", "@area", "@tab", "value"]);
    }

    #[test]
    fn test_no_classes_leaves_axis_columns() {
        let records = vec![record(json!({"@cat01": "001", "$": "1"}))];
        let t = remap_value_records(&[], &records, &RemapLabels::english());
        assert_eq!(t.columns(), &["@cat01", "value"]);
    }

    #[test]
    fn test_row_count_and_order_preserved() {
        let classes = vec![class("time", "Year")];
        let records: Vec<ValueRecord> = (0..5)
            .map(|i| record(json!({"@time": format!("20{:02}000000", i), "$": i.to_string()})))
            .collect();

        let t = remap_value_records(&classes, &records, &RemapLabels::english());
        assert_eq!(t.len(), records.len());
        assert_eq!(t.width(), 2);
        let values: Vec<_> = t.column("value").unwrap();
        assert_eq!(
            values,
            vec![Some("0"), Some("1"), Some("2"), Some("3"), Some("4")]
        );
    }

    #[test]
    fn test_empty_records_give_empty_table() {
        let classes = vec![class("cat01", "Category")];
        let t = remap_value_records(&classes, &[], &RemapLabels::default());
        assert_eq!(t.len(), 0);
        assert_eq!(t.width(), 0);

        let t = remap_value_records_with_id("0003410379", &classes, &[], &RemapLabels::default());
        assert_eq!(t.len(), 0);
        assert_eq!(t.columns(), &[STATS_DATA_ID_COLUMN]);
    }

    #[test]
    fn test_with_id_prefixes_one_column() {
        let classes = vec![class("cat01", "Category")];
        let records = vec![
            record(json!({"@cat01": "001", "$": "1"})),
            record(json!({"@cat01": "002", "$": "2"})),
        ];

        let t = remap_value_records_with_id("0003410379", &classes, &records, &RemapLabels::english());
        assert_eq!(t.columns(), &[STATS_DATA_ID_COLUMN, "Category", "value"]);
        assert_eq!(
            t.column(STATS_DATA_ID_COLUMN).unwrap(),
            vec![Some("0003410379"), Some("0003410379")]
        );
    }

    #[test]
    fn test_mapping_contents() {
        let mapping = build_column_mapping(&[class("area", "地域")], &RemapLabels::default());
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping["@area"], "地域");
        assert_eq!(mapping[UNIT_KEY], "単位");
        assert_eq!(mapping[VALUE_KEY], "値");
    }
}
