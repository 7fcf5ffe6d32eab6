// src/data.rs

use serde_json::Value;

use crate::remap::{self, RemapLabels, STATS_DATA_ID_COLUMN};
use crate::response::{self, ClassDefinition, ValueRecord};
use crate::table::{cell_text, flatten_record, Table};

/// Columns kept by [`StatList::basic_info_table`].
pub const BASIC_INFO_COLUMNS: &[&str] = &[
    "@id",
    "STATISTICS_NAME",
    "CYCLE",
    "SURVEY_DATE",
    "COLLECT_AREA",
    "DESCRIPTION",
    "TITLE_SPEC.TABLE_CATEGORY",
    "TITLE_SPEC.TABLE_NAME",
    "TITLE_SPEC.TABLE_EXPLANATION",
];

/// Identity and descriptive metadata of one statistical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableInfoRecord {
    pub id: Option<String>,
    pub stat_name: Option<String>,
    pub gov_org: Option<String>,
    pub statistics_name: Option<String>,
    pub title: Option<String>,
    pub cycle: Option<String>,
    pub survey_date: Option<String>,
    pub open_date: Option<String>,
    pub small_area: Option<String>,
    pub collect_area: Option<String>,
    pub main_category: Option<String>,
    pub sub_category: Option<String>,
    pub overall_total_number: Option<String>,
    pub updated_date: Option<String>,
    pub description: Option<String>,
    pub tabulation_category: Option<String>,
    pub tabulation_sub_category1: Option<String>,
    pub tabulation_sub_category2: Option<String>,
    pub tabulation_sub_category3: Option<String>,
    pub table_category: Option<String>,
    pub table_name: Option<String>,
    pub table_explanation: Option<String>,
}

impl TableInfoRecord {
    /// Build from one `TABLE_INF` element. Missing keys stay `None`.
    pub fn from_value(value: &Value) -> Self {
        let flat = flatten_record(value);
        let get = |key: &str| {
            flat.iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| cell_text(v))
        };
        // e.g. TITLE is a plain string in some tables and {"@no", "$"} in others
        let text = |key: &str| get(key).or_else(|| get(&format!("{}.$", key)));

        Self {
            id: get("@id"),
            stat_name: text("STAT_NAME"),
            gov_org: text("GOV_ORG"),
            statistics_name: get("STATISTICS_NAME"),
            title: text("TITLE"),
            cycle: get("CYCLE"),
            survey_date: get("SURVEY_DATE"),
            open_date: get("OPEN_DATE"),
            small_area: get("SMALL_AREA"),
            collect_area: get("COLLECT_AREA"),
            main_category: text("MAIN_CATEGORY"),
            sub_category: text("SUB_CATEGORY"),
            overall_total_number: get("OVERALL_TOTAL_NUMBER"),
            updated_date: get("UPDATED_DATE"),
            description: text("DESCRIPTION"),
            tabulation_category: get("STATISTICS_NAME_SPEC.TABULATION_CATEGORY"),
            tabulation_sub_category1: get("STATISTICS_NAME_SPEC.TABULATION_SUB_CATEGORY1"),
            tabulation_sub_category2: get("STATISTICS_NAME_SPEC.TABULATION_SUB_CATEGORY2"),
            tabulation_sub_category3: get("STATISTICS_NAME_SPEC.TABULATION_SUB_CATEGORY3"),
            table_category: get("TITLE_SPEC.TABLE_CATEGORY"),
            table_name: get("TITLE_SPEC.TABLE_NAME"),
            table_explanation: get("TITLE_SPEC.TABLE_EXPLANATION"),
        }
    }
}

/// A `getStatsData` response together with the table id it was requested for.
#[derive(Debug, Clone)]
pub struct StatsData {
    pub stats_data_id: String,
    pub raw: Value,
}

impl StatsData {
    pub fn new(stats_data_id: impl Into<String>, raw: Value) -> Self {
        Self {
            stats_data_id: stats_data_id.into(),
            raw,
        }
    }

    pub fn table_info_table(&self) -> Table {
        Table::from_records(&response::extract_table_info(&self.raw))
    }

    pub fn table_info(&self) -> Vec<TableInfoRecord> {
        table_info_records(&response::extract_table_info(&self.raw))
    }

    pub fn class_info_table(&self) -> Table {
        Table::from_records(&response::records_at(
            &self.raw,
            response::STATS_DATA_CLASS_OBJ,
        ))
    }

    /// Raw `VALUE` rows with a leading `statsDataId` column.
    pub fn value_table(&self) -> Table {
        let mut table = Table::from_records(&response::records_at(
            &self.raw,
            response::STATS_DATA_VALUE,
        ));
        table.insert_column(0, STATS_DATA_ID_COLUMN, Some(self.stats_data_id.clone()));
        table
    }

    /// The `CLASS` codes of one axis; empty when the axis is absent.
    pub fn column_info_table(&self, axis_id: &str) -> Table {
        let target = response::records_at(&self.raw, response::STATS_DATA_CLASS_OBJ)
            .into_iter()
            .find(|c| c.get("@id").and_then(Value::as_str) == Some(axis_id));
        match target {
            Some(obj) => Table::from_records(&response::as_records(obj.get("CLASS"))),
            None => Table::default(),
        }
    }

    /// Value rows with axis headers relabeled, led by the `statsDataId` column.
    pub fn column_modified_values_table(&self, labels: &RemapLabels) -> Table {
        remap::remap_value_records_with_id(
            &self.stats_data_id,
            &self.class_definitions(),
            &self.value_records(),
            labels,
        )
    }

    pub fn class_definitions(&self) -> Vec<ClassDefinition> {
        response::extract_class_definitions(&self.raw)
    }

    pub fn class_definition(&self, axis_id: &str) -> Option<ClassDefinition> {
        response::extract_class_definition_by_axis(&self.raw, axis_id)
    }

    pub fn value_records(&self) -> Vec<ValueRecord> {
        response::extract_value_records(&self.raw)
    }

    pub fn next_key(&self) -> Option<String> {
        response::next_key(&self.raw)
    }
}

/// A `getStatsList` response.
#[derive(Debug, Clone)]
pub struct StatList {
    pub raw: Value,
}

impl StatList {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn table(&self) -> Table {
        Table::from_records(&response::extract_list_table_info(&self.raw))
    }

    /// [`StatList::table`] projected onto [`BASIC_INFO_COLUMNS`].
    pub fn basic_info_table(&self) -> Table {
        self.table().select(BASIC_INFO_COLUMNS)
    }

    pub fn basic_info(&self) -> Vec<TableInfoRecord> {
        table_info_records(&response::extract_list_table_info(&self.raw))
    }

    pub fn next_key(&self) -> Option<String> {
        response::next_key(&self.raw)
    }
}

/// A `getMetaInfo` response.
#[derive(Debug, Clone)]
pub struct MetaInfo {
    pub raw: Value,
}

impl MetaInfo {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn table(&self) -> Table {
        Table::from_records(&response::extract_meta_table_info(&self.raw))
    }

    pub fn table_info(&self) -> Vec<TableInfoRecord> {
        table_info_records(&response::extract_meta_table_info(&self.raw))
    }

    pub fn class_definitions(&self) -> Vec<ClassDefinition> {
        response::extract_meta_class_definitions(&self.raw)
    }

    pub fn class_definition(&self, axis_id: &str) -> Option<ClassDefinition> {
        response::find_axis(self.class_definitions(), axis_id)
    }
}

fn table_info_records(records: &[Value]) -> Vec<TableInfoRecord> {
    records.iter().map(TableInfoRecord::from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats_data() -> StatsData {
        StatsData::new(
            "0003410379",
            json!({
                "GET_STATS_DATA": {
                    "STATISTICAL_DATA": {
                        "TABLE_INF": {"@id": "0003410379", "TITLE": "人口"},
                        "CLASS_INF": {
                            "CLASS_OBJ": [
                                {"@id": "area", "@name": "地域", "CLASS": [
                                    {"@code": "00000", "@name": "全国", "@level": "1"},
                                    {"@code": "13000", "@name": "東京都", "@level": "2"}
                                ]},
                                {"@id": "time", "@name": "時間軸", "CLASS": {"@code": "2020000000", "@name": "2020年"}}
                            ]
                        },
                        "DATA_INF": {
                            "VALUE": [
                                {"@area": "00000", "@time": "2020000000", "@unit": "人", "$": "126146099"},
                                {"@area": "13000", "@time": "2020000000", "@unit": "人", "$": "14047594"}
                            ]
                        }
                    }
                }
            }),
        )
    }

    #[test]
    fn test_column_modified_values_table() {
        let t = stats_data().column_modified_values_table(&RemapLabels::default());
        assert_eq!(t.columns(), &["statsDataId", "地域", "時間軸", "単位", "値"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(1, "地域"), Some("13000"));
        assert_eq!(t.get(1, "値"), Some("14047594"));
    }

    #[test]
    fn test_value_table_keeps_raw_keys() {
        let t = stats_data().value_table();
        assert_eq!(t.columns(), &["statsDataId", "@area", "@time", "@unit", "$"]);
    }

    #[test]
    fn test_table_info_single_object_is_one_row() {
        let t = stats_data().table_info_table();
        assert_eq!(t.len(), 1);
        assert_eq!(t.columns(), &["@id", "TITLE"]);
    }

    #[test]
    fn test_stats_data_table_info_is_typed() {
        let info = stats_data().table_info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].id.as_deref(), Some("0003410379"));
        assert_eq!(info[0].title.as_deref(), Some("人口"));
        assert_eq!(info[0].cycle, None);
    }

    #[test]
    fn test_class_info_table_flattens_class_obj() {
        let t = stats_data().class_info_table();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(0, "@id"), Some("area"));
        // single CLASS object flattens into dotted columns
        assert_eq!(t.get(1, "CLASS.@code"), Some("2020000000"));
    }

    #[test]
    fn test_column_info_table() {
        let data = stats_data();
        let area = data.column_info_table("area");
        assert_eq!(area.columns(), &["@code", "@name", "@level"]);
        assert_eq!(area.len(), 2);

        let time = data.column_info_table("time");
        assert_eq!(time.len(), 1);

        let missing = data.column_info_table("cat01");
        assert!(missing.is_empty());
        assert_eq!(missing.width(), 0);
    }

    #[test]
    fn test_stat_list_basic_info() {
        let list = StatList::new(json!({
            "GET_STATS_LIST": {
                "DATALIST_INF": {
                    "NUMBER": 1,
                    "TABLE_INF": {
                        "@id": "0003410379",
                        "STAT_NAME": {"@code": "00200521", "$": "国勢調査"},
                        "GOV_ORG": {"@code": "00200", "$": "総務省"},
                        "STATISTICS_NAME": "令和2年国勢調査 人口等基本集計",
                        "TITLE": {"@no": "001", "$": "男女別人口"},
                        "CYCLE": "-",
                        "SURVEY_DATE": 202010,
                        "COLLECT_AREA": "全国",
                        "STATISTICS_NAME_SPEC": {
                            "TABULATION_CATEGORY": "令和2年国勢調査",
                            "TABULATION_SUB_CATEGORY1": "人口等基本集計"
                        },
                        "TITLE_SPEC": {"TABLE_NAME": "男女別人口"}
                    }
                }
            }
        }));

        let info = list.basic_info();
        assert_eq!(info.len(), 1);
        let rec = &info[0];
        assert_eq!(rec.id.as_deref(), Some("0003410379"));
        assert_eq!(rec.stat_name.as_deref(), Some("国勢調査"));
        assert_eq!(rec.gov_org.as_deref(), Some("総務省"));
        assert_eq!(rec.title.as_deref(), Some("男女別人口"));
        assert_eq!(rec.survey_date.as_deref(), Some("202010"));
        assert_eq!(rec.tabulation_sub_category1.as_deref(), Some("人口等基本集計"));
        assert_eq!(rec.tabulation_sub_category2, None);
        assert_eq!(rec.description, None);

        let basic = list.basic_info_table();
        assert_eq!(basic.columns(), BASIC_INFO_COLUMNS);
        assert_eq!(basic.get(0, "TITLE_SPEC.TABLE_NAME"), Some("男女別人口"));
        assert_eq!(basic.get(0, "DESCRIPTION"), None);
    }

    #[test]
    fn test_meta_info_class_lookup() {
        let meta = MetaInfo::new(json!({
            "GET_META_INFO": {
                "METADATA_INF": {
                    "TABLE_INF": {"@id": "0003410379"},
                    "CLASS_INF": {"CLASS_OBJ": {"@id": "cat01", "@name": "男女", "CLASS": [
                        {"@code": "0", "@name": "総数"},
                        {"@code": "1", "@name": "男"}
                    ]}}
                }
            }
        }));

        assert_eq!(meta.table().len(), 1);
        let info = meta.table_info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].id.as_deref(), Some("0003410379"));
        let cat = meta.class_definition("cat01").expect("cat01");
        assert_eq!(cat.label_for("1"), Some("男"));
        assert!(meta.class_definition("area").is_none());
    }
}
