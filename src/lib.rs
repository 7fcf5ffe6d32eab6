//! Client for the e-Stat statistics API (api.e-stat.go.jp, REST 3.0, JSON).
//!
//! Responses are kept as raw [`serde_json::Value`]s and projected into flat
//! [`Table`]s on demand. [`remap`] relabels the `@`-prefixed axis columns of
//! `getStatsData` value rows with the axis names from `CLASS_INF`.

pub mod client;
pub mod config;
pub mod data;
pub mod remap;
pub mod response;
pub mod table;

pub use client::{Client, Endpoint, Params};
pub use config::{ClientConfig, Lang};
pub use data::{MetaInfo, StatList, StatsData, TableInfoRecord};
pub use remap::RemapLabels;
pub use response::{ClassCode, ClassDefinition, ValueRecord};
pub use table::Table;
