//! Purpose: JSON envelopes for CLI output.
//! Exports: `info_json`, `cell_json`, `row_json`.
//! Invariants: Stable key names; fields are additive-only.

use csvstore::api::{Engine, EngineStats};
use serde_json::{Map, Value, json};

pub(crate) fn info_json(engine: &Engine) -> Value {
    let options = engine.options();
    let mut map = Map::new();
    map.insert("path".to_string(), json!(engine.path().display().to_string()));
    map.insert("rows".to_string(), json!(engine.row_count()));
    map.insert("columns".to_string(), json!(engine.column_count()));
    map.insert("total_length".to_string(), json!(engine.total_length()));
    map.insert("delimiter".to_string(), json!(options.delimiter.to_string()));
    map.insert("appendable".to_string(), json!(options.appendable));
    if let Some(mode) = engine.mode() {
        map.insert("mode".to_string(), serde_json::to_value(mode).unwrap_or_default());
    }
    map.insert("stats".to_string(), stats_json(engine.stats()));
    Value::Object(map)
}

fn stats_json(stats: EngineStats) -> Value {
    serde_json::to_value(stats).unwrap_or_default()
}

pub(crate) fn cell_json(row: i64, col: i64, value: &str) -> Value {
    json!({ "row": row, "col": col, "value": value })
}

pub(crate) fn row_json(fields: &[String]) -> Value {
    json!(fields)
}
