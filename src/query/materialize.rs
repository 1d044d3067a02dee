// 结果物化：行 → 有序字段映射（JSON）

use crate::storage::{is_internal_field, Row, Value};
use serde_json::{Map, Number, Value as JsonValue};

/// 线上记录：保持字段顺序的 JSON 对象
pub type Record = Map<String, JsonValue>;

pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s.clone()),
        other => JsonValue::String(other.to_string()),
    }
}

/// 单行物化。字段顺序由 `order` 决定（表声明顺序或投影顺序），
/// 内部记录字段永远不会出现在结果中。
pub fn materialize_row(row: &Row, order: &[String]) -> Record {
    let mut record = Record::new();
    for name in order {
        if is_internal_field(name) {
            continue;
        }
        let value = row.get(name).map(to_json).unwrap_or(JsonValue::Null);
        record.insert(name.clone(), value);
    }
    record
}

pub fn materialize(rows: &[Row], order: &[String]) -> Vec<Record> {
    rows.iter().map(|row| materialize_row(row, order)).collect()
}

/// 已是 (列, 值) 序列的结果（例如最小/最大值汇总）
pub fn materialize_pairs(pairs: &[(String, Value)]) -> Record {
    pairs
        .iter()
        .filter(|(name, _)| !is_internal_field(name))
        .map(|(name, value)| (name.clone(), to_json(value)))
        .collect()
}
