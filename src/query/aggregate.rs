// 按列最小/最大值
//
// 规则：
// - NULL 永远不参与比较，全为 NULL 的列结果为 NULL
// - 只有可排序类型（整数/实数/日期/日期时间/时间）参与，文本与布尔列结果为 NULL
// - 值类型与列声明类型不一致属于表结构错误，不做隐式转换

use super::types::Extreme;
use crate::storage::{ColumnDef, Row, Value};
use crate::MeteoError;
use std::cmp::Ordering;

/// 单列极值
pub fn column_extreme(
    rows: &[Row],
    column: &ColumnDef,
    which: Extreme,
) -> Result<Value, MeteoError> {
    if !column.column_type.is_orderable() {
        return Ok(Value::Null);
    }

    let mut best: Option<&Value> = None;
    for row in rows {
        let value = match row.get(&column.name) {
            Some(v) if !v.is_null() => v,
            _ => continue,
        };
        if !column.column_type.accepts(value) {
            return Err(MeteoError::TypeMismatch {
                column: column.name.clone(),
                expected: column.column_type.name().to_string(),
            });
        }

        best = match best {
            None => Some(value),
            Some(current) => {
                let replace = match (value.compare(current), which) {
                    (Some(Ordering::Less), Extreme::Min) => true,
                    (Some(Ordering::Greater), Extreme::Max) => true,
                    _ => false,
                };
                if replace {
                    Some(value)
                } else {
                    Some(current)
                }
            }
        };
    }

    Ok(best.cloned().unwrap_or(Value::Null))
}

/// 多列极值，按列顺序返回
pub fn extremes(
    rows: &[Row],
    columns: &[&ColumnDef],
    which: Extreme,
) -> Result<Vec<(String, Value)>, MeteoError> {
    columns
        .iter()
        .map(|column| Ok((column.name.clone(), column_extreme(rows, column, which)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ColumnType;
    use chrono::NaiveDate;

    fn row(time_h: u32, temp: Option<f64>, label: &str) -> Row {
        Row::new(vec![
            (
                "time".to_string(),
                Value::DateTime(
                    NaiveDate::from_ymd_opt(2024, 3, 1)
                        .unwrap()
                        .and_hms_opt(time_h, 0, 0)
                        .unwrap(),
                ),
            ),
            ("tempf".to_string(), temp.into()),
            ("label".to_string(), Value::Text(label.to_string())),
        ])
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("time", ColumnType::DateTime),
            ColumnDef::new("tempf", ColumnType::Real),
            ColumnDef::new("label", ColumnType::Text),
        ]
    }

    #[test]
    fn test_nulls_never_win() {
        let rows = vec![
            row(1, None, "a"),
            row(2, Some(40.5), "b"),
            row(3, Some(38.0), "c"),
            row(4, None, "d"),
        ];
        let cols = columns();
        let refs: Vec<&ColumnDef> = cols.iter().collect();

        let min = extremes(&rows, &refs, Extreme::Min).unwrap();
        assert_eq!(min[1], ("tempf".to_string(), Value::Float(38.0)));
        let max = extremes(&rows, &refs, Extreme::Max).unwrap();
        assert_eq!(max[1], ("tempf".to_string(), Value::Float(40.5)));
        assert_eq!(max[0].1, rows[3].get("time").cloned().unwrap());

        // 文本列不参与比较
        assert_eq!(max[2], ("label".to_string(), Value::Null));
    }

    #[test]
    fn test_all_null_column() {
        let rows = vec![row(1, None, "a"), row(2, None, "b")];
        let col = ColumnDef::new("tempf", ColumnType::Real);
        assert_eq!(column_extreme(&rows, &col, Extreme::Max).unwrap(), Value::Null);
    }

    #[test]
    fn test_empty_rows() {
        let cols = columns();
        let refs: Vec<&ColumnDef> = cols.iter().collect();
        let result = extremes(&[], &refs, Extreme::Min).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|(_, v)| v.is_null()));
    }

    #[test]
    fn test_result_is_observed_value() {
        let rows: Vec<Row> = [12.25, -3.5, 7.0, -3.5]
            .iter()
            .enumerate()
            .map(|(i, t)| row(i as u32, Some(*t), "x"))
            .collect();
        let col = ColumnDef::new("tempf", ColumnType::Real);
        for which in [Extreme::Min, Extreme::Max] {
            let v = column_extreme(&rows, &col, which).unwrap();
            assert!(rows.iter().any(|r| r.get("tempf") == Some(&v)));
        }
    }

    #[test]
    fn test_mixed_types_rejected() {
        let rows = vec![
            Row::new(vec![("tempf".to_string(), Value::Float(1.0))]),
            Row::new(vec![("tempf".to_string(), Value::Text("warm".into()))]),
        ];
        let col = ColumnDef::new("tempf", ColumnType::Real);
        assert!(matches!(
            column_extreme(&rows, &col, Extreme::Max),
            Err(MeteoError::TypeMismatch { .. })
        ));
    }
}
