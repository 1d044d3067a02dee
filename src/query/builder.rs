// 查询构建器
//
// 表 + 可选时间窗口 + 可选等值过滤 + 可选列投影 → Query

use super::types::{ColumnProjection, Filter, FilterSet, Query, Window};
use crate::schema::TableDescriptor;
use crate::storage::{ColumnDef, ColumnType, Value, DATETIME_SQL_FORMAT};
use crate::MeteoError;
use chrono::{Days, NaiveDateTime, NaiveTime};

/// 查询构建器
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    table: &'a TableDescriptor,
    window: Option<Window>,
    filters: FilterSet,
    projection: ColumnProjection,
    hours: Option<Vec<u32>>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(table: &'a TableDescriptor) -> Self {
        Self {
            table,
            window: None,
            filters: FilterSet::new(),
            projection: ColumnProjection::default(),
            hours: None,
        }
    }

    pub fn window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    pub fn filters(mut self, filters: &FilterSet) -> Self {
        for (column, value) in filters.iter() {
            self.filters.insert(column.clone(), value.clone());
        }
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(column, value);
        self
    }

    pub fn projection(mut self, projection: &ColumnProjection) -> Self {
        self.projection = projection.clone();
        self
    }

    /// 锚定列的小时过滤 (0-23)
    pub fn hours(mut self, hours: Vec<u32>) -> Self {
        self.hours = Some(hours);
        self
    }

    pub fn build(self) -> Result<Query, MeteoError> {
        let table = self.table;
        let mut filters = Vec::new();

        if let Some(window) = &self.window {
            let anchor = table.anchor()?;
            let (start, end) = window_bounds(anchor, window)?;
            filters.push(Filter::gte(anchor.name.clone(), start));
            filters.push(Filter::lt(anchor.name.clone(), end));
        }

        if let Some(hours) = self.hours {
            let anchor = table.anchor()?;
            if let Some(bad) = hours.iter().find(|h| **h > 23) {
                return Err(MeteoError::InvalidParameter(format!(
                    "hour out of range: {}",
                    bad
                )));
            }
            filters.push(Filter::hour_in(anchor.name.clone(), hours));
        }

        for (column, value) in self.filters.iter() {
            let def = table.require_column(column)?;
            filters.push(Filter::eq(column.clone(), coerce_filter_value(def, value)?));
        }

        let columns = if self.projection.is_empty() {
            table.column_names()
        } else {
            for column in self.projection.columns() {
                table.require_column(column)?;
            }
            self.projection.columns().to_vec()
        };

        let query = Query {
            table: table.name.clone(),
            columns,
            filters,
            order_by: None,
            limit: None,
        };
        log::debug!("Built query on {}: {:?}", query.table, query.filters);
        Ok(query)
    }
}

/// 一次性构建：可选窗口、可选过滤、可选投影
pub fn build(
    table: &TableDescriptor,
    window: Option<Window>,
    filters: Option<&FilterSet>,
    projection: Option<&ColumnProjection>,
) -> Result<Query, MeteoError> {
    let mut builder = QueryBuilder::new(table);
    if let Some(window) = window {
        builder = builder.window(window);
    }
    if let Some(filters) = filters {
        builder = builder.filters(filters);
    }
    if let Some(projection) = projection {
        builder = builder.projection(projection);
    }
    builder.build()
}

/// 窗口边界按锚定列类型表示。日期列的结束边界向上取整到下一个整日
fn window_bounds(anchor: &ColumnDef, window: &Window) -> Result<(Value, Value), MeteoError> {
    match anchor.column_type {
        ColumnType::DateTime => Ok((
            Value::DateTime(window.start()),
            Value::DateTime(window.end()),
        )),
        ColumnType::Date => {
            let start = window.start().date();
            let end = ceil_to_date(window.end())?;
            Ok((Value::Date(start), Value::Date(end)))
        }
        ColumnType::Text => Ok((
            Value::Text(window.start().format(DATETIME_SQL_FORMAT).to_string()),
            Value::Text(window.end().format(DATETIME_SQL_FORMAT).to_string()),
        )),
        other => Err(MeteoError::TypeMismatch {
            column: anchor.name.clone(),
            expected: format!("date or datetime, found {}", other.name()),
        }),
    }
}

fn ceil_to_date(ts: NaiveDateTime) -> Result<chrono::NaiveDate, MeteoError> {
    if ts.time() == NaiveTime::MIN {
        return Ok(ts.date());
    }
    ts.date()
        .checked_add_days(Days::new(1))
        .ok_or_else(|| MeteoError::InvalidParameter(format!("date out of range: {}", ts)))
}

/// 过滤值按列类型对齐：布尔标记可用于整数列，整数可用于实数列
fn coerce_filter_value(column: &ColumnDef, value: &Value) -> Result<Value, MeteoError> {
    let coerced = match (column.column_type, value) {
        (ColumnType::Integer, Value::Bool(b)) => Value::Int(*b as i64),
        (ColumnType::Real, Value::Int(i)) => Value::Float(*i as f64),
        (_, v) => v.clone(),
    };

    if column.column_type.accepts(&coerced) {
        Ok(coerced)
    } else {
        Err(MeteoError::InvalidParameter(format!(
            "column '{}' is {}, cannot filter by '{}'",
            column.name,
            column.column_type.name(),
            value
        )))
    }
}
