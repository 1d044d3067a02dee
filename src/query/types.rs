// 查询引擎类型定义

use crate::storage::{Value, DATETIME_WIRE_FORMAT};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::cmp::Ordering;

/// 时间窗口：半开区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Window {
    /// 创建窗口；`start > end` 时返回 None
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// 结束时间（不包含）
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    #[cfg(test)]
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format(DATETIME_WIRE_FORMAT),
            self.end.format(DATETIME_WIRE_FORMAT)
        )
    }
}

/// 列投影：有序的请求列；为空表示全部列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnProjection {
    columns: Vec<String>,
}

impl ColumnProjection {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projection = Self::default();
        for column in columns {
            let column = column.into();
            // 重复列只保留第一次出现的位置
            if !projection.columns.contains(&column) {
                projection.columns.push(column);
            }
        }
        projection
    }

    /// 解析逗号分隔的列表 (`a,b,c`)，忽略空白项
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// 附加过滤条件：列名 → 期望值（保持插入顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    entries: Vec<(String, Value)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 等值条件；同名列后写覆盖先写
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// 布尔标记条件 (`column == true`)，用于选取预先标记的行
    pub fn with_flag(self, column: impl Into<String>) -> Self {
        self.with(column, true)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }
}

/// 过滤条件
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// 列名
    pub column: String,
    /// 操作符
    pub op: FilterOp,
    /// 值
    pub value: FilterValue,
}

/// 过滤操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,     // ==
    Gte,    // >=
    Lt,     // <
    HourIn, // HOUR(column) IN (...)
}

/// 过滤值
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Value),
    Hours(Vec<u32>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: FilterValue::Scalar(value),
        }
    }

    pub fn gte(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Gte,
            value: FilterValue::Scalar(value),
        }
    }

    pub fn lt(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Lt,
            value: FilterValue::Scalar(value),
        }
    }

    pub fn hour_in(column: impl Into<String>, hours: Vec<u32>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::HourIn,
            value: FilterValue::Hours(hours),
        }
    }

    /// 对单个单元格求值。NULL 不满足任何条件（与 SQL 三值逻辑一致）
    pub fn matches(&self, cell: &Value) -> bool {
        if cell.is_null() {
            return false;
        }
        match (&self.op, &self.value) {
            (FilterOp::Eq, FilterValue::Scalar(v)) => cell.compare(v) == Some(Ordering::Equal),
            (FilterOp::Gte, FilterValue::Scalar(v)) => {
                matches!(cell.compare(v), Some(Ordering::Greater | Ordering::Equal))
            }
            (FilterOp::Lt, FilterValue::Scalar(v)) => cell.compare(v) == Some(Ordering::Less),
            (FilterOp::HourIn, FilterValue::Hours(hours)) => {
                cell.hour().map(|h| hours.contains(&h)).unwrap_or(false)
            }
            _ => false,
        }
    }
}

/// 排序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// 列名
    pub column: String,
    /// 是否降序
    pub descending: bool,
}

/// 已构建的查询
///
/// `columns` 总是显式列出（投影为空时为表的全部声明列）。
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 表名
    pub table: String,
    /// 返回列
    pub columns: Vec<String>,
    /// 过滤条件（AND）
    pub filters: Vec<Filter>,
    /// 排序（可选）；未指定时按存储顺序返回
    pub order_by: Option<OrderBy>,
    /// 限制返回行数（可选）
    pub limit: Option<usize>,
}

impl Query {
    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// 极值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Extreme {
    Min,
    Max,
}

impl std::str::FromStr for Extreme {
    type Err = crate::MeteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "min" => Ok(Extreme::Min),
            "max" => Ok(Extreme::Max),
            other => Err(crate::MeteoError::InvalidParameter(format!(
                "expected min or max, got '{}'",
                other
            ))),
        }
    }
}
