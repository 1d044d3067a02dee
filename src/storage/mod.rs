//! 存储抽象层
//!
//! 核心只依赖 [`StorageEngine`] trait：表结构内省 + 查询执行。
//! 具体实现：
//! - [`SqliteStorage`]: 基于 rusqlite 的连接池实现（生产）
//! - [`MemoryStorage`]: 内存表实现（测试/演示），带调用计数

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::{SqliteConfig, SqliteStorage};

use crate::query::Query;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// 存储层错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// 存储引擎（外部协作者）
///
/// 实现必须是线程安全的：同一个实例在所有请求间共享。
pub trait StorageEngine: Send + Sync {
    /// 内省表结构，按声明顺序返回列定义；表不存在时返回 `TableNotFound`
    fn introspect(&self, table: &str) -> StorageResult<Vec<ColumnDef>>;

    /// 执行查询，按存储顺序返回行
    fn execute(&self, query: &Query) -> StorageResult<Vec<Row>>;
}

// ============================================================================
// 列定义
// ============================================================================

/// 列类型（由声明的 SQL 类型推导）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    Date,
    DateTime,
    Time,
}

impl ColumnType {
    /// 按 SQLite 亲和性规则推导列类型，时间类型优先识别
    pub fn from_declared(declared: &str) -> Self {
        let decl = declared.to_ascii_uppercase();
        if decl.contains("DATETIME") || decl.contains("TIMESTAMP") {
            ColumnType::DateTime
        } else if decl.contains("DATE") {
            ColumnType::Date
        } else if decl.contains("TIME") {
            ColumnType::Time
        } else if decl.contains("BOOL") {
            ColumnType::Boolean
        } else if decl.contains("INT") {
            ColumnType::Integer
        } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
            ColumnType::Text
        } else if decl.contains("REAL")
            || decl.contains("FLOA")
            || decl.contains("DOUB")
            || decl.contains("DEC")
            || decl.contains("NUM")
        {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }

    /// 是否参与最小/最大值比较
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer
                | ColumnType::Real
                | ColumnType::Date
                | ColumnType::DateTime
                | ColumnType::Time
        )
    }

    /// 值是否与列类型一致（NULL 与任何类型一致）
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Integer, Value::Int(_))
                | (ColumnType::Real, Value::Float(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Boolean, Value::Bool(_))
                | (ColumnType::Date, Value::Date(_))
                | (ColumnType::DateTime, Value::DateTime(_))
                | (ColumnType::Time, Value::Time(_))
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
        }
    }
}

/// 列定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

// ============================================================================
// 值与行
// ============================================================================

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// 线上 (JSON) 日期时间格式
pub const DATETIME_WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// SQLite 文本存储格式
pub const DATETIME_SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 文本形式的日期时间：`YYYY-MM-DD HH:MM:SS[.f]`、ISO `T` 分隔、精确到分钟，或纯日期
pub fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    [
        DATETIME_SQL_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .or_else(|| {
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    })
}

pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime_text(s).map(|dt| dt.date()))
}

pub fn parse_time_text(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveTime::parse_from_str(s, "%H:%M").ok())
}

/// 单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 同类型比较；类型不同或 NaN 时返回 None（不做类型转换）
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// 时间类值的小时数
    pub fn hour(&self) -> Option<u32> {
        match self {
            Value::DateTime(dt) => Some(dt.hour()),
            Value::Time(t) => Some(t.hour()),
            Value::Date(_) => Some(0),
            Value::Text(s) => parse_datetime_text(s).map(|dt| dt.hour()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            // 文本列按存储约定的日期时间格式解析
            Value::Text(s) => parse_datetime_text(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_WIRE_FORMAT)),
            Value::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            // NaN/Inf 无法用 JSON 表示
            Value::Float(v) if !v.is_finite() => serializer.serialize_none(),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(s) => serializer.serialize_str(s),
            other => serializer.collect_str(other),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// 存储层返回的一行：有序 (列名, 值)
///
/// 以 `_` 开头的字段是存储层的内部记录字段（例如 `_rowid`），物化时剔除。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

/// 内部记录字段前缀
pub const INTERNAL_FIELD_PREFIX: char = '_';

pub fn is_internal_field(name: &str) -> bool {
    name.starts_with(INTERNAL_FIELD_PREFIX)
}
