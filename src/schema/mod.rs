//! 表结构目录
//!
//! 五种粒度 (原始读数/日汇总/周汇总/月汇总/通用聚合) 各对应一张表，
//! 每张表有且只有一个时间锚定列。目录在启动时通过存储层内省一次性构建，
//! 此后只读。

pub mod catalog;

pub use catalog::SchemaCatalog;

use crate::storage::ColumnDef;
use crate::MeteoError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// 时间锚定列候选，按优先级排列
pub const ANCHOR_CANDIDATES: [&str; 4] = ["date", "week_start", "next_month_start", "time"];

/// 精确时间过滤所用的列
pub const TIME_COLUMN: &str = "time";

/// 主键列（"最新一条"优先按它排序）
pub const IDENTITY_COLUMN: &str = "id";

/// 数据粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// 气象站原始读数
    Raw,
    /// 日汇总
    Daily,
    /// 周汇总
    Weekly,
    /// 月汇总
    Monthly,
    /// 通用聚合（小时级）
    Aggregate,
}

impl TableKind {
    pub const ALL: [TableKind; 5] = [
        TableKind::Raw,
        TableKind::Daily,
        TableKind::Weekly,
        TableKind::Monthly,
        TableKind::Aggregate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Raw => "raw",
            TableKind::Daily => "daily",
            TableKind::Weekly => "weekly",
            TableKind::Monthly => "monthly",
            TableKind::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableKind {
    type Err = MeteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" | "meteostation" => Ok(TableKind::Raw),
            "daily" => Ok(TableKind::Daily),
            "weekly" => Ok(TableKind::Weekly),
            "monthly" => Ok(TableKind::Monthly),
            "aggregate" | "aggregated" => Ok(TableKind::Aggregate),
            _ => Err(MeteoError::UnknownGranularity(s.to_string())),
        }
    }
}

/// 表描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescriptor {
    pub kind: TableKind,
    pub name: String,
    /// 时间锚定列；没有候选列的表为 None
    pub anchor_column: Option<String>,
    /// 按声明顺序排列的列
    pub columns: Vec<ColumnDef>,
}

impl TableDescriptor {
    /// 根据内省得到的列构建描述，按优先级选择锚定列
    pub fn new(kind: TableKind, name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        let anchor_column = ANCHOR_CANDIDATES
            .iter()
            .find(|candidate| columns.iter().any(|c| c.name == **candidate))
            .map(|c| c.to_string());

        Self {
            kind,
            name: name.into(),
            anchor_column,
            columns,
        }
    }

    /// 锚定列定义
    pub fn anchor(&self) -> Result<&ColumnDef, MeteoError> {
        self.anchor_column
            .as_deref()
            .and_then(|name| self.column(name))
            .ok_or_else(|| MeteoError::NoTimeColumn(self.name.clone()))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// 查找列，不存在时返回 `UnknownColumn`
    pub fn require_column(&self, name: &str) -> Result<&ColumnDef, MeteoError> {
        self.column(name).ok_or_else(|| MeteoError::UnknownColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// "最新一条"的排序列：主键优先，其次锚定列
    pub fn recency_column(&self) -> Result<&str, MeteoError> {
        if self.has_column(IDENTITY_COLUMN) {
            return Ok(IDENTITY_COLUMN);
        }
        self.anchor().map(|c| c.name.as_str())
    }
}
