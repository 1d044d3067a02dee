//! # METEOSTATION
//!
//! 气象站数据查询服务 - 基于时间分桶的聚合与检索引擎
//!
//! ## 核心能力
//!
//! - **表结构目录**: 启动时内省数据库，按粒度 (原始/日/周/月/聚合) 缓存表描述
//! - **时间窗口解析**: 日期/时间/日期区间 → 半开区间 `[start, end)`
//! - **查询构建**: 时间窗口 + 等值过滤 + 列投影
//! - **聚合引擎**: 全量读取 / 最新一条 / 按列最小最大值
//! - **结果物化**: 有序字段映射，剔除内部记录字段
//! - **访问控制**: JWT Bearer Token 校验 (基于 Actix-web 提取器)
//!
//! ## 架构设计
//!
//! ```text
//! 客户端 (HTTP)
//!     ↓
//! Service Layer (service/)  ← Access Gate (user/gate.rs)
//!     ↓
//! Query Service (query/)
//!     ↓ WindowResolver → QueryBuilder → AggregationEngine → Materializer
//! Schema Catalog (schema/)
//!     ↓
//! Storage (storage/)  ← SQLite / 内存
//! ```

// ============================================================================
// 内部模块
// ============================================================================

/// 表结构目录
pub mod schema;

/// 查询引擎 (窗口解析、查询构建、聚合、物化)
pub mod query;

/// 存储抽象与实现
pub mod storage;

/// 用户与访问控制
pub mod user;

/// 对外服务层 (HTTP)
pub mod service;

/// 工具模块
pub mod utils;

// ============================================================================
// 重导出常用类型
// ============================================================================

pub use query::{MeteoQueryService, Window};
pub use schema::{SchemaCatalog, TableDescriptor, TableKind};
pub use storage::{StorageEngine, StorageError, Value};

// ============================================================================
// 全局错误类型
// ============================================================================

/// 服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum MeteoError {
    #[error("Unknown granularity: {0}")]
    UnknownGranularity(String),

    #[error("Table {0} has no date column")]
    NoTimeColumn(String),

    #[error("Unknown column '{column}' in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Type mismatch in column '{column}': expected {expected}")]
    TypeMismatch { column: String, expected: String },

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("User error: {0}")]
    UserError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl MeteoError {
    /// 边界层使用的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            MeteoError::UnknownGranularity(_)
            | MeteoError::UnknownColumn { .. }
            | MeteoError::InvalidParameter(_)
            | MeteoError::UserError(_) => 400,
            MeteoError::Unauthorized(_) => 401,
            MeteoError::NoTimeColumn(_)
            | MeteoError::TypeMismatch { .. }
            | MeteoError::StorageFailure(_)
            | MeteoError::ConfigError(_)
            | MeteoError::InternalError(_) => 500,
        }
    }

    /// 调用方错误 (请求本身有问题，重试无意义)
    pub fn is_caller_error(&self) -> bool {
        self.status_code() == 400
    }
}

pub type Result<T> = std::result::Result<T, MeteoError>;

// ============================================================================
// 测试模块
// ============================================================================
