//! HTTP API 请求/响应模型

use crate::MeteoError;
use serde::{Deserialize, Serialize};

/// 错误响应 `{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// 提示性响应（例如空表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// 旧接口 `/api/columns` 的响应 `{"rows": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowsBody<T> {
    pub rows: T,
}

/// 登录响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// 注册响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub access_token: String,
}

/// 读取类接口的查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataParams {
    /// 布尔标记列：只返回该列为 true 的行
    pub column: Option<String>,
    /// 列投影，逗号分隔
    pub columns: Option<String>,
    /// 精确时间 `HH:MM:SS`
    pub time: Option<String>,
}

/// 区间扫描参数
#[derive(Debug, Clone, Deserialize)]
pub struct RangeParams {
    pub start: String,
    pub end: String,
    pub hours: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoursParams {
    pub hours: Option<String>,
}

/// 解析小时列表 `0,4,8`
pub fn parse_hours(list: Option<&str>) -> Result<Option<Vec<u32>>, MeteoError> {
    let list = match list.map(str::trim) {
        Some(l) if !l.is_empty() => l,
        _ => return Ok(None),
    };
    list.split(',')
        .map(|h| {
            h.trim()
                .parse::<u32>()
                .map_err(|_| MeteoError::InvalidParameter(format!("invalid hour '{}'", h.trim())))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
