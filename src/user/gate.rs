//! 访问控制
//!
//! 每个受保护请求在进入查询层之前先经过 [`AccessGate`]。
//! 拒绝的请求不会触达存储。

use super::UserManager;
use crate::MeteoError;
use serde::Serialize;
use std::sync::Arc;

/// 已认证的调用方
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

/// 授权检查。`authorization` 为原始的 Authorization 请求头
pub trait AccessGate: Send + Sync {
    fn authorize(&self, authorization: Option<&str>) -> Result<Identity, MeteoError>;
}

/// `Authorization: Bearer <jwt>`
pub struct JwtGate {
    users: Arc<UserManager>,
}

impl JwtGate {
    pub fn new(users: Arc<UserManager>) -> Self {
        Self { users }
    }
}

/// 取出 Bearer token
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, MeteoError> {
    let header = authorization
        .ok_or_else(|| MeteoError::Unauthorized("Missing Authorization Header".to_string()))?;
    match header.trim().split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
        {
            Ok(token.trim())
        }
        _ => Err(MeteoError::Unauthorized(
            "Authorization header must be 'Bearer <token>'".to_string(),
        )),
    }
}

impl AccessGate for JwtGate {
    fn authorize(&self, authorization: Option<&str>) -> Result<Identity, MeteoError> {
        let result = bearer_token(authorization).and_then(|token| self.users.verify_token(token));
        if let Err(e) = &result {
            log::warn!("Request rejected: {}", e);
        }
        result
    }
}
