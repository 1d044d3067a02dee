//! 用户与访问控制
//!
//! - [`UserManager`]: 用户注册（需注册码）、登录签发 token
//! - [`AccessGate`]: 请求进入查询层之前的授权检查

pub mod gate;
pub mod user_manager;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use gate::{AccessGate, Identity, JwtGate};
pub use user_manager::UserManager;

/// 用户
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 用户ID (UUID)
    pub user_id: String,

    /// 用户名 (唯一)
    pub username: String,

    /// 密码哈希 (bcrypt)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// 创建时间 (Unix timestamp)
    pub created_at: i64,

    pub status: UserStatus,
}

/// 用户状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum UserStatus {
    Active,
    Frozen,
}

impl User {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            created_at: Utc::now().timestamp(),
            status: UserStatus::Active,
        }
    }

    /// 验证密码
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn freeze(&mut self) {
        self.status = UserStatus::Frozen;
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// 用户注册请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisterRequest {
    pub username: String,
    pub password: String,
    /// 注册码
    pub code: String,
}

/// 用户登录请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoginRequest {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let hash = bcrypt::hash("test123", 4).unwrap();
        let user = User::new("station".to_string(), hash);

        assert_eq!(user.username, "station");
        assert!(user.verify_password("test123"));
        assert!(!user.verify_password("wrong"));
        assert!(user.is_active());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("station".to_string(), bcrypt::hash("x", 4).unwrap());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_frozen_user() {
        let mut user = User::new("station".to_string(), bcrypt::hash("x", 4).unwrap());
        user.freeze();
        assert!(!user.is_active());
        assert_eq!(user.status, UserStatus::Frozen);
    }
}
