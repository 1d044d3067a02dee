//! 用户管理器
//!
//! 负责用户的注册、登录与 token 校验。用户只保存在内存中，
//! 启动时从配置的预置用户加载。

use super::{Identity, User, UserLoginRequest, UserRegisterRequest};
use crate::utils::config::AuthConfig;
use crate::utils::jwt::JwtKeys;
use crate::MeteoError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, MeteoError>;

/// 用户管理器
pub struct UserManager {
    /// 用户映射 (user_id -> User)
    pub(crate) users: DashMap<String, Arc<RwLock<User>>>,

    /// 用户名索引 (username -> user_id)
    pub(crate) username_index: DashMap<String, String>,

    /// 有效注册码
    enrollment_codes: HashSet<String>,

    jwt: JwtKeys,

    /// bcrypt cost
    hash_cost: u32,
}

impl UserManager {
    pub fn new(jwt: JwtKeys) -> Self {
        Self {
            users: DashMap::new(),
            username_index: DashMap::new(),
            enrollment_codes: HashSet::new(),
            jwt,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// 按认证配置创建：密钥、有效期、注册码、预置用户
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let jwt = JwtKeys::new(config.jwt_secret.as_bytes(), config.token_ttl_secs);
        let manager = Self::new(jwt).with_enrollment_codes(config.enrollment_codes.clone());
        for seed in &config.users {
            manager
                .seed_user(&seed.username, &seed.password_hash)
                .map_err(|e| MeteoError::ConfigError(e.to_string()))?;
        }
        log::info!(
            "UserManager ready: {} seeded users, {} enrollment codes",
            manager.user_count(),
            manager.enrollment_codes.len()
        );
        Ok(manager)
    }

    pub fn with_enrollment_codes(mut self, codes: impl IntoIterator<Item = String>) -> Self {
        self.enrollment_codes = codes.into_iter().filter(|c| !c.is_empty()).collect();
        self
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// 加入一个已有 bcrypt 哈希的用户
    pub fn seed_user(&self, username: &str, password_hash: &str) -> Result<User> {
        self.insert_user(User::new(username.to_string(), password_hash.to_string()))
    }

    fn insert_user(&self, user: User) -> Result<User> {
        match self.username_index.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(MeteoError::UserError(
                "Username already exists".to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(user.user_id.clone());
                self.users
                    .insert(user.user_id.clone(), Arc::new(RwLock::new(user.clone())));
                Ok(user)
            }
        }
    }

    /// 注册新用户，返回用户和新签发的 token
    pub fn register(&self, req: UserRegisterRequest) -> Result<(User, String)> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(MeteoError::UserError(
                "Username and password are required".to_string(),
            ));
        }

        if self.username_index.contains_key(&req.username) {
            return Err(MeteoError::UserError(
                "Username already exists".to_string(),
            ));
        }

        if !self.enrollment_codes.contains(&req.code) {
            log::warn!("Registration for {} rejected: invalid code", req.username);
            return Err(MeteoError::UserError("Invalid code".to_string()));
        }

        let password_hash = bcrypt::hash(&req.password, self.hash_cost)
            .map_err(|e| MeteoError::InternalError(format!("Password hashing failed: {}", e)))?;

        // 哈希期间可能有并发注册同名用户，insert_user 再检查一次
        let user = self.insert_user(User::new(req.username, password_hash))?;
        let token = self.issue_token(&user)?;

        log::info!("User registered: {} ({})", user.username, user.user_id);
        Ok((user, token))
    }

    /// 用户登录，成功返回 token
    pub fn login(&self, req: UserLoginRequest) -> Result<String> {
        let rejected = || MeteoError::Unauthorized("Invalid username or password".to_string());

        let user_id = match self.username_index.get(&req.username) {
            Some(id) => id.clone(),
            None => {
                log::warn!("Login failed: unknown user {}", req.username);
                return Err(rejected());
            }
        };
        let user_arc = self.users.get(&user_id).ok_or_else(rejected)?;
        let user = user_arc.read();

        if !user.is_active() {
            log::warn!("Login failed: user {} is frozen", user.username);
            return Err(MeteoError::Unauthorized("User is frozen".to_string()));
        }
        if !user.verify_password(&req.password) {
            log::warn!("Login failed: bad password for {}", user.username);
            return Err(rejected());
        }

        let token = self.issue_token(&user)?;
        log::info!("User logged in: {}", user.username);
        Ok(token)
    }

    fn issue_token(&self, user: &User) -> Result<String> {
        self.jwt
            .generate_token(&user.user_id, &user.username)
            .map_err(|e| MeteoError::InternalError(format!("Failed to generate JWT token: {}", e)))
    }

    /// 验证 token：签名、有效期，以及用户仍存在且未冻结
    pub fn verify_token(&self, token: &str) -> Result<Identity> {
        let claims = self
            .jwt
            .verify_token(token)
            .map_err(|e| MeteoError::Unauthorized(format!("Invalid token: {}", e)))?;

        match self.users.get(&claims.sub) {
            Some(user_arc) => {
                let user = user_arc.read();
                if !user.is_active() {
                    return Err(MeteoError::Unauthorized("User is frozen".to_string()));
                }
                Ok(Identity {
                    user_id: user.user_id.clone(),
                    username: user.username.clone(),
                })
            }
            None => Err(MeteoError::Unauthorized("User not found".to_string())),
        }
    }

    pub fn freeze_user(&self, username: &str) -> Result<()> {
        let user_id = self
            .username_index
            .get(username)
            .map(|id| id.clone())
            .ok_or_else(|| MeteoError::UserError(format!("User not found: {}", username)))?;
        if let Some(user_arc) = self.users.get(&user_id) {
            user_arc.write().freeze();
        }
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::SeedUser;

    fn manager() -> UserManager {
        UserManager::new(JwtKeys::new(b"test-secret", 3600))
            .with_enrollment_codes(vec!["METEO-2024".to_string()])
            .with_hash_cost(4)
    }

    fn register_req(username: &str, code: &str) -> UserRegisterRequest {
        UserRegisterRequest {
            username: username.to_string(),
            password: "pa55word".to_string(),
            code: code.to_string(),
        }
    }

    fn login_req(username: &str, password: &str) -> UserLoginRequest {
        UserLoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_register_and_login() {
        let mgr = manager();
        let (user, token) = mgr.register(register_req("alice", "METEO-2024")).unwrap();
        assert_eq!(mgr.verify_token(&token).unwrap().user_id, user.user_id);

        let token = mgr.login(login_req("alice", "pa55word")).unwrap();
        let identity = mgr.verify_token(&token).unwrap();
        assert_eq!(identity.username, "alice");
    }

    #[test]
    fn test_register_rejections() {
        let mgr = manager();
        mgr.register(register_req("alice", "METEO-2024")).unwrap();

        let dup = mgr.register(register_req("alice", "METEO-2024")).unwrap_err();
        assert!(matches!(dup, MeteoError::UserError(ref m) if m == "Username already exists"));
        assert_eq!(dup.status_code(), 400);

        let bad = mgr.register(register_req("bob", "WRONG")).unwrap_err();
        assert!(matches!(bad, MeteoError::UserError(ref m) if m == "Invalid code"));
        assert_eq!(mgr.user_count(), 1);
    }

    #[test]
    fn test_login_failures_are_unauthorized() {
        let mgr = manager();
        mgr.register(register_req("alice", "METEO-2024")).unwrap();

        for req in [login_req("alice", "nope"), login_req("mallory", "pa55word")] {
            let err = mgr.login(req).unwrap_err();
            assert_eq!(err.status_code(), 401);
        }
    }

    #[test]
    fn test_frozen_user_token_rejected() {
        let mgr = manager();
        let (_, token) = mgr.register(register_req("alice", "METEO-2024")).unwrap();
        mgr.freeze_user("alice").unwrap();
        assert!(matches!(
            mgr.verify_token(&token),
            Err(MeteoError::Unauthorized(_))
        ));
        assert!(mgr.login(login_req("alice", "pa55word")).is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let mgr = manager();
        let (user, _) = mgr.register(register_req("alice", "METEO-2024")).unwrap();
        let foreign = JwtKeys::new(b"other", 3600)
            .generate_token(&user.user_id, &user.username)
            .unwrap();
        assert!(mgr.verify_token(&foreign).is_err());
    }

    #[test]
    fn test_from_config_seeds_users() {
        let config = AuthConfig {
            jwt_secret: "s".to_string(),
            token_ttl_secs: 60,
            enrollment_codes: vec![],
            users: vec![SeedUser {
                username: "station".to_string(),
                password_hash: bcrypt::hash("admin", 4).unwrap(),
            }],
        };
        let mgr = UserManager::from_config(&config).unwrap();
        assert!(mgr.login(login_req("station", "admin")).is_ok());

        // 没有注册码时注册全部拒绝
        assert!(mgr.register(register_req("bob", "")).is_err());
    }

    #[test]
    fn test_concurrent_registration_same_name() {
        let mgr = Arc::new(manager());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mgr = mgr.clone();
                std::thread::spawn(move || {
                    mgr.register(register_req("racer", "METEO-2024")).is_ok()
                })
            })
            .collect();
        let ok = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(ok, 1);
        assert_eq!(mgr.user_count(), 1);
    }
}
