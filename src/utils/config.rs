//! 配置管理模块

use crate::schema::TableKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/meteo.toml";

/// 配置文件路径环境变量
pub const CONFIG_ENV_VAR: &str = "METEO_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeteoConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tables: TablesConfig,
}

impl MeteoConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// 配置文件路径：命令行参数 > 环境变量 > 默认路径
    pub fn resolve_path(cli_arg: Option<String>) -> String {
        cli_arg
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            environment: default_environment(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数；0 表示使用 CPU 核数
    #[serde(default)]
    pub workers: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl HttpConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite 数据库文件
    #[serde(default = "default_db_path")]
    pub path: String,
    /// 连接池大小
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// 锁等待超时（毫秒）
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// 预置用户（密码为 bcrypt 哈希）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token 有效期（秒）
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// 注册码（注册时必须提供其中之一）
    #[serde(default)]
    pub enrollment_codes: Vec<String>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl(),
            enrollment_codes: Vec::new(),
            users: Vec::new(),
        }
    }
}

/// 各粒度对应的表名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_raw_table")]
    pub raw: String,
    #[serde(default = "default_daily_table")]
    pub daily: String,
    #[serde(default = "default_weekly_table")]
    pub weekly: String,
    #[serde(default = "default_monthly_table")]
    pub monthly: String,
    #[serde(default = "default_aggregate_table")]
    pub aggregate: String,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            raw: default_raw_table(),
            daily: default_daily_table(),
            weekly: default_weekly_table(),
            monthly: default_monthly_table(),
            aggregate: default_aggregate_table(),
        }
    }
}

impl TablesConfig {
    pub fn table_name(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Raw => &self.raw,
            TableKind::Daily => &self.daily,
            TableKind::Weekly => &self.weekly,
            TableKind::Monthly => &self.monthly,
            TableKind::Aggregate => &self.aggregate,
        }
    }
}

// 默认值函数
fn default_server_name() -> String {
    "meteostation".to_string()
}
fn default_environment() -> String {
    "development".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_db_path() -> String {
    "data/meteostation.db".to_string()
}
fn default_pool_size() -> usize {
    4
}
fn default_busy_timeout() -> u64 {
    5000
}
fn default_jwt_secret() -> String {
    "meteostation_jwt_secret_change_in_production".to_string()
}
fn default_token_ttl() -> u64 {
    3600
}
fn default_raw_table() -> String {
    "Weather_table_meteostation1".to_string()
}
fn default_daily_table() -> String {
    "aggregated_daily_data".to_string()
}
fn default_weekly_table() -> String {
    "aggregated_weekly_data".to_string()
}
fn default_monthly_table() -> String {
    "aggregated_monthly_data".to_string()
}
fn default_aggregate_table() -> String {
    "aggregated_data".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MeteoConfig::from_toml_str("").unwrap();
        assert_eq!(config.http.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.storage.pool_size, 4);
        assert_eq!(config.tables.table_name(TableKind::Raw), "Weather_table_meteostation1");
    }

    #[test]
    fn test_partial_sections() {
        let config = MeteoConfig::from_toml_str(
            r#"
            [http]
            port = 8080

            [auth]
            jwt_secret = "s3cret"
            enrollment_codes = ["jei4Rail"]

            [[auth.users]]
            username = "honza"
            password_hash = "$2b$04$abcdefghijklmnopqrstuu"

            [tables]
            raw = "Weather_table_meteostation2"
            "#,
        )
        .unwrap();

        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.enrollment_codes, vec!["jei4Rail".to_string()]);
        assert_eq!(config.auth.users[0].username, "honza");
        assert_eq!(config.tables.raw, "Weather_table_meteostation2");
        assert_eq!(config.tables.daily, "aggregated_daily_data");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(MeteoConfig::from_toml_str("[http\nport = ").is_err());
    }
}
