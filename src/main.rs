//! 气象站数据查询服务
//!
//! 启动流程：
//! 1. 加载配置（命令行参数 > METEO_CONFIG > config/meteo.toml）
//! 2. 打开只读 SQLite 连接池
//! 3. 内省各粒度表结构，加载用户
//! 4. 启动 HTTP API
//!
//! 运行: cargo run --bin meteostation-server -- config/meteo.toml

use anyhow::Context;
use meteostation::service::http::{AppState, HttpServer};
use meteostation::storage::{SqliteConfig, SqliteStorage, StorageEngine};
use meteostation::utils::config::MeteoConfig;
use meteostation::utils::{Clock, SystemClock};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 1. 加载配置
    let config_path = MeteoConfig::resolve_path(std::env::args().nth(1));
    let (config, load_error) = match MeteoConfig::load_from_file(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (MeteoConfig::default(), Some(e)),
    };

    // 初始化日志
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.server.log_level.as_str()),
    )
    .init();

    match load_error {
        None => log::info!("Loaded config from {}", config_path),
        Some(e) => log::warn!("{} ({}), using defaults", e, config_path),
    }
    log::info!(
        "{} starting ({})",
        config.server.name,
        config.server.environment
    );

    // 2. 存储
    let sqlite_config = SqliteConfig {
        path: config.storage.path.clone().into(),
        pool_size: config.storage.pool_size,
        busy_timeout_ms: config.storage.busy_timeout_ms,
    };
    let storage: Arc<dyn StorageEngine> = Arc::new(
        SqliteStorage::open(&sqlite_config)
            .with_context(|| format!("failed to open database {}", config.storage.path))?,
    );

    // 3. 表结构与用户
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::build(storage, clock, &config).context("bootstrap failed")?;

    // 4. HTTP
    HttpServer::new(state, &config.http)
        .run()
        .await
        .context("HTTP server error")?;

    log::info!("Server stopped");
    Ok(())
}
