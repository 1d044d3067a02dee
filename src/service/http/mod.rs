//! HTTP API 服务模块
//!
//! 提供气象数据的只读查询接口以及登录/注册

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;

use actix_web::{middleware, web, App, HttpServer as ActixHttpServer};
use std::io;

use crate::utils::config::HttpConfig;
pub use handlers::AppState;

/// HTTP 服务器
pub struct HttpServer {
    /// 应用状态
    app_state: web::Data<AppState>,

    /// 监听地址
    bind_address: String,

    /// 工作线程数；0 使用 actix 默认值
    workers: usize,
}

impl HttpServer {
    pub fn new(app_state: AppState, config: &HttpConfig) -> Self {
        Self {
            app_state: web::Data::new(app_state),
            bind_address: config.bind_address(),
            workers: config.workers,
        }
    }

    /// 启动 HTTP 服务器
    pub async fn run(self) -> io::Result<()> {
        log::info!("Starting HTTP server at {}", self.bind_address);

        let app_state = self.app_state.clone();

        let mut server = ActixHttpServer::new(move || {
            App::new()
                // 应用状态
                .app_data(app_state.clone())
                // 中间件
                .wrap(middleware::Logger::default())
                .wrap(middleware::Compress::default())
                // CORS 支持
                .wrap(
                    actix_cors::Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                // 配置路由
                .configure(routes::configure)
        });
        if self.workers > 0 {
            server = server.workers(self.workers);
        }

        server.bind(&self.bind_address)?.run().await
    }
}
