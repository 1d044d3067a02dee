//! HTTP API 路由配置

use actix_web::web;

use super::auth;
use super::error::bad_request;
use super::handlers;

/// 配置所有路由
///
/// 同一 scope 内按注册顺序匹配：固定路径必须先于 `{date}` 这类通配段。
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // 提取器解析失败 → 400 {"error": ...}
        .app_data(web::JsonConfig::default().error_handler(|err, _| bad_request(err.to_string())))
        .app_data(web::QueryConfig::default().error_handler(|err, _| bad_request(err.to_string())))
        .app_data(web::PathConfig::default().error_handler(|err, _| bad_request(err.to_string())))

        // 健康检查
        .route("/health", web::get().to(handlers::health_check))

        // 用户认证
        .route("/api/is_valid", web::get().to(handlers::is_valid))
        .route("/api/login", web::post().to(auth::login))
        .route("/api/register", web::post().to(auth::register))

        // 旧接口
        .route("/api/columns", web::get().to(handlers::aggregate_columns))
        .route("/api/data/last_data", web::get().to(handlers::last_data))

        // 按粒度查询
        .service(
            web::scope("/api/data/{kind}")
                .route("", web::get().to(handlers::all))
                .route("/latest", web::get().to(handlers::latest))
                .route("/latest_day", web::get().to(handlers::latest_day))
                .route("/columns", web::get().to(handlers::columns))
                .route("/today", web::get().to(handlers::today))
                .route("/today/{which}", web::get().to(handlers::today_extreme))
                .route("/range", web::get().to(handlers::range))
                .route("/week/{date}", web::get().to(handlers::week))
                .route("/month/{date}", web::get().to(handlers::month))
                .route("/year/{date}", web::get().to(handlers::year))
                .route("/hourly_week/{date}", web::get().to(handlers::hourly_week))
                .route("/four_hourly_month/{date}", web::get().to(handlers::four_hourly_month))
                .route("/{which}/{date}", web::get().to(handlers::date_extreme))
                .route("/{date}", web::get().to(handlers::by_date)),
        );
}
