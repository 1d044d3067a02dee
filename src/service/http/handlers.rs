//! HTTP API 请求处理器
//!
//! 所有查询在 actix 的阻塞线程池上执行（存储访问是同步的）。

use actix_web::{web, HttpResponse};
use std::str::FromStr;
use std::sync::Arc;

use super::extractors::Authenticated;
use super::models::*;
use crate::query::{
    parse_date, parse_time, ColumnProjection, Extreme, MeteoQueryService, ReadOptions,
};
use crate::schema::{SchemaCatalog, TableKind};
use crate::storage::StorageEngine;
use crate::user::{AccessGate, JwtGate, UserManager};
use crate::utils::config::MeteoConfig;
use crate::utils::Clock;
use crate::MeteoError;

/// 应用状态
pub struct AppState {
    pub query: MeteoQueryService,
    pub user_mgr: Arc<UserManager>,
    pub gate: Arc<dyn AccessGate>,
}

impl AppState {
    /// 内省表结构、加载用户，组装服务状态。任一配置的表不存在即失败
    pub fn build(
        storage: Arc<dyn StorageEngine>,
        clock: Arc<dyn Clock>,
        config: &MeteoConfig,
    ) -> Result<Self, MeteoError> {
        let catalog = SchemaCatalog::build(storage.as_ref(), &config.tables)?;
        let user_mgr = Arc::new(UserManager::from_config(&config.auth)?);
        let gate: Arc<dyn AccessGate> = Arc::new(JwtGate::new(user_mgr.clone()));
        Ok(Self {
            query: MeteoQueryService::new(Arc::new(catalog), storage, clock),
            user_mgr,
            gate,
        })
    }
}

type HandlerResult = Result<HttpResponse, MeteoError>;

/// 在阻塞线程池上执行同步查询
async fn blocking<T, F>(f: F) -> Result<T, MeteoError>
where
    F: FnOnce() -> Result<T, MeteoError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| MeteoError::InternalError(format!("blocking task failed: {}", e)))?
}

fn parse_kind(kind: &str) -> Result<TableKind, MeteoError> {
    TableKind::from_str(kind)
}

/// 健康检查
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "meteostation-api"
    }))
}

/// Token 探测（不校验）
pub async fn is_valid() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "valid_token": 1 }))
}

/// 最新一条原始数据
pub async fn last_data(_user: Authenticated, state: web::Data<AppState>) -> HandlerResult {
    latest_of(state, TableKind::Raw).await
}

/// 汇总表的列名，包在 `rows` 字段里
pub async fn aggregate_columns(_user: Authenticated, state: web::Data<AppState>) -> HandlerResult {
    let query = state.query.clone();
    let columns = blocking(move || query.columns(TableKind::Aggregate)).await?;
    Ok(HttpResponse::Ok().json(RowsBody { rows: columns }))
}

/// 整表
pub async fn all(
    _user: Authenticated,
    path: web::Path<String>,
    params: web::Query<DataParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let kind = parse_kind(&path)?;
    let params = params.into_inner();
    let options = ReadOptions::new(params.column, params.columns.as_deref());
    let query = state.query.clone();
    let rows = blocking(move || query.all(kind, &options)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// 最新一条
pub async fn latest(
    _user: Authenticated,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let kind = parse_kind(&path)?;
    latest_of(state, kind).await
}

async fn latest_of(state: web::Data<AppState>, kind: TableKind) -> HandlerResult {
    let query = state.query.clone();
    match blocking(move || query.latest(kind)).await? {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Ok(HttpResponse::Ok().json(MessageBody {
            message: "No data found in the table.".to_string(),
        })),
    }
}

/// 最近一天的全部数据；空表返回 404
pub async fn latest_day(
    _user: Authenticated,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let kind = parse_kind(&path)?;
    let query = state.query.clone();
    match blocking(move || query.latest_day(kind)).await? {
        Some(rows) => Ok(HttpResponse::Ok().json(rows)),
        None => Ok(HttpResponse::NotFound().json(ErrorBody::new("No data found in the database."))),
    }
}

/// 列名
pub async fn columns(
    _user: Authenticated,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let kind = parse_kind(&path)?;
    let query = state.query.clone();
    let columns = blocking(move || query.columns(kind)).await?;
    Ok(HttpResponse::Ok().json(columns))
}

/// 当天数据
pub async fn today(
    _user: Authenticated,
    path: web::Path<String>,
    params: web::Query<DataParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let kind = parse_kind(&path)?;
    let params = params.into_inner();
    let options = ReadOptions::new(params.column, params.columns.as_deref());
    let query = state.query.clone();
    let rows = blocking(move || query.today(kind, &options)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// 当天的最小/最大值
pub async fn today_extreme(
    _user: Authenticated,
    path: web::Path<(String, String)>,
    params: web::Query<DataParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let (kind, which) = path.into_inner();
    extreme(state, &kind, &which, None, params.columns.as_deref()).await
}

/// 指定日期的最小/最大值
pub async fn date_extreme(
    _user: Authenticated,
    path: web::Path<(String, String, String)>,
    params: web::Query<DataParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let (kind, which, date) = path.into_inner();
    let date = parse_date(&date)?;
    extreme(state, &kind, &which, Some(date), params.columns.as_deref()).await
}

async fn extreme(
    state: web::Data<AppState>,
    kind: &str,
    which: &str,
    date: Option<chrono::NaiveDate>,
    columns: Option<&str>,
) -> HandlerResult {
    let kind = parse_kind(kind)?;
    let which = Extreme::from_str(which)?;
    let projection = columns.map(ColumnProjection::parse).unwrap_or_default();
    let query = state.query.clone();
    let record = blocking(move || query.min_max(kind, date, which, &projection)).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// 显式日期区间
pub async fn range(
    _user: Authenticated,
    path: web::Path<String>,
    params: web::Query<RangeParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let kind = parse_kind(&path)?;
    let start = parse_date(&params.start)?;
    let end = parse_date(&params.end)?;
    let hours = parse_hours(params.hours.as_deref())?;
    let query = state.query.clone();
    let rows = blocking(move || query.range_scan(kind, start, end, hours)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// 日历周期
#[derive(Debug, Clone, Copy)]
enum Period {
    Week,
    Month,
    Year,
    HourlyWeek,
    FourHourlyMonth,
}

async fn period_scan(
    state: web::Data<AppState>,
    path: (String, String),
    hours: Option<&str>,
    period: Period,
) -> HandlerResult {
    let (kind, date) = path;
    let kind = parse_kind(&kind)?;
    let date = parse_date(&date)?;
    let hours = parse_hours(hours)?;
    let query = state.query.clone();
    let rows = blocking(move || match period {
        Period::Week => query.week_scan(kind, date, hours),
        Period::Month => query.month_scan(kind, date, hours),
        Period::Year => query.year_scan(kind, date, hours),
        Period::HourlyWeek => query.hourly_week(kind, date),
        Period::FourHourlyMonth => query.four_hourly_month(kind, date),
    })
    .await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn week(
    _user: Authenticated,
    path: web::Path<(String, String)>,
    params: web::Query<HoursParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    period_scan(state, path.into_inner(), params.hours.as_deref(), Period::Week).await
}

pub async fn month(
    _user: Authenticated,
    path: web::Path<(String, String)>,
    params: web::Query<HoursParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    period_scan(state, path.into_inner(), params.hours.as_deref(), Period::Month).await
}

pub async fn year(
    _user: Authenticated,
    path: web::Path<(String, String)>,
    params: web::Query<HoursParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    period_scan(state, path.into_inner(), params.hours.as_deref(), Period::Year).await
}

pub async fn hourly_week(
    _user: Authenticated,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> HandlerResult {
    period_scan(state, path.into_inner(), None, Period::HourlyWeek).await
}

pub async fn four_hourly_month(
    _user: Authenticated,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> HandlerResult {
    period_scan(state, path.into_inner(), None, Period::FourHourlyMonth).await
}

/// 指定日期（可选精确时间）
pub async fn by_date(
    _user: Authenticated,
    path: web::Path<(String, String)>,
    params: web::Query<DataParams>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let (kind, date) = path.into_inner();
    let kind = parse_kind(&kind)?;
    let date = parse_date(&date)?;
    let params = params.into_inner();
    let time = params.time.as_deref().map(parse_time).transpose()?;
    let options = ReadOptions::new(params.column, params.columns.as_deref());
    let query = state.query.clone();
    let rows = blocking(move || query.by_date(kind, date, time, &options)).await?;
    Ok(HttpResponse::Ok().json(rows))
}
