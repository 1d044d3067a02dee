//! 集成测试公共夹具

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use meteostation::service::http::AppState;
use meteostation::storage::{ColumnDef, ColumnType, MemoryStorage, StorageEngine, Value};
use meteostation::utils::config::{MeteoConfig, SeedUser};
use meteostation::utils::FixedClock;
use std::sync::Arc;

pub const USERNAME: &str = "station";
pub const PASSWORD: &str = "secret";
pub const ENROLLMENT_CODE: &str = "jei4Rail";

pub const RAW: &str = "Weather_table_meteostation1";
pub const DAILY: &str = "aggregated_daily_data";
pub const WEEKLY: &str = "aggregated_weekly_data";
pub const MONTHLY: &str = "aggregated_monthly_data";
pub const AGGREGATE: &str = "aggregated_data";

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn dt(y: i32, m: u32, day: u32, h: u32, min: u32) -> NaiveDateTime {
    d(y, m, day).and_hms_opt(h, min, 0).unwrap()
}

pub fn config() -> MeteoConfig {
    let mut config = MeteoConfig::default();
    config.auth.jwt_secret = "integration-secret".to_string();
    config.auth.enrollment_codes = vec![ENROLLMENT_CODE.to_string()];
    config.auth.users = vec![SeedUser {
        username: USERNAME.to_string(),
        password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
    }];
    config
}

/// 五张空表，结构与现场数据库一致
pub fn empty_storage() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    storage.create_table(
        RAW,
        vec![
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("time", ColumnType::DateTime),
            ColumnDef::new("outdoor_temperature_F", ColumnType::Real),
            ColumnDef::new("humidity", ColumnType::Integer),
            ColumnDef::new("is_aggregated", ColumnType::Boolean),
        ],
    );
    storage.create_table(
        DAILY,
        vec![
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("date", ColumnType::Date),
            ColumnDef::new("time", ColumnType::Time),
            ColumnDef::new("avg_temperature_F", ColumnType::Real),
        ],
    );
    storage.create_table(
        WEEKLY,
        vec![
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("week_start", ColumnType::Date),
            ColumnDef::new("rain_weekly_in", ColumnType::Real),
        ],
    );
    storage.create_table(
        MONTHLY,
        vec![
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("next_month_start", ColumnType::Date),
            ColumnDef::new("rain_monthly_in", ColumnType::Real),
        ],
    );
    storage.create_table(
        AGGREGATE,
        vec![
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("time", ColumnType::DateTime),
            ColumnDef::new("outdoor_temperature_F", ColumnType::Real),
        ],
    );
    storage
}

pub fn insert_raw(
    storage: &MemoryStorage,
    id: i64,
    time: NaiveDateTime,
    temp: Option<f64>,
    flag: bool,
) {
    storage
        .insert(
            RAW,
            vec![
                Value::Int(id),
                Value::DateTime(time),
                temp.into(),
                Value::Int(50),
                Value::Bool(flag),
            ],
        )
        .unwrap();
}

pub fn state(storage: Arc<dyn StorageEngine>, now: NaiveDateTime) -> AppState {
    AppState::build(storage, Arc::new(FixedClock(now)), &config()).unwrap()
}
