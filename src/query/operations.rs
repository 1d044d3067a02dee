// 查询服务 - 按粒度参数化的只读操作
//
// 每次调用：解析窗口 → 构建查询 → 执行 → 物化。
// 所有中间对象都是调用局部的，服务本身只持有只读目录和共享的存储句柄。

use super::builder::QueryBuilder;
use super::engine::AggregationEngine;
use super::materialize::{materialize, materialize_pairs, materialize_row, Record};
use super::types::{ColumnProjection, Extreme, FilterSet, Window};
use super::window::{self, WindowResolver};
use crate::schema::{SchemaCatalog, TableDescriptor, TableKind};
use crate::storage::StorageEngine;
use crate::utils::Clock;
use crate::MeteoError;
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

/// 原始"4小时"采样点
pub const FOUR_HOURLY: [u32; 6] = [0, 4, 8, 12, 16, 20];

/// 查询的可选修饰：布尔标记列 + 列投影
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// 只返回该布尔列为 true 的行
    pub flag_column: Option<String>,
    pub projection: ColumnProjection,
}

impl ReadOptions {
    pub fn new(flag_column: Option<String>, projection: Option<&str>) -> Self {
        Self {
            flag_column: flag_column.filter(|c| !c.is_empty()),
            projection: projection.map(ColumnProjection::parse).unwrap_or_default(),
        }
    }

    fn filter_set(&self) -> FilterSet {
        match &self.flag_column {
            Some(column) => FilterSet::new().with_flag(column.clone()),
            None => FilterSet::new(),
        }
    }
}

/// 查询服务
#[derive(Clone)]
pub struct MeteoQueryService {
    catalog: Arc<SchemaCatalog>,
    storage: Arc<dyn StorageEngine>,
    clock: Arc<dyn Clock>,
}

impl MeteoQueryService {
    pub fn new(
        catalog: Arc<SchemaCatalog>,
        storage: Arc<dyn StorageEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            storage,
            clock,
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    fn engine(&self) -> AggregationEngine<'_> {
        AggregationEngine::new(self.storage.as_ref())
    }

    fn resolver(&self) -> WindowResolver<'_> {
        WindowResolver::new(&self.catalog, self.clock.as_ref())
    }

    fn fetch(
        &self,
        table: &TableDescriptor,
        builder: QueryBuilder<'_>,
    ) -> Result<Vec<Record>, MeteoError> {
        let query = builder.build()?;
        let rows = self.engine().fetch_all(&query)?;
        log::debug!("{}: {} rows", table.name, rows.len());
        Ok(materialize(&rows, &query.columns))
    }

    /// 最新一条；空表返回 None
    pub fn latest(&self, kind: TableKind) -> Result<Option<Record>, MeteoError> {
        let table = self.catalog.resolve_table(kind)?;
        let query = QueryBuilder::new(table).build()?;
        let columns = query.columns.clone();
        let row = self.engine().latest(table, query)?;
        Ok(row.map(|r| materialize_row(&r, &columns)))
    }

    /// 当天窗口内的所有行
    pub fn today(&self, kind: TableKind, options: &ReadOptions) -> Result<Vec<Record>, MeteoError> {
        self.read_day(kind, None, None, options)
    }

    /// 指定日期的单日窗口，可叠加精确时间
    pub fn by_date(
        &self,
        kind: TableKind,
        date: NaiveDate,
        time: Option<NaiveTime>,
        options: &ReadOptions,
    ) -> Result<Vec<Record>, MeteoError> {
        self.read_day(kind, Some(date), time, options)
    }

    fn read_day(
        &self,
        kind: TableKind,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
        options: &ReadOptions,
    ) -> Result<Vec<Record>, MeteoError> {
        let resolved = self.resolver().resolve_window(kind, date, time)?;
        let mut builder = QueryBuilder::new(resolved.table)
            .window(resolved.window)
            .filters(&options.filter_set())
            .projection(&options.projection);
        if let Some((column, value)) = resolved.time_filter {
            builder = builder.filter(column, value);
        }
        self.fetch(resolved.table, builder)
    }

    /// 整表
    pub fn all(&self, kind: TableKind, options: &ReadOptions) -> Result<Vec<Record>, MeteoError> {
        let table = self.catalog.resolve_table(kind)?;
        let builder = QueryBuilder::new(table)
            .filters(&options.filter_set())
            .projection(&options.projection);
        self.fetch(table, builder)
    }

    /// 表的列名（声明顺序）
    pub fn columns(&self, kind: TableKind) -> Result<Vec<String>, MeteoError> {
        Ok(self.catalog.resolve_table(kind)?.column_names())
    }

    /// 单日窗口内按列的最小/最大值；未给出日期时取当天
    pub fn min_max(
        &self,
        kind: TableKind,
        date: Option<NaiveDate>,
        which: Extreme,
        projection: &ColumnProjection,
    ) -> Result<Record, MeteoError> {
        let resolved = self.resolver().resolve_window(kind, date, None)?;
        let query = QueryBuilder::new(resolved.table)
            .window(resolved.window)
            .projection(projection)
            .build()?;
        let pairs = self.engine().min_max(resolved.table, &query, which)?;
        Ok(materialize_pairs(&pairs))
    }

    /// 锚定列落在 `[start_date, end_date)` 的行
    pub fn range_scan(
        &self,
        kind: TableKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
        hours: Option<Vec<u32>>,
    ) -> Result<Vec<Record>, MeteoError> {
        self.scan(kind, window::resolve_range(start_date, end_date)?, hours)
    }

    /// 包含 `date` 的自然周（周一起）
    pub fn week_scan(
        &self,
        kind: TableKind,
        date: NaiveDate,
        hours: Option<Vec<u32>>,
    ) -> Result<Vec<Record>, MeteoError> {
        self.scan(kind, window::week_of(date)?, hours)
    }

    /// 包含 `date` 的自然月
    pub fn month_scan(
        &self,
        kind: TableKind,
        date: NaiveDate,
        hours: Option<Vec<u32>>,
    ) -> Result<Vec<Record>, MeteoError> {
        self.scan(kind, window::month_of(date)?, hours)
    }

    /// 包含 `date` 的自然年
    pub fn year_scan(
        &self,
        kind: TableKind,
        date: NaiveDate,
        hours: Option<Vec<u32>>,
    ) -> Result<Vec<Record>, MeteoError> {
        self.scan(kind, window::year_of(date)?, hours)
    }

    /// 包含 `date` 的自然周内的全部逐时数据
    pub fn hourly_week(&self, kind: TableKind, date: NaiveDate) -> Result<Vec<Record>, MeteoError> {
        self.week_scan(kind, date, None)
    }

    /// 当月每天 0/4/8/12/16/20 点的数据
    pub fn four_hourly_month(
        &self,
        kind: TableKind,
        date: NaiveDate,
    ) -> Result<Vec<Record>, MeteoError> {
        self.month_scan(kind, date, Some(FOUR_HOURLY.to_vec()))
    }

    fn scan(
        &self,
        kind: TableKind,
        window: Window,
        hours: Option<Vec<u32>>,
    ) -> Result<Vec<Record>, MeteoError> {
        let table = self.catalog.resolve_table(kind)?;
        let mut builder = QueryBuilder::new(table).window(window);
        if let Some(hours) = hours {
            builder = builder.hours(hours);
        }
        self.fetch(table, builder)
    }

    /// 最近一条记录所在那一天的全部行；表为空返回 None
    pub fn latest_day(&self, kind: TableKind) -> Result<Option<Vec<Record>>, MeteoError> {
        let table = self.catalog.resolve_table(kind)?;
        let anchor = table.anchor()?.name.clone();

        let query = QueryBuilder::new(table).build()?;
        let latest = match self.engine().latest_by(query, anchor.clone())? {
            Some(row) => row,
            None => return Ok(None),
        };

        let reference = match latest.get(&anchor).and_then(|v| v.as_datetime()) {
            Some(ts) => ts.date(),
            None => return Ok(None),
        };

        let builder = QueryBuilder::new(table).window(window::day_window(reference)?);
        self.fetch(table, builder).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ColumnDef, ColumnType, MemoryStorage, Value};
    use crate::utils::config::TablesConfig;
    use crate::utils::FixedClock;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn service_with(storage: Arc<MemoryStorage>, today: NaiveDate) -> MeteoQueryService {
        let catalog = SchemaCatalog::build(storage.as_ref(), &TablesConfig::default()).unwrap();
        MeteoQueryService::new(
            Arc::new(catalog),
            storage,
            Arc::new(FixedClock::at_date(today)),
        )
    }

    fn storage() -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        let tables = TablesConfig::default();
        storage.create_table(
            tables.table_name(TableKind::Raw),
            vec![
                ColumnDef::new("id", ColumnType::Integer),
                ColumnDef::new("time", ColumnType::DateTime),
                ColumnDef::new("tempf", ColumnType::Real),
            ],
        );
        for kind in [
            TableKind::Daily,
            TableKind::Weekly,
            TableKind::Monthly,
            TableKind::Aggregate,
        ] {
            storage.create_table(
                tables.table_name(kind),
                vec![ColumnDef::new("time", ColumnType::DateTime)],
            );
        }
        storage
    }

    fn insert_raw(storage: &MemoryStorage, id: i64, day: u32, hour: u32, temp: Option<f64>) {
        storage
            .insert(
                "Weather_table_meteostation1",
                vec![
                    Value::Int(id),
                    Value::DateTime(d(day).and_hms_opt(hour, 0, 0).unwrap()),
                    temp.into(),
                ],
            )
            .unwrap();
    }

    #[test]
    fn test_today_uses_clock() {
        let storage = storage();
        insert_raw(&storage, 1, 1, 8, Some(40.0));
        insert_raw(&storage, 2, 2, 8, Some(41.0));
        let service = service_with(storage, d(2));

        let rows = service.today(TableKind::Raw, &ReadOptions::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], serde_json::json!(2));
    }

    #[test]
    fn test_latest_day() {
        let storage = storage();
        insert_raw(&storage, 1, 1, 8, Some(40.0));
        insert_raw(&storage, 2, 3, 1, Some(41.0));
        insert_raw(&storage, 3, 3, 23, Some(42.0));
        let service = service_with(storage.clone(), d(10));

        let rows = service.latest_day(TableKind::Raw).unwrap().unwrap();
        assert_eq!(rows.len(), 2);

        let empty = service_with(self::storage(), d(10));
        assert!(empty.latest_day(TableKind::Raw).unwrap().is_none());
    }

    #[test]
    fn test_min_max_empty_window_is_all_null() {
        let service = service_with(storage(), d(5));
        let result = service
            .min_max(TableKind::Raw, None, Extreme::Min, &ColumnProjection::default())
            .unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.values().all(|v| v.is_null()));
    }

    #[test]
    fn test_four_hourly_month() {
        let storage = storage();
        for (id, hour) in [(1, 0), (2, 3), (3, 4), (4, 20), (5, 21)] {
            insert_raw(&storage, id, 15, hour, Some(1.0));
        }
        let service = service_with(storage, d(1));
        let rows = service.four_hourly_month(TableKind::Raw, d(31)).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![serde_json::json!(1), serde_json::json!(3), serde_json::json!(4)]);
    }
}
