// 时间窗口解析
//
// 单日窗口：所有粒度统一取锚定日的 [00:00, 次日 00:00)。
// 周/月汇总的锚定列只标记周期起点，按日期查询时同样只取这一天，
// 真正覆盖整周/整月的查询走 resolve_range 及 week_of/month_of/year_of。

use super::types::Window;
use crate::schema::{SchemaCatalog, TableDescriptor, TableKind, TIME_COLUMN};
use crate::storage::{ColumnType, Value, DATETIME_SQL_FORMAT, DATE_FORMAT, TIME_FORMAT};
use crate::utils::Clock;
use crate::MeteoError;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};

/// 解析结果：目标表 + 窗口 + 可选的精确时间条件
#[derive(Debug, Clone)]
pub struct ResolvedWindow<'a> {
    pub table: &'a TableDescriptor,
    pub window: Window,
    /// `time` 列的精确匹配值
    pub time_filter: Option<(String, Value)>,
}

/// 时间窗口解析器
pub struct WindowResolver<'a> {
    catalog: &'a SchemaCatalog,
    clock: &'a dyn Clock,
}

impl<'a> WindowResolver<'a> {
    pub fn new(catalog: &'a SchemaCatalog, clock: &'a dyn Clock) -> Self {
        Self { catalog, clock }
    }

    /// 单日窗口；未给出日期时取时钟的当天
    pub fn resolve_window(
        &self,
        kind: TableKind,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) -> Result<ResolvedWindow<'a>, MeteoError> {
        let table = self.catalog.resolve_table(kind)?;
        table.anchor()?;

        let date = date.unwrap_or_else(|| self.clock.today());
        let window = day_window(date)?;

        let time_filter = match time {
            Some(t) => Some(exact_time_filter(table, date, t)?),
            None => None,
        };

        Ok(ResolvedWindow {
            table,
            window,
            time_filter,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

/// `time` 列的精确匹配条件，值的形态取决于列类型
fn exact_time_filter(
    table: &TableDescriptor,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<(String, Value), MeteoError> {
    let column = table.require_column(TIME_COLUMN)?;
    let value = match column.column_type {
        ColumnType::DateTime => Value::DateTime(date.and_time(time)),
        ColumnType::Time => Value::Time(time),
        // 文本锚定列存完整日期时间；非锚定的文本列只存时刻
        ColumnType::Text if table.anchor()?.name == TIME_COLUMN => {
            Value::Text(date.and_time(time).format(DATETIME_SQL_FORMAT).to_string())
        }
        ColumnType::Text => Value::Text(time.format(TIME_FORMAT).to_string()),
        other => {
            return Err(MeteoError::TypeMismatch {
                column: TIME_COLUMN.to_string(),
                expected: format!("time or datetime, found {}", other.name()),
            })
        }
    };
    Ok((TIME_COLUMN.to_string(), value))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, MeteoError> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| MeteoError::InvalidParameter(format!("date out of range: {}", date)))
}

/// `[date 00:00, date+1 00:00)`
pub fn day_window(date: NaiveDate) -> Result<Window, MeteoError> {
    days(date, 1)
}

/// 从 `start` 起连续 `n` 天
pub fn days(start: NaiveDate, n: u64) -> Result<Window, MeteoError> {
    resolve_range(start, add_days(start, n)?)
}

/// 显式日期区间 `[start_date, end_date)`
pub fn resolve_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<Window, MeteoError> {
    Window::new(midnight(start_date), midnight(end_date)).ok_or_else(|| {
        MeteoError::InvalidParameter(format!(
            "end date {} is before start date {}",
            end_date, start_date
        ))
    })
}

/// 包含 `date` 的自然周（周一开始，7 天）
pub fn week_of(date: NaiveDate) -> Result<Window, MeteoError> {
    let offset = date.weekday().num_days_from_monday() as u64;
    let monday = date
        .checked_sub_days(Days::new(offset))
        .ok_or_else(|| MeteoError::InvalidParameter(format!("date out of range: {}", date)))?;
    days(monday, 7)
}

/// 包含 `date` 的自然月
pub fn month_of(date: NaiveDate) -> Result<Window, MeteoError> {
    let out_of_range = || MeteoError::InvalidParameter(format!("date out of range: {}", date));
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).ok_or_else(out_of_range)?;
    let next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
    .ok_or_else(out_of_range)?;
    resolve_range(first, next)
}

/// 包含 `date` 的自然年
pub fn year_of(date: NaiveDate) -> Result<Window, MeteoError> {
    let out_of_range = || MeteoError::InvalidParameter(format!("date out of range: {}", date));
    let first = NaiveDate::from_ymd_opt(date.year(), 1, 1).ok_or_else(out_of_range)?;
    let next = NaiveDate::from_ymd_opt(date.year() + 1, 1, 1).ok_or_else(out_of_range)?;
    resolve_range(first, next)
}

/// 解析 `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate, MeteoError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| MeteoError::InvalidParameter(format!("invalid date '{}': {}", s, e)))
}

/// 解析 `HH:MM:SS`
pub fn parse_time(s: &str) -> Result<NaiveTime, MeteoError> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
        .map_err(|e| MeteoError::InvalidParameter(format!("invalid time '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ColumnDef;
    use crate::utils::FixedClock;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn catalog() -> SchemaCatalog {
        let cols = |names: &[(&str, ColumnType)]| {
            names
                .iter()
                .map(|(n, t)| ColumnDef::new(*n, *t))
                .collect::<Vec<_>>()
        };
        SchemaCatalog::from_descriptors(vec![
            TableDescriptor::new(
                TableKind::Raw,
                "Weather_table_meteostation1",
                cols(&[("id", ColumnType::Integer), ("time", ColumnType::DateTime)]),
            ),
            TableDescriptor::new(
                TableKind::Daily,
                "aggregated_daily_data",
                cols(&[
                    ("id", ColumnType::Integer),
                    ("date", ColumnType::Date),
                    ("time", ColumnType::Time),
                ]),
            ),
            TableDescriptor::new(
                TableKind::Weekly,
                "aggregated_weekly_data",
                cols(&[("week_start", ColumnType::Date)]),
            ),
            TableDescriptor::new(
                TableKind::Monthly,
                "aggregated_monthly_data",
                cols(&[("next_month_start", ColumnType::Date)]),
            ),
            TableDescriptor::new(
                TableKind::Aggregate,
                "aggregated_data",
                cols(&[("label", ColumnType::Text)]),
            ),
        ])
    }

    #[test]
    fn test_day_window_for_every_kind() {
        let catalog = catalog();
        let clock = FixedClock::at_date(d(2024, 3, 1));
        let resolver = WindowResolver::new(&catalog, &clock);

        for kind in [TableKind::Raw, TableKind::Daily, TableKind::Weekly, TableKind::Monthly] {
            let resolved = resolver.resolve_window(kind, Some(d(2024, 2, 29)), None).unwrap();
            assert!(resolved.window.start() < resolved.window.end());
            assert_eq!(resolved.window.duration(), Duration::days(1));
            assert_eq!(resolved.window.start(), midnight(d(2024, 2, 29)));
            assert!(resolved.time_filter.is_none());
        }
    }

    #[test]
    fn test_missing_date_uses_clock() {
        let catalog = catalog();
        let clock = FixedClock(d(2024, 3, 1).and_hms_opt(17, 30, 0).unwrap());
        let resolver = WindowResolver::new(&catalog, &clock);

        let resolved = resolver.resolve_window(TableKind::Raw, None, None).unwrap();
        assert_eq!(resolved.window.start(), midnight(d(2024, 3, 1)));
        assert_eq!(resolved.window.end(), midnight(d(2024, 3, 2)));
    }

    #[test]
    fn test_exact_time_scenario() {
        let catalog = catalog();
        let clock = FixedClock::at_date(d(2030, 1, 1));
        let resolver = WindowResolver::new(&catalog, &clock);

        let noon = parse_time("12:00:00").unwrap();
        let resolved = resolver
            .resolve_window(TableKind::Daily, Some(parse_date("2024-03-01").unwrap()), Some(noon))
            .unwrap();
        assert_eq!(resolved.window.start(), midnight(d(2024, 3, 1)));
        assert_eq!(resolved.window.end(), midnight(d(2024, 3, 2)));
        assert_eq!(
            resolved.time_filter,
            Some(("time".to_string(), Value::Time(noon)))
        );

        // datetime 类型的 time 列：与日期组合
        let resolved = resolver
            .resolve_window(TableKind::Raw, Some(d(2024, 3, 1)), Some(noon))
            .unwrap();
        assert_eq!(
            resolved.time_filter,
            Some((
                "time".to_string(),
                Value::DateTime(d(2024, 3, 1).and_time(noon))
            ))
        );
    }

    #[test]
    fn test_exact_time_on_text_anchor() {
        let catalog = SchemaCatalog::from_descriptors(vec![TableDescriptor::new(
            TableKind::Raw,
            "Weather_table_meteostation1",
            vec![
                ColumnDef::new("id", ColumnType::Integer),
                ColumnDef::new("time", ColumnType::Text),
            ],
        )]);
        let clock = FixedClock::at_date(d(2024, 3, 1));
        let resolver = WindowResolver::new(&catalog, &clock);

        let noon = parse_time("12:00:00").unwrap();
        let resolved = resolver
            .resolve_window(TableKind::Raw, Some(d(2024, 3, 1)), Some(noon))
            .unwrap();
        assert_eq!(
            resolved.time_filter,
            Some(("time".to_string(), Value::Text("2024-03-01 12:00:00".to_string())))
        );
    }

    #[test]
    fn test_time_on_table_without_time_column() {
        let catalog = catalog();
        let clock = FixedClock::at_date(d(2024, 3, 1));
        let resolver = WindowResolver::new(&catalog, &clock);

        let err = resolver
            .resolve_window(TableKind::Weekly, None, Some(NaiveTime::MIN))
            .unwrap_err();
        assert!(matches!(err, MeteoError::UnknownColumn { column, .. } if column == "time"));
    }

    #[test]
    fn test_no_time_column() {
        let catalog = catalog();
        let clock = FixedClock::at_date(d(2024, 3, 1));
        let resolver = WindowResolver::new(&catalog, &clock);

        let err = resolver
            .resolve_window(TableKind::Aggregate, None, None)
            .unwrap_err();
        assert!(matches!(err, MeteoError::NoTimeColumn(_)));
    }

    #[test]
    fn test_calendar_ranges() {
        // 2024-03-06 是周三
        let week = week_of(d(2024, 3, 6)).unwrap();
        assert_eq!(week.start(), midnight(d(2024, 3, 4)));
        assert_eq!(week.end(), midnight(d(2024, 3, 11)));

        let feb = month_of(d(2024, 2, 10)).unwrap();
        assert_eq!(feb.duration(), Duration::days(29));

        let dec = month_of(d(2023, 12, 31)).unwrap();
        assert_eq!(dec.end(), midnight(d(2024, 1, 1)));

        let year = year_of(d(2024, 7, 1)).unwrap();
        assert_eq!(year.duration(), Duration::days(366));
    }

    #[test]
    fn test_resolve_range() {
        let w = resolve_range(d(2024, 3, 4), d(2024, 3, 11)).unwrap();
        assert_eq!(w.duration(), Duration::days(7));

        let empty = resolve_range(d(2024, 3, 4), d(2024, 3, 4)).unwrap();
        assert_eq!(empty.duration(), Duration::zero());

        assert!(matches!(
            resolve_range(d(2024, 3, 11), d(2024, 3, 4)),
            Err(MeteoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_date("2024-13-01"), Err(MeteoError::InvalidParameter(_))));
        assert!(matches!(parse_date("yesterday"), Err(MeteoError::InvalidParameter(_))));
        assert!(matches!(parse_time("25:00:00"), Err(MeteoError::InvalidParameter(_))));
        assert_eq!(parse_date(" 2024-03-01 ").unwrap(), d(2024, 3, 1));
    }
}
