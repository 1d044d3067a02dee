// SQLite 存储 - 只读连接池
//
// 连接在启动时一次性打开，放入有界通道；每次调用借出一条，用完归还。
// 连接全部借出时调用方阻塞等待归还，不设超时；`busy_timeout` 只作用于 SQLite 自身的锁等待。
// 所有连接都设置 `PRAGMA query_only = ON`，服务进程永远不会写库。
// 列类型按表缓存，解码时不再重复内省。
//
// 约定：日期时间列以文本 `YYYY-MM-DD HH:MM:SS` 存储，日期列为 `YYYY-MM-DD`，
// 时间列为 `HH:MM:SS`。窗口边界按同样的格式绑定，文本比较即时间比较。

use super::{
    parse_date_text, parse_datetime_text, parse_time_text, ColumnDef, ColumnType, Row,
    StorageEngine, StorageError, StorageResult, Value, DATETIME_SQL_FORMAT, DATE_FORMAT,
    TIME_FORMAT,
};
use crate::query::{Filter, FilterOp, FilterValue, Query};
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// SQLite 连接配置
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    pub pool_size: usize,
    pub busy_timeout_ms: u64,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool_size: 4,
            busy_timeout_ms: 5000,
        }
    }
}

/// 只读 SQLite 存储
pub struct SqliteStorage {
    idle: Receiver<Connection>,
    release: Sender<Connection>,
    /// 表名 → 列定义（声明顺序）
    column_cache: RwLock<HashMap<String, Arc<Vec<ColumnDef>>>>,
}

impl SqliteStorage {
    /// 打开连接池。数据库文件必须已存在
    pub fn open(config: &SqliteConfig) -> StorageResult<Self> {
        if !config.path.exists() {
            return Err(StorageError::Connection(format!(
                "database file not found: {}",
                config.path.display()
            )));
        }

        let pool_size = config.pool_size.max(1);
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let (release, idle) = bounded(pool_size);

        for _ in 0..pool_size {
            let conn = Connection::open(&config.path).map_err(connection_error)?;
            conn.busy_timeout(busy_timeout).map_err(connection_error)?;
            conn.execute_batch("PRAGMA query_only = ON;")
                .map_err(connection_error)?;
            release
                .send(conn)
                .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        log::info!(
            "SQLite storage opened: {} ({} connections, query_only)",
            config.path.display(),
            pool_size
        );

        Ok(Self {
            idle,
            release,
            column_cache: RwLock::new(HashMap::new()),
        })
    }

    /// 借出一条连接执行 `f`，结束后归还。池空时阻塞直到有连接归还
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        // 发送端由自身持有，通道不会断开
        let conn = self
            .idle
            .recv()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let result = f(&conn);
        if self.release.send(conn).is_err() {
            log::error!("SQLite connection could not be returned to the pool");
        }
        result
    }
}

impl StorageEngine for SqliteStorage {
    fn introspect(&self, table: &str) -> StorageResult<Vec<ColumnDef>> {
        let columns = self.with_conn(|conn| column_types(conn, table))?;
        log::debug!("Introspected {}: {} columns", table, columns.len());
        self.column_cache
            .write()
            .insert(table.to_string(), Arc::new(columns.clone()));
        Ok(columns)
    }

    fn execute(&self, query: &Query) -> StorageResult<Vec<Row>> {
        let (sql, params) = render_sql(query);
        log::debug!("SQL: {} {:?}", sql, params);

        let types = self.cached_columns(&query.table)?;
        self.with_conn(|conn| {
            let decoders: Vec<ColumnType> = query
                .columns
                .iter()
                .map(|c| {
                    types
                        .iter()
                        .find(|d| d.name == *c)
                        .map(|d| d.column_type)
                        .ok_or_else(|| StorageError::Query(format!("no such column: {}", c)))
                })
                .collect::<StorageResult<_>>()?;

            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| table_error(e, &query.table))?;
            let mut rows = stmt
                .query(params_from_iter(params.iter()))
                .map_err(query_error)?;

            let mut out = Vec::new();
            while let Some(row) = rows.next().map_err(query_error)? {
                let mut fields = Vec::with_capacity(decoders.len() + 1);
                let rowid: i64 = row.get(0).map_err(query_error)?;
                fields.push(("_rowid".to_string(), Value::Int(rowid)));
                for (i, (name, column_type)) in query.columns.iter().zip(&decoders).enumerate() {
                    let cell = row.get_ref(i + 1).map_err(query_error)?;
                    fields.push((name.clone(), decode(name, *column_type, cell)?));
                }
                out.push(Row::new(fields));
            }
            Ok(out)
        })
    }
}

impl SqliteStorage {
    /// 解码用的列类型；首次访问某表时内省并缓存
    fn cached_columns(&self, table: &str) -> StorageResult<Arc<Vec<ColumnDef>>> {
        if let Some(columns) = self.column_cache.read().get(table) {
            return Ok(columns.clone());
        }
        let columns = Arc::new(self.with_conn(|conn| column_types(conn, table))?);
        self.column_cache
            .write()
            .insert(table.to_string(), columns.clone());
        Ok(columns)
    }
}

/// 按声明顺序读取列定义；没有列即表不存在
fn column_types(conn: &Connection, table: &str) -> StorageResult<Vec<ColumnDef>> {
    let mut stmt = conn
        .prepare_cached("SELECT name, type FROM pragma_table_info(?1)")
        .map_err(query_error)?;
    let columns = stmt
        .query_map([table], |row| {
            let declared: String = row.get(1)?;
            Ok(ColumnDef::new(
                row.get::<_, String>(0)?,
                ColumnType::from_declared(&declared),
            ))
        })
        .map_err(query_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(query_error)?;
    if columns.is_empty() {
        return Err(StorageError::TableNotFound(table.to_string()));
    }
    Ok(columns)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Query → (SQL, 绑定参数)
pub(crate) fn render_sql(query: &Query) -> (String, Vec<SqlValue>) {
    let mut sql = String::from("SELECT rowid AS \"_rowid\"");
    for column in &query.columns {
        sql.push_str(", ");
        sql.push_str(&quote_ident(column));
    }
    sql.push_str(" FROM ");
    sql.push_str(&quote_ident(&query.table));

    let mut params = Vec::new();
    let clauses: Vec<String> = query
        .filters
        .iter()
        .map(|f| render_filter(f, &mut params))
        .collect();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    match &query.order_by {
        Some(order) => {
            sql.push_str(&format!(
                " ORDER BY {} {}, rowid ASC",
                quote_ident(&order.column),
                if order.descending { "DESC" } else { "ASC" }
            ));
        }
        None => sql.push_str(" ORDER BY rowid ASC"),
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    (sql, params)
}

fn render_filter(filter: &Filter, params: &mut Vec<SqlValue>) -> String {
    let column = quote_ident(&filter.column);
    match (&filter.op, &filter.value) {
        (FilterOp::HourIn, FilterValue::Hours(hours)) => {
            let list: Vec<String> = hours.iter().map(|h| h.to_string()).collect();
            format!(
                "CAST(strftime('%H', {}) AS INTEGER) IN ({})",
                column,
                list.join(", ")
            )
        }
        (op, FilterValue::Scalar(value)) => {
            params.push(to_sql(value));
            let symbol = match op {
                FilterOp::Gte => ">=",
                FilterOp::Lt => "<",
                _ => "=",
            };
            format!("{} {} ?{}", column, symbol, params.len())
        }
        // 操作符与值不匹配时不选中任何行
        _ => "0".to_string(),
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.format(DATETIME_SQL_FORMAT).to_string()),
        Value::Time(t) => SqlValue::Text(t.format(TIME_FORMAT).to_string()),
    }
}

/// 按声明类型解码单元格
fn decode(column: &str, column_type: ColumnType, cell: ValueRef<'_>) -> StorageResult<Value> {
    let bad = |what: &str| {
        StorageError::Decode(format!(
            "column '{}' declared {} holds {}",
            column,
            column_type.name(),
            what
        ))
    };

    let value = match (column_type, cell) {
        (_, ValueRef::Null) => Value::Null,
        (_, ValueRef::Blob(_)) => return Err(bad("a blob")),

        (ColumnType::Real, ValueRef::Integer(i)) => Value::Float(i as f64),
        (ColumnType::Boolean, ValueRef::Integer(i)) => Value::Bool(i != 0),
        (_, ValueRef::Integer(i)) => Value::Int(i),
        (_, ValueRef::Real(f)) => Value::Float(f),

        (ColumnType::Date, ValueRef::Text(bytes)) => {
            let s = text(bytes).ok_or_else(|| bad("invalid utf-8"))?;
            Value::Date(parse_date_text(s).ok_or_else(|| bad(s))?)
        }
        (ColumnType::DateTime, ValueRef::Text(bytes)) => {
            let s = text(bytes).ok_or_else(|| bad("invalid utf-8"))?;
            Value::DateTime(parse_datetime_text(s).ok_or_else(|| bad(s))?)
        }
        (ColumnType::Time, ValueRef::Text(bytes)) => {
            let s = text(bytes).ok_or_else(|| bad("invalid utf-8"))?;
            Value::Time(parse_time_text(s).ok_or_else(|| bad(s))?)
        }
        (_, ValueRef::Text(bytes)) => {
            Value::Text(text(bytes).ok_or_else(|| bad("invalid utf-8"))?.to_string())
        }
    };
    Ok(value)
}

fn text(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

fn connection_error(e: rusqlite::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn query_error(e: rusqlite::Error) -> StorageError {
    StorageError::Query(e.to_string())
}

fn table_error(e: rusqlite::Error, table: &str) -> StorageError {
    let message = e.to_string();
    if message.contains("no such table") {
        StorageError::TableNotFound(table.to_string())
    } else {
        StorageError::Query(message)
    }
}
