// 内存存储 - 测试与演示用的 StorageEngine 实现
//
// 行按插入顺序保存，`_rowid` 从 1 递增。
// 记录 introspect/execute 调用次数，便于验证"未授权请求不触达存储"。

use super::{ColumnDef, Row, StorageEngine, StorageError, StorageResult, Value};
use crate::query::{Filter, Query};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

struct MemoryTable {
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    fn index_of(&self, column: &str) -> StorageResult<usize> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| StorageError::Query(format!("no such column: {}", column)))
    }
}

/// 内存存储
pub struct MemoryStorage {
    tables: RwLock<HashMap<String, MemoryTable>>,
    introspect_calls: AtomicUsize,
    execute_calls: AtomicUsize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            introspect_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }

    /// 创建（或替换）一张空表
    pub fn create_table(&self, name: impl Into<String>, columns: Vec<ColumnDef>) {
        self.tables.write().insert(
            name.into(),
            MemoryTable {
                columns,
                rows: Vec::new(),
            },
        );
    }

    /// 按列声明顺序插入一行。值不做类型校验，可用来模拟表结构漂移
    pub fn insert(&self, table: &str, values: Vec<Value>) -> StorageResult<()> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        if values.len() != t.columns.len() {
            return Err(StorageError::Query(format!(
                "{} has {} columns but {} values were supplied",
                table,
                t.columns.len(),
                values.len()
            )));
        }
        t.rows.push(values);
        Ok(())
    }

    pub fn drop_table(&self, table: &str) {
        self.tables.write().remove(table);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn introspect_count(&self) -> usize {
        self.introspect_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn execute_count(&self) -> usize {
        self.execute_calls.load(AtomicOrdering::SeqCst)
    }
}

impl StorageEngine for MemoryStorage {
    fn introspect(&self, table: &str) -> StorageResult<Vec<ColumnDef>> {
        self.introspect_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.tables
            .read()
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))
    }

    fn execute(&self, query: &Query) -> StorageResult<Vec<Row>> {
        self.execute_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let tables = self.tables.read();
        let table = tables
            .get(&query.table)
            .ok_or_else(|| StorageError::TableNotFound(query.table.clone()))?;

        let filters: Vec<(usize, &Filter)> = query
            .filters
            .iter()
            .map(|f| Ok((table.index_of(&f.column)?, f)))
            .collect::<StorageResult<_>>()?;
        let projection: Vec<usize> = query
            .columns
            .iter()
            .map(|c| table.index_of(c))
            .collect::<StorageResult<_>>()?;

        let mut matched: Vec<(usize, &Vec<Value>)> = table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filters.iter().all(|(idx, f)| f.matches(&row[*idx])))
            .collect();

        if let Some(order) = &query.order_by {
            let idx = table.index_of(&order.column)?;
            // NULL 视为最小值，与 SQLite 一致；sort_by 是稳定排序
            matched.sort_by(|(_, a), (_, b)| {
                let ord = match (a[idx].is_null(), b[idx].is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => a[idx].compare(&b[idx]).unwrap_or(Ordering::Equal),
                };
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .take(limit)
            .map(|(position, row)| {
                let mut fields = Vec::with_capacity(projection.len() + 1);
                fields.push(("_rowid".to_string(), Value::Int(position as i64 + 1)));
                for (name, idx) in query.columns.iter().zip(&projection) {
                    fields.push((name.clone(), row[*idx].clone()));
                }
                Row::new(fields)
            })
            .collect())
    }
}
