// 聚合引擎 - 执行已构建的查询
//
// 三种模式：全量读取 / 最新一条 / 按列最小最大值。
// 只读，不缓存，不重试；存储层错误在这里统一转换为 StorageFailure。

use super::aggregate;
use super::types::{Extreme, Query};
use crate::schema::TableDescriptor;
use crate::storage::{ColumnDef, Row, StorageEngine, Value};
use crate::MeteoError;

/// 聚合引擎
pub struct AggregationEngine<'a> {
    storage: &'a dyn StorageEngine,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(storage: &'a dyn StorageEngine) -> Self {
        Self { storage }
    }

    /// 执行查询，返回所有匹配行
    pub fn fetch_all(&self, query: &Query) -> Result<Vec<Row>, MeteoError> {
        let start = std::time::Instant::now();
        let rows = self.storage.execute(query).map_err(|e| {
            log::error!("Query on {} failed: {}", query.table, e);
            MeteoError::StorageFailure(e)
        })?;
        log::debug!(
            "Query on {} returned {} rows in {}ms",
            query.table,
            rows.len(),
            start.elapsed().as_millis()
        );
        Ok(rows)
    }

    /// 最新一条：按主键（或锚定列）降序取第一行；空表返回 None
    pub fn latest(&self, table: &TableDescriptor, query: Query) -> Result<Option<Row>, MeteoError> {
        let column = table.recency_column()?.to_string();
        self.latest_by(query, column)
    }

    /// 按指定列降序取第一行
    pub fn latest_by(&self, query: Query, column: String) -> Result<Option<Row>, MeteoError> {
        let query = query.order_by(column, true).limit(1);
        Ok(self.fetch_all(&query)?.into_iter().next())
    }

    /// 按列最小/最大值。参与的列为查询的返回列
    pub fn min_max(
        &self,
        table: &TableDescriptor,
        query: &Query,
        which: Extreme,
    ) -> Result<Vec<(String, Value)>, MeteoError> {
        let columns: Vec<&ColumnDef> = query
            .columns
            .iter()
            .map(|name| table.require_column(name))
            .collect::<Result<_, _>>()?;

        let rows = self.fetch_all(query)?;
        aggregate::extremes(&rows, &columns, which)
    }
}
