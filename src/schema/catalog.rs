//! 表结构目录：启动时内省，进程生命周期内只读

use super::{TableDescriptor, TableKind};
use crate::storage::StorageEngine;
use crate::utils::config::TablesConfig;
use crate::MeteoError;
use std::collections::HashMap;

/// 表结构目录
///
/// 构建后不可变，可通过 `Arc` 在请求间共享；查找不涉及 I/O。
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: HashMap<TableKind, TableDescriptor>,
}

impl SchemaCatalog {
    /// 内省所有配置的表。任一表不存在时启动失败
    pub fn build(storage: &dyn StorageEngine, tables: &TablesConfig) -> Result<Self, MeteoError> {
        let mut catalog = Self::default();

        for kind in TableKind::ALL {
            let name = tables.table_name(kind);
            let columns = storage.introspect(name)?;
            let descriptor = TableDescriptor::new(kind, name, columns);

            match &descriptor.anchor_column {
                Some(anchor) => log::info!(
                    "Catalog: {} -> {} ({} columns, anchor '{}')",
                    kind,
                    name,
                    descriptor.columns.len(),
                    anchor
                ),
                None => log::warn!(
                    "Catalog: {} -> {} ({} columns) has no date column",
                    kind,
                    name,
                    descriptor.columns.len()
                ),
            }

            catalog.tables.insert(kind, descriptor);
        }

        Ok(catalog)
    }

    /// 直接由描述构建（测试或离线场景）
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = TableDescriptor>) -> Self {
        Self {
            tables: descriptors.into_iter().map(|d| (d.kind, d)).collect(),
        }
    }

    pub fn resolve_table(&self, kind: TableKind) -> Result<&TableDescriptor, MeteoError> {
        self.tables
            .get(&kind)
            .ok_or_else(|| MeteoError::UnknownGranularity(kind.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ColumnDef, ColumnType, MemoryStorage, StorageError};

    fn storage_with_all_tables() -> MemoryStorage {
        let storage = MemoryStorage::new();
        let tables = TablesConfig::default();
        for kind in TableKind::ALL {
            storage.create_table(
                tables.table_name(kind),
                vec![
                    ColumnDef::new("id", ColumnType::Integer),
                    ColumnDef::new("time", ColumnType::DateTime),
                ],
            );
        }
        storage
    }

    #[test]
    fn test_build_introspects_every_kind_once() {
        let storage = storage_with_all_tables();
        let catalog = SchemaCatalog::build(&storage, &TablesConfig::default()).unwrap();

        for kind in TableKind::ALL {
            assert_eq!(catalog.resolve_table(kind).unwrap().kind, kind);
        }
        assert_eq!(storage.introspect_count(), 5);

        // 之后的查找不访问存储
        for _ in 0..10 {
            catalog.resolve_table(TableKind::Weekly).unwrap();
        }
        assert_eq!(storage.introspect_count(), 5);
        assert_eq!(storage.execute_count(), 0);
    }

    #[test]
    fn test_build_fails_on_missing_table() {
        let storage = MemoryStorage::new();
        let err = SchemaCatalog::build(&storage, &TablesConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            MeteoError::StorageFailure(StorageError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_table() {
        let storage = storage_with_all_tables();
        let catalog = SchemaCatalog::build(&storage, &TablesConfig::default()).unwrap();

        let kind: TableKind = "aggregated".parse().unwrap();
        assert_eq!(catalog.resolve_table(kind).unwrap().name, "aggregated_data");

        let partial = SchemaCatalog::from_descriptors(vec![]);
        assert!(matches!(
            partial.resolve_table(TableKind::Raw),
            Err(MeteoError::UnknownGranularity(_))
        ));
    }
}
