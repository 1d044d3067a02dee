// 查询层
//
// 架构：
// ┌─────────────────────────────────────────────────────────────┐
// │                   MeteoQueryService                         │
// │        (latest / today / by_date / min_max / scans)          │
// │                          │                                  │
// │   ┌──────────────┐  ┌────▼────────┐  ┌──────────────────┐   │
// │   │WindowResolver│→ │QueryBuilder │→ │AggregationEngine │   │
// │   │  (日期→窗口)  │  │ (窗口→Query) │  │ (执行/最新/极值)  │   │
// │   └──────────────┘  └─────────────┘  └────────┬─────────┘   │
// │                                               │             │
// │                                      ┌────────▼────────┐    │
// │                                      │  materialize    │    │
// │                                      │ (行→有序记录)    │    │
// │                                      └─────────────────┘    │
// └─────────────────────────────────────────────────────────────┘

pub mod aggregate;
pub mod builder;
pub mod engine;
pub mod materialize;
pub mod operations;
pub mod types;
pub mod window;

pub use builder::QueryBuilder;
pub use engine::AggregationEngine;
pub use materialize::Record;
pub use operations::{MeteoQueryService, ReadOptions, FOUR_HOURLY};
pub use types::*;
pub use window::{parse_date, parse_time, WindowResolver};
