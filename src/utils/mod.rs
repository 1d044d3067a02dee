//! 工具模块

pub mod clock;
pub mod config;
pub mod jwt;

pub use clock::{Clock, FixedClock, SystemClock};
