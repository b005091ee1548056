//! # R 因子比较模块
//!
//! 比较两组 I(V) 曲线并给出 R 因子、重叠和强度比。
//!
//! ## 子模块
//! - `grid`: 能量网格统一
//! - `symmetry`: 对称等价束平均
//! - `correspondence`: 束流对应
//! - `metric`: 单束 R 因子
//! - `aggregate`: 汇总与分组统计
//! - `shift`: 能量位移优化
//! - `pipeline`: 完整比较流程
//! - `export`: 结果导出
//! - `plot`: 曲线绘图
//!
//! ## 依赖关系
//! - 被 `commands/compare.rs`, `commands/rank.rs` 使用
//! - 使用 `models/`

pub mod aggregate;
pub mod correspondence;
pub mod export;
pub mod grid;
pub mod metric;
pub mod pipeline;
pub mod plot;
pub mod shift;
pub mod symmetry;

pub use aggregate::{CategoryBreakdown, CategoryStats, Comparison};
pub use metric::MetricKind;
pub use pipeline::{run, PipelineOutput, RFactorConfig};
