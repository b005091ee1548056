//! # 数据模型模块
//!
//! 定义 I(V) 曲线、数据集和斑点图样。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `rfactor/` 和 `commands/` 使用
//! - 子模块: curve, spots

pub mod curve;
pub mod spots;

pub use curve::{Beam, Curve, Dataset, EnergyGrid};
pub use spots::{Spot, SpotPattern, SymmetryGroup};
