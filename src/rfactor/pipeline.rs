//! # 比较流程
//!
//! 按调用顺序串联各步骤：
//! 能量范围限制 → 对称平均 → 束流对应 → 网格统一 → 比较 → 分组统计
//!
//! 所有参数都通过 `RFactorConfig` 显式传入，没有全局状态。
//!
//! ## 依赖关系
//! - 被 `commands/compare.rs`, `commands/rank.rs` 调用
//! - 使用 `rfactor/` 下各子模块

use crate::error::{IvError, Result};
use crate::models::{Dataset, SpotPattern};
use crate::rfactor::aggregate::{category_stats, CategoryBreakdown, Comparison};
use crate::rfactor::correspondence::build_correspondence;
use crate::rfactor::grid::{align_grids, DEFAULT_MAX_STEP};
use crate::rfactor::metric::MetricKind;
use crate::rfactor::shift::compare;
use crate::rfactor::symmetry::average_symmetric;

/// 比较参数
#[derive(Debug, Clone, PartialEq)]
pub struct RFactorConfig {
    /// 虚部光学势 V0i (eV)
    pub v0i: f64,
    /// 最大比较步长 (eV)
    pub max_step: f64,
    pub metric: MetricKind,
    /// 是否优化能量位移
    pub allow_shift: bool,
    /// 是否先平均对称等价束
    pub average_symmetric: bool,
    /// 只比较该能量范围 (eV)
    pub energy_range: Option<(f64, f64)>,
}

impl Default for RFactorConfig {
    fn default() -> Self {
        RFactorConfig {
            v0i: 4.0,
            max_step: DEFAULT_MAX_STEP,
            metric: MetricKind::Pendry,
            allow_shift: true,
            average_symmetric: true,
            energy_range: None,
        }
    }
}

impl RFactorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.v0i > 0.0) || !self.v0i.is_finite() {
            return Err(IvError::InvalidArgument(format!(
                "V0i must be positive, got {}",
                self.v0i
            )));
        }
        if !(self.max_step > 0.0) || !self.max_step.is_finite() {
            return Err(IvError::InvalidArgument(format!(
                "maximum energy step must be positive, got {}",
                self.max_step
            )));
        }
        if let Some((lo, hi)) = self.energy_range {
            if !(hi > lo) {
                return Err(IvError::InvalidRange(format!("{}-{}", lo, hi)));
            }
        }
        Ok(())
    }
}

/// 完整流程的结果
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// 参与比较（对应、网格统一后）的两个数据集
    pub reference: Dataset,
    pub candidate: Dataset,
    pub comparison: Comparison,
    pub categories: Option<CategoryBreakdown>,
}

/// 比较参考数据集与候选数据集
pub fn run(
    reference: &Dataset,
    candidate: &Dataset,
    spots: &SpotPattern,
    config: &RFactorConfig,
) -> Result<PipelineOutput> {
    config.validate()?;

    let (mut a, mut b) = match config.energy_range {
        Some((lo, hi)) => (
            reference.restrict_energy(lo, hi),
            candidate.restrict_energy(lo, hi),
        ),
        None => (reference.clone(), candidate.clone()),
    };

    if config.average_symmetric {
        a = average_symmetric(&a, spots);
        b = average_symmetric(&b, spots);
    }

    let (a, b) = build_correspondence(&a, &b, spots)?;
    let (a, b) = align_grids(&a, &b, config.max_step)?;
    let comparison = compare(&a, &b, config.v0i, config.metric, config.allow_shift)?;
    let categories = category_stats(&comparison, spots);

    Ok(PipelineOutput {
        reference: a,
        candidate: b,
        comparison,
        categories,
    })
}
