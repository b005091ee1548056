//! # 汇总
//!
//! 对每束调用单束 R 因子，再按重叠加权汇总。
//!
//! ## 规则
//! - 单束重叠点数乘以步长，换算为能量跨度 (eV)
//! - 汇总 R 因子与强度比：以重叠为权重的加权平均，跳过零重叠的束
//! - 汇总重叠：各束重叠之和
//! - 总重叠为零时汇总值为 NaN，`SummaryRow::is_defined()` 返回 false
//!
//! ## 依赖关系
//! - 被 `rfactor/shift.rs` 调用
//! - 使用 `rfactor/metric.rs`
//! - 使用 `rayon` 并行计算各束

use crate::error::{IvError, Result};
use crate::models::{Dataset, SpotPattern};
use crate::rfactor::metric::{MetricKind, MetricRow};

use rayon::prelude::*;

/// 汇总行
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRow {
    pub r_factor: f64,
    /// 总重叠能量跨度 (eV)
    pub overlap: f64,
    pub ratio: f64,
    /// 优化得到的能量位移 (eV)，未做位移优化时为 `None`
    pub shift: Option<f64>,
}

impl SummaryRow {
    fn from_row(row: MetricRow, shift: Option<f64>) -> Self {
        SummaryRow {
            r_factor: row.r_factor,
            overlap: row.overlap,
            ratio: row.ratio,
            shift,
        }
    }

    pub fn as_row(&self) -> MetricRow {
        MetricRow {
            r_factor: self.r_factor,
            overlap: self.overlap,
            ratio: self.ratio,
        }
    }

    /// 总重叠大于零时汇总值才有意义
    pub fn is_defined(&self) -> bool {
        self.overlap > 0.0
    }
}

/// 单束结果
#[derive(Debug, Clone, PartialEq)]
pub struct BeamResult {
    pub id: usize,
    pub name: String,
    pub row: MetricRow,
}

/// 完整比较结果：逐束表格加汇总行
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub beams: Vec<BeamResult>,
    pub summary: SummaryRow,
}

impl Comparison {
    /// 归一化强度比，使其按重叠加权的平均值为 1
    ///
    /// 均值由逐束结果重新计算；抛物线细化后的汇总比值不是逐束比值的加权平均。
    pub fn normalize_ratios(&mut self) {
        let rows: Vec<MetricRow> = self.beams.iter().map(|b| b.row).collect();
        let mean = summarize(&rows).ratio;
        if !mean.is_finite() || mean <= 0.0 {
            return;
        }
        for beam in &mut self.beams {
            beam.row.ratio /= mean;
        }
        self.summary.ratio = 1.0;
    }
}

/// 已对应、同步长的一对数据集
///
/// `offset` 是两个能量轴起点之差（以步长计，取整）。
#[derive(Debug)]
pub struct AlignedPair<'a> {
    pub a: &'a Dataset,
    pub b: &'a Dataset,
    pub step: f64,
    pub offset: i64,
}

impl<'a> AlignedPair<'a> {
    pub fn new(a: &'a Dataset, b: &'a Dataset) -> Result<Self> {
        let grid_a = a.grid()?;
        let grid_b = b.grid()?;

        if (grid_a.step - grid_b.step).abs() > 1e-3 * grid_a.step {
            return Err(IvError::StepMismatch {
                step_a: grid_a.step,
                step_b: grid_b.step,
            });
        }

        if a.beam_ids() != b.beam_ids() {
            return Err(IvError::InternalInconsistency(format!(
                "beam lists of '{}' and '{}' differ",
                a.title, b.title
            )));
        }

        let step = grid_a.step;
        let offset = ((grid_b.first - grid_a.first) / step).round() as i64;
        Ok(AlignedPair { a, b, step, offset })
    }

    /// 在位移 `shift`（网格步数）下计算逐束结果和汇总
    pub fn aggregate(&self, shift: i64, v0i: f64, metric: MetricKind) -> Comparison {
        let index_shift = shift - self.offset;
        let v0i_over_step = v0i / self.step;
        let step = self.step;

        let beams: Vec<BeamResult> = self
            .a
            .beams
            .par_iter()
            .zip(self.b.beams.par_iter())
            .map(|(beam_a, beam_b)| {
                let mut row =
                    metric.evaluate(&beam_a.curve, &beam_b.curve, index_shift, v0i_over_step);
                row.overlap *= step;
                BeamResult {
                    id: beam_a.id,
                    name: beam_a.name.clone(),
                    row,
                }
            })
            .collect();

        let rows: Vec<MetricRow> = beams.iter().map(|b| b.row).collect();
        Comparison {
            beams,
            summary: SummaryRow::from_row(summarize(&rows), None),
        }
    }
}

/// 按重叠加权汇总；重叠为普通求和
pub fn summarize(rows: &[MetricRow]) -> MetricRow {
    let mut total = 0.0;
    let mut sum_r = 0.0;
    let mut sum_ratio = 0.0;

    for row in rows.iter().filter(|r| r.overlap > 0.0) {
        total += row.overlap;
        sum_r += row.r_factor * row.overlap;
        sum_ratio += row.ratio * row.overlap;
    }

    MetricRow {
        r_factor: sum_r / total,
        overlap: total,
        ratio: sum_ratio / total,
    }
}

/// 整数束或超结构束的统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryStats {
    /// 有重叠的束数
    pub beams: usize,
    /// 总重叠 (eV)
    pub overlap: f64,
    /// R 因子的算术平均
    pub mean_r_factor: f64,
    /// 强度比的算术平均
    pub mean_ratio: f64,
}

impl CategoryStats {
    fn from_rows<'r>(rows: impl Iterator<Item = &'r MetricRow>) -> Self {
        let mut beams = 0;
        let mut overlap = 0.0;
        let mut sum_r = 0.0;
        let mut sum_ratio = 0.0;
        for row in rows.filter(|r| r.overlap > 0.0) {
            beams += 1;
            overlap += row.overlap;
            sum_r += row.r_factor;
            sum_ratio += row.ratio;
        }
        let n = beams as f64;
        CategoryStats {
            beams,
            overlap,
            mean_r_factor: sum_r / n,
            mean_ratio: sum_ratio / n,
        }
    }
}

/// 整数束 / 超结构束分组统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryBreakdown {
    pub integer: CategoryStats,
    pub superstructure: CategoryStats,
}

/// 图样含超结构束时给出分组统计
pub fn category_stats(comparison: &Comparison, spots: &SpotPattern) -> Option<CategoryBreakdown> {
    if !spots.has_superstructure() {
        return None;
    }
    let integer = CategoryStats::from_rows(
        comparison
            .beams
            .iter()
            .filter(|b| !spots.is_superstructure(b.id))
            .map(|b| &b.row),
    );
    let superstructure = CategoryStats::from_rows(
        comparison
            .beams
            .iter()
            .filter(|b| spots.is_superstructure(b.id))
            .map(|b| &b.row),
    );
    Some(CategoryBreakdown {
        integer,
        superstructure,
    })
}
