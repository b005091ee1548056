//! # 能量位移优化
//!
//! 寻找使汇总 R 因子最小的能量轴整体位移。
//!
//! ## 算法
//! 1. 搜索范围 `max_shift = round(2·V0i/step)`（至少 1 步）
//! 2. 计算位移 0，再试 +1；+1 不优于 0 时改为向负方向搜索
//! 3. 沿当前方向逐步前进，直到某一步不再下降，最小值即被括在 (best−1, best, best+1)
//! 4. 超出范围仍在下降则报 `NoMinimumFound`
//! 5. 三点抛物线拟合求亚步长修正 `dx = −¼·(R₊ − R₋) / (½(R₊ + R₋) − R₀)`
//! 6. 每束和汇总行的各字段按同一抛物线插值到 dx，重叠取 best 处的值
//!
//! ## 依赖关系
//! - 被 `rfactor/pipeline.rs` 调用
//! - 使用 `rfactor/aggregate.rs`

use crate::error::{IvError, Result};
use crate::models::Dataset;
use crate::rfactor::aggregate::{AlignedPair, BeamResult, Comparison, SummaryRow};
use crate::rfactor::metric::{MetricKind, MetricRow};

use std::collections::HashMap;

/// 比较两个已对应、同步长的数据集
///
/// `allow_shift` 为 false 时只在两能量轴的自然对齐处计算一次。
/// 返回的强度比已归一化为加权平均 1。
pub fn compare(
    a: &Dataset,
    b: &Dataset,
    v0i: f64,
    metric: MetricKind,
    allow_shift: bool,
) -> Result<Comparison> {
    if !(v0i > 0.0) || !v0i.is_finite() {
        return Err(IvError::InvalidArgument(format!(
            "V0i must be positive, got {}",
            v0i
        )));
    }

    let pair = AlignedPair::new(a, b)?;
    let mut comparison = if allow_shift {
        optimize_shift(&pair, v0i, metric)?
    } else {
        pair.aggregate(0, v0i, metric)
    };
    comparison.normalize_ratios();
    Ok(comparison)
}

/// 搜索范围（网格步数）
pub fn max_shift(v0i: f64, step: f64) -> i64 {
    ((2.0 * v0i / step).round() as i64).max(1)
}

/// 有界单峰搜索加抛物线细化
pub fn optimize_shift(pair: &AlignedPair, v0i: f64, metric: MetricKind) -> Result<Comparison> {
    let max_shift = max_shift(v0i, pair.step);
    let mut evaluated: HashMap<i64, Comparison> = HashMap::new();

    let mut score = |shift: i64| -> f64 {
        let r = evaluated
            .entry(shift)
            .or_insert_with(|| pair.aggregate(shift, v0i, metric))
            .summary
            .r_factor;
        log::debug!("shift {:+} steps: {} = {:.5}", shift, metric, r);
        r
    };

    let r_zero = score(0);
    let r_first = score(1);

    let (mut best, mut r_best, direction): (i64, f64, i64) = if r_first < r_zero {
        (1, r_first, 1)
    } else {
        (0, r_zero, -1)
    };

    loop {
        let next = best + direction;
        if next.abs() > max_shift {
            return Err(IvError::NoMinimumFound { max_shift });
        }
        let r = score(next);
        if r < r_best {
            best = next;
            r_best = r;
        } else {
            break;
        }
    }

    let (Some(minus), Some(zero), Some(plus)) = (
        evaluated.remove(&(best - 1)),
        evaluated.remove(&best),
        evaluated.remove(&(best + 1)),
    ) else {
        return Err(IvError::InternalInconsistency(format!(
            "shift {} was not bracketed by evaluated neighbours",
            best
        )));
    };

    let dx = parabola_vertex(
        minus.summary.r_factor,
        zero.summary.r_factor,
        plus.summary.r_factor,
    );
    log::debug!("best shift {} steps, parabolic correction {:+.3}", best, dx);

    let beams = zero
        .beams
        .iter()
        .zip(minus.beams.iter().zip(plus.beams.iter()))
        .map(|(z, (m, p))| BeamResult {
            id: z.id,
            name: z.name.clone(),
            row: MetricRow::interpolate(&m.row, &z.row, &p.row, dx),
        })
        .collect();

    let summary_row = MetricRow::interpolate(
        &minus.summary.as_row(),
        &zero.summary.as_row(),
        &plus.summary.as_row(),
        dx,
    );

    Ok(Comparison {
        beams,
        summary: SummaryRow {
            r_factor: summary_row.r_factor,
            overlap: summary_row.overlap,
            ratio: summary_row.ratio,
            shift: Some((best as f64 + dx) * pair.step),
        },
    })
}

/// 过 (−1, r_minus), (0, r_zero), (1, r_plus) 的抛物线顶点位置
///
/// 曲率非正或数值退化时返回 0（不做细化）。
pub fn parabola_vertex(r_minus: f64, r_zero: f64, r_plus: f64) -> f64 {
    let twob = r_plus - r_minus;
    let c = 0.5 * (r_plus + r_minus) - r_zero;
    if !(c > 0.0) || !c.is_finite() {
        return 0.0;
    }
    let dx = -0.25 * twob / c;
    if dx.is_finite() {
        dx
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Beam, Curve, EnergyGrid};

    const STEP: f64 = 0.5;

    /// 合成 I(V) 曲线：平缓背景上的若干高斯峰
    fn iv(energy: f64, beam: usize) -> f64 {
        let centers = [80.0, 125.0, 170.0, 215.0];
        let mut y = 1.0 + 0.002 * energy;
        for (k, c) in centers.iter().enumerate() {
            let height = 2.0 + ((k + beam) % 3) as f64;
            let center = c + 7.0 * beam as f64;
            y += height * (-(energy - center).powi(2) / (2.0 * 36.0)).exp();
        }
        y
    }

    fn synthetic(title: &str, shift_ev: f64) -> Dataset {
        let grid = EnergyGrid::new(50.0, STEP, 401);
        let beams = (0..3)
            .map(|beam| {
                let values: Vec<f64> = grid
                    .energies()
                    .iter()
                    .map(|&e| iv(e - shift_ev, beam))
                    .collect();
                Beam::new(beam, format!("({}|0)", beam), Curve::from_values(&values))
            })
            .collect();
        Dataset::new(title, grid.energies(), beams)
    }

    #[test]
    fn test_identity_gives_zero_r() {
        let a = synthetic("a", 0.0);
        for allow_shift in [false, true] {
            let c = compare(&a, &a, 4.0, MetricKind::Pendry, allow_shift).unwrap();
            assert!(c.summary.r_factor.abs() < 1e-12);
            assert!(c.summary.is_defined());
            for beam in &c.beams {
                assert!((beam.row.ratio - 1.0).abs() < 1e-12);
            }
        }
        let c = compare(&a, &a, 4.0, MetricKind::Pendry, true).unwrap();
        assert_eq!(c.summary.shift, Some(0.0));
        let c = compare(&a, &a, 4.0, MetricKind::Pendry, false).unwrap();
        assert_eq!(c.summary.shift, None);
    }

    #[test]
    fn test_recovers_integer_shift() {
        let a = synthetic("a", 0.0);
        let b = synthetic("b", 2.0);
        let fixed = compare(&a, &b, 4.0, MetricKind::Pendry, false).unwrap();
        let best = compare(&a, &b, 4.0, MetricKind::Pendry, true).unwrap();
        let shift = best.summary.shift.unwrap();
        assert!((shift - 2.0).abs() < STEP, "shift = {}", shift);
        assert!(best.summary.r_factor <= fixed.summary.r_factor);
    }

    #[test]
    fn test_recovers_negative_fractional_shift() {
        let a = synthetic("a", 0.0);
        let b = synthetic("b", -1.3);
        let fixed = compare(&a, &b, 4.0, MetricKind::Pendry, false).unwrap();
        let best = compare(&a, &b, 4.0, MetricKind::Pendry, true).unwrap();
        let shift = best.summary.shift.unwrap();
        assert!((shift + 1.3).abs() < STEP, "shift = {}", shift);
        assert!(best.summary.r_factor <= fixed.summary.r_factor);
    }

    #[test]
    fn test_overlap_taken_from_best_integer_shift() {
        let a = synthetic("a", 0.0);
        let b = synthetic("b", 1.5);
        let best = compare(&a, &b, 4.0, MetricKind::Pendry, true).unwrap();
        // 1.5 eV = 3 步，每束少 3 个重叠点
        for beam in &best.beams {
            assert_eq!(beam.row.overlap, (401.0 - 3.0) * STEP);
        }
    }

    #[test]
    fn test_refined_ratios_have_unit_weighted_mean() {
        let a = synthetic("a", 0.0);
        let b = synthetic("b", 1.3);
        // 各束强度比例不同，定义区间也不同，使各束重叠不等
        let scales = [1.0, 3.0, 0.2];
        let ranges = [(0, 401), (40, 380), (90, 300)];
        let beams = b
            .beams
            .iter()
            .zip(scales.iter().zip(ranges.iter()))
            .map(|(beam, (&scale, &(lo, hi)))| {
                let samples = beam
                    .curve
                    .samples()
                    .iter()
                    .enumerate()
                    .map(|(i, v)| if (lo..hi).contains(&i) { v.map(|y| y * scale) } else { None })
                    .collect();
                Beam::new(beam.id, beam.name.clone(), Curve::new(samples))
            })
            .collect();
        let b = Dataset::new("b", b.energies.clone(), beams);

        let c = compare(&a, &b, 4.0, MetricKind::Pendry, true).unwrap();
        assert!(c.summary.shift.is_some());
        let overlaps: Vec<f64> = c.beams.iter().map(|b| b.row.overlap).collect();
        assert!(overlaps[0] != overlaps[1] && overlaps[1] != overlaps[2]);

        let total: f64 = overlaps.iter().sum();
        let weighted: f64 = c
            .beams
            .iter()
            .map(|b| b.row.ratio * b.row.overlap)
            .sum::<f64>()
            / total;
        assert!((weighted - 1.0).abs() < 1e-12, "weighted mean = {}", weighted);
        assert_eq!(c.summary.ratio, 1.0);
    }

    #[test]
    fn test_minimum_outside_bound_fails() {
        let a = synthetic("a", 0.0);
        let b = synthetic("b", 3.0);
        // V0i = 1 eV -> 最多 4 步 = 2 eV
        let err = compare(&a, &b, 1.0, MetricKind::Pendry, true).unwrap_err();
        assert!(matches!(err, IvError::NoMinimumFound { max_shift: 4 }));
    }

    #[test]
    fn test_invalid_v0i_rejected() {
        let a = synthetic("a", 0.0);
        assert!(matches!(
            compare(&a, &a, 0.0, MetricKind::Pendry, true).unwrap_err(),
            IvError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_parabola_vertex() {
        // R(x) = (x - 0.3)^2
        let dx = parabola_vertex(1.69, 0.09, 0.49);
        assert!((dx - 0.3).abs() < 1e-12);
        // 曲率为零或为负时不细化
        assert_eq!(parabola_vertex(1.0, 1.0, 1.0), 0.0);
        assert_eq!(parabola_vertex(0.0, 1.0, 0.0), 0.0);
        assert_eq!(parabola_vertex(f64::NAN, 1.0, 2.0), 0.0);
    }

    #[test]
    fn test_max_shift_bound() {
        assert_eq!(max_shift(4.0, 0.5), 16);
        assert_eq!(max_shift(0.1, 0.5), 1);
    }
}
