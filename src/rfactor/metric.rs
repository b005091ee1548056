//! # 单束 R 因子
//!
//! 对一对曲线在给定整数位移下计算 R 因子、重叠点数和强度比。
//!
//! ## 支持的 R 因子
//! - Pendry: 基于 Y 函数 `Y = I·I' / (I² + V0i²·I'²)`，对强度缩放不敏感
//! - R2: 归一化均方差 `Σ(I_a − c·I_b)² / ΣI_a²`，`c = ΣI_a / ΣI_b`
//!
//! 位移 `shift` 表示比较 `a[i]` 与 `b[i + shift]`。
//!
//! ## 参考
//! - J. B. Pendry, J. Phys. C 13, 937 (1980)
//!
//! ## 依赖关系
//! - 被 `rfactor/aggregate.rs` 调用
//! - 使用 `models/curve.rs`

use crate::models::Curve;

use clap::ValueEnum;

/// R 因子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MetricKind {
    /// Pendry R-factor (log-derivative based)
    #[default]
    Pendry,
    /// Normalized mean-square deviation
    R2,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Pendry => write!(f, "R_Pendry"),
            MetricKind::R2 => write!(f, "R2"),
        }
    }
}

/// 单束（或汇总）比较结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRow {
    /// R 因子
    pub r_factor: f64,
    /// 重叠范围：单束计算时为点数，汇总后为能量跨度 (eV)
    pub overlap: f64,
    /// 强度比 ΣI_a / ΣI_b
    pub ratio: f64,
}

impl MetricRow {
    /// 无重叠时的结果
    pub fn undefined() -> Self {
        MetricRow {
            r_factor: f64::NAN,
            overlap: 0.0,
            ratio: f64::NAN,
        }
    }

    /// 过 (-1, minus), (0, zero), (1, plus) 三点的抛物线在 dx 处的值；重叠取 zero 的
    pub fn interpolate(minus: &MetricRow, zero: &MetricRow, plus: &MetricRow, dx: f64) -> Self {
        MetricRow {
            r_factor: quadratic(minus.r_factor, zero.r_factor, plus.r_factor, dx),
            overlap: zero.overlap,
            ratio: quadratic(minus.ratio, zero.ratio, plus.ratio, dx),
        }
    }
}

fn quadratic(minus: f64, zero: f64, plus: f64, dx: f64) -> f64 {
    if dx == 0.0 {
        return zero;
    }
    let b = 0.5 * (plus - minus);
    let c = 0.5 * (plus + minus) - zero;
    zero + b * dx + c * dx * dx
}

impl MetricKind {
    /// 计算一对曲线在位移 `shift`（网格步数）下的结果
    ///
    /// `v0i_over_step` 是以网格步长为单位的虚部光学势，仅 Pendry 使用。
    pub fn evaluate(self, a: &Curve, b: &Curve, shift: i64, v0i_over_step: f64) -> MetricRow {
        match self {
            MetricKind::Pendry => pendry(a, b, shift, v0i_over_step),
            MetricKind::R2 => r2(a, b, shift),
        }
    }
}

/// 位移后两条曲线下标对 (i, j = i + shift)
fn index_pairs(len_a: usize, len_b: usize, shift: i64) -> impl Iterator<Item = (usize, usize)> {
    (0..len_a).filter_map(move |i| {
        let j = i as i64 + shift;
        if j >= 0 && (j as usize) < len_b {
            Some((i, j as usize))
        } else {
            None
        }
    })
}

fn pendry(a: &Curve, b: &Curve, shift: i64, v: f64) -> MetricRow {
    let ya = y_function(a, v);
    let yb = y_function(b, v);

    let mut num = 0.0;
    let mut den = 0.0;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    let mut n = 0usize;

    for (i, j) in index_pairs(a.len(), b.len(), shift) {
        if let (Some(y1), Some(y2)) = (ya[i], yb[j]) {
            num += (y1 - y2) * (y1 - y2);
            den += y1 * y1 + y2 * y2;
            sum_a += a.get(i).unwrap_or(0.0);
            sum_b += b.get(j).unwrap_or(0.0);
            n += 1;
        }
    }

    if n == 0 {
        return MetricRow::undefined();
    }

    MetricRow {
        r_factor: if den > 0.0 { num / den } else { 0.0 },
        overlap: n as f64,
        ratio: ratio(sum_a, sum_b),
    }
}

/// Pendry Y 函数；导数在已定义段内部用中心差分，段端点用单侧差分
fn y_function(curve: &Curve, v: f64) -> Vec<Option<f64>> {
    let v2 = v * v;
    (0..curve.len())
        .map(|i| {
            let intensity = curve.get(i)?;
            let prev = i.checked_sub(1).and_then(|k| curve.get(k));
            let next = curve.get(i + 1);
            let derivative = match (prev, next) {
                (Some(p), Some(n)) => 0.5 * (n - p),
                (None, Some(n)) => n - intensity,
                (Some(p), None) => intensity - p,
                (None, None) => return None,
            };
            let denom = intensity * intensity + v2 * derivative * derivative;
            Some(if denom > 0.0 {
                intensity * derivative / denom
            } else {
                0.0
            })
        })
        .collect()
}

fn r2(a: &Curve, b: &Curve, shift: i64) -> MetricRow {
    let pairs: Vec<(f64, f64)> = index_pairs(a.len(), b.len(), shift)
        .filter_map(|(i, j)| Some((a.get(i)?, b.get(j)?)))
        .collect();

    if pairs.is_empty() {
        return MetricRow::undefined();
    }

    let sum_a: f64 = pairs.iter().map(|(x, _)| x).sum();
    let sum_b: f64 = pairs.iter().map(|(_, y)| y).sum();
    let c = sum_a / sum_b;

    let num: f64 = pairs.iter().map(|(x, y)| (x - c * y) * (x - c * y)).sum();
    let den: f64 = pairs.iter().map(|(x, _)| x * x).sum();

    MetricRow {
        r_factor: if den > 0.0 { num / den } else { 0.0 },
        overlap: pairs.len() as f64,
        ratio: ratio(sum_a, sum_b),
    }
}

fn ratio(sum_a: f64, sum_b: f64) -> f64 {
    if sum_b != 0.0 {
        sum_a / sum_b
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks(n: usize, offset: f64) -> Curve {
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let x = i as f64 - offset;
                1.0 + 5.0 * (-(x - 30.0).powi(2) / 40.0).exp() + 3.0 * (-(x - 70.0).powi(2) / 60.0).exp()
            })
            .collect();
        Curve::from_values(&values)
    }

    #[test]
    fn test_identical_curves_have_zero_r() {
        let c = peaks(100, 0.0);
        for kind in [MetricKind::Pendry, MetricKind::R2] {
            let row = kind.evaluate(&c, &c, 0, 8.0);
            assert!(row.r_factor.abs() < 1e-12, "{} = {}", kind, row.r_factor);
            assert_eq!(row.overlap, 100.0);
            assert!((row.ratio - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_pendry_is_scale_invariant() {
        let a = peaks(100, 0.0);
        let b = Curve::new(a.samples().iter().map(|s| s.map(|v| 2.0 * v)).collect());
        let row = MetricKind::Pendry.evaluate(&a, &b, 0, 8.0);
        assert!(row.r_factor.abs() < 1e-12);
        assert!((row.ratio - 0.5).abs() < 1e-12);

        let r2 = MetricKind::R2.evaluate(&a, &b, 0, 8.0);
        assert!(r2.r_factor.abs() < 1e-12);
    }

    #[test]
    fn test_matching_shift_lowers_r() {
        let a = peaks(120, 0.0);
        let b = peaks(120, 3.0);
        let unshifted = MetricKind::Pendry.evaluate(&a, &b, 0, 8.0);
        let shifted = MetricKind::Pendry.evaluate(&a, &b, 3, 8.0);
        assert_eq!(shifted.overlap, 117.0);
        assert!(shifted.r_factor < 0.1 * unshifted.r_factor);
    }

    #[test]
    fn test_no_overlap_is_undefined() {
        let a = Curve::new(vec![Some(1.0), Some(2.0), Some(3.0), None, None, None]);
        let b = Curve::new(vec![None, None, None, Some(1.0), Some(2.0), Some(3.0)]);
        let row = MetricKind::Pendry.evaluate(&a, &b, 0, 4.0);
        assert_eq!(row.overlap, 0.0);
        assert!(row.r_factor.is_nan());
        // 位移后重叠
        let row = MetricKind::Pendry.evaluate(&a, &b, 3, 4.0);
        assert_eq!(row.overlap, 3.0);
        assert!(row.r_factor.abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_keeps_overlap_of_center() {
        let minus = MetricRow { r_factor: 0.5, overlap: 10.0, ratio: 1.0 };
        let zero = MetricRow { r_factor: 0.2, overlap: 12.0, ratio: 1.0 };
        let plus = MetricRow { r_factor: 0.3, overlap: 11.0, ratio: 1.0 };
        let row = MetricRow::interpolate(&minus, &zero, &plus, 0.25);
        assert_eq!(row.overlap, 12.0);
        // 0.2 + (-0.1)*0.25 + 0.2*0.0625
        assert!((row.r_factor - 0.1875).abs() < 1e-12);
        assert!((row.ratio - 1.0).abs() < 1e-12);
    }
}
