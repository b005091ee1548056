//! # I(V) 曲线数据模型
//!
//! 定义能量网格、单条束流曲线和数据集。
//!
//! 未定义的采样点（该能量没有测量值）用 `None` 表示，绝不当作 0 处理。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `rfactor/` 使用
//! - 使用 `error.rs`

use crate::error::{IvError, Result};

/// 均匀能量网格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyGrid {
    /// 第一个能量点 (eV)
    pub first: f64,
    /// 步长 (eV)，恒为正
    pub step: f64,
    /// 点数
    pub count: usize,
}

impl EnergyGrid {
    pub fn new(first: f64, step: f64, count: usize) -> Self {
        EnergyGrid { first, step, count }
    }

    /// 从原始能量轴提取网格参数
    ///
    /// 能量必须升序且等间距：每个点与 `first + i·step` 的偏差不超过步长的 1%。
    pub fn from_energies(energies: &[f64], dataset: &str) -> Result<Self> {
        let irregular = |reason: String| IvError::IrregularGrid {
            dataset: dataset.to_string(),
            reason,
        };

        if energies.len() < 2 {
            return Err(irregular(format!(
                "need at least two energies, found {}",
                energies.len()
            )));
        }

        let n = energies.len();
        let first = energies[0];
        let step = (energies[n - 1] - first) / (n - 1) as f64;

        if !step.is_finite() || step <= 0.0 {
            return Err(irregular(format!("non-positive step {}", step)));
        }

        let tolerance = 0.01 * step;
        for (i, &e) in energies.iter().enumerate() {
            let expected = first + i as f64 * step;
            if !e.is_finite() || (e - expected).abs() > tolerance {
                return Err(irregular(format!(
                    "energy #{} is {} but {:.4} was expected",
                    i, e, expected
                )));
            }
        }

        Ok(EnergyGrid { first, step, count: n })
    }

    /// 覆盖 [first, last] 的网格，所有点落在 `anchor + k·step` 上
    ///
    /// 起点为其中不小于 first 的最小者，保证不同来源的网格互相对齐。
    pub fn commensurate(first: f64, last: f64, step: f64, anchor: f64) -> Self {
        let eps = 1e-6;
        let start = anchor + ((first - anchor) / step - eps).ceil() * step;
        let count = if last + eps * step >= start {
            ((last - start) / step + eps).floor() as usize + 1
        } else {
            0
        };
        EnergyGrid::new(start, step, count)
    }

    /// 第 i 个能量点
    pub fn energy(&self, i: usize) -> f64 {
        self.first + i as f64 * self.step
    }

    /// 最后一个能量点
    pub fn last(&self) -> f64 {
        self.energy(self.count.saturating_sub(1))
    }

    /// 展开为能量数组
    pub fn energies(&self) -> Vec<f64> {
        (0..self.count).map(|i| self.energy(i)).collect()
    }
}

/// 单条 I(V) 曲线，采样点与所属数据集的能量轴一一对应
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    samples: Vec<Option<f64>>,
}

impl Curve {
    pub fn new(samples: Vec<Option<f64>>) -> Self {
        Curve { samples }
    }

    /// 全部定义的曲线
    #[cfg(test)]
    pub fn from_values(values: &[f64]) -> Self {
        Curve::new(values.iter().map(|&v| Some(v)).collect())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[Option<f64>] {
        &self.samples
    }

    /// 第 i 个采样点（越界视为未定义）
    pub fn get(&self, i: usize) -> Option<f64> {
        self.samples.get(i).copied().flatten()
    }

    /// 已定义采样点数
    pub fn defined_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_some()).count()
    }

    /// 至少含一个已定义采样点
    pub fn has_data(&self) -> bool {
        self.samples.iter().any(|s| s.is_some())
    }

    /// 第一个与最后一个已定义采样点的下标
    pub fn defined_span(&self) -> Option<(usize, usize)> {
        let start = self.samples.iter().position(|s| s.is_some())?;
        let end = self.samples.iter().rposition(|s| s.is_some())?;
        Some((start, end))
    }

    /// 只保留满足条件的下标，其余置为未定义
    pub fn restricted<F>(&self, keep: F) -> Curve
    where
        F: Fn(usize) -> bool,
    {
        Curve::new(
            self.samples
                .iter()
                .enumerate()
                .map(|(i, s)| if keep(i) { *s } else { None })
                .collect(),
        )
    }
}

/// 一束衍射束：束流编号（SpotPattern 中的下标）、名称与曲线
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    pub id: usize,
    pub name: String,
    pub curve: Curve,
}

impl Beam {
    pub fn new(id: usize, name: impl Into<String>, curve: Curve) -> Self {
        Beam {
            id,
            name: name.into(),
            curve,
        }
    }
}

/// 数据集：标题、原始能量轴和有序的束流列表
///
/// 所有曲线共享同一能量轴。
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub title: String,
    pub energies: Vec<f64>,
    pub beams: Vec<Beam>,
}

impl Dataset {
    pub fn new(title: impl Into<String>, energies: Vec<f64>, beams: Vec<Beam>) -> Self {
        Dataset {
            title: title.into(),
            energies,
            beams,
        }
    }

    /// 提取并校验能量网格
    pub fn grid(&self) -> Result<EnergyGrid> {
        EnergyGrid::from_energies(&self.energies, &self.title)
    }

    /// 束流编号序列
    pub fn beam_ids(&self) -> Vec<usize> {
        self.beams.iter().map(|b| b.id).collect()
    }

    /// 替换束流列表，保留标题与能量轴
    pub fn with_beams(&self, beams: Vec<Beam>) -> Dataset {
        Dataset::new(self.title.clone(), self.energies.clone(), beams)
    }

    /// 将 [e_min, e_max] 之外的采样点置为未定义
    pub fn restrict_energy(&self, e_min: f64, e_max: f64) -> Dataset {
        let energies = &self.energies;
        let beams = self
            .beams
            .iter()
            .map(|b| {
                let curve = b.curve.restricted(|i| {
                    energies
                        .get(i)
                        .map(|&e| e >= e_min && e <= e_max)
                        .unwrap_or(false)
                });
                Beam::new(b.id, b.name.clone(), curve)
            })
            .collect();
        self.with_beams(beams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_from_uniform_energies() {
        let energies: Vec<f64> = (0..11).map(|i| 50.0 + 0.5 * i as f64).collect();
        let grid = EnergyGrid::from_energies(&energies, "exp").unwrap();
        assert_eq!(grid.count, 11);
        assert!((grid.first - 50.0).abs() < 1e-12);
        assert!((grid.step - 0.5).abs() < 1e-12);
        assert!((grid.last() - 55.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_rejects_irregular_spacing() {
        let energies = vec![10.0, 11.0, 12.5, 13.0];
        let err = EnergyGrid::from_energies(&energies, "exp").unwrap_err();
        assert!(matches!(err, IvError::IrregularGrid { .. }));
    }

    #[test]
    fn test_grid_rejects_descending_and_short_axes() {
        assert!(EnergyGrid::from_energies(&[5.0, 4.0, 3.0], "a").is_err());
        assert!(EnergyGrid::from_energies(&[5.0], "a").is_err());
        assert!(EnergyGrid::from_energies(&[5.0, 5.0, 5.0], "a").is_err());
    }

    #[test]
    fn test_commensurate_grid_alignment() {
        let grid = EnergyGrid::commensurate(50.2, 60.0, 0.5, 0.0);
        assert!((grid.first - 50.5).abs() < 1e-9);
        assert!((grid.last() - 60.0).abs() < 1e-9);
        assert_eq!(grid.count, 20);

        let exact = EnergyGrid::commensurate(50.0, 51.0, 0.5, 0.0);
        assert!((exact.first - 50.0).abs() < 1e-9);
        assert_eq!(exact.count, 3);

        // 锚定到另一网格 50.1 + k·0.3
        let anchored = EnergyGrid::commensurate(50.0, 53.0, 0.3, 50.1);
        assert!((anchored.first - 50.1).abs() < 1e-9);
        assert_eq!(anchored.count, 10);
    }

    #[test]
    fn test_curve_defined_span() {
        let a = Curve::new(vec![None, Some(1.0), Some(2.0), Some(3.0), None]);
        assert_eq!(a.defined_count(), 3);
        assert_eq!(a.defined_span(), Some((1, 3)));
        assert_eq!(Curve::new(vec![None, None]).defined_span(), None);
        assert!(!Curve::new(vec![None]).has_data());
    }

    #[test]
    fn test_restrict_energy_marks_outside_undefined() {
        let ds = Dataset::new(
            "exp",
            vec![1.0, 2.0, 3.0, 4.0],
            vec![Beam::new(0, "(1|0)", Curve::from_values(&[1.0, 2.0, 3.0, 4.0]))],
        );
        let restricted = ds.restrict_energy(2.0, 3.0);
        assert_eq!(
            restricted.beams[0].curve.samples(),
            &[None, Some(2.0), Some(3.0), None]
        );
        // 原数据集不变
        assert_eq!(ds.beams[0].curve.defined_count(), 4);
    }
}
