//! # 能量网格统一
//!
//! 将两个数据集放到同一步长的均匀能量网格上，供 R 因子计算使用。
//!
//! ## 算法
//! 1. 从两个数据集的能量轴提取 (first, step)，不均匀则报 `IrregularGrid`
//! 2. 目标步长 = min(step_a, step_b, max_step)
//! 3. 步长与目标不同的数据集线性插值到目标网格，相同的原样返回
//! 4. 新网格与保持不变的那个数据集的网格对齐；两个都要重采样时对齐到步长的整数倍
//!
//! ## 依赖关系
//! - 被 `rfactor/pipeline.rs` 调用
//! - 使用 `models/curve.rs`

use crate::error::Result;
use crate::models::{Beam, Curve, Dataset, EnergyGrid};

/// 默认最大比较步长 (eV)
pub const DEFAULT_MAX_STEP: f64 = 0.5;

/// 步长相对容差，低于此值视为同一步长
const STEP_TOLERANCE: f64 = 1e-3;

/// 统一两个数据集的能量网格
pub fn align_grids(a: &Dataset, b: &Dataset, max_step: f64) -> Result<(Dataset, Dataset)> {
    let grid_a = a.grid()?;
    let grid_b = b.grid()?;

    let target = grid_a.step.min(grid_b.step).min(max_step);

    let anchor = if same_step(&grid_a, target) {
        grid_a.first
    } else if same_step(&grid_b, target) {
        grid_b.first
    } else {
        0.0
    };

    let a = resample_if_needed(a, &grid_a, target, anchor);
    let b = resample_if_needed(b, &grid_b, target, anchor);
    Ok((a, b))
}

fn same_step(grid: &EnergyGrid, target: f64) -> bool {
    (grid.step - target).abs() <= STEP_TOLERANCE * target
}

fn resample_if_needed(dataset: &Dataset, grid: &EnergyGrid, target: f64, anchor: f64) -> Dataset {
    if same_step(grid, target) {
        return dataset.clone();
    }

    let new_grid = EnergyGrid::commensurate(grid.first, grid.last(), target, anchor);
    log::debug!(
        "Resampling '{}' from step {:.4} to {:.4} ({} points)",
        dataset.title,
        grid.step,
        target,
        new_grid.count
    );

    let beams = dataset
        .beams
        .iter()
        .map(|b| Beam::new(b.id, b.name.clone(), resample(&b.curve, grid, &new_grid)))
        .collect();

    Dataset::new(dataset.title.clone(), new_grid.energies(), beams)
}

/// 线性插值重采样
///
/// 目标点两侧的源点都有定义时线性插值；与有定义的源点重合时直接取值；否则未定义。
pub fn resample(curve: &Curve, from: &EnergyGrid, to: &EnergyGrid) -> Curve {
    let eps = 1e-6;
    let samples = (0..to.count)
        .map(|j| {
            let x = (to.energy(j) - from.first) / from.step;
            if x < -eps || x > (from.count as f64 - 1.0) + eps {
                return None;
            }
            let nearest = x.round();
            if (x - nearest).abs() <= eps {
                return curve.get(nearest.max(0.0) as usize);
            }
            let i = x.floor() as usize;
            let t = x - i as f64;
            match (curve.get(i), curve.get(i + 1)) {
                (Some(y0), Some(y1)) => Some(y0 + t * (y1 - y0)),
                _ => None,
            }
        })
        .collect();
    Curve::new(samples)
}
