//! # 对称等价束平均
//!
//! 将同一对称群中的束流合并为一条平均曲线。
//!
//! ## 算法（最佳重叠累积）
//! 1. 按对称群划分，单成员群不处理
//! 2. 丢弃已定义点少于 3 个的曲线
//! 3. 已定义点最多的曲线作为种子（并列取先出现者）
//! 4. 反复选出与当前平均重叠最多的候选曲线加入；
//!    最佳重叠不足种子已定义点数的一半时停止
//! 5. 逐点求和并按贡献数相除；结果不超出种子曲线的能量范围
//!
//! ## 依赖关系
//! - 被 `rfactor/pipeline.rs` 调用
//! - 使用 `models/curve.rs`, `models/spots.rs`

use crate::models::{Beam, Curve, Dataset, SpotPattern, SymmetryGroup};

use std::collections::{HashMap, HashSet};

/// 参与平均所需的最少已定义点数
const MIN_DEFINED: usize = 3;

/// 对数据集中每个对称群做平均，返回新数据集
///
/// 平均后的束流使用该群在图样中的第一个编号和规范名称，
/// 放在群内第一个成员原来的位置；其余成员被移除。
pub fn average_symmetric(dataset: &Dataset, spots: &SpotPattern) -> Dataset {
    // 群编号 -> 成员在数据集中的下标（保持出现顺序）
    let mut order: Vec<u32> = Vec::new();
    let mut members: HashMap<u32, Vec<usize>> = HashMap::new();
    for (i, beam) in dataset.beams.iter().enumerate() {
        if let SymmetryGroup::Member(g) = spots.group(beam.id) {
            let list = members.entry(g).or_default();
            if list.is_empty() {
                order.push(g);
            }
            list.push(i);
        }
    }

    let mut replacement: HashMap<usize, Option<Beam>> = HashMap::new();
    let mut removed: HashSet<usize> = HashSet::new();

    for g in order {
        let indices = &members[&g];
        if indices.len() < 2 {
            continue;
        }

        let curves: Vec<&Curve> = indices.iter().map(|&i| &dataset.beams[i].curve).collect();
        let id = spots
            .first_in_group(g)
            .unwrap_or(dataset.beams[indices[0]].id);

        let averaged = average_curves(&curves);
        if averaged.is_none() {
            log::warn!(
                "'{}': symmetry group {} has no curve with at least {} points, dropped",
                dataset.title,
                g,
                MIN_DEFINED
            );
        }

        replacement.insert(
            indices[0],
            averaged.map(|curve| Beam::new(id, spots.name(id), curve)),
        );
        removed.extend(indices[1..].iter().copied());
    }

    let beams = dataset
        .beams
        .iter()
        .enumerate()
        .filter(|(i, _)| !removed.contains(i))
        .filter_map(|(i, beam)| match replacement.remove(&i) {
            Some(averaged) => averaged,
            None => Some(beam.clone()),
        })
        .collect();

    dataset.with_beams(beams)
}

/// 平均一组对称等价曲线；没有可用曲线时返回 `None`
pub fn average_curves(curves: &[&Curve]) -> Option<Curve> {
    let mut candidates: Vec<&Curve> = curves
        .iter()
        .copied()
        .filter(|c| c.defined_count() >= MIN_DEFINED)
        .collect();

    if candidates.is_empty() {
        return None;
    }

    let mut seed_index = 0;
    for (k, c) in candidates.iter().enumerate().skip(1) {
        if c.defined_count() > candidates[seed_index].defined_count() {
            seed_index = k;
        }
    }
    let seed = candidates.remove(seed_index);
    let seed_defined = seed.defined_count();
    let (span_start, span_end) = seed.defined_span()?;

    let len = seed.len();
    let mut sum = vec![0.0_f64; len];
    let mut count = vec![0_u32; len];
    accumulate(seed, &mut sum, &mut count);
    let mut accepted = 1;

    loop {
        let mut best: Option<(usize, usize)> = None;
        for (k, c) in candidates.iter().enumerate() {
            let overlap = overlap_with_running(&count, c);
            if best.map_or(true, |(_, o)| overlap > o) {
                best = Some((k, overlap));
            }
        }

        let Some((k, overlap)) = best else { break };
        // 重叠过短的曲线会把可用范围缩小一半以上
        if (overlap as f64) < 0.5 * seed_defined as f64 {
            break;
        }
        let curve = candidates.remove(k);
        accumulate(curve, &mut sum, &mut count);
        accepted += 1;
    }

    log::debug!(
        "Averaged {} of {} symmetry-equivalent curves",
        accepted,
        curves.len()
    );

    if accepted == 1 {
        return Some(seed.clone());
    }

    let samples = (0..len)
        .map(|i| {
            if i >= span_start && i <= span_end && count[i] > 0 {
                Some(sum[i] / count[i] as f64)
            } else {
                None
            }
        })
        .collect();
    Some(Curve::new(samples))
}

fn accumulate(curve: &Curve, sum: &mut [f64], count: &mut [u32]) {
    for (i, s) in curve.samples().iter().enumerate().take(sum.len()) {
        if let Some(v) = s {
            sum[i] += v;
            count[i] += 1;
        }
    }
}

fn overlap_with_running(count: &[u32], curve: &Curve) -> usize {
    count
        .iter()
        .zip(curve.samples().iter())
        .filter(|(n, s)| **n > 0 && s.is_some())
        .count()
}
