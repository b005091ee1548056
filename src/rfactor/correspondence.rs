//! # 束流对应
//!
//! 找出两个数据集共有的束流，丢弃其余，并按规范顺序排列、重新命名。
//!
//! ## 规则
//! - 分组模式：两个数据集中每个对称群都最多只有一束，且图样含对称群信息时，
//!   束流先映射到其所属群的第一个编号，按群而非具体斑点匹配
//! - 只有在两个数据集中都存在且有数据的束流保留
//! - 结果按编号升序排列，名称取自斑点图样
//!
//! ## 依赖关系
//! - 被 `rfactor/pipeline.rs` 调用
//! - 使用 `models/curve.rs`, `models/spots.rs`

use crate::error::{IvError, Result};
use crate::models::{Beam, Dataset, SpotPattern, SymmetryGroup};

use std::collections::{HashMap, HashSet};

/// 构建两个数据集的束流对应关系
pub fn build_correspondence(
    a: &Dataset,
    b: &Dataset,
    spots: &SpotPattern,
) -> Result<(Dataset, Dataset)> {
    let group_mode =
        spots.has_groups() && one_beam_per_group(a, spots) && one_beam_per_group(b, spots);
    if group_mode {
        log::debug!("Matching beams by symmetry group");
    }

    let beams_a = present_beams(a, spots, group_mode);
    let beams_b = present_beams(b, spots, group_mode);

    let ids_a: HashSet<usize> = beams_a.iter().map(|b| b.id).collect();
    let ids_b: HashSet<usize> = beams_b.iter().map(|b| b.id).collect();

    let kept_a = common_sorted(beams_a, &ids_b, spots);
    let kept_b = common_sorted(beams_b, &ids_a, spots);

    if kept_a.is_empty() {
        return Err(IvError::NoCommonBeams);
    }

    let seq_a: Vec<usize> = kept_a.iter().map(|b| b.id).collect();
    let seq_b: Vec<usize> = kept_b.iter().map(|b| b.id).collect();
    if seq_a != seq_b {
        return Err(IvError::InternalInconsistency(format!(
            "beam sequences differ after matching: {:?} vs {:?}",
            seq_a, seq_b
        )));
    }

    Ok((a.with_beams(kept_a), b.with_beams(kept_b)))
}

/// 每个对称群至多一束
fn one_beam_per_group(dataset: &Dataset, spots: &SpotPattern) -> bool {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for beam in &dataset.beams {
        if let SymmetryGroup::Member(g) = spots.group(beam.id) {
            *counts.entry(g).or_default() += 1;
        }
    }
    counts.values().all(|&n| n <= 1)
}

/// 有数据的束流（分组模式下编号换成群代表）；重复编号保留第一个
fn present_beams(dataset: &Dataset, spots: &SpotPattern, group_mode: bool) -> Vec<Beam> {
    let mut seen = HashSet::new();
    dataset
        .beams
        .iter()
        .filter(|b| b.curve.has_data())
        .filter_map(|b| {
            let id = if group_mode {
                representative(b.id, spots)
            } else {
                b.id
            };
            if seen.insert(id) {
                Some(Beam::new(id, b.name.clone(), b.curve.clone()))
            } else {
                None
            }
        })
        .collect()
}

fn representative(id: usize, spots: &SpotPattern) -> usize {
    match spots.group(id) {
        SymmetryGroup::Member(g) => spots.first_in_group(g).unwrap_or(id),
        _ => id,
    }
}

fn common_sorted(beams: Vec<Beam>, other: &HashSet<usize>, spots: &SpotPattern) -> Vec<Beam> {
    let mut kept: Vec<Beam> = beams
        .into_iter()
        .filter(|b| other.contains(&b.id))
        .map(|mut b| {
            if let Some(spot) = spots.spot(b.id) {
                b.name = spot.name.clone();
            }
            b
        })
        .collect();
    kept.sort_by_key(|b| b.id);
    kept
}
