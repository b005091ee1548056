//! # 比较结果导出
//!
//! 导出逐束结果和批量排名到 CSV。
//!
//! ## 格式
//! - 比较结果：`beam, name, r_factor, overlap_ev, ratio`，最后一行 `beam = all` 为汇总，
//!   附 `shift_ev` 列（无位移优化时为空）
//! - 排名：`rank, file, r_factor, overlap_ev, shift_ev, beams`
//!
//! 未定义的数值写为空字符串。
//!
//! ## 依赖关系
//! - 被 `commands/compare.rs`, `commands/rank.rs` 调用
//! - 使用 `rfactor/aggregate.rs` 的 Comparison 结构
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{IvError, Result};
use crate::rfactor::aggregate::Comparison;

use std::path::Path;

/// 批量排名中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub file: String,
    pub r_factor: f64,
    pub overlap: f64,
    pub shift: Option<f64>,
    pub beams: usize,
}

fn number(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", precision, value)
    } else {
        String::new()
    }
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map(|v| number(v, precision)).unwrap_or_default()
}

/// 导出比较结果为 CSV 格式
pub fn comparison_to_csv(comparison: &Comparison, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["beam", "name", "r_factor", "overlap_ev", "ratio", "shift_ev"])?;

    for beam in &comparison.beams {
        wtr.write_record([
            beam.id.to_string(),
            beam.name.clone(),
            number(beam.row.r_factor, 5),
            number(beam.row.overlap, 2),
            number(beam.row.ratio, 4),
            String::new(),
        ])?;
    }

    let s = &comparison.summary;
    wtr.write_record([
        "all".to_string(),
        String::new(),
        number(s.r_factor, 5),
        number(s.overlap, 2),
        number(s.ratio, 4),
        optional(s.shift, 3),
    ])?;

    wtr.flush().map_err(|e| IvError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 导出排名为 CSV 格式（调用者负责排序）
pub fn ranking_to_csv(rows: &[RankingRow], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["rank", "file", "r_factor", "overlap_ev", "shift_ev", "beams"])?;

    for (i, row) in rows.iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            row.file.clone(),
            number(row.r_factor, 5),
            number(row.overlap, 2),
            optional(row.shift, 3),
            row.beams.to_string(),
        ])?;
    }

    wtr.flush().map_err(|e| IvError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}
