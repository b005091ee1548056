//! # compare 子命令 CLI 定义
//!
//! 同时定义 `compare` 与 `rank` 共用的比较参数 `ComparisonOptions`。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`, `cli/rank.rs` 使用
//! - 参数传递给 `commands/compare.rs`

use crate::error::{IvError, Result};
use crate::rfactor::grid::DEFAULT_MAX_STEP;
use crate::rfactor::{MetricKind, RFactorConfig};

use clap::Args;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 共用比较参数
// ─────────────────────────────────────────────────────────────

/// R 因子比较参数
#[derive(Args, Debug, Clone)]
pub struct ComparisonOptions {
    /// Spot pattern CSV (name,group,superstructure); inferred from beam names if omitted
    #[arg(short, long)]
    pub spots: Option<PathBuf>,

    /// Imaginary part of the inner potential V0i (eV)
    #[arg(long, default_value_t = 4.0)]
    pub v0i: f64,

    /// Maximum energy step used for the comparison (eV)
    #[arg(long, default_value_t = DEFAULT_MAX_STEP)]
    pub max_step: f64,

    /// R-factor to compute
    #[arg(short, long, value_enum, default_value = "pendry")]
    pub metric: MetricKind,

    /// Do not optimize the energy shift between the datasets
    #[arg(long, default_value_t = false)]
    pub no_shift: bool,

    /// Do not average symmetry-equivalent beams
    #[arg(long, default_value_t = false)]
    pub no_average: bool,

    /// Energy range to compare in eV (e.g., '50-400')
    #[arg(short, long)]
    pub range: Option<String>,
}

impl ComparisonOptions {
    /// 转换为显式的比较配置
    pub fn to_config(&self) -> Result<RFactorConfig> {
        let energy_range = self.range.as_deref().map(parse_energy_range).transpose()?;
        let config = RFactorConfig {
            v0i: self.v0i,
            max_step: self.max_step,
            metric: self.metric,
            allow_shift: !self.no_shift,
            average_symmetric: !self.no_average,
            energy_range,
        };
        config.validate()?;
        Ok(config)
    }
}

/// 解析能量范围 "min-max"
pub fn parse_energy_range(range: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = range.split('-').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(IvError::InvalidRange(range.to_string()));
    }

    let min: f64 = parts[0]
        .parse()
        .map_err(|_| IvError::InvalidRange(range.to_string()))?;
    let max: f64 = parts[1]
        .parse()
        .map_err(|_| IvError::InvalidRange(range.to_string()))?;

    if min < 0.0 || max <= min {
        return Err(IvError::InvalidRange(format!(
            "{} (must be 0 <= min < max)",
            range
        )));
    }

    Ok((min, max))
}

// ─────────────────────────────────────────────────────────────
// compare 子命令
// ─────────────────────────────────────────────────────────────

/// compare 子命令参数
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Reference I(V) CSV (usually the experiment)
    pub reference: PathBuf,

    /// Candidate I(V) CSV (usually the calculation)
    pub candidate: PathBuf,

    #[command(flatten)]
    pub options: ComparisonOptions,

    /// Write per-beam results to this CSV file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Plot both datasets to this file (.png or .svg)
    #[arg(short, long)]
    pub plot: Option<PathBuf>,

    /// Plot width in pixels
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Plot height in pixels
    #[arg(long, default_value_t = 1200)]
    pub height: u32,
}
