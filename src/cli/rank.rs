//! # rank 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/rank.rs`

use crate::cli::compare::ComparisonOptions;

use clap::Args;
use std::path::PathBuf;

/// rank 子命令参数
#[derive(Args, Debug)]
pub struct RankArgs {
    /// Reference I(V) CSV (usually the experiment)
    pub reference: PathBuf,

    /// Directory containing candidate I(V) CSV files
    pub dir: PathBuf,

    #[command(flatten)]
    pub options: ComparisonOptions,

    /// File pattern for candidates (comma-separated for multiple)
    #[arg(long, default_value = "*.csv")]
    pub pattern: String,

    /// Search subdirectories recursively
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Number of best candidates to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Write the full ranking to this CSV file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
