//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `compare`: 比较两个 I(V) 数据集
//! - `rank`: 将一个参考数据集与目录中的所有候选数据集比较并排序
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: compare, rank

pub mod compare;
pub mod rank;

use clap::{Parser, Subcommand};

/// ivrfactor - LEED I(V) 曲线比较工具
#[derive(Parser)]
#[command(name = "ivrfactor")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Compare LEED I(V) curves with the Pendry R-factor", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Compare a reference I(V) dataset with one candidate dataset
    Compare(compare::CompareArgs),

    /// Compare a reference dataset with every candidate in a directory and rank them
    Rank(rank::RankArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compare_command() {
        let cli = Cli::try_parse_from([
            "ivrfactor",
            "compare",
            "exp.csv",
            "theo.csv",
            "--v0i",
            "5",
            "--metric",
            "r2",
            "--no-shift",
            "--range",
            "60-300",
        ])
        .unwrap();
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        let config = args.options.to_config().unwrap();
        assert_eq!(config.v0i, 5.0);
        assert_eq!(config.metric, crate::rfactor::MetricKind::R2);
        assert!(!config.allow_shift);
        assert!(config.average_symmetric);
        assert_eq!(config.energy_range, Some((60.0, 300.0)));
    }

    #[test]
    fn test_parse_rank_command() {
        let cli = Cli::try_parse_from([
            "ivrfactor", "rank", "exp.csv", "models", "--recursive", "--top", "5",
        ])
        .unwrap();
        let Commands::Rank(args) = cli.command else {
            panic!("expected rank");
        };
        assert_eq!(args.top, 5);
        assert!(args.recursive);
        assert_eq!(args.pattern, "*.csv");
        assert_eq!(
            args.options.to_config().unwrap(),
            crate::rfactor::RFactorConfig::default()
        );
    }
}
