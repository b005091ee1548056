//! # rank 子命令实现
//!
//! 将参考数据集与目录中的每个候选数据集比较，按 R 因子排序。
//!
//! ## 功能
//! - 并行比较（rayon，线程数可配置）
//! - 排名表格（前 N 个）与失败文件列表
//! - 可选导出完整排名 CSV
//!
//! ## 依赖关系
//! - 使用 `cli/rank.rs` 定义的 RankArgs
//! - 使用 `batch/` 模块收集文件、并行执行
//! - 使用 `parsers/` 读取数据，`rfactor/` 进行比较

use crate::batch::{BatchRunner, FileCollector};
use crate::cli::rank::RankArgs;
use crate::commands::compare::fmt_value;
use crate::error::{IvError, Result};
use crate::models::{Dataset, SpotPattern};
use crate::parsers;
use crate::rfactor::export::{self, RankingRow};
use crate::rfactor::{self, RFactorConfig};
use crate::utils::output;

use std::cmp::Ordering;
use std::path::Path;
use tabled::{Table, Tabled};

/// 排名表格行
#[derive(Debug, Clone, Tabled)]
struct RankRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Candidate")]
    file: String,
    #[tabled(rename = "R")]
    r_factor: String,
    #[tabled(rename = "Overlap (eV)")]
    overlap: String,
    #[tabled(rename = "Shift (eV)")]
    shift: String,
    #[tabled(rename = "Beams")]
    beams: usize,
}

/// 执行排名
pub fn execute(args: RankArgs) -> Result<()> {
    output::print_header("LEED I(V) Candidate Ranking");

    if !args.dir.is_dir() {
        return Err(IvError::DirectoryNotFound {
            path: args.dir.display().to_string(),
        });
    }

    let config = args.options.to_config()?;
    let reference = parsers::load_iv_table(&args.reference)?;
    let spots = parsers::load_spot_pattern(args.options.spots.as_deref(), &reference)?;
    let reference = reference.into_dataset(&spots);

    let files = FileCollector::new(args.dir.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .exclude(&args.reference)
        .collect();

    if files.is_empty() {
        return Err(IvError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Comparing '{}' with {} candidates using {} threads ({})",
        reference.title,
        files.len(),
        runner.jobs(),
        config.metric
    ));

    let result = runner.run(files, |file| {
        compare_candidate(file, &args.dir, &reference, &spots, &config)
    })?;

    let total = result.total();
    let failures = result.failures;
    let ranking = rank_rows(result.successes.into_iter().map(|(_, row)| row).collect());

    if ranking.is_empty() {
        output::print_warning("No candidate could be compared");
    } else {
        print_ranking(&ranking, args.top);
    }

    output::print_separator();
    output::print_success(&format!(
        "Ranking complete: {} of {} candidates compared, {} failed",
        ranking.len(),
        total,
        failures.len()
    ));

    if !failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path.display(), err));
        }
        if failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", failures.len() - 10));
        }
    }

    if let Some(path) = &args.output {
        export::ranking_to_csv(&ranking, path)?;
        output::print_success(&format!("Full ranking saved to '{}'", path.display()));
    }

    Ok(())
}

/// 比较一个候选文件
fn compare_candidate(
    file: &Path,
    root: &Path,
    reference: &Dataset,
    spots: &SpotPattern,
    config: &RFactorConfig,
) -> Result<RankingRow> {
    let candidate = parsers::parse_iv_file(file)?.into_dataset(spots);
    let result = rfactor::run(reference, &candidate, spots, config)?;
    let summary = result.comparison.summary;

    if !summary.is_defined() {
        return Err(IvError::Other("no overlap with the reference".to_string()));
    }

    let label = file.strip_prefix(root).unwrap_or(file).display().to_string();
    Ok(RankingRow {
        file: label,
        r_factor: summary.r_factor,
        overlap: summary.overlap,
        shift: summary.shift,
        beams: result.comparison.beams.len(),
    })
}

/// 按 R 因子升序排序；R 相同时重叠大的在前
fn rank_rows(mut rows: Vec<RankingRow>) -> Vec<RankingRow> {
    rows.sort_by(|a, b| {
        a.r_factor
            .partial_cmp(&b.r_factor)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.overlap
                    .partial_cmp(&a.overlap)
                    .unwrap_or(Ordering::Equal)
            })
    });
    rows
}

fn print_ranking(ranking: &[RankingRow], top: usize) {
    let rows: Vec<RankRow> = ranking
        .iter()
        .take(top)
        .enumerate()
        .map(|(i, r)| RankRow {
            rank: i + 1,
            file: r.file.clone(),
            r_factor: fmt_value(r.r_factor, 4),
            overlap: fmt_value(r.overlap, 1),
            shift: r
                .shift
                .map(|s| format!("{:+.2}", s))
                .unwrap_or_else(|| "-".to_string()),
            beams: r.beams,
        })
        .collect();

    output::print_header(&format!("Top {} Candidates", rows.len()));
    println!("{}", Table::new(&rows));
}
