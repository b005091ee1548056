//! # compare 子命令实现
//!
//! 比较参考与候选 I(V) 数据集并报告 R 因子。
//!
//! ## 功能
//! - 逐束结果表格与汇总行
//! - 整数束 / 超结构束分组统计
//! - 可选导出 CSV 和对比图
//!
//! ## 依赖关系
//! - 使用 `cli/compare.rs` 定义的 CompareArgs
//! - 使用 `parsers/` 读取数据
//! - 使用 `rfactor/` 进行比较、导出和绘图

use crate::cli::compare::CompareArgs;
use crate::error::Result;
use crate::models::SpotPattern;
use crate::parsers;
use crate::rfactor::{self, CategoryBreakdown, Comparison, MetricKind, PipelineOutput};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 逐束结果行
#[derive(Debug, Clone, Tabled)]
struct BeamRow {
    #[tabled(rename = "#")]
    id: String,
    #[tabled(rename = "Beam")]
    name: String,
    #[tabled(rename = "R")]
    r_factor: String,
    #[tabled(rename = "Overlap (eV)")]
    overlap: String,
    #[tabled(rename = "Ratio")]
    ratio: String,
}

/// 分组统计行
#[derive(Debug, Clone, Tabled)]
struct CategoryRow {
    #[tabled(rename = "Beams")]
    category: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Overlap (eV)")]
    overlap: String,
    #[tabled(rename = "Mean R")]
    mean_r: String,
    #[tabled(rename = "Mean ratio")]
    mean_ratio: String,
}

/// 执行比较
pub fn execute(args: CompareArgs) -> Result<()> {
    output::print_header("LEED I(V) Comparison");

    let config = args.options.to_config()?;

    let reference = parsers::load_iv_table(&args.reference)?;
    let candidate = parsers::load_iv_table(&args.candidate)?;
    let spots = parsers::load_spot_pattern(args.options.spots.as_deref(), &reference)?;

    output::print_info(&format!(
        "Reference '{}': {} beams, {} energies",
        reference.title,
        reference.columns.len(),
        reference.energies.len()
    ));
    output::print_info(&format!(
        "Candidate '{}': {} beams, {} energies",
        candidate.title,
        candidate.columns.len(),
        candidate.energies.len()
    ));
    output::print_info(&format!(
        "{}, V0i = {:.2} eV, shift {}, symmetry averaging {}",
        config.metric,
        config.v0i,
        on_off(config.allow_shift),
        on_off(config.average_symmetric && spots.has_groups())
    ));

    let reference = reference.into_dataset(&spots);
    let candidate = candidate.into_dataset(&spots);

    let result = rfactor::run(&reference, &candidate, &spots, &config)?;

    print_beam_table(&result.comparison, config.metric);
    print_summary(&result, config.metric);
    if let Some(categories) = &result.categories {
        print_categories(categories, &spots);
    }

    if let Some(path) = &args.output {
        rfactor::export::comparison_to_csv(&result.comparison, path)?;
        output::print_success(&format!("Results saved to '{}'", path.display()));
    }

    if let Some(path) = &args.plot {
        let title = format!("{} vs {}", result.reference.title, result.candidate.title);
        rfactor::plot::generate_curve_plot(&result, path, &title, args.width, args.height)?;
        output::print_success(&format!("Plot saved to '{}'", path.display()));
    }

    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// 数值格式化；NaN 显示为 "-"
pub(crate) fn fmt_value(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", precision, value)
    } else {
        "-".to_string()
    }
}

fn print_beam_table(comparison: &Comparison, metric: MetricKind) {
    let rows: Vec<BeamRow> = comparison
        .beams
        .iter()
        .map(|b| BeamRow {
            id: b.id.to_string(),
            name: b.name.clone(),
            r_factor: fmt_value(b.row.r_factor, 4),
            overlap: fmt_value(b.row.overlap, 1),
            ratio: fmt_value(b.row.ratio, 3),
        })
        .collect();

    output::print_header(&format!("{} per beam", metric));
    println!("{}", Table::new(&rows));
}

fn print_summary(result: &PipelineOutput, metric: MetricKind) {
    let s = &result.comparison.summary;
    output::print_separator();

    if !s.is_defined() {
        output::print_warning("The datasets do not overlap; no R-factor could be computed");
        return;
    }

    output::print_done(&format!(
        "{} = {:.4} over {:.1} eV ({} beams)",
        metric,
        s.r_factor,
        s.overlap,
        result.comparison.beams.len()
    ));
    if let Some(shift) = s.shift {
        output::print_info(&format!("Best energy shift: {:+.2} eV", shift));
    }
}

fn print_categories(categories: &CategoryBreakdown, spots: &SpotPattern) {
    let row = |category: &str, stats: &rfactor::CategoryStats| CategoryRow {
        category: category.to_string(),
        count: stats.beams,
        overlap: fmt_value(stats.overlap, 1),
        mean_r: fmt_value(stats.mean_r_factor, 4),
        mean_ratio: fmt_value(stats.mean_ratio, 3),
    };
    let rows = vec![
        row("integer", &categories.integer),
        row("superstructure", &categories.superstructure),
    ];

    output::print_header(&format!(
        "Integer / superstructure beams ({} spots)",
        spots.len()
    ));
    println!("{}", Table::new(&rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::compare::ComparisonOptions;
    use std::fmt::Write as _;
    use std::fs;

    fn iv_csv(shift: f64) -> String {
        let mut s = String::from("energy,(1|0),(0|1),(1/2|0)\n");
        for i in 0..241 {
            let e = 60.0 + 0.5 * i as f64;
            let y = |c: f64| 1.0 + 3.0 * (-((e - shift) - c).powi(2) / 40.0).exp();
            writeln!(s, "{},{},{},{}", e, y(90.0), y(90.0), y(120.0)).unwrap();
        }
        s
    }

    fn options() -> ComparisonOptions {
        ComparisonOptions {
            spots: None,
            v0i: 4.0,
            max_step: 0.5,
            metric: MetricKind::Pendry,
            no_shift: false,
            no_average: false,
            range: None,
        }
    }

    #[test]
    fn test_execute_writes_results() {
        let dir = tempfile::tempdir().unwrap();
        let exp = dir.path().join("exp.csv");
        let theo = dir.path().join("theo.csv");
        fs::write(&exp, iv_csv(0.0)).unwrap();
        fs::write(&theo, iv_csv(1.0)).unwrap();
        let out = dir.path().join("results.csv");

        execute(CompareArgs {
            reference: exp,
            candidate: theo,
            options: options(),
            output: Some(out.clone()),
            plot: None,
            width: 800,
            height: 600,
        })
        .unwrap();

        let text = fs::read_to_string(&out).unwrap();
        // 三束加表头和汇总行
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().last().unwrap().starts_with("all,"));
    }

    #[test]
    fn test_execute_missing_file() {
        let result = execute(CompareArgs {
            reference: "/nonexistent/exp.csv".into(),
            candidate: "/nonexistent/theo.csv".into(),
            options: options(),
            output: None,
            plot: None,
            width: 800,
            height: 600,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(0.12345, 3), "0.123");
        assert_eq!(fmt_value(f64::NAN, 3), "-");
    }
}
