//! # I(V) 曲线对比图
//!
//! 使用 `plotters` 将参考与候选曲线逐束叠放绘制。
//!
//! ## 功能
//! - 每束曲线归一化到最大值 1 后按束号向上错开
//! - 候选曲线的能量轴减去优化得到的位移，与参考曲线对齐
//! - 每束在右侧标注名称与 R 因子
//! - 支持 PNG 和 SVG 输出（按扩展名选择）
//!
//! ## 依赖关系
//! - 被 `commands/compare.rs` 调用
//! - 使用 `rfactor/pipeline.rs` 的 PipelineOutput 结构
//! - 使用 `plotters` 渲染图表

use crate::error::{IvError, Result};
use crate::models::Curve;
use crate::rfactor::pipeline::PipelineOutput;

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::path::Path;

/// 相邻两束之间的竖直间距
const BEAM_SPACING: f64 = 1.2;

/// 生成对比图；扩展名为 `.svg` 时输出 SVG，否则 PNG
pub fn generate_curve_plot(
    output: &PipelineOutput,
    output_path: &Path,
    title: &str,
    width: u32,
    height: u32,
) -> Result<()> {
    let use_svg = output_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_curves(&root, output, title)?;
        root.present()
            .map_err(|e| IvError::PlotError(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_curves(&root, output, title)?;
        root.present()
            .map_err(|e| IvError::PlotError(e.to_string()))?;
    }
    Ok(())
}

/// 已定义点的 (能量, 归一化强度)，能量平移 `shift`，强度抬高 `offset`
fn normalized_points(energies: &[f64], curve: &Curve, shift: f64, offset: f64) -> Vec<(f64, f64)> {
    let max = curve
        .samples()
        .iter()
        .flatten()
        .fold(f64::NEG_INFINITY, |m, &v| m.max(v.abs()));
    let scale = if max.is_finite() && max > 0.0 { 1.0 / max } else { 1.0 };

    energies
        .iter()
        .zip(curve.samples())
        .filter_map(|(&e, s)| s.map(|v| (e - shift, v * scale + offset)))
        .collect()
}

/// 按已定义段拆分，避免跨过缺失点连线
fn segments(points: &[(f64, f64)], step: f64) -> Vec<Vec<(f64, f64)>> {
    let mut out: Vec<Vec<(f64, f64)>> = Vec::new();
    for &p in points {
        match out.last_mut() {
            Some(seg) if seg.last().map_or(false, |q| p.0 - q.0 <= 1.5 * step) => seg.push(p),
            _ => out.push(vec![p]),
        }
    }
    out
}

fn draw_curves<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    output: &PipelineOutput,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let plot_err = |e: DrawingAreaErrorKind<DB::ErrorType>| IvError::PlotError(format!("{:?}", e));

    root.fill(&WHITE).map_err(plot_err)?;

    let reference = &output.reference;
    let candidate = &output.candidate;
    let shift = output.comparison.summary.shift.unwrap_or(0.0);
    let step = reference.grid()?.step;

    let x_min = reference
        .energies
        .first()
        .copied()
        .unwrap_or(0.0)
        .min(candidate.energies.first().copied().unwrap_or(0.0) - shift);
    let x_max = reference
        .energies
        .last()
        .copied()
        .unwrap_or(1.0)
        .max(candidate.energies.last().copied().unwrap_or(1.0) - shift);
    let n_beams = reference.beams.len().max(1);
    let y_max = BEAM_SPACING * n_beams as f64 + 0.2;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(40)
        .right_y_label_area_size(10)
        .build_cartesian_2d(x_min..x_max + 0.15 * (x_max - x_min), 0.0..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc("Energy (eV)")
        .y_desc("Intensity (normalized, offset)")
        .x_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    let reference_color = BLACK;
    let candidate_color = RGBColor(204, 51, 0);

    for (k, (beam_a, beam_b)) in reference.beams.iter().zip(&candidate.beams).enumerate() {
        let offset = BEAM_SPACING * k as f64;

        let points_a = normalized_points(&reference.energies, &beam_a.curve, 0.0, offset);
        for seg in segments(&points_a, step) {
            chart
                .draw_series(LineSeries::new(seg, reference_color.stroke_width(2)))
                .map_err(plot_err)?;
        }

        let points_b = normalized_points(&candidate.energies, &beam_b.curve, shift, offset);
        for seg in segments(&points_b, step) {
            chart
                .draw_series(LineSeries::new(seg, candidate_color.stroke_width(2)))
                .map_err(plot_err)?;
        }

        let r = output
            .comparison
            .beams
            .get(k)
            .map(|b| b.row.r_factor)
            .unwrap_or(f64::NAN);
        let label = if r.is_finite() {
            format!("{}  R={:.3}", beam_a.name, r)
        } else {
            beam_a.name.clone()
        };
        chart
            .draw_series(std::iter::once(Text::new(
                label,
                (x_max + 0.01 * (x_max - x_min), offset + 0.3),
                ("sans-serif", 12).into_font().color(&BLACK),
            )))
            .map_err(plot_err)?;
    }

    let legend = format!(
        "{} (black) vs {} (red), shift {:+.2} eV",
        reference.title, candidate.title, shift
    );
    chart
        .draw_series(std::iter::once(Text::new(
            legend,
            (x_min + 0.01 * (x_max - x_min), y_max - 0.1),
            ("sans-serif", 14).into_font().color(&BLACK),
        )))
        .map_err(plot_err)?;

    Ok(())
}
