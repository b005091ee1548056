//! # I(V) 曲线 CSV 解析器
//!
//! 读取以能量为第一列、每束一列的 I(V) 表格。
//!
//! ## 格式说明
//! ```text
//! # 注释行
//! energy,(1|0),(0|1),(1/2|0)
//! 50.0,1.23,1.10,
//! 50.5,1.31,1.18,0.05
//! ```
//! - 表头第一列为能量 (eV)，其余为束流名称
//! - 空单元格或 `nan` 表示该能量无数据
//! - 列之间可以用逗号、分号或制表符分隔（按表头自动判断）
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/curve.rs`, `models/spots.rs`
//! - 使用 `csv` 库读取表格

use crate::error::{IvError, Result};
use crate::models::{Beam, Curve, Dataset, SpotPattern};

use std::fs;
use std::path::Path;

/// 尚未与斑点图样关联的原始 I(V) 表格
#[derive(Debug, Clone, PartialEq)]
pub struct IvTable {
    pub title: String,
    pub energies: Vec<f64>,
    /// (束流名称, 曲线)，按表格列顺序
    pub columns: Vec<(String, Curve)>,
}

impl IvTable {
    /// 表格中的束流名称
    pub fn beam_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// 按斑点图样为每列分配束流编号；图样中找不到的列被忽略
    pub fn into_dataset(self, spots: &SpotPattern) -> Dataset {
        let mut beams = Vec::with_capacity(self.columns.len());
        for (name, curve) in self.columns {
            match spots.id_of(&name) {
                Some(id) => beams.push(Beam::new(id, name, curve)),
                None => log::warn!(
                    "'{}': beam '{}' is not in the spot pattern, ignored",
                    self.title,
                    name
                ),
            }
        }
        Dataset::new(self.title, self.energies, beams)
    }
}

/// 解析 I(V) CSV 文件
pub fn parse_iv_file(path: &Path) -> Result<IvTable> {
    let content = fs::read_to_string(path).map_err(|e| IvError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    parse_iv_content(&content, title).map_err(|e| match e {
        IvError::ParseError { format, reason, .. } => IvError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析 I(V) 表格
pub fn parse_iv_content(content: &str, title: &str) -> Result<IvTable> {
    let parse_error = |reason: String| IvError::ParseError {
        format: "I(V) CSV".to_string(),
        path: title.to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(content))
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(parse_error(
            "header needs an energy column followed by at least one beam".to_string(),
        ));
    }

    let names: Vec<String> = headers.iter().skip(1).map(|s| s.to_string()).collect();
    let mut energies = Vec::new();
    let mut samples: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // 表头之后第 row+1 行数据
        let line = row + 2;

        let energy_field = record.get(0).unwrap_or("");
        if energy_field.is_empty() {
            continue;
        }
        let energy: f64 = energy_field.parse().map_err(|_| {
            parse_error(format!("line {}: invalid energy '{}'", line, energy_field))
        })?;
        energies.push(energy);

        for (col, column) in samples.iter_mut().enumerate() {
            let field = record.get(col + 1).unwrap_or("");
            column.push(parse_sample(field).map_err(|_| {
                parse_error(format!(
                    "line {}: invalid intensity '{}' for beam '{}'",
                    line, field, names[col]
                ))
            })?);
        }
    }

    if energies.is_empty() {
        return Err(parse_error("no data rows".to_string()));
    }

    let columns = names
        .into_iter()
        .zip(samples)
        .map(|(name, s)| (name, Curve::new(s)))
        .collect();

    Ok(IvTable {
        title: title.to_string(),
        energies,
        columns,
    })
}

fn parse_sample(field: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = field.parse()?;
    Ok(value.is_finite().then_some(value))
}

/// 根据第一个非注释行判断分隔符
fn detect_delimiter(content: &str) -> u8 {
    let header = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .unwrap_or("");
    if header.contains('\t') {
        b'\t'
    } else if header.contains(';') {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Spot, SymmetryGroup};
    use std::io::Write;

    const SAMPLE: &str = "\
# LEED I(V), Cu(100)
energy,(1|0),(0|1),(1/2|0)
50.0,1.0,1.1,
50.5,2.0,2.1,0.5
51.0,3.0,nan,0.6
";

    #[test]
    fn test_parse_iv_basic() {
        let table = parse_iv_content(SAMPLE, "exp").unwrap();
        assert_eq!(table.title, "exp");
        assert_eq!(table.energies, vec![50.0, 50.5, 51.0]);
        assert_eq!(table.beam_names(), vec!["(1|0)", "(0|1)", "(1/2|0)"]);
        assert_eq!(
            table.columns[1].1.samples(),
            &[Some(1.1), Some(2.1), None]
        );
        assert_eq!(table.columns[2].1.samples(), &[None, Some(0.5), Some(0.6)]);
    }

    #[test]
    fn test_parse_iv_tab_separated() {
        let content = "E\tA\tB\n10\t1\t2\n11\t3\t4\n";
        let table = parse_iv_content(content, "t").unwrap();
        assert_eq!(table.beam_names(), vec!["A", "B"]);
        assert_eq!(table.columns[1].1.samples(), &[Some(2.0), Some(4.0)]);
    }

    #[test]
    fn test_parse_iv_rejects_bad_values() {
        let err = parse_iv_content("energy,A\n10,abc\n", "t").unwrap_err();
        assert!(matches!(err, IvError::ParseError { .. }));
        assert!(parse_iv_content("energy\n10\n", "t").is_err());
        assert!(parse_iv_content("energy,A\n", "t").is_err());
    }

    #[test]
    fn test_into_dataset_maps_names_to_ids() {
        let spots = SpotPattern::new(vec![
            Spot::new("(0|1)", SymmetryGroup::Member(1), false),
            Spot::new("(1|0)", SymmetryGroup::Member(1), false),
        ]);
        let ds = parse_iv_content(SAMPLE, "exp").unwrap().into_dataset(&spots);
        // (1/2|0) 不在图样中
        assert_eq!(ds.beam_ids(), vec![1, 0]);
        assert_eq!(ds.beams[0].name, "(1|0)");
        assert_eq!(ds.energies.len(), 3);
    }

    #[test]
    fn test_parse_iv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let table = parse_iv_file(file.path()).unwrap();
        assert_eq!(table.columns.len(), 3);

        let missing = parse_iv_file(Path::new("/nonexistent/iv.csv")).unwrap_err();
        assert!(matches!(missing, IvError::FileReadError { .. }));
    }
}
