//! # 斑点图样 CSV 解析器
//!
//! ## 格式说明
//! ```text
//! name,group,superstructure
//! (1|0),1,
//! (0|1),1,
//! (1/2|0),2,true
//! (1/2|1/2),-3,
//! ```
//! - `group` 为对称群编号；负数表示该斑点按对称性消光，空表示未知
//! - `superstructure` 为空时由束流指数是否含分数推断
//! - 行号（从 0 开始）即束流编号
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/spots.rs`
//! - 使用 `csv` + `serde` 反序列化

use crate::error::{IvError, Result};
use crate::models::spots::parse_beam_indices;
use crate::models::{Spot, SpotPattern, SymmetryGroup};

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SpotRecord {
    name: String,
    #[serde(default)]
    group: Option<i64>,
    #[serde(default)]
    superstructure: Option<String>,
}

/// 解析斑点图样文件
pub fn parse_spot_file(path: &Path) -> Result<SpotPattern> {
    let content = fs::read_to_string(path).map_err(|e| IvError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_spot_content(&content).map_err(|e| match e {
        IvError::ParseError { format, reason, .. } => IvError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析斑点图样
pub fn parse_spot_content(content: &str) -> Result<SpotPattern> {
    let parse_error = |reason: String| IvError::ParseError {
        format: "spot pattern".to_string(),
        path: "<input>".to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut spots = Vec::new();
    for (i, record) in reader.deserialize::<SpotRecord>().enumerate() {
        let record = record?;
        if record.name.is_empty() {
            return Err(parse_error(format!("spot #{} has an empty name", i)));
        }

        let superstructure = match record.superstructure.as_deref() {
            None | Some("") => infer_superstructure(&record.name),
            Some(flag) => parse_flag(flag).ok_or_else(|| {
                parse_error(format!(
                    "spot '{}': superstructure flag '{}' is not a boolean",
                    record.name, flag
                ))
            })?,
        };

        spots.push(Spot::new(
            record.name,
            SymmetryGroup::from_code(record.group),
            superstructure,
        ));
    }

    if spots.is_empty() {
        return Err(parse_error("no spots defined".to_string()));
    }

    Ok(SpotPattern::new(spots))
}

fn parse_flag(flag: &str) -> Option<bool> {
    match flag.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn infer_superstructure(name: &str) -> bool {
    parse_beam_indices(name)
        .map(|(h, k)| h.fract() != 0.0 || k.fract() != 0.0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spot_basic() {
        let content = "\
name,group,superstructure
(1|0),1,
(0|1),1,
(1/2|0),2,true
(1/2|1/2),-3,
(2|0),,no
";
        let spots = parse_spot_content(content).unwrap();
        assert_eq!(spots.len(), 5);
        assert_eq!(spots.group(0), SymmetryGroup::Member(1));
        assert_eq!(spots.group(3), SymmetryGroup::Forbidden(3));
        assert_eq!(spots.group(4), SymmetryGroup::Unknown);
        assert!(spots.is_superstructure(2));
        // 由分数指数推断
        assert!(spots.is_superstructure(3));
        assert!(!spots.is_superstructure(4));
        assert_eq!(spots.first_in_group(1), Some(0));
    }

    #[test]
    fn test_parse_spot_name_only() {
        let spots = parse_spot_content("name\n(1|0)\n(1/3|0)\n").unwrap();
        assert_eq!(spots.len(), 2);
        assert!(!spots.has_groups());
        assert!(spots.is_superstructure(1));
    }

    #[test]
    fn test_parse_spot_errors() {
        assert!(parse_spot_content("name,group\n").is_err());
        assert!(parse_spot_content("name,group,superstructure\nA,1,maybe\n").is_err());
        assert!(parse_spot_content("name,group\nA,x\n").is_err());
    }
}
