//! # 解析器模块
//!
//! 读取 I(V) 曲线表格和斑点图样。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: iv_csv, spots

pub mod iv_csv;
pub mod spots;

pub use iv_csv::{parse_iv_file, IvTable};
pub use spots::parse_spot_file;

use crate::error::{IvError, Result};
use crate::models::SpotPattern;
use std::path::Path;

/// 读取斑点图样；未给出文件时由参考表格的束流名称构造
pub fn load_spot_pattern(spots: Option<&Path>, reference: &IvTable) -> Result<SpotPattern> {
    match spots {
        Some(path) => {
            if !path.exists() {
                return Err(IvError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            parse_spot_file(path)
        }
        None => Ok(SpotPattern::from_names(&reference.beam_names())),
    }
}

/// 读取 I(V) 表格，先检查文件是否存在
pub fn load_iv_table(path: &Path) -> Result<IvTable> {
    if !path.is_file() {
        return Err(IvError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    parse_iv_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_pattern_from_reference_names() {
        let table = iv_csv::parse_iv_content("E,(1|0),(1/2|0)\n1,1,1\n2,2,2\n", "exp").unwrap();
        let spots = load_spot_pattern(None, &table).unwrap();
        assert_eq!(spots.len(), 2);
        assert!(spots.is_superstructure(1));
    }

    #[test]
    fn test_pattern_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,group\n(1|0),1\n(0|1),1").unwrap();
        let table = iv_csv::parse_iv_content("E,(1|0)\n1,1\n2,2\n", "exp").unwrap();
        let spots = load_spot_pattern(Some(file.path()), &table).unwrap();
        assert_eq!(spots.len(), 2);
        assert!(spots.has_groups());

        let missing = load_spot_pattern(Some(Path::new("/nonexistent/spots.csv")), &table);
        assert!(matches!(missing.unwrap_err(), IvError::FileNotFound { .. }));
    }
}
