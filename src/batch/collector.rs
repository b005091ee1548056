//! # 文件收集器
//!
//! 根据输入目录和模式收集候选数据集文件列表。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - glob 模式匹配（逗号分隔多个模式，只匹配文件名）
//! - 递归目录搜索
//! - 可排除指定文件（如参考数据集本身）
//!
//! ## 依赖关系
//! - 被 `commands/rank.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    /// 输入路径
    input: PathBuf,
    /// 匹配模式列表
    patterns: Vec<Pattern>,
    /// 是否递归
    recursive: bool,
    /// 排除的文件
    exclude: Vec<PathBuf>,
}

impl FileCollector {
    /// 创建新的文件收集器
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: Vec::new(),
            recursive: false,
            exclude: Vec::new(),
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）；无法解析的模式被忽略
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match Pattern::new(s) {
                Ok(p) => Some(p),
                Err(e) => {
                    log::warn!("Ignoring invalid pattern '{}': {}", s, e);
                    None
                }
            })
            .collect();
        self
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 排除某个文件
    pub fn exclude(mut self, path: &Path) -> Self {
        self.exclude.push(canonical(path));
        self
    }

    /// 收集所有匹配的文件（按路径排序）
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }

        if !self.input.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches_patterns(e.path()))
            .map(|e| e.path().to_path_buf())
            .filter(|p| !self.exclude.contains(&canonical(p)))
            .collect();

        files.sort();
        files
    }

    /// 检查文件名是否匹配任一模式；没有模式时全部匹配
    fn matches_patterns(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(filename))
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_pattern_matching() {
        let collector = FileCollector::new(PathBuf::from(".")).with_pattern("*.csv, theo_??.txt");
        assert!(collector.matches_patterns(Path::new("dir/model.csv")));
        assert!(collector.matches_patterns(Path::new("theo_01.txt")));
        assert!(!collector.matches_patterns(Path::new("theo_001.txt")));
        assert!(!collector.matches_patterns(Path::new("model.dat")));
    }

    #[test]
    fn test_collect_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        for name in ["b.csv", "a.csv", "notes.txt", "exp.csv"] {
            fs::write(dir.path().join(name), "E,A\n").unwrap();
        }
        fs::write(sub.join("c.csv"), "E,A\n").unwrap();

        let flat = FileCollector::new(dir.path().to_path_buf())
            .with_pattern("*.csv")
            .exclude(&dir.path().join("exp.csv"))
            .collect();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);

        let deep = FileCollector::new(dir.path().to_path_buf())
            .with_pattern("*.csv")
            .recursive(true)
            .collect();
        assert_eq!(deep.len(), 4);
    }
}
