//! # 批量执行器
//!
//! 并行执行批量比较任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代（线程数可配置）
//! - 进度条显示
//! - 成功结果与失败信息分别收集，保持输入顺序
//!
//! ## 依赖关系
//! - 被 `commands/rank.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{IvError, Result};
use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;

/// 单个文件处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult<T> {
    /// 处理成功
    Success(PathBuf, T),
    /// 处理失败 (文件路径, 错误信息)
    Failed(PathBuf, String),
}

/// 批量处理结果
#[derive(Debug)]
pub struct BatchResult<T> {
    /// 成功的 (文件, 结果)
    pub successes: Vec<(PathBuf, T)>,
    /// 失败详情
    pub failures: Vec<(PathBuf, String)>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        BatchResult {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchResult<T> {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult<T>) {
        match result {
            ProcessResult::Success(path, value) => self.successes.push((path, value)),
            ProcessResult::Failed(path, err) => self.failures.push((path, err)),
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器；`jobs = 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理文件列表
    pub fn run<T, F>(&self, files: Vec<PathBuf>, processor: F) -> Result<BatchResult<T>>
    where
        T: Send,
        F: Fn(&PathBuf) -> Result<T> + Sync + Send,
    {
        let pb = progress::create_progress_bar(files.len() as u64, "Comparing");

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| IvError::Other(format!("Failed to start thread pool: {}", e)))?;

        let results: Vec<ProcessResult<T>> = pool.install(|| {
            files
                .into_par_iter()
                .map(|file| {
                    let result = match processor(&file) {
                        Ok(value) => ProcessResult::Success(file, value),
                        Err(e) => ProcessResult::Failed(file, e.to_string()),
                    };
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }

        Ok(batch_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_collects_successes_and_failures_in_order() {
        let files: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("{}.csv", i))).collect();
        let runner = BatchRunner::new(3);
        assert_eq!(runner.jobs(), 3);

        let result = runner
            .run(files, |path| {
                let n: usize = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                if n % 3 == 0 {
                    Err(IvError::Other(format!("bad {}", n)))
                } else {
                    Ok(n * 10)
                }
            })
            .unwrap();

        assert_eq!(result.total(), 8);
        let values: Vec<usize> = result.successes.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10, 20, 40, 50, 70]);
        assert_eq!(result.failures.len(), 3);
        assert_eq!(result.failures[1].1, "bad 3");
    }

    #[test]
    fn test_zero_jobs_uses_all_cpus() {
        assert_eq!(BatchRunner::new(0).jobs(), num_cpus::get());
    }
}
