//! # ivrfactor - LEED I(V) 曲线比较工具
//!
//! 计算两组 I(V) 曲线之间的 Pendry R 因子（或 R2），
//! 可选优化整体能量位移，并对对称等价束做平均。
//!
//! ## 子命令
//! - `compare` - 比较参考数据集与一个候选数据集
//! - `rank`    - 与目录中的所有候选数据集比较并按 R 因子排序
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (I(V) 与斑点图样解析)
//!   │     ├── rfactor/   (比较引擎)
//!   │     ├── batch/     (批量并行)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```
//!
//! 诊断日志通过 `RUST_LOG` 控制，例如 `RUST_LOG=debug` 显示位移搜索过程。

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod rfactor;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error_chain(&e);
        std::process::exit(1);
    }
}
