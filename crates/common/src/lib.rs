//! # Polyfund Common
//!
//! 公共错误类型与工具函数

pub mod errors;
pub mod utils;

// 重新导出常用类型
pub use errors::{AppError, Result};
