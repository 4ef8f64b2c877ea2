//! # Polyfund Infrastructure
//!
//! 仓储实现层：MySQL (sqlx) 实现与内存实现。
//! 内存实现与数据库实现遵守同一接口契约，供测试与本地演练使用。

pub mod repositories;

pub use repositories::memory_repository::MemoryRepository;
pub use repositories::sqlx_repository::SqlxRepository;
