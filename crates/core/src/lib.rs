//! # Polyfund Core
//!
//! 基础设施核心：配置加载、日志、数据库连接池、优雅停止

pub mod config;
pub mod database;
pub mod logger;

pub use config::environment::{env_bool, env_i64, env_or_default, env_usize};
pub use config::settings::AppConfig;
pub use config::shutdown_manager::{
    get_shutdown_manager, init_shutdown_manager, ShutdownConfig, ShutdownManager,
};
pub use database::{close_db_pool, get_db_pool, init_db_pool};
pub use logger::setup_logging;
