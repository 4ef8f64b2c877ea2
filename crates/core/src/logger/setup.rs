//! 日志初始化
//!
//! 本地环境仅控制台输出；其他环境写 info/error 两个滚动日志文件，
//! 可选叠加控制台输出。

use std::env;
use std::sync::OnceLock;

use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

// 全局保持日志文件句柄，防止guard被丢弃后日志丢失
static INFO_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
static ERROR_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone)]
struct LogConfig {
    app_env: String,
    log_level: String,
    log_dir: String,
    log_rotation: String,
    info_file_name: String,
    error_file_name: String,
    enable_console_logging: bool,
}

impl LogConfig {
    fn from_env() -> Self {
        Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "local".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "log_files".to_string()),
            log_rotation: env::var("LOG_ROTATION").unwrap_or_else(|_| "daily".to_string()),
            info_file_name: env::var("LOG_INFO_FILE").unwrap_or_else(|_| "info.log".to_string()),
            error_file_name: env::var("LOG_ERROR_FILE")
                .unwrap_or_else(|_| "error.log".to_string()),
            enable_console_logging: crate::config::environment::env_bool(
                "ENABLE_CONSOLE_LOGGING",
                true,
            ),
        }
    }
}

fn parse_rotation(s: &str) -> Rotation {
    match s.to_lowercase().as_str() {
        "minutely" | "minute" | "min" => Rotation::MINUTELY,
        "hourly" | "hour" | "hr" => Rotation::HOURLY,
        "daily" | "day" => Rotation::DAILY,
        _ => Rotation::DAILY,
    }
}

/// 设置日志
pub async fn setup_logging() -> anyhow::Result<()> {
    let config = LogConfig::from_env();

    // 本地环境：仅控制台输出
    if config.app_env == "local" {
        let base = Registry::default().with(
            fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stdout)
                .with_filter(EnvFilter::new(&config.log_level)),
        );
        tracing::subscriber::set_global_default(base)?;

        info!(
            "日志初始化完成: env={}, level={}, console_only",
            config.app_env, config.log_level
        );
        return Ok(());
    }

    // 非本地环境：文件输出（可选控制台）
    std::fs::create_dir_all(&config.log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log directory '{}': {}", config.log_dir, e))?;

    let rotation_info = parse_rotation(&config.log_rotation);
    let rotation_error = parse_rotation(&config.log_rotation);
    let info_file = RollingFileAppender::new(rotation_info, &config.log_dir, &config.info_file_name);
    let error_file =
        RollingFileAppender::new(rotation_error, &config.log_dir, &config.error_file_name);

    let (info_non_blocking, info_guard) = tracing_appender::non_blocking(info_file);
    let (error_non_blocking, error_guard) = tracing_appender::non_blocking(error_file);

    INFO_GUARD
        .set(info_guard)
        .map_err(|_| anyhow::anyhow!("Failed to set INFO_GUARD"))?;
    ERROR_GUARD
        .set(error_guard)
        .map_err(|_| anyhow::anyhow!("Failed to set ERROR_GUARD"))?;

    let base = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(info_non_blocking)
                .with_filter(EnvFilter::new(&config.log_level)),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(error_non_blocking)
                .with_filter(EnvFilter::new("error")),
        );

    if config.enable_console_logging {
        let with_console = base.with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(std::io::stdout)
                .with_filter(EnvFilter::new(&config.log_level)),
        );
        tracing::subscriber::set_global_default(with_console)?;
    } else {
        tracing::subscriber::set_global_default(base)?;
    }

    info!(
        "日志初始化完成: env={}, level={}, dir={}",
        config.app_env, config.log_level, config.log_dir
    );
    Ok(())
}
