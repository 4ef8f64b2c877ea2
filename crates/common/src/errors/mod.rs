//! 统一错误类型定义

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("Polymarket API错误: {0}")]
    VenueApi(String),

    #[error("解析错误: {0}")]
    Parse(String),

    #[error("业务错误: {0}")]
    Biz(String),

    #[error("未知错误: {0}")]
    Unknown(String),
}
