//! 应用配置
//!
//! 全部来自环境变量（配合 .env），未设置时取默认值。

use std::time::Duration;

use super::environment::{env_i64, env_or_default, env_usize};

/// 核心调度与执行配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 执行工作协程数
    pub worker_count: usize,

    /// 审计任务间隔
    pub audit_interval: Duration,
    /// 审计批量大小
    pub audit_batch_size: usize,

    /// 滞留意图兜底扫描间隔
    pub execute_interval: Duration,
    /// 兜底扫描批量大小
    pub execute_batch_size: usize,

    /// 数据聚合间隔
    pub aggregation_interval: Duration,

    /// 实时风控检查间隔
    pub realtime_check_interval: Duration,

    /// 每日结算Cron表达式（5段，UTC）
    pub settlement_cron: String,

    /// 执行重试次数上限
    pub max_retries: u32,
    /// 重试间隔
    pub retry_interval: Duration,
    /// 任务队列容量
    pub task_queue_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            worker_count: env_usize("WORKER_COUNT", 4),
            audit_interval: Duration::from_secs(env_i64("AUDIT_INTERVAL_SECS", 30) as u64),
            audit_batch_size: env_usize("AUDIT_BATCH_SIZE", 100),
            execute_interval: Duration::from_secs(env_i64("EXECUTE_INTERVAL_SECS", 60) as u64),
            execute_batch_size: env_usize("EXECUTE_BATCH_SIZE", 50),
            aggregation_interval: Duration::from_secs(
                env_i64("AGGREGATION_INTERVAL_SECS", 10) as u64
            ),
            realtime_check_interval: Duration::from_secs(
                env_i64("REALTIME_CHECK_INTERVAL_SECS", 30) as u64,
            ),
            settlement_cron: env_or_default("SETTLEMENT_CRON", "0 0 * * *"),
            max_retries: env_i64("MAX_RETRIES", 3) as u32,
            retry_interval: Duration::from_secs(env_i64("RETRY_INTERVAL_SECS", 5) as u64),
            task_queue_capacity: env_usize("TASK_QUEUE_CAPACITY", 1000),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            audit_interval: Duration::from_secs(30),
            audit_batch_size: 100,
            execute_interval: Duration::from_secs(60),
            execute_batch_size: 50,
            aggregation_interval: Duration::from_secs(10),
            realtime_check_interval: Duration::from_secs(30),
            settlement_cron: "0 0 * * *".to_string(),
            max_retries: 3,
            retry_interval: Duration::from_secs(5),
            task_queue_capacity: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_interval, Duration::from_secs(5));
        assert_eq!(cfg.task_queue_capacity, 1000);
        assert_eq!(cfg.settlement_cron, "0 0 * * *");
    }
}
