//! 任务运行器
//!
//! 每个任务一个tokio协程：固定间隔任务用 interval（任务体await完成后
//! 才等下一个tick，单任务不可重入）；Cron任务按表达式算出下次触发时间
//! sleep_until。广播关闭信号，shutdown 等待全部协程退出。

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::Utc;
use cron::Schedule;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Duration, Instant};
use tracing::{error, info, warn};

pub struct JobRunner {
    jobs: HashMap<String, JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobRunner {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            jobs: HashMap::new(),
            shutdown_tx,
        }
    }

    /// 注册固定间隔任务
    pub fn add_interval_job<F, Fut>(&mut self, name: &str, every: Duration, job_fn: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut ticker = interval(every);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let job_name = name.to_string();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        job_fn().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("任务退出: {}", job_name);
                        break;
                    }
                }
            }
        });
        self.jobs.insert(name.to_string(), handle);
    }

    /// 注册Cron任务（支持标准5段表达式，UTC时区）
    pub fn add_cron_job<F, Fut>(&mut self, name: &str, expression: &str, job_fn: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let schedule = Schedule::from_str(&normalize_cron(expression))
            .map_err(|e| anyhow!("Cron表达式非法 '{}': {}", expression, e))?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let job_name = name.to_string();

        let handle = tokio::spawn(async move {
            loop {
                let next = match schedule.upcoming(Utc).next() {
                    Some(next) => next,
                    None => {
                        warn!("任务无后续触发时间，退出: {}", job_name);
                        break;
                    }
                };
                // 触发时刻已过（时钟回拨或计算竞争）时立即执行
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = sleep_until(Instant::now() + wait) => {
                        job_fn().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("任务退出: {}", job_name);
                        break;
                    }
                }
            }
        });
        self.jobs.insert(name.to_string(), handle);
        Ok(())
    }

    /// 关闭：广播信号并等待所有任务完成当前迭代后退出
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for (name, handle) in self.jobs {
            if handle.await.is_err() {
                error!("任务关闭异常: {}", name);
            }
        }
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// 标准5段Cron补秒字段（cron crate要求6/7段）
fn normalize_cron(expression: &str) -> String {
    let fields = expression.split_whitespace().count();
    if fields == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn normalizes_five_field_expressions() {
        assert_eq!(normalize_cron("0 0 * * *"), "0 0 0 * * *");
        assert_eq!(normalize_cron("0 0 0 * * *"), "0 0 0 * * *");
        // 每日零点的表达式可被解析
        assert!(Schedule::from_str(&normalize_cron("0 0 * * *")).is_ok());
    }

    #[tokio::test]
    async fn interval_job_runs_and_shuts_down_cleanly() {
        let mut runner = JobRunner::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        runner.add_interval_job("tick", Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        runner.shutdown().await;

        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn rejects_malformed_cron() {
        let mut runner = JobRunner::new();
        let result = runner.add_cron_job("bad", "not a cron", || async {});
        assert!(result.is_err());
        runner.shutdown().await;
    }
}
