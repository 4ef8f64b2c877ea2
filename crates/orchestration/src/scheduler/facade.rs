//! 调度器门面
//!
//! 启动时注册四个周期任务并拉起实时风控引擎；
//! 关闭顺序：调度任务 → 实时风控引擎（执行工作池由上层停止）。

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::info;

use polyfund_core::AppConfig;
use polyfund_domain::traits::{Repository, VenueClient};
use polyfund_execution::Executor;
use polyfund_risk::{Auditor, RealtimeRiskEngine};

use crate::jobs::{AggregateJob, AuditJob, ExecuteJob, SettlementJob};
use crate::scheduler::JobRunner;

pub struct Scheduler {
    repo: Arc<dyn Repository>,
    auditor: Arc<Auditor>,
    executor: Arc<Executor>,
    venue: Arc<dyn VenueClient>,
    engine: Arc<RealtimeRiskEngine<Executor>>,
    config: AppConfig,
    runner: Mutex<Option<JobRunner>>,
}

impl Scheduler {
    pub fn new(
        repo: Arc<dyn Repository>,
        auditor: Arc<Auditor>,
        executor: Arc<Executor>,
        venue: Arc<dyn VenueClient>,
        engine: Arc<RealtimeRiskEngine<Executor>>,
        config: AppConfig,
    ) -> Self {
        Self {
            repo,
            auditor,
            executor,
            venue,
            engine,
            config,
            runner: Mutex::new(None),
        }
    }

    /// 注册全部周期任务并启动实时风控
    pub async fn start(&self) -> Result<()> {
        info!("启动定时调度器");
        let mut runner = JobRunner::new();

        // 1. 风控审计任务
        let audit_job = Arc::new(AuditJob::new(
            Arc::clone(&self.repo),
            Arc::clone(&self.auditor),
            Arc::clone(&self.executor),
            self.config.audit_batch_size,
        ));
        runner.add_interval_job("risk_audit", self.config.audit_interval, move || {
            let job = Arc::clone(&audit_job);
            async move { job.run_once().await }
        });

        // 2. 滞留意图兜底任务
        let execute_job = Arc::new(ExecuteJob::new(
            Arc::clone(&self.repo),
            Arc::clone(&self.executor),
            self.config.execute_batch_size,
        ));
        runner.add_interval_job("trade_execute", self.config.execute_interval, move || {
            let job = Arc::clone(&execute_job);
            async move { job.run_once().await }
        });

        // 3. 数据聚合任务
        let aggregate_job = Arc::new(AggregateJob::new(
            Arc::clone(&self.repo),
            Arc::clone(&self.venue),
        ));
        runner.add_interval_job(
            "data_aggregate",
            self.config.aggregation_interval,
            move || {
                let job = Arc::clone(&aggregate_job);
                async move { job.run_once().await }
            },
        );

        // 4. 每日结算任务
        let settlement_job = Arc::new(SettlementJob::new(Arc::clone(&self.repo)));
        runner.add_cron_job(
            "daily_settlement",
            &self.config.settlement_cron,
            move || {
                let job = Arc::clone(&settlement_job);
                async move { job.run_once().await }
            },
        )?;

        *self.runner.lock().await = Some(runner);

        self.engine.start().await;
        Ok(())
    }

    /// 停止调度：先停任务，再停实时风控
    pub async fn stop(&self) {
        info!("停止定时调度器");
        if let Some(runner) = self.runner.lock().await.take() {
            runner.shutdown().await;
        }
        self.engine.stop().await;
    }
}
