//! 应用组装与生命周期

use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tracing::{info, warn};

use polyfund_core::{
    close_db_pool, env_or_default, init_db_pool, init_shutdown_manager, setup_logging, AppConfig,
    ShutdownManager,
};
use polyfund_domain::traits::{Repository, VenueClient};
use polyfund_execution::{Executor, ExecutorConfig, PolymarketClient, SimulatedVenueClient};
use polyfund_infrastructure::SqlxRepository;
use polyfund_orchestration::Scheduler;
use polyfund_risk::{Auditor, RealtimeRiskEngine};

/// 环境、日志与数据库初始化
pub async fn app_init() -> Result<()> {
    dotenv().ok();
    setup_logging().await?;
    init_db_pool().await?;
    Ok(())
}

/// 选择交易场所客户端：默认Polymarket，VENUE_MODE=simulated 时纸面交易
fn build_venue_client() -> Result<Arc<dyn VenueClient>> {
    match env_or_default("VENUE_MODE", "polymarket").as_str() {
        "simulated" => {
            warn!("使用模拟交易场所客户端（纸面交易模式）");
            Ok(Arc::new(SimulatedVenueClient::new()))
        }
        _ => Ok(Arc::new(PolymarketClient::from_env()?)),
    }
}

/// 组装组件并运行到收到退出信号
pub async fn run() -> Result<()> {
    let config = AppConfig::from_env();

    let repo: Arc<dyn Repository> = Arc::new(SqlxRepository::from_global_pool());
    let venue = build_venue_client()?;

    let auditor = Arc::new(Auditor::new(Arc::clone(&repo)));
    let executor = Arc::new(Executor::new(
        Arc::clone(&repo),
        Arc::clone(&venue),
        ExecutorConfig {
            workers: config.worker_count,
            max_retries: config.max_retries,
            retry_interval: config.retry_interval,
            queue_capacity: config.task_queue_capacity,
        },
    ));
    let engine = Arc::new(RealtimeRiskEngine::new(
        Arc::clone(&repo),
        Arc::clone(&executor),
        config.realtime_check_interval,
    ));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&repo),
        auditor,
        Arc::clone(&executor),
        venue,
        engine,
        config.clone(),
    ));

    executor.start().await;
    scheduler.start().await?;

    info!(
        workers = config.worker_count,
        audit_interval = ?config.audit_interval,
        execute_interval = ?config.execute_interval,
        "Polymarket基金调度系统已启动"
    );

    // 关闭顺序：调度任务与实时风控 → 执行工作池 → 数据库连接池
    let shutdown = init_shutdown_manager(None);
    {
        let scheduler = Arc::clone(&scheduler);
        shutdown
            .register_shutdown_hook("scheduler", move || {
                let scheduler = Arc::clone(&scheduler);
                async move {
                    scheduler.stop().await;
                    Ok(())
                }
            })
            .await;
    }
    {
        let executor = Arc::clone(&executor);
        shutdown
            .register_shutdown_hook("executor", move || {
                let executor = Arc::clone(&executor);
                async move {
                    executor.stop().await;
                    Ok(())
                }
            })
            .await;
    }
    shutdown
        .register_shutdown_hook("db_pool", || async { close_db_pool().await })
        .await;

    let signal = ShutdownManager::wait_for_shutdown_signal().await;
    info!("收到退出信号: {}，正在关闭系统...", signal);
    shutdown.shutdown().await?;
    info!("系统已安全关闭");

    Ok(())
}
