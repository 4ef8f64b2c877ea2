//! 实时风控引擎
//!
//! 单循环按固定间隔扫描全部ACTIVE基金的持仓，亏损百分比
//! 严格超过止损线时追加CRITICAL风控事件并调用止损执行器平仓。
//! 引擎对 StopLossExecutor 能力参数化，在组装期注入执行实现。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use polyfund_domain::entities::{Fund, RiskEvent};
use polyfund_domain::enums::RiskRuleType;
use polyfund_domain::traits::{
    FundRepository, PositionRepository, Repository, RiskRepository, StopLossExecutor,
};

use crate::rules::RuleParams;

pub struct RealtimeRiskEngine<E: StopLossExecutor + 'static> {
    repo: Arc<dyn Repository>,
    executor: Arc<E>,
    check_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<E: StopLossExecutor + 'static> RealtimeRiskEngine<E> {
    pub fn new(repo: Arc<dyn Repository>, executor: Arc<E>, check_interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            repo,
            executor,
            check_interval,
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// 启动监控循环（首次tick立即执行，之后按间隔周期执行）
    pub async fn start(&self) {
        info!("启动实时风控引擎, interval={:?}", self.check_interval);

        let repo = Arc::clone(&self.repo);
        let executor = Arc::clone(&self.executor);
        let check_interval = self.check_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweep_all_funds(&repo, &executor).await;
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        *self.handle.lock().await = Some(handle);
    }

    /// 停止监控并等待循环退出
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
        info!("实时风控引擎已停止");
    }

    /// 执行一轮完整扫描（测试入口，循环内部同款逻辑）
    pub async fn sweep_once(&self) {
        sweep_all_funds(&self.repo, &self.executor).await;
    }
}

/// 扫描所有ACTIVE基金，单个基金出错不影响其余
async fn sweep_all_funds<E: StopLossExecutor>(repo: &Arc<dyn Repository>, executor: &Arc<E>) {
    let funds = match repo.get_active_funds().await {
        Ok(funds) => funds,
        Err(e) => {
            error!("获取活跃基金失败: {}", e);
            return;
        }
    };

    for fund in funds {
        if let Err(e) = check_fund(repo, executor, &fund).await {
            error!(fund_id = %fund.id, "检查基金风控失败: {}", e);
        }
    }
}

/// 解析基金的止损阈值：优先STOP_LOSS规则，退化到基金默认值；
/// 两者都未配置（默认值为0）时不监控。
async fn resolve_threshold(repo: &Arc<dyn Repository>, fund: &Fund) -> Result<Option<Decimal>> {
    let rules = repo
        .get_risk_rules_by_type(fund.id, RiskRuleType::StopLoss)
        .await
        .context("获取止损规则失败")?;

    if let Some(rule) = rules.first() {
        let params =
            RuleParams::parse(RiskRuleType::StopLoss, &rule.params).context("解析止损参数失败")?;
        if let RuleParams::StopLoss(p) = params {
            return Ok(Some(p.stop_loss_percent));
        }
    }

    if fund.stop_loss_percent.is_zero() {
        return Ok(None);
    }
    Ok(Some(fund.stop_loss_percent))
}

async fn check_fund<E: StopLossExecutor>(
    repo: &Arc<dyn Repository>,
    executor: &Arc<E>,
    fund: &Fund,
) -> Result<()> {
    let threshold = match resolve_threshold(repo, fund).await? {
        Some(t) => t,
        None => return Ok(()),
    };

    let positions = repo
        .get_fund_positions(fund.id)
        .await
        .context("获取持仓失败")?;

    for pos in positions {
        if pos.size.is_zero() {
            continue;
        }

        let loss_percent = pos.loss_percent();
        if loss_percent <= threshold {
            continue;
        }

        warn!(
            fund_id = %fund.id,
            market_id = %pos.market_id,
            loss_percent = %loss_percent,
            "触发止损"
        );

        let event = RiskEvent::critical(
            fund.id,
            RiskRuleType::StopLoss,
            pos.market_id.clone(),
            format!(
                "持仓亏损 {}%，触发止损线 {}%",
                loss_percent.round_dp(2),
                threshold.round_dp(2)
            ),
        );
        if let Err(e) = repo.create_risk_event(&event).await {
            error!("记录风控事件失败: {}", e);
        }

        // 止损平仓失败只记录，继续处理其他持仓
        if let Err(e) = executor.close_position(&pos).await {
            error!(
                fund_id = %fund.id,
                market_id = %pos.market_id,
                "执行止损平仓失败: {}", e
            );
        }
    }

    Ok(())
}
