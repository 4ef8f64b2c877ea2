//! 交易执行工作池
//!
//! 有界FIFO任务队列 + N个工作协程。每个任务驱动一条意图走
//! APPROVED → EXECUTING → {COMPLETED | FAILED}：调用场所客户端下单、
//! 持久化结果、更新持仓。暂时性失败带间隔重试，场所业务拒绝立即失败，
//! 前置条件不满足直接放弃。
//!
//! 队列满时任务被丢弃（计数 + 错误日志），滞留意图由调度器的兜底扫描
//! 重新入队。止损快速路径绕过队列同步执行。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use polyfund_common::utils::time::nanos_now;
use polyfund_domain::entities::{AuditLog, Position, TradeIntent};
use polyfund_domain::enums::{AuditResult, IntentStatus, RiskRuleType, TradeSide};
use polyfund_domain::traits::{
    IntentRepository, OrderRequest, OrderResponse, PositionRepository, Repository, RiskRepository,
    StopLossExecutor, VenueClient,
};

/// 订单有效期
const ORDER_EXPIRY_SECS: i64 = 300;

/// 执行任务
#[derive(Debug, Clone)]
pub struct ExecutionTask {
    pub intent_id: Uuid,
    pub retries: u32,
}

/// 执行错误分类，决定重试策略
#[derive(Error, Debug)]
pub enum ExecError {
    /// 状态不满足预期，放弃任务，不重试
    #[error("前置条件不满足: {0}")]
    Precondition(String),

    /// 传输层/存储层失败，可重试
    #[error("暂时性失败: {0}")]
    Transient(String),

    /// 场所返回业务错误，立即失败，不重试
    #[error("场所拒绝: {0}")]
    Venue(String),
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub workers: usize,
    pub max_retries: u32,
    pub retry_interval: std::time::Duration,
    pub queue_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_retries: 3,
            retry_interval: std::time::Duration::from_secs(5),
            queue_capacity: 1000,
        }
    }
}

type PositionKey = (Uuid, String, String);

pub struct Executor {
    repo: Arc<dyn Repository>,
    venue: Arc<dyn VenueClient>,
    config: ExecutorConfig,

    task_tx: mpsc::Sender<ExecutionTask>,
    task_rx: Arc<Mutex<mpsc::Receiver<ExecutionTask>>>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// 队列满被丢弃的任务计数
    dropped_tasks: AtomicU64,
    /// 同一 (fund, market, outcome) 的持仓更新串行化
    position_locks: Mutex<HashMap<PositionKey, Arc<Mutex<()>>>>,
}

impl Executor {
    pub fn new(
        repo: Arc<dyn Repository>,
        venue: Arc<dyn VenueClient>,
        config: ExecutorConfig,
    ) -> Self {
        let (task_tx, task_rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            repo,
            venue,
            config,
            task_tx,
            task_rx: Arc::new(Mutex::new(task_rx)),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
            dropped_tasks: AtomicU64::new(0),
            position_locks: Mutex::new(HashMap::new()),
        }
    }

    /// 启动工作协程
    pub async fn start(self: &Arc<Self>) {
        info!("启动交易执行器, workers={}", self.config.workers);
        let mut handles = self.handles.lock().await;
        for worker_id in 0..self.config.workers {
            let executor = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                executor.worker_loop(worker_id).await;
            }));
        }
    }

    /// 停止执行器：广播关闭信号并等待全部工作协程退出
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("交易执行器已停止");
    }

    /// 提交执行任务（非阻塞，队列满时丢弃）
    pub fn submit(&self, intent_id: Uuid) {
        self.enqueue(ExecutionTask {
            intent_id,
            retries: 0,
        });
    }

    /// 被丢弃的任务总数
    pub fn dropped_tasks(&self) -> u64 {
        self.dropped_tasks.load(Ordering::Relaxed)
    }

    fn enqueue(&self, task: ExecutionTask) {
        match self.task_tx.try_send(task) {
            Ok(()) => debug!("任务已加入队列"),
            Err(TrySendError::Full(task)) => {
                self.dropped_tasks.fetch_add(1, Ordering::Relaxed);
                error!(intent_id = %task.intent_id, "任务队列已满，任务被丢弃");
            }
            Err(TrySendError::Closed(task)) => {
                error!(intent_id = %task.intent_id, "任务队列已关闭");
            }
        }
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        info!("执行器工作协程启动, worker_id={}", worker_id);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            // 接收端共享，出队互斥，处理并行
            let task = {
                let mut rx = self.task_rx.lock().await;
                tokio::select! {
                    _ = shutdown_rx.recv() => None,
                    task = rx.recv() => task,
                }
            };

            let Some(task) = task else { break };
            self.handle_task(task).await;
        }

        info!("执行器工作协程退出, worker_id={}", worker_id);
    }

    /// 执行任务并按错误分类处理善后
    async fn handle_task(&self, task: ExecutionTask) {
        match self.execute_task(&task).await {
            Ok(()) => {}
            Err(ExecError::Precondition(msg)) => {
                warn!(intent_id = %task.intent_id, "放弃任务: {}", msg);
            }
            Err(ExecError::Venue(msg)) => {
                error!(intent_id = %task.intent_id, "场所拒绝订单: {}", msg);
                self.fail_intent(task.intent_id, format!("订单错误: {}", msg))
                    .await;
            }
            Err(ExecError::Transient(msg)) => {
                error!(
                    intent_id = %task.intent_id,
                    retries = task.retries,
                    "任务执行失败: {}", msg
                );
                if task.retries < self.config.max_retries {
                    tokio::time::sleep(self.config.retry_interval).await;
                    self.enqueue(ExecutionTask {
                        intent_id: task.intent_id,
                        retries: task.retries + 1,
                    });
                } else {
                    self.fail_intent(
                        task.intent_id,
                        format!("重试{}次后失败", self.config.max_retries),
                    )
                    .await;
                }
            }
        }
    }

    /// 单次执行尝试
    async fn execute_task(&self, task: &ExecutionTask) -> Result<(), ExecError> {
        let mut intent = self
            .repo
            .get_trade_intent(task.intent_id)
            .await
            .map_err(|e| ExecError::Transient(format!("获取交易意图失败: {}", e)))?
            .ok_or_else(|| ExecError::Precondition(format!("意图不存在: {}", task.intent_id)))?;

        match intent.status {
            IntentStatus::Approved => {
                // 状态CAS：观察到APPROVED才允许进入执行，竞争失败即放弃
                let won = self
                    .repo
                    .transition_intent_status(
                        intent.id,
                        IntentStatus::Approved,
                        IntentStatus::Executing,
                    )
                    .await
                    .map_err(|e| ExecError::Transient(format!("更新状态失败: {}", e)))?;
                if !won {
                    return Err(ExecError::Precondition(
                        "意图状态已被并发修改".to_string(),
                    ));
                }
                intent
                    .begin_execution()
                    .map_err(|e| ExecError::Precondition(e.to_string()))?;
            }
            // 本任务先前的尝试已完成 APPROVED → EXECUTING 迁移，重试不重复迁移
            IntentStatus::Executing if task.retries > 0 => {}
            other => {
                return Err(ExecError::Precondition(format!("意图状态不正确: {}", other)));
            }
        }

        // 确定执行价格：限价单用限价，市价单取对手方最优价
        let market = self
            .venue
            .get_market(&intent.market_id)
            .await
            .map_err(|e| ExecError::Transient(format!("获取市场信息失败: {}", e)))?;
        let execution_price = if intent.price.is_zero() {
            match intent.side {
                TradeSide::Buy => market.best_ask,
                TradeSide::Sell => market.best_bid,
            }
        } else {
            intent.price
        };

        let order_req = OrderRequest {
            market_id: intent.market_id.clone(),
            outcome_id: intent.outcome_id.clone(),
            side: intent.side,
            size: intent.size,
            price: execution_price,
            order_type: intent.order_type,
            nonce: nanos_now(),
            expiration: Utc::now().timestamp() + ORDER_EXPIRY_SECS,
        };

        info!(
            intent_id = %intent.id,
            market_id = %intent.market_id,
            side = %intent.side,
            size = %intent.size,
            price = %execution_price,
            "执行交易"
        );

        let resp = self
            .venue
            .place_order(&order_req)
            .await
            .map_err(|e| ExecError::Transient(format!("下单失败: {}", e)))?;
        if !resp.error.is_empty() {
            return Err(ExecError::Venue(resp.error.clone()));
        }

        // 下单已成功，后续持久化失败只记录，避免重试造成重复下单
        if let Err(e) = intent.complete(resp.transaction_id.clone(), resp.avg_fill_price, Utc::now())
        {
            error!(intent_id = %intent.id, "记录完成状态失败: {}", e);
        } else if let Err(e) = self.repo.update_trade_intent(&intent).await {
            error!(intent_id = %intent.id, "更新意图完成状态失败: {}", e);
        }

        if let Err(e) = self.apply_fill_to_position(&intent, &resp).await {
            error!(intent_id = %intent.id, "更新持仓失败: {}", e);
        }

        info!(
            intent_id = %intent.id,
            tx_id = %resp.transaction_id,
            avg_price = %resp.avg_fill_price,
            "交易执行完成"
        );
        Ok(())
    }

    /// 持仓读改写，同一键串行
    async fn apply_fill_to_position(
        &self,
        intent: &TradeIntent,
        resp: &OrderResponse,
    ) -> Result<()> {
        let key: PositionKey = (
            intent.fund_id,
            intent.market_id.clone(),
            intent.outcome_id.clone(),
        );
        let key_lock = {
            let mut locks = self.position_locks.lock().await;
            Arc::clone(locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))))
        };
        let _guard = key_lock.lock().await;

        let mut position = self
            .repo
            .get_position(intent.fund_id, &intent.market_id, &intent.outcome_id)
            .await
            .context("查询持仓失败")?
            .unwrap_or_else(|| {
                Position::empty(
                    intent.fund_id,
                    intent.market_id.clone(),
                    intent.outcome_id.clone(),
                )
            });

        position.apply_fill(intent.side, resp.filled_size, resp.avg_fill_price);
        self.repo
            .save_position(&position)
            .await
            .context("保存持仓失败")
    }

    /// 标记意图失败并记录原因
    async fn fail_intent(&self, intent_id: Uuid, reason: String) {
        match self.repo.get_trade_intent(intent_id).await {
            Ok(Some(mut intent)) => {
                intent.status = IntentStatus::Failed;
                intent.reject_reason = Some(reason);
                intent.updated_at = Utc::now();
                if let Err(e) = self.repo.update_trade_intent(&intent).await {
                    error!(intent_id = %intent_id, "更新失败状态失败: {}", e);
                }
            }
            Ok(None) => error!(intent_id = %intent_id, "意图不存在"),
            Err(e) => error!(intent_id = %intent_id, "获取意图失败: {}", e),
        }
    }
}

/// 止损快速路径：合成平仓意图并同步执行，绕过审计队列。
/// 止损规则已经触发，事前审计没有意义；补一条合成审计日志闭合审计链路。
#[async_trait]
impl StopLossExecutor for Executor {
    async fn close_position(&self, position: &Position) -> Result<()> {
        warn!(
            fund_id = %position.fund_id,
            market_id = %position.market_id,
            size = %position.size,
            "执行止损平仓"
        );

        let intent = TradeIntent::system_close(
            position.fund_id,
            position.market_id.clone(),
            position.outcome_id.clone(),
            position.close_side(),
            position.size.abs(),
        );
        self.repo
            .create_trade_intent(&intent)
            .await
            .context("创建平仓意图失败")?;

        let log = AuditLog::new(
            intent.id,
            RiskRuleType::StopLoss,
            AuditResult::Pass,
            "自动止损平仓，绕过审计".to_string(),
        );
        if let Err(e) = self.repo.create_audit_log(&log).await {
            error!(intent_id = %intent.id, "记录审计日志失败: {}", e);
        }

        // 同步执行，不经过队列
        let task = ExecutionTask {
            intent_id: intent.id,
            retries: 0,
        };
        match self.execute_task(&task).await {
            Ok(()) => Ok(()),
            Err(ExecError::Transient(msg)) => {
                // 转入队列继续按重试路径处理
                self.enqueue(ExecutionTask {
                    intent_id: intent.id,
                    retries: 1,
                });
                Err(anyhow!("止损平仓首次尝试失败，已转入重试: {}", msg))
            }
            Err(ExecError::Venue(msg)) => {
                self.fail_intent(intent.id, format!("订单错误: {}", msg)).await;
                Err(anyhow!("止损平仓被场所拒绝: {}", msg))
            }
            Err(ExecError::Precondition(msg)) => Err(anyhow!("止损平仓前置条件不满足: {}", msg)),
        }
    }
}
