//! 执行工作池集成测试（内存仓储 + 模拟场所）

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal_macros::dec;
use uuid::Uuid;

use polyfund_domain::entities::{Position, TradeIntent};
use polyfund_domain::enums::{IntentStatus, OrderType, TradeSide};
use polyfund_domain::traits::{
    IntentRepository, Market, OrderRequest, OrderResponse, PositionRepository, Repository,
    VenueClient,
};
use polyfund_execution::{Executor, ExecutorConfig, SimulatedVenueClient};
use polyfund_infrastructure::MemoryRepository;

const MARKET: &str = "0x4d31";
const OUTCOME: &str = "1";

fn approved_intent(fund_id: Uuid, side: TradeSide, size: rust_decimal::Decimal, price: rust_decimal::Decimal) -> TradeIntent {
    let order_type = if price.is_zero() {
        OrderType::Market
    } else {
        OrderType::Limit
    };
    let mut intent = TradeIntent::new(
        fund_id,
        Uuid::new_v4(),
        MARKET.to_string(),
        OUTCOME.to_string(),
        side,
        size,
        price,
        order_type,
    )
    .unwrap();
    intent.status = IntentStatus::Approved;
    intent
}

async fn simulated_venue() -> Arc<SimulatedVenueClient> {
    let venue = Arc::new(SimulatedVenueClient::new());
    venue
        .set_market(Market {
            id: MARKET.to_string(),
            best_bid: dec!(0.54),
            best_ask: dec!(0.56),
            last_price: dec!(0.55),
            ..Default::default()
        })
        .await;
    venue
}

fn fast_config(workers: usize) -> ExecutorConfig {
    ExecutorConfig {
        workers,
        max_retries: 3,
        retry_interval: Duration::from_millis(10),
        queue_capacity: 1000,
    }
}

/// 轮询等待意图进入终态
async fn wait_for_terminal(repo: &MemoryRepository, intent_id: Uuid) -> TradeIntent {
    for _ in 0..500 {
        let intent = repo.get_trade_intent(intent_id).await.unwrap().unwrap();
        if intent.status.is_terminal() {
            return intent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("意图未在限期内进入终态");
}

#[tokio::test]
async fn happy_path_fill_updates_intent_and_position() {
    let repo = Arc::new(MemoryRepository::new());
    let venue = simulated_venue().await;
    let fund_id = Uuid::new_v4();

    // 已有仓位 50@0.5
    let mut pos = Position::empty(fund_id, MARKET.to_string(), OUTCOME.to_string());
    pos.apply_fill(TradeSide::Buy, dec!(50), dec!(0.5));
    repo.seed_position(pos).await;

    let intent = approved_intent(fund_id, TradeSide::Buy, dec!(30), dec!(0.55));
    let intent_id = intent.id;
    repo.seed_intent(intent).await;

    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue,
        fast_config(2),
    ));
    executor.start().await;
    executor.submit(intent_id);

    let done = wait_for_terminal(&repo, intent_id).await;
    executor.stop().await;

    assert_eq!(done.status, IntentStatus::Completed);
    assert_eq!(done.executed_price, dec!(0.55));
    assert!(done.executed_tx.is_some());
    assert!(done.executed_at.is_some());

    // entry = (0.5*50 + 0.55*30)/80 = 0.51875
    let position = repo
        .get_position(fund_id, MARKET, OUTCOME)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(position.size, dec!(80));
    assert_eq!(position.entry_price, dec!(0.51875));
    assert_eq!(position.current_price, dec!(0.55));
}

#[tokio::test]
async fn market_order_uses_best_quote_by_side() {
    let repo = Arc::new(MemoryRepository::new());
    let venue = simulated_venue().await;
    let fund_id = Uuid::new_v4();

    let intent = approved_intent(fund_id, TradeSide::Buy, dec!(10), dec!(0));
    let intent_id = intent.id;
    repo.seed_intent(intent).await;

    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue,
        fast_config(1),
    ));
    executor.start().await;
    executor.submit(intent_id);

    let done = wait_for_terminal(&repo, intent_id).await;
    executor.stop().await;

    assert_eq!(done.status, IntentStatus::Completed);
    // BUY市价单吃最优卖价
    assert_eq!(done.executed_price, dec!(0.56));
}

/// 下单永远超时的场所客户端
struct FailingVenue {
    attempts: AtomicU32,
}

#[async_trait]
impl VenueClient for FailingVenue {
    async fn get_market(&self, market_id: &str) -> Result<Market> {
        Ok(Market {
            id: market_id.to_string(),
            best_bid: dec!(0.54),
            best_ask: dec!(0.56),
            ..Default::default()
        })
    }

    async fn place_order(&self, _req: &OrderRequest) -> Result<OrderResponse> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("connection timed out"))
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn transient_errors_retry_then_fail() {
    let repo = Arc::new(MemoryRepository::new());
    let venue = Arc::new(FailingVenue {
        attempts: AtomicU32::new(0),
    });

    let intent = approved_intent(Uuid::new_v4(), TradeSide::Buy, dec!(10), dec!(0.55));
    let intent_id = intent.id;
    repo.seed_intent(intent).await;

    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue.clone(),
        fast_config(1),
    ));
    executor.start().await;
    executor.submit(intent_id);

    let done = wait_for_terminal(&repo, intent_id).await;
    executor.stop().await;

    assert_eq!(done.status, IntentStatus::Failed);
    assert_eq!(done.reject_reason.as_deref(), Some("重试3次后失败"));
    // 首次尝试 + 3次重试
    assert_eq!(venue.attempts.load(Ordering::SeqCst), 4);
}

/// 返回业务错误的场所客户端
struct RejectingVenue {
    attempts: AtomicU32,
}

#[async_trait]
impl VenueClient for RejectingVenue {
    async fn get_market(&self, market_id: &str) -> Result<Market> {
        Ok(Market {
            id: market_id.to_string(),
            best_bid: dec!(0.54),
            best_ask: dec!(0.56),
            ..Default::default()
        })
    }

    async fn place_order(&self, _req: &OrderRequest) -> Result<OrderResponse> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(OrderResponse {
            error: "insufficient balance".to_string(),
            ..Default::default()
        })
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn venue_business_error_fails_without_retry() {
    let repo = Arc::new(MemoryRepository::new());
    let venue = Arc::new(RejectingVenue {
        attempts: AtomicU32::new(0),
    });

    let intent = approved_intent(Uuid::new_v4(), TradeSide::Buy, dec!(10), dec!(0.55));
    let intent_id = intent.id;
    repo.seed_intent(intent).await;

    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue.clone(),
        fast_config(1),
    ));
    executor.start().await;
    executor.submit(intent_id);

    let done = wait_for_terminal(&repo, intent_id).await;
    executor.stop().await;

    assert_eq!(done.status, IntentStatus::Failed);
    assert!(done.reject_reason.unwrap().contains("订单错误"));
    assert_eq!(venue.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_approved_intent_is_abandoned() {
    let repo = Arc::new(MemoryRepository::new());
    let venue = simulated_venue().await;

    let mut intent = approved_intent(Uuid::new_v4(), TradeSide::Buy, dec!(10), dec!(0.55));
    intent.status = IntentStatus::Pending;
    let intent_id = intent.id;
    repo.seed_intent(intent).await;

    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue,
        fast_config(1),
    ));
    executor.start().await;
    executor.submit(intent_id);

    // 给工作协程一点处理时间
    tokio::time::sleep(Duration::from_millis(100)).await;
    executor.stop().await;

    let intent = repo.get_trade_intent(intent_id).await.unwrap().unwrap();
    assert_eq!(intent.status, IntentStatus::Pending);
}

#[tokio::test]
async fn concurrent_fills_serialize_on_position_row() {
    let repo = Arc::new(MemoryRepository::new());
    let venue = simulated_venue().await;
    let fund_id = Uuid::new_v4();

    let a = approved_intent(fund_id, TradeSide::Buy, dec!(30), dec!(0.5));
    let b = approved_intent(fund_id, TradeSide::Buy, dec!(50), dec!(0.6));
    let (a_id, b_id) = (a.id, b.id);
    repo.seed_intent(a).await;
    repo.seed_intent(b).await;

    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue,
        fast_config(2),
    ));
    executor.start().await;
    executor.submit(a_id);
    executor.submit(b_id);

    let a_done = wait_for_terminal(&repo, a_id).await;
    let b_done = wait_for_terminal(&repo, b_id).await;
    executor.stop().await;

    assert_eq!(a_done.status, IntentStatus::Completed);
    assert_eq!(b_done.status, IntentStatus::Completed);

    // 与完成顺序无关：数量相加，开仓价按成交量加权
    // entry = (0.5*30 + 0.6*50)/80 = 0.5625
    let position = repo
        .get_position(fund_id, MARKET, OUTCOME)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(position.size, dec!(80));
    assert_eq!(position.entry_price, dec!(0.5625));
}

#[tokio::test]
async fn queue_overflow_drops_and_counts() {
    let repo = Arc::new(MemoryRepository::new());
    let venue = simulated_venue().await;

    // 不启动工作协程，容量1的队列第二次提交必然溢出
    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue,
        ExecutorConfig {
            workers: 1,
            max_retries: 3,
            retry_interval: Duration::from_millis(10),
            queue_capacity: 1,
        },
    ));

    executor.submit(Uuid::new_v4());
    executor.submit(Uuid::new_v4());

    assert_eq!(executor.dropped_tasks(), 1);
}
