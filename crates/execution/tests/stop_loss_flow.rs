//! 止损快速路径端到端测试：实时风控引擎 → 执行器同步平仓

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use uuid::Uuid;

use polyfund_domain::entities::{Fund, Position};
use polyfund_domain::enums::{
    AuditResult, FundStatus, IntentOrigin, IntentStatus, OrderType, RiskSeverity, TradeSide,
};
use polyfund_domain::traits::{Market, PositionRepository, Repository};
use polyfund_execution::{Executor, ExecutorConfig, SimulatedVenueClient};
use polyfund_infrastructure::MemoryRepository;
use polyfund_risk::RealtimeRiskEngine;

const MARKET: &str = "0x4d31";
const OUTCOME: &str = "1";

#[tokio::test]
async fn stop_loss_breach_closes_position_synchronously() {
    let repo = Arc::new(MemoryRepository::new());

    // 基金默认止损线10%
    let mut fund = Fund::new("测试基金".to_string(), Uuid::new_v4(), dec!(1000), dec!(10));
    fund.status = FundStatus::Active;
    repo.seed_fund(fund.clone()).await;

    // 多头100 entry 0.60，标记价跌到0.50 → 亏损 ≈ 16.67%
    let mut pos = Position::empty(fund.id, MARKET.to_string(), OUTCOME.to_string());
    pos.apply_fill(TradeSide::Buy, dec!(100), dec!(0.60));
    pos.current_price = dec!(0.50);
    repo.seed_position(pos).await;

    let venue = Arc::new(SimulatedVenueClient::new());
    venue
        .set_market(Market {
            id: MARKET.to_string(),
            best_bid: dec!(0.50),
            best_ask: dec!(0.52),
            last_price: dec!(0.50),
            ..Default::default()
        })
        .await;

    // 工作池无需启动：快速路径同步执行，不走队列
    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue,
        ExecutorConfig {
            workers: 1,
            max_retries: 3,
            retry_interval: Duration::from_millis(10),
            queue_capacity: 100,
        },
    ));

    let engine = RealtimeRiskEngine::new(
        repo.clone() as Arc<dyn Repository>,
        executor.clone(),
        Duration::from_secs(30),
    );
    engine.sweep_once().await;

    // CRITICAL 风控事件
    let events = repo.risk_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, RiskSeverity::Critical);

    // 系统来源的市价SELL意图已同步执行完成
    let intents = repo.all_intents().await;
    assert_eq!(intents.len(), 1);
    let close = &intents[0];
    assert_eq!(close.origin, IntentOrigin::System);
    assert!(close.manager_id.is_none());
    assert_eq!(close.side, TradeSide::Sell);
    assert_eq!(close.size, dec!(100));
    assert_eq!(close.order_type, OrderType::Market);
    assert_eq!(close.status, IntentStatus::Completed);
    // SELL市价单按最优买价成交
    assert_eq!(close.executed_price, dec!(0.50));

    // 平仓后持仓归零，开仓价保留
    let position = repo
        .get_position(fund.id, MARKET, OUTCOME)
        .await
        .unwrap()
        .unwrap();
    assert!(position.size.is_zero());
    assert_eq!(position.entry_price, dec!(0.60));

    // 审计被绕过，但留有合成审计日志
    let logs = repo.audit_logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].intent_id, close.id);
    assert_eq!(logs[0].result, AuditResult::Pass);
    assert!(logs[0].details.contains("绕过审计"));
}

#[tokio::test]
async fn short_position_closes_with_buy() {
    let repo = Arc::new(MemoryRepository::new());

    let mut fund = Fund::new("测试基金".to_string(), Uuid::new_v4(), dec!(1000), dec!(10));
    fund.status = FundStatus::Active;
    repo.seed_fund(fund.clone()).await;

    // 空头100 entry 0.50，标记价涨到0.60 → 亏损20%
    let mut pos = Position::empty(fund.id, MARKET.to_string(), OUTCOME.to_string());
    pos.apply_fill(TradeSide::Sell, dec!(100), dec!(0.50));
    pos.current_price = dec!(0.60);
    repo.seed_position(pos).await;

    let venue = Arc::new(SimulatedVenueClient::new());
    venue
        .set_market(Market {
            id: MARKET.to_string(),
            best_bid: dec!(0.59),
            best_ask: dec!(0.61),
            last_price: dec!(0.60),
            ..Default::default()
        })
        .await;

    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue,
        ExecutorConfig {
            workers: 1,
            max_retries: 3,
            retry_interval: Duration::from_millis(10),
            queue_capacity: 100,
        },
    ));

    RealtimeRiskEngine::new(
        repo.clone() as Arc<dyn Repository>,
        executor.clone(),
        Duration::from_secs(30),
    )
    .sweep_once()
    .await;

    let intents = repo.all_intents().await;
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].side, TradeSide::Buy);
    assert_eq!(intents[0].status, IntentStatus::Completed);
    // BUY市价单按最优卖价成交
    assert_eq!(intents[0].executed_price, dec!(0.61));

    let position = repo
        .get_position(fund.id, MARKET, OUTCOME)
        .await
        .unwrap()
        .unwrap();
    assert!(position.size.is_zero());
}
