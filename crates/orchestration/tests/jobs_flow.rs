//! 周期任务集成测试（内存仓储 + 模拟场所）

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

use polyfund_domain::entities::{Fund, MarketData, Position, RiskRule, TradeIntent};
use polyfund_domain::enums::{FundStatus, IntentStatus, OrderType, RiskRuleType, TradeSide};
use polyfund_domain::traits::{
    FundRepository, IntentRepository, Market, MarketDataRepository, PositionRepository,
    Repository, VenueClient,
};
use polyfund_execution::{Executor, ExecutorConfig, SimulatedVenueClient};
use polyfund_infrastructure::MemoryRepository;
use polyfund_orchestration::{AggregateJob, AuditJob, ExecuteJob, SettlementJob};
use polyfund_risk::Auditor;

const MARKET: &str = "0x4d31";
const OUTCOME: &str = "1";

struct Fixture {
    repo: Arc<MemoryRepository>,
    venue: Arc<SimulatedVenueClient>,
    executor: Arc<Executor>,
    fund: Fund,
}

async fn fixture() -> Fixture {
    let repo = Arc::new(MemoryRepository::new());

    let mut fund = Fund::new("测试基金".to_string(), Uuid::new_v4(), dec!(1000), dec!(10));
    fund.status = FundStatus::Active;
    fund.total_aum = dec!(10000);
    repo.seed_fund(fund.clone()).await;

    repo.seed_market(MarketData {
        market_id: MARKET.to_string(),
        question: "Will it settle YES?".to_string(),
        active: true,
        closed: false,
        best_bid: dec!(0.54),
        best_ask: dec!(0.56),
        last_price: dec!(0.55),
        volume: dec!(1000),
        liquidity: dec!(500),
        updated_at: Utc::now(),
    })
    .await;

    let venue = Arc::new(SimulatedVenueClient::new());
    venue
        .set_market(Market {
            id: MARKET.to_string(),
            active: true,
            best_bid: dec!(0.54),
            best_ask: dec!(0.56),
            last_price: dec!(0.55),
            volume: dec!(2000),
            liquidity: dec!(800),
            ..Default::default()
        })
        .await;

    let executor = Arc::new(Executor::new(
        repo.clone() as Arc<dyn Repository>,
        venue.clone() as Arc<dyn VenueClient>,
        ExecutorConfig {
            workers: 2,
            max_retries: 3,
            retry_interval: Duration::from_millis(10),
            queue_capacity: 100,
        },
    ));

    Fixture {
        repo,
        venue,
        executor,
        fund,
    }
}

fn pending_intent(fund_id: Uuid, size: rust_decimal::Decimal) -> TradeIntent {
    TradeIntent::new(
        fund_id,
        Uuid::new_v4(),
        MARKET.to_string(),
        OUTCOME.to_string(),
        TradeSide::Buy,
        size,
        dec!(0.55),
        OrderType::Limit,
    )
    .unwrap()
}

async fn wait_for_status(
    repo: &MemoryRepository,
    intent_id: Uuid,
    expected: IntentStatus,
) -> TradeIntent {
    for _ in 0..500 {
        let intent = repo.get_trade_intent(intent_id).await.unwrap().unwrap();
        if intent.status == expected {
            return intent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("意图未达到预期状态 {:?}", expected);
}

#[tokio::test]
async fn audit_sweep_approves_and_drives_execution() {
    let fx = fixture().await;
    fx.repo
        .seed_rule(RiskRule::new(
            fx.fund.id,
            RiskRuleType::PositionLimit,
            r#"{"max_single_position":"100","max_position_size":"500","max_total_exposure":"10000"}"#
                .to_string(),
            "仓位限制".to_string(),
        ))
        .await;

    let ok = pending_intent(fx.fund.id, dec!(30));
    let rejected = pending_intent(fx.fund.id, dec!(150));
    let (ok_id, rejected_id) = (ok.id, rejected.id);
    fx.repo.seed_intent(ok).await;
    fx.repo.seed_intent(rejected).await;

    fx.executor.start().await;
    let job = AuditJob::new(
        fx.repo.clone() as Arc<dyn Repository>,
        Arc::new(Auditor::new(fx.repo.clone() as Arc<dyn Repository>)),
        fx.executor.clone(),
        100,
    );
    job.run_once().await;

    // 通过审计的意图最终被工作池执行完成
    let done = wait_for_status(&fx.repo, ok_id, IntentStatus::Completed).await;
    assert!(done.executed_tx.is_some());

    // 超限意图被拒绝且不会进入执行
    let rejected = fx.repo.get_trade_intent(rejected_id).await.unwrap().unwrap();
    assert_eq!(rejected.status, IntentStatus::Rejected);
    assert!(rejected.reject_reason.unwrap().contains("超过单笔上限"));

    fx.executor.stop().await;

    // 两条意图各产生一条审计日志
    assert_eq!(fx.repo.audit_logs().await.len(), 2);
}

#[tokio::test]
async fn stale_approved_sweeper_rescues_dropped_intents() {
    let fx = fixture().await;

    // 模拟队列满丢弃：意图停留在APPROVED超过5分钟
    let mut stranded = pending_intent(fx.fund.id, dec!(20));
    stranded.status = IntentStatus::Approved;
    stranded.updated_at = Utc::now() - chrono::Duration::minutes(6);
    let stranded_id = stranded.id;
    fx.repo.seed_intent(stranded).await;

    fx.executor.start().await;
    let job = ExecuteJob::new(
        fx.repo.clone() as Arc<dyn Repository>,
        fx.executor.clone(),
        50,
    );
    job.run_once().await;

    let done = wait_for_status(&fx.repo, stranded_id, IntentStatus::Completed).await;
    assert_eq!(done.executed_price, dec!(0.55));

    fx.executor.stop().await;
}

#[tokio::test]
async fn fresh_approved_intents_are_not_swept() {
    let fx = fixture().await;

    let mut fresh = pending_intent(fx.fund.id, dec!(20));
    fresh.status = IntentStatus::Approved;
    let fresh_id = fresh.id;
    fx.repo.seed_intent(fresh).await;

    fx.executor.start().await;
    let job = ExecuteJob::new(
        fx.repo.clone() as Arc<dyn Repository>,
        fx.executor.clone(),
        50,
    );
    job.run_once().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    fx.executor.stop().await;

    let intent = fx.repo.get_trade_intent(fresh_id).await.unwrap().unwrap();
    assert_eq!(intent.status, IntentStatus::Approved);
}

#[tokio::test]
async fn aggregation_refreshes_marks_and_pnl() {
    let fx = fixture().await;

    // 场所行情已变化：last 0.60
    fx.venue
        .set_market(Market {
            id: MARKET.to_string(),
            active: true,
            best_bid: dec!(0.59),
            best_ask: dec!(0.61),
            last_price: dec!(0.60),
            volume: dec!(3000),
            liquidity: dec!(900),
            ..Default::default()
        })
        .await;

    // 多头50 entry 0.5
    let mut pos = Position::empty(fx.fund.id, MARKET.to_string(), OUTCOME.to_string());
    pos.apply_fill(TradeSide::Buy, dec!(50), dec!(0.5));
    fx.repo.seed_position(pos).await;

    AggregateJob::new(
        fx.repo.clone() as Arc<dyn Repository>,
        fx.venue.clone() as Arc<dyn VenueClient>,
    )
    .run_once()
    .await;

    // 行情缓存已刷新
    let market = fx
        .repo
        .get_market_data(MARKET)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(market.last_price, dec!(0.60));
    assert_eq!(market.best_bid, dec!(0.59));

    // 未实现盈亏 = (0.60 - 0.5) * 50 = 5
    let position = fx
        .repo
        .get_position(fx.fund.id, MARKET, OUTCOME)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(position.unrealized_pnl, dec!(5.0));
    assert_eq!(position.current_price, dec!(0.60));
}

#[tokio::test]
async fn settlement_recomputes_nav_and_resets_daily_pnl() {
    let fx = fixture().await;

    // 两个持仓：80 * 0.55 + 40 * 0.5 = 64
    let mut p1 = Position::empty(fx.fund.id, MARKET.to_string(), OUTCOME.to_string());
    p1.apply_fill(TradeSide::Buy, dec!(80), dec!(0.55));
    p1.realized_pnl_today = dec!(-3);
    let mut p2 = Position::empty(fx.fund.id, "0x9f2a".to_string(), "2".to_string());
    p2.apply_fill(TradeSide::Buy, dec!(40), dec!(0.5));
    fx.repo.seed_position(p1).await;
    fx.repo.seed_position(p2).await;

    SettlementJob::new(fx.repo.clone() as Arc<dyn Repository>)
        .run_once()
        .await;

    let fund = fx.repo.get_fund(fx.fund.id).await.unwrap().unwrap();
    assert_eq!(fund.total_aum, dec!(64));

    // 当日已实现盈亏清零，日亏损统计窗口重开
    for pos in fx.repo.get_fund_positions(fx.fund.id).await.unwrap() {
        assert!(pos.realized_pnl_today.is_zero());
    }
}
