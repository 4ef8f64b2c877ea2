//! 实时风控引擎集成测试

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;
use uuid::Uuid;

use polyfund_domain::entities::{Fund, Position, RiskRule};
use polyfund_domain::enums::{FundStatus, RiskRuleType, RiskSeverity, TradeSide};
use polyfund_domain::traits::{Repository, StopLossExecutor};
use polyfund_infrastructure::MemoryRepository;
use polyfund_risk::RealtimeRiskEngine;

/// 记录被调用持仓的打桩执行器
#[derive(Default)]
struct RecordingExecutor {
    closed: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl StopLossExecutor for RecordingExecutor {
    async fn close_position(&self, position: &Position) -> Result<()> {
        self.closed.lock().await.push(position.id);
        Ok(())
    }
}

async fn active_fund(repo: &MemoryRepository, stop_loss_percent: rust_decimal::Decimal) -> Fund {
    let mut fund = Fund::new(
        "测试基金".to_string(),
        Uuid::new_v4(),
        dec!(1000),
        stop_loss_percent,
    );
    fund.status = FundStatus::Active;
    repo.seed_fund(fund.clone()).await;
    fund
}

fn long_position(fund_id: Uuid, entry: rust_decimal::Decimal, mark: rust_decimal::Decimal) -> Position {
    let mut pos = Position::empty(fund_id, "0x4d31".to_string(), "1".to_string());
    pos.apply_fill(TradeSide::Buy, dec!(100), entry);
    pos.current_price = mark;
    pos
}

fn engine(
    repo: Arc<MemoryRepository>,
    executor: Arc<RecordingExecutor>,
) -> RealtimeRiskEngine<RecordingExecutor> {
    RealtimeRiskEngine::new(
        repo as Arc<dyn Repository>,
        executor,
        Duration::from_secs(30),
    )
}

#[tokio::test]
async fn breach_emits_critical_event_and_invokes_executor() {
    let repo = Arc::new(MemoryRepository::new());
    let executor = Arc::new(RecordingExecutor::default());

    // 默认止损线10%，多头 entry 0.60 → mark 0.50，亏损 ≈ 16.67%
    let fund = active_fund(&repo, dec!(10)).await;
    let pos = long_position(fund.id, dec!(0.60), dec!(0.50));
    repo.seed_position(pos.clone()).await;

    engine(repo.clone(), executor.clone()).sweep_once().await;

    let events = repo.risk_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, RiskSeverity::Critical);
    assert_eq!(events[0].rule_type, RiskRuleType::StopLoss);
    assert!(events[0].description.contains("触发止损线"));

    assert_eq!(*executor.closed.lock().await, vec![pos.id]);
}

#[tokio::test]
async fn loss_at_threshold_does_not_trigger() {
    let repo = Arc::new(MemoryRepository::new());
    let executor = Arc::new(RecordingExecutor::default());

    // entry 0.60 → mark 0.54，亏损恰好 10%，不严格大于阈值
    let fund = active_fund(&repo, dec!(10)).await;
    repo.seed_position(long_position(fund.id, dec!(0.60), dec!(0.54)))
        .await;

    engine(repo.clone(), executor.clone()).sweep_once().await;

    assert!(repo.risk_events().await.is_empty());
    assert!(executor.closed.lock().await.is_empty());
}

#[tokio::test]
async fn rule_threshold_overrides_fund_default() {
    let repo = Arc::new(MemoryRepository::new());
    let executor = Arc::new(RecordingExecutor::default());

    // 默认50%不会触发，规则5%会触发
    let fund = active_fund(&repo, dec!(50)).await;
    repo.seed_rule(RiskRule::new(
        fund.id,
        RiskRuleType::StopLoss,
        r#"{"stop_loss_percent":"5"}"#.to_string(),
        "止损线".to_string(),
    ))
    .await;
    repo.seed_position(long_position(fund.id, dec!(0.60), dec!(0.55)))
        .await;

    engine(repo.clone(), executor.clone()).sweep_once().await;

    assert_eq!(repo.risk_events().await.len(), 1);
    assert_eq!(executor.closed.lock().await.len(), 1);
}

#[tokio::test]
async fn unset_threshold_and_dormant_positions_are_skipped() {
    let repo = Arc::new(MemoryRepository::new());
    let executor = Arc::new(RecordingExecutor::default());

    // 默认止损0 = 未设置 → 整个基金跳过
    let fund = active_fund(&repo, dec!(0)).await;
    repo.seed_position(long_position(fund.id, dec!(0.60), dec!(0.30)))
        .await;

    // 有阈值但持仓为0 → 跳过
    let fund2 = active_fund(&repo, dec!(10)).await;
    repo.seed_position(Position::empty(
        fund2.id,
        "0x4d31".to_string(),
        "1".to_string(),
    ))
    .await;

    engine(repo.clone(), executor.clone()).sweep_once().await;

    assert!(repo.risk_events().await.is_empty());
    assert!(executor.closed.lock().await.is_empty());
}

#[tokio::test]
async fn executor_failure_does_not_abort_sweep() {
    struct FailingExecutor {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl StopLossExecutor for FailingExecutor {
        async fn close_position(&self, _position: &Position) -> Result<()> {
            *self.calls.lock().await += 1;
            Err(anyhow::anyhow!("下单失败"))
        }
    }

    let repo = Arc::new(MemoryRepository::new());
    let executor = Arc::new(FailingExecutor {
        calls: Mutex::new(0),
    });

    let fund = active_fund(&repo, dec!(10)).await;
    // 两个触发止损的持仓，第一个失败不应阻断第二个
    let mut p1 = long_position(fund.id, dec!(0.60), dec!(0.50));
    p1.outcome_id = "1".to_string();
    let mut p2 = long_position(fund.id, dec!(0.60), dec!(0.50));
    p2.outcome_id = "2".to_string();
    repo.seed_position(p1).await;
    repo.seed_position(p2).await;

    let engine = RealtimeRiskEngine::new(
        repo.clone() as Arc<dyn Repository>,
        executor.clone(),
        Duration::from_secs(30),
    );
    engine.sweep_once().await;

    assert_eq!(*executor.calls.lock().await, 2);
    assert_eq!(repo.risk_events().await.len(), 2);
}
