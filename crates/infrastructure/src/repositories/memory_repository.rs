//! 内存仓储实现
//!
//! 与 MySQL 实现遵守同一契约（包括状态CAS语义），
//! 驱动集成测试与本地演练，不做持久化。

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use polyfund_domain::entities::{
    AuditLog, Fund, MarketData, Position, RiskEvent, RiskRule, TradeIntent,
};
use polyfund_domain::enums::{FundStatus, IntentStatus, RiskRuleType};
use polyfund_domain::traits::{
    FundRepository, IntentRepository, MarketDataRepository, PositionRepository, RiskRepository,
};

type PositionKey = (Uuid, String, String);

#[derive(Default)]
struct Store {
    funds: HashMap<Uuid, Fund>,
    intents: HashMap<Uuid, TradeIntent>,
    positions: HashMap<PositionKey, Position>,
    rules: Vec<RiskRule>,
    risk_events: Vec<RiskEvent>,
    audit_logs: Vec<AuditLog>,
    markets: HashMap<String, MarketData>,
}

#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- 测试/演练用的写入与观测入口 ----

    pub async fn seed_fund(&self, fund: Fund) {
        self.store.write().await.funds.insert(fund.id, fund);
    }

    pub async fn seed_position(&self, position: Position) {
        let key = (
            position.fund_id,
            position.market_id.clone(),
            position.outcome_id.clone(),
        );
        self.store.write().await.positions.insert(key, position);
    }

    pub async fn seed_rule(&self, rule: RiskRule) {
        self.store.write().await.rules.push(rule);
    }

    pub async fn seed_market(&self, market: MarketData) {
        self.store
            .write()
            .await
            .markets
            .insert(market.market_id.clone(), market);
    }

    pub async fn seed_intent(&self, intent: TradeIntent) {
        self.store.write().await.intents.insert(intent.id, intent);
    }

    pub async fn audit_logs(&self) -> Vec<AuditLog> {
        self.store.read().await.audit_logs.clone()
    }

    pub async fn risk_events(&self) -> Vec<RiskEvent> {
        self.store.read().await.risk_events.clone()
    }

    pub async fn all_intents(&self) -> Vec<TradeIntent> {
        self.store.read().await.intents.values().cloned().collect()
    }
}

#[async_trait]
impl FundRepository for MemoryRepository {
    async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>> {
        Ok(self.store.read().await.funds.get(&id).cloned())
    }

    async fn get_active_funds(&self) -> Result<Vec<Fund>> {
        let store = self.store.read().await;
        let mut funds: Vec<Fund> = store
            .funds
            .values()
            .filter(|f| f.status == FundStatus::Active)
            .cloned()
            .collect();
        funds.sort_by_key(|f| f.created_at);
        Ok(funds)
    }

    async fn update_fund(&self, fund: &Fund) -> Result<()> {
        self.store.write().await.funds.insert(fund.id, fund.clone());
        Ok(())
    }
}

#[async_trait]
impl IntentRepository for MemoryRepository {
    async fn create_trade_intent(&self, intent: &TradeIntent) -> Result<()> {
        self.store
            .write()
            .await
            .intents
            .insert(intent.id, intent.clone());
        Ok(())
    }

    async fn get_trade_intent(&self, id: Uuid) -> Result<Option<TradeIntent>> {
        Ok(self.store.read().await.intents.get(&id).cloned())
    }

    async fn get_pending_intents(&self, limit: usize) -> Result<Vec<TradeIntent>> {
        let store = self.store.read().await;
        let mut pending: Vec<TradeIntent> = store
            .intents
            .values()
            .filter(|i| i.status == IntentStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|i| i.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn get_stale_approved_intents(
        &self,
        stale_for: Duration,
        limit: usize,
    ) -> Result<Vec<TradeIntent>> {
        let cutoff = Utc::now() - chrono::Duration::from_std(stale_for)?;
        let store = self.store.read().await;
        let mut stale: Vec<TradeIntent> = store
            .intents
            .values()
            .filter(|i| i.status == IntentStatus::Approved && i.updated_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|i| i.updated_at);
        stale.truncate(limit);
        Ok(stale)
    }

    async fn update_trade_intent(&self, intent: &TradeIntent) -> Result<()> {
        self.store
            .write()
            .await
            .intents
            .insert(intent.id, intent.clone());
        Ok(())
    }

    async fn transition_intent_status(
        &self,
        id: Uuid,
        from: IntentStatus,
        to: IntentStatus,
    ) -> Result<bool> {
        let mut store = self.store.write().await;
        match store.intents.get_mut(&id) {
            Some(intent) if intent.status == from => {
                intent.status = to;
                intent.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PositionRepository for MemoryRepository {
    async fn get_fund_positions(&self, fund_id: Uuid) -> Result<Vec<Position>> {
        let store = self.store.read().await;
        let mut positions: Vec<Position> = store
            .positions
            .values()
            .filter(|p| p.fund_id == fund_id)
            .cloned()
            .collect();
        positions.sort_by_key(|p| p.created_at);
        Ok(positions)
    }

    async fn get_position(
        &self,
        fund_id: Uuid,
        market_id: &str,
        outcome_id: &str,
    ) -> Result<Option<Position>> {
        let key = (fund_id, market_id.to_string(), outcome_id.to_string());
        Ok(self.store.read().await.positions.get(&key).cloned())
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        let key = (
            position.fund_id,
            position.market_id.clone(),
            position.outcome_id.clone(),
        );
        self.store
            .write()
            .await
            .positions
            .insert(key, position.clone());
        Ok(())
    }

    async fn get_all_positions(&self) -> Result<Vec<Position>> {
        Ok(self.store.read().await.positions.values().cloned().collect())
    }
}

#[async_trait]
impl RiskRepository for MemoryRepository {
    async fn get_active_risk_rules(&self, fund_id: Uuid) -> Result<Vec<RiskRule>> {
        let store = self.store.read().await;
        Ok(store
            .rules
            .iter()
            .filter(|r| r.fund_id == fund_id && r.is_active)
            .cloned()
            .collect())
    }

    async fn get_risk_rules_by_type(
        &self,
        fund_id: Uuid,
        rule_type: RiskRuleType,
    ) -> Result<Vec<RiskRule>> {
        let store = self.store.read().await;
        Ok(store
            .rules
            .iter()
            .filter(|r| r.fund_id == fund_id && r.is_active && r.rule_type == rule_type)
            .cloned()
            .collect())
    }

    async fn create_risk_event(&self, event: &RiskEvent) -> Result<()> {
        self.store.write().await.risk_events.push(event.clone());
        Ok(())
    }

    async fn create_audit_log(&self, log: &AuditLog) -> Result<()> {
        self.store.write().await.audit_logs.push(log.clone());
        Ok(())
    }
}

#[async_trait]
impl MarketDataRepository for MemoryRepository {
    async fn get_market_data(&self, market_id: &str) -> Result<Option<MarketData>> {
        Ok(self.store.read().await.markets.get(market_id).cloned())
    }

    async fn get_active_markets(&self) -> Result<Vec<MarketData>> {
        let store = self.store.read().await;
        Ok(store
            .markets
            .values()
            .filter(|m| m.active && !m.closed)
            .cloned()
            .collect())
    }

    async fn save_market_data(&self, market: &MarketData) -> Result<()> {
        self.store
            .write()
            .await
            .markets
            .insert(market.market_id.clone(), market.clone());
        Ok(())
    }
}
