//! 仓储接口 - 定义数据访问的抽象
//!
//! 各组件通过仓储门面按值读写实体，不跨tick缓存可变实体状态。
//! 并发契约：
//! - `transition_intent_status` 是意图状态的线性化原语（CAS），
//!   工作协程必须先观察到 APPROVED 才能写入 EXECUTING；
//! - 实现必须可被所有组件并发使用 (Send + Sync)。

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{AuditLog, Fund, MarketData, Position, RiskEvent, RiskRule, TradeIntent};
use crate::enums::{IntentStatus, RiskRuleType};

/// 基金仓储接口
#[async_trait]
pub trait FundRepository: Send + Sync {
    /// 根据ID查询基金
    async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>>;

    /// 查询所有 ACTIVE 状态的基金
    async fn get_active_funds(&self) -> Result<Vec<Fund>>;

    /// 更新基金
    async fn update_fund(&self, fund: &Fund) -> Result<()>;
}

/// 交易意图仓储接口
#[async_trait]
pub trait IntentRepository: Send + Sync {
    /// 保存新意图
    async fn create_trade_intent(&self, intent: &TradeIntent) -> Result<()>;

    /// 根据ID查询意图
    async fn get_trade_intent(&self, id: Uuid) -> Result<Option<TradeIntent>>;

    /// 按创建顺序查询待审计意图
    async fn get_pending_intents(&self, limit: usize) -> Result<Vec<TradeIntent>>;

    /// 查询滞留在 APPROVED 超过 stale_for 的意图（兜底扫描）
    async fn get_stale_approved_intents(
        &self,
        stale_for: Duration,
        limit: usize,
    ) -> Result<Vec<TradeIntent>>;

    /// 整行更新意图
    async fn update_trade_intent(&self, intent: &TradeIntent) -> Result<()>;

    /// 状态CAS：仅当当前状态为 from 时置为 to，返回是否成功
    async fn transition_intent_status(
        &self,
        id: Uuid,
        from: IntentStatus,
        to: IntentStatus,
    ) -> Result<bool>;
}

/// 持仓仓储接口
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// 查询基金全部持仓
    async fn get_fund_positions(&self, fund_id: Uuid) -> Result<Vec<Position>>;

    /// 查询 (fund, market, outcome) 对应的持仓行
    async fn get_position(
        &self,
        fund_id: Uuid,
        market_id: &str,
        outcome_id: &str,
    ) -> Result<Option<Position>>;

    /// 保存持仓（按 (fund, market, outcome) upsert）
    async fn save_position(&self, position: &Position) -> Result<()>;

    /// 查询全部持仓（聚合任务用）
    async fn get_all_positions(&self) -> Result<Vec<Position>>;
}

/// 风控仓储接口
#[async_trait]
pub trait RiskRepository: Send + Sync {
    /// 按插入顺序查询基金启用中的规则
    async fn get_active_risk_rules(&self, fund_id: Uuid) -> Result<Vec<RiskRule>>;

    /// 查询基金指定类型的启用规则
    async fn get_risk_rules_by_type(
        &self,
        fund_id: Uuid,
        rule_type: RiskRuleType,
    ) -> Result<Vec<RiskRule>>;

    /// 追加风控事件
    async fn create_risk_event(&self, event: &RiskEvent) -> Result<()>;

    /// 追加审计日志
    async fn create_audit_log(&self, log: &AuditLog) -> Result<()>;
}

/// 市场数据仓储接口
#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    /// 查询单个市场缓存
    async fn get_market_data(&self, market_id: &str) -> Result<Option<MarketData>>;

    /// 查询所有活跃市场
    async fn get_active_markets(&self) -> Result<Vec<MarketData>>;

    /// 保存市场缓存（按 market_id upsert）
    async fn save_market_data(&self, market: &MarketData) -> Result<()>;
}

/// 仓储门面：各组件统一持有的聚合视图
pub trait Repository:
    FundRepository + IntentRepository + PositionRepository + RiskRepository + MarketDataRepository
{
}

impl<T> Repository for T where
    T: FundRepository
        + IntentRepository
        + PositionRepository
        + RiskRepository
        + MarketDataRepository
{
}
