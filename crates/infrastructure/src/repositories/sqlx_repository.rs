//! MySQL 仓储实现 (sqlx)
//!
//! 实体行与领域实体之间显式映射，枚举按字符串列存储。
//! 意图状态CAS通过 `WHERE id = ? AND status = ?` 的受影响行数实现。

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, Pool};
use uuid::Uuid;

use polyfund_domain::entities::{
    AuditLog, Fund, MarketData, Position, RiskEvent, RiskRule, TradeIntent,
};
use polyfund_domain::enums::{
    FundStatus, IntentOrigin, IntentStatus, OrderType, RiskRuleType, TradeSide,
};
use polyfund_domain::traits::{
    FundRepository, IntentRepository, MarketDataRepository, PositionRepository, RiskRepository,
};

pub struct SqlxRepository {
    pool: Pool<MySql>,
}

impl SqlxRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// 使用全局连接池构造
    pub fn from_global_pool() -> Self {
        Self {
            pool: polyfund_core::get_db_pool().clone(),
        }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| anyhow!("非法UUID '{}': {}", s, e))
}

// ---------------------------------------------------------------------------
// 行实体
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
struct FundRow {
    id: String,
    name: String,
    manager_id: String,
    total_aum: Decimal,
    daily_loss_limit: Decimal,
    stop_loss_percent: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FundRow {
    fn to_domain(&self) -> Result<Fund> {
        Ok(Fund {
            id: parse_uuid(&self.id)?,
            name: self.name.clone(),
            manager_id: parse_uuid(&self.manager_id)?,
            total_aum: self.total_aum,
            daily_loss_limit: self.daily_loss_limit,
            stop_loss_percent: self.stop_loss_percent,
            status: FundStatus::from_str(&self.status).map_err(anyhow::Error::msg)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct TradeIntentRow {
    id: String,
    fund_id: String,
    origin: String,
    manager_id: Option<String>,
    market_id: String,
    outcome_id: String,
    side: String,
    size: Decimal,
    price: Decimal,
    order_type: String,
    status: String,
    audit_result: Option<String>,
    reject_reason: Option<String>,
    executed_tx: Option<String>,
    executed_price: Decimal,
    executed_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TradeIntentRow {
    fn to_domain(&self) -> Result<TradeIntent> {
        Ok(TradeIntent {
            id: parse_uuid(&self.id)?,
            fund_id: parse_uuid(&self.fund_id)?,
            origin: IntentOrigin::from_str(&self.origin).map_err(anyhow::Error::msg)?,
            manager_id: self.manager_id.as_deref().map(parse_uuid).transpose()?,
            market_id: self.market_id.clone(),
            outcome_id: self.outcome_id.clone(),
            side: TradeSide::from_str(&self.side).map_err(anyhow::Error::msg)?,
            size: self.size,
            price: self.price,
            order_type: OrderType::from_str(&self.order_type).map_err(anyhow::Error::msg)?,
            status: IntentStatus::from_str(&self.status).map_err(anyhow::Error::msg)?,
            audit_result: self.audit_result.clone(),
            reject_reason: self.reject_reason.clone(),
            executed_tx: self.executed_tx.clone(),
            executed_price: self.executed_price,
            executed_at: self.executed_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct PositionRow {
    id: String,
    fund_id: String,
    market_id: String,
    outcome_id: String,
    size: Decimal,
    entry_price: Decimal,
    current_price: Decimal,
    unrealized_pnl: Decimal,
    realized_pnl_today: Decimal,
    last_updated: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl PositionRow {
    fn to_domain(&self) -> Result<Position> {
        Ok(Position {
            id: parse_uuid(&self.id)?,
            fund_id: parse_uuid(&self.fund_id)?,
            market_id: self.market_id.clone(),
            outcome_id: self.outcome_id.clone(),
            size: self.size,
            entry_price: self.entry_price,
            current_price: self.current_price,
            unrealized_pnl: self.unrealized_pnl,
            realized_pnl_today: self.realized_pnl_today,
            last_updated: self.last_updated,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct RiskRuleRow {
    id: String,
    fund_id: String,
    rule_type: String,
    params: String,
    is_active: bool,
    description: String,
    created_at: DateTime<Utc>,
}

impl RiskRuleRow {
    fn to_domain(&self) -> Result<RiskRule> {
        Ok(RiskRule {
            id: parse_uuid(&self.id)?,
            fund_id: parse_uuid(&self.fund_id)?,
            rule_type: RiskRuleType::from_str(&self.rule_type).map_err(anyhow::Error::msg)?,
            params: self.params.clone(),
            is_active: self.is_active,
            description: self.description.clone(),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct MarketDataRow {
    market_id: String,
    question: String,
    active: bool,
    closed: bool,
    best_bid: Decimal,
    best_ask: Decimal,
    last_price: Decimal,
    volume: Decimal,
    liquidity: Decimal,
    updated_at: DateTime<Utc>,
}

impl MarketDataRow {
    fn to_domain(&self) -> MarketData {
        MarketData {
            market_id: self.market_id.clone(),
            question: self.question.clone(),
            active: self.active,
            closed: self.closed,
            best_bid: self.best_bid,
            best_ask: self.best_ask,
            last_price: self.last_price,
            volume: self.volume,
            liquidity: self.liquidity,
            updated_at: self.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// 仓储实现
// ---------------------------------------------------------------------------

#[async_trait]
impl FundRepository for SqlxRepository {
    async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>> {
        let row = sqlx::query_as::<_, FundRow>("SELECT * FROM funds WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.to_domain()).transpose()
    }

    async fn get_active_funds(&self) -> Result<Vec<Fund>> {
        let rows = sqlx::query_as::<_, FundRow>(
            "SELECT * FROM funds WHERE status = 'ACTIVE' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| r.to_domain()).collect()
    }

    async fn update_fund(&self, fund: &Fund) -> Result<()> {
        sqlx::query(
            "UPDATE funds
             SET name = ?, manager_id = ?, total_aum = ?, daily_loss_limit = ?,
                 stop_loss_percent = ?, status = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&fund.name)
        .bind(fund.manager_id.to_string())
        .bind(fund.total_aum)
        .bind(fund.daily_loss_limit)
        .bind(fund.stop_loss_percent)
        .bind(fund.status.as_str())
        .bind(fund.updated_at)
        .bind(fund.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl IntentRepository for SqlxRepository {
    async fn create_trade_intent(&self, intent: &TradeIntent) -> Result<()> {
        sqlx::query(
            "INSERT INTO trade_intents
             (id, fund_id, origin, manager_id, market_id, outcome_id, side, size, price,
              order_type, status, audit_result, reject_reason, executed_tx, executed_price,
              executed_at, expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(intent.id.to_string())
        .bind(intent.fund_id.to_string())
        .bind(intent.origin.as_str())
        .bind(intent.manager_id.map(|m| m.to_string()))
        .bind(&intent.market_id)
        .bind(&intent.outcome_id)
        .bind(intent.side.as_str())
        .bind(intent.size)
        .bind(intent.price)
        .bind(intent.order_type.as_str())
        .bind(intent.status.as_str())
        .bind(&intent.audit_result)
        .bind(&intent.reject_reason)
        .bind(&intent.executed_tx)
        .bind(intent.executed_price)
        .bind(intent.executed_at)
        .bind(intent.expires_at)
        .bind(intent.created_at)
        .bind(intent.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_trade_intent(&self, id: Uuid) -> Result<Option<TradeIntent>> {
        let row = sqlx::query_as::<_, TradeIntentRow>("SELECT * FROM trade_intents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.to_domain()).transpose()
    }

    async fn get_pending_intents(&self, limit: usize) -> Result<Vec<TradeIntent>> {
        let rows = sqlx::query_as::<_, TradeIntentRow>(
            "SELECT * FROM trade_intents
             WHERE status = 'PENDING' ORDER BY created_at ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| r.to_domain()).collect()
    }

    async fn get_stale_approved_intents(
        &self,
        stale_for: Duration,
        limit: usize,
    ) -> Result<Vec<TradeIntent>> {
        let cutoff = Utc::now() - chrono::Duration::from_std(stale_for)?;
        let rows = sqlx::query_as::<_, TradeIntentRow>(
            "SELECT * FROM trade_intents
             WHERE status = 'APPROVED' AND updated_at < ?
             ORDER BY updated_at ASC LIMIT ?",
        )
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| r.to_domain()).collect()
    }

    async fn update_trade_intent(&self, intent: &TradeIntent) -> Result<()> {
        sqlx::query(
            "UPDATE trade_intents
             SET status = ?, audit_result = ?, reject_reason = ?, executed_tx = ?,
                 executed_price = ?, executed_at = ?, expires_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(intent.status.as_str())
        .bind(&intent.audit_result)
        .bind(&intent.reject_reason)
        .bind(&intent.executed_tx)
        .bind(intent.executed_price)
        .bind(intent.executed_at)
        .bind(intent.expires_at)
        .bind(intent.updated_at)
        .bind(intent.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn transition_intent_status(
        &self,
        id: Uuid,
        from: IntentStatus,
        to: IntentStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE trade_intents SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl PositionRepository for SqlxRepository {
    async fn get_fund_positions(&self, fund_id: Uuid) -> Result<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>(
            "SELECT * FROM positions WHERE fund_id = ? ORDER BY created_at ASC",
        )
        .bind(fund_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| r.to_domain()).collect()
    }

    async fn get_position(
        &self,
        fund_id: Uuid,
        market_id: &str,
        outcome_id: &str,
    ) -> Result<Option<Position>> {
        let row = sqlx::query_as::<_, PositionRow>(
            "SELECT * FROM positions WHERE fund_id = ? AND market_id = ? AND outcome_id = ?",
        )
        .bind(fund_id.to_string())
        .bind(market_id)
        .bind(outcome_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.to_domain()).transpose()
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        // (fund_id, market_id, outcome_id) 上有唯一索引
        sqlx::query(
            "INSERT INTO positions
             (id, fund_id, market_id, outcome_id, size, entry_price, current_price,
              unrealized_pnl, realized_pnl_today, last_updated, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
               size = VALUES(size), entry_price = VALUES(entry_price),
               current_price = VALUES(current_price), unrealized_pnl = VALUES(unrealized_pnl),
               realized_pnl_today = VALUES(realized_pnl_today), last_updated = VALUES(last_updated)",
        )
        .bind(position.id.to_string())
        .bind(position.fund_id.to_string())
        .bind(&position.market_id)
        .bind(&position.outcome_id)
        .bind(position.size)
        .bind(position.entry_price)
        .bind(position.current_price)
        .bind(position.unrealized_pnl)
        .bind(position.realized_pnl_today)
        .bind(position.last_updated)
        .bind(position.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_all_positions(&self) -> Result<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>("SELECT * FROM positions")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| r.to_domain()).collect()
    }
}

#[async_trait]
impl RiskRepository for SqlxRepository {
    async fn get_active_risk_rules(&self, fund_id: Uuid) -> Result<Vec<RiskRule>> {
        let rows = sqlx::query_as::<_, RiskRuleRow>(
            "SELECT * FROM risk_rules WHERE fund_id = ? AND is_active = 1 ORDER BY created_at ASC",
        )
        .bind(fund_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| r.to_domain()).collect()
    }

    async fn get_risk_rules_by_type(
        &self,
        fund_id: Uuid,
        rule_type: RiskRuleType,
    ) -> Result<Vec<RiskRule>> {
        let rows = sqlx::query_as::<_, RiskRuleRow>(
            "SELECT * FROM risk_rules
             WHERE fund_id = ? AND rule_type = ? AND is_active = 1
             ORDER BY created_at ASC",
        )
        .bind(fund_id.to_string())
        .bind(rule_type.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| r.to_domain()).collect()
    }

    async fn create_risk_event(&self, event: &RiskEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO risk_events
             (id, fund_id, rule_type, severity, market_id, description, triggered_at, is_handled)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(event.fund_id.to_string())
        .bind(event.rule_type.as_str())
        .bind(event.severity.as_str())
        .bind(&event.market_id)
        .bind(&event.description)
        .bind(event.triggered_at)
        .bind(event.is_handled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_audit_log(&self, log: &AuditLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_logs (id, intent_id, rule_type, result, details, checked_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(log.id.to_string())
        .bind(log.intent_id.to_string())
        .bind(log.rule_type.as_str())
        .bind(log.result.as_str())
        .bind(&log.details)
        .bind(log.checked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MarketDataRepository for SqlxRepository {
    async fn get_market_data(&self, market_id: &str) -> Result<Option<MarketData>> {
        let row =
            sqlx::query_as::<_, MarketDataRow>("SELECT * FROM market_data WHERE market_id = ?")
                .bind(market_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.to_domain()))
    }

    async fn get_active_markets(&self) -> Result<Vec<MarketData>> {
        let rows = sqlx::query_as::<_, MarketDataRow>(
            "SELECT * FROM market_data WHERE active = 1 AND closed = 0",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.to_domain()).collect())
    }

    async fn save_market_data(&self, market: &MarketData) -> Result<()> {
        sqlx::query(
            "INSERT INTO market_data
             (market_id, question, active, closed, best_bid, best_ask, last_price,
              volume, liquidity, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
               question = VALUES(question), active = VALUES(active), closed = VALUES(closed),
               best_bid = VALUES(best_bid), best_ask = VALUES(best_ask),
               last_price = VALUES(last_price), volume = VALUES(volume),
               liquidity = VALUES(liquidity), updated_at = VALUES(updated_at)",
        )
        .bind(&market.market_id)
        .bind(&market.question)
        .bind(market.active)
        .bind(market.closed)
        .bind(market.best_bid)
        .bind(market.best_ask)
        .bind(market.last_price)
        .bind(market.volume)
        .bind(market.liquidity)
        .bind(market.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
