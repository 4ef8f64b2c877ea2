//! 交易意图实体

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::enums::{IntentOrigin, IntentStatus, OrderType, TradeSide};

#[derive(Error, Debug)]
pub enum IntentError {
    #[error("意图参数无效: {0}")]
    InvalidParameter(String),

    #[error("非法状态迁移: {from} -> {to}")]
    InvalidTransition { from: IntentStatus, to: IntentStatus },
}

/// 交易意图
///
/// 基金经理（或止损触发的系统路径）提交的交易请求，
/// 必须通过风控审计才会成为真正的订单。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    pub id: Uuid,
    pub fund_id: Uuid,
    /// 来源：经理提交 / 系统止损平仓
    pub origin: IntentOrigin,
    /// 系统来源时为 None
    pub manager_id: Option<Uuid>,
    /// Polymarket市场ID
    pub market_id: String,
    /// 预测结果ID
    pub outcome_id: String,
    pub side: TradeSide,
    /// 交易数量 (> 0)
    pub size: Decimal,
    /// 目标价格，0表示市价单
    pub price: Decimal,
    pub order_type: OrderType,
    pub status: IntentStatus,
    /// 审计结果快照 (JSON)
    pub audit_result: Option<String>,
    pub reject_reason: Option<String>,
    pub executed_tx: Option<String>,
    pub executed_price: Decimal,
    pub executed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TradeIntent {
    /// 经理提交的意图，初始为 PENDING
    pub fn new(
        fund_id: Uuid,
        manager_id: Uuid,
        market_id: String,
        outcome_id: String,
        side: TradeSide,
        size: Decimal,
        price: Decimal,
        order_type: OrderType,
    ) -> Result<Self, IntentError> {
        if size <= Decimal::ZERO {
            return Err(IntentError::InvalidParameter(format!(
                "交易数量必须大于零: {}",
                size
            )));
        }
        if price < Decimal::ZERO {
            return Err(IntentError::InvalidParameter(format!(
                "价格不能为负: {}",
                price
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            fund_id,
            origin: IntentOrigin::Manager,
            manager_id: Some(manager_id),
            market_id,
            outcome_id,
            side,
            size,
            price,
            order_type,
            status: IntentStatus::Pending,
            audit_result: None,
            reject_reason: None,
            executed_tx: None,
            executed_price: Decimal::ZERO,
            executed_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// 系统生成的止损平仓意图：市价、反向、直接置为 APPROVED（跳过审计队列）
    pub fn system_close(
        fund_id: Uuid,
        market_id: String,
        outcome_id: String,
        side: TradeSide,
        size: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            fund_id,
            origin: IntentOrigin::System,
            manager_id: None,
            market_id,
            outcome_id,
            side,
            size,
            price: Decimal::ZERO,
            order_type: OrderType::Market,
            status: IntentStatus::Approved,
            audit_result: None,
            reject_reason: None,
            executed_tx: None,
            executed_price: Decimal::ZERO,
            executed_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否为市价单（价格为零）
    pub fn is_market_order(&self) -> bool {
        self.price.is_zero()
    }

    fn transition(&mut self, to: IntentStatus) -> Result<(), IntentError> {
        if !self.status.can_transition_to(to) {
            return Err(IntentError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 进入执行中状态（工作协程在仓储CAS成功后调用）
    pub fn begin_execution(&mut self) -> Result<(), IntentError> {
        self.transition(IntentStatus::Executing)
    }

    /// 审计通过，记录审计结果快照
    pub fn approve(&mut self, audit_result: String) -> Result<(), IntentError> {
        self.transition(IntentStatus::Approved)?;
        self.audit_result = Some(audit_result);
        Ok(())
    }

    /// 审计拒绝，记录拒绝原因与审计结果快照
    pub fn reject(&mut self, reason: String, audit_result: String) -> Result<(), IntentError> {
        self.transition(IntentStatus::Rejected)?;
        self.reject_reason = Some(reason);
        self.audit_result = Some(audit_result);
        Ok(())
    }

    /// 执行完成，记录成交信息
    pub fn complete(
        &mut self,
        tx_id: String,
        avg_fill_price: Decimal,
        executed_at: DateTime<Utc>,
    ) -> Result<(), IntentError> {
        self.transition(IntentStatus::Completed)?;
        self.executed_tx = Some(tx_id);
        self.executed_price = avg_fill_price;
        self.executed_at = Some(executed_at);
        Ok(())
    }

    /// 执行失败，记录原因
    pub fn fail(&mut self, reason: String) -> Result<(), IntentError> {
        self.transition(IntentStatus::Failed)?;
        self.reject_reason = Some(reason);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_intent() -> TradeIntent {
        TradeIntent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "0xmarket".to_string(),
            "1".to_string(),
            TradeSide::Buy,
            dec!(30),
            dec!(0.55),
            OrderType::Limit,
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_positive_size() {
        let err = TradeIntent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "m".to_string(),
            "1".to_string(),
            TradeSide::Buy,
            dec!(0),
            dec!(0.5),
            OrderType::Limit,
        );
        assert!(err.is_err());
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut intent = sample_intent();
        intent.status = IntentStatus::Auditing;
        intent.approve("{}".to_string()).unwrap();
        assert_eq!(intent.status, IntentStatus::Approved);

        intent.transition(IntentStatus::Executing).unwrap();
        intent
            .complete("0xtx".to_string(), dec!(0.55), Utc::now())
            .unwrap();
        assert_eq!(intent.status, IntentStatus::Completed);
        assert!(intent.executed_tx.is_some());
        assert!(intent.executed_at.is_some());
    }

    #[test]
    fn terminal_state_is_sticky() {
        let mut intent = sample_intent();
        intent.status = IntentStatus::Completed;
        assert!(intent.fail("x".to_string()).is_err());
        assert!(intent.transition(IntentStatus::Executing).is_err());
    }

    #[test]
    fn system_close_is_pre_approved_market_order() {
        let intent = TradeIntent::system_close(
            Uuid::new_v4(),
            "m".to_string(),
            "1".to_string(),
            TradeSide::Sell,
            dec!(100),
        );
        assert_eq!(intent.status, IntentStatus::Approved);
        assert_eq!(intent.origin, IntentOrigin::System);
        assert!(intent.manager_id.is_none());
        assert!(intent.is_market_order());
    }
}
