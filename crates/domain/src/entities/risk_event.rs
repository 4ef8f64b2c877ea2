//! 风控事件实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{RiskRuleType, RiskSeverity};

/// 风控事件（追加写，规则触发的留痕）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskEvent {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub rule_type: RiskRuleType,
    pub severity: RiskSeverity,
    pub market_id: String,
    pub description: String,
    pub triggered_at: DateTime<Utc>,
    pub is_handled: bool,
}

impl RiskEvent {
    pub fn critical(
        fund_id: Uuid,
        rule_type: RiskRuleType,
        market_id: String,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fund_id,
            rule_type,
            severity: RiskSeverity::Critical,
            market_id,
            description,
            triggered_at: Utc::now(),
            is_handled: false,
        }
    }
}
