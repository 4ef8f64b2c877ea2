//! 风控规则实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::RiskRuleType;

/// 风控规则
///
/// params 为JSON参数串，schema 由 rule_type 决定，
/// 解析与校验见 polyfund-risk 的规则注册表。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRule {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub rule_type: RiskRuleType,
    /// JSON格式参数
    pub params: String,
    pub is_active: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl RiskRule {
    pub fn new(fund_id: Uuid, rule_type: RiskRuleType, params: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            fund_id,
            rule_type,
            params,
            is_active: true,
            description,
            created_at: Utc::now(),
        }
    }
}
