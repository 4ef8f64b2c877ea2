//! 审计日志实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{AuditResult, RiskRuleType};

/// 审计日志（追加写，每条规则评估一条）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub intent_id: Uuid,
    pub rule_type: RiskRuleType,
    pub result: AuditResult,
    pub details: String,
    pub checked_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        intent_id: Uuid,
        rule_type: RiskRuleType,
        result: AuditResult,
        details: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            intent_id,
            rule_type,
            result,
            details,
            checked_at: Utc::now(),
        }
    }
}
