//! 基金实体

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::FundStatus;

/// 基金
///
/// 资金托管在链上Vault，执行钱包仅有规则内的受限权限。
/// 平台侧只维护规模、风控默认值与生命周期状态。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fund {
    pub id: Uuid,
    pub name: String,
    pub manager_id: Uuid,
    /// 资产管理总规模 (AUM ≥ 0)
    pub total_aum: Decimal,
    /// 日亏损上限（绝对金额）
    pub daily_loss_limit: Decimal,
    /// 默认止损百分比 (0-100)，无STOP_LOSS规则时由实时风控兜底使用
    pub stop_loss_percent: Decimal,
    pub status: FundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fund {
    pub fn new(
        name: String,
        manager_id: Uuid,
        daily_loss_limit: Decimal,
        stop_loss_percent: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            manager_id,
            total_aum: Decimal::ZERO,
            daily_loss_limit,
            stop_loss_percent,
            status: FundStatus::Preparing,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == FundStatus::Active
    }
}
