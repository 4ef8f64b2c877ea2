//! 业务枚举

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 交易意图状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    /// 待审计
    Pending,
    /// 风控审计中
    Auditing,
    /// 审计通过
    Approved,
    /// 审计拒绝
    Rejected,
    /// 执行中
    Executing,
    /// 执行完成
    Completed,
    /// 执行失败
    Failed,
    /// 已取消
    Cancelled,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "PENDING",
            IntentStatus::Auditing => "AUDITING",
            IntentStatus::Approved => "APPROVED",
            IntentStatus::Rejected => "REJECTED",
            IntentStatus::Executing => "EXECUTING",
            IntentStatus::Completed => "COMPLETED",
            IntentStatus::Failed => "FAILED",
            IntentStatus::Cancelled => "CANCELLED",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentStatus::Rejected
                | IntentStatus::Completed
                | IntentStatus::Failed
                | IntentStatus::Cancelled
        )
    }

    /// 状态机合法迁移:
    /// PENDING → AUDITING → {APPROVED | REJECTED}
    /// APPROVED → EXECUTING → {COMPLETED | FAILED}
    /// 任意非终态 → CANCELLED
    pub fn can_transition_to(&self, next: IntentStatus) -> bool {
        if next == IntentStatus::Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (IntentStatus::Pending, IntentStatus::Auditing)
                | (IntentStatus::Auditing, IntentStatus::Approved)
                | (IntentStatus::Auditing, IntentStatus::Rejected)
                | (IntentStatus::Approved, IntentStatus::Executing)
                | (IntentStatus::Executing, IntentStatus::Completed)
                | (IntentStatus::Executing, IntentStatus::Failed)
        )
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(IntentStatus::Pending),
            "AUDITING" => Ok(IntentStatus::Auditing),
            "APPROVED" => Ok(IntentStatus::Approved),
            "REJECTED" => Ok(IntentStatus::Rejected),
            "EXECUTING" => Ok(IntentStatus::Executing),
            "COMPLETED" => Ok(IntentStatus::Completed),
            "FAILED" => Ok(IntentStatus::Failed),
            "CANCELLED" => Ok(IntentStatus::Cancelled),
            _ => Err(format!("unknown intent status: {}", s)),
        }
    }
}

/// 交易方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    /// 反向
    pub fn opposite(&self) -> Self {
        match self {
            TradeSide::Buy => TradeSide::Sell,
            TradeSide::Sell => TradeSide::Buy,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            _ => Err(format!("unknown trade side: {}", s)),
        }
    }
}

/// 订单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            _ => Err(format!("unknown order type: {}", s)),
        }
    }
}

/// 意图来源：基金经理提交 / 系统自动生成（止损平仓）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentOrigin {
    Manager,
    System,
}

impl IntentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentOrigin::Manager => "MANAGER",
            IntentOrigin::System => "SYSTEM",
        }
    }
}

impl FromStr for IntentOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANAGER" => Ok(IntentOrigin::Manager),
            "SYSTEM" => Ok(IntentOrigin::System),
            _ => Err(format!("unknown intent origin: {}", s)),
        }
    }
}

/// 基金生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundStatus {
    Preparing,
    Active,
    Closed,
}

impl FundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundStatus::Preparing => "PREPARING",
            FundStatus::Active => "ACTIVE",
            FundStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for FundStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PREPARING" => Ok(FundStatus::Preparing),
            "ACTIVE" => Ok(FundStatus::Active),
            "CLOSED" => Ok(FundStatus::Closed),
            _ => Err(format!("unknown fund status: {}", s)),
        }
    }
}

/// 风控规则类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskRuleType {
    /// 仓位限制
    PositionLimit,
    /// 日亏损限制
    DailyLossLimit,
    /// 价格偏离
    PriceDeviation,
    /// 集中度限制
    Concentration,
    /// 止损线
    StopLoss,
}

impl RiskRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRuleType::PositionLimit => "POSITION_LIMIT",
            RiskRuleType::DailyLossLimit => "DAILY_LOSS_LIMIT",
            RiskRuleType::PriceDeviation => "PRICE_DEVIATION",
            RiskRuleType::Concentration => "CONCENTRATION",
            RiskRuleType::StopLoss => "STOP_LOSS",
        }
    }
}

impl fmt::Display for RiskRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskRuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POSITION_LIMIT" => Ok(RiskRuleType::PositionLimit),
            "DAILY_LOSS_LIMIT" => Ok(RiskRuleType::DailyLossLimit),
            "PRICE_DEVIATION" => Ok(RiskRuleType::PriceDeviation),
            "CONCENTRATION" => Ok(RiskRuleType::Concentration),
            "STOP_LOSS" => Ok(RiskRuleType::StopLoss),
            _ => Err(format!("unknown risk rule type: {}", s)),
        }
    }
}

/// 风控事件级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskSeverity {
    Warning,
    Critical,
}

impl RiskSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskSeverity::Warning => "WARNING",
            RiskSeverity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for RiskSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WARNING" => Ok(RiskSeverity::Warning),
            "CRITICAL" => Ok(RiskSeverity::Critical),
            _ => Err(format!("unknown risk severity: {}", s)),
        }
    }
}

/// 单条规则审计结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditResult {
    Pass,
    Fail,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Pass => "PASS",
            AuditResult::Fail => "FAIL",
        }
    }

    pub fn from_passed(passed: bool) -> Self {
        if passed {
            AuditResult::Pass
        } else {
            AuditResult::Fail
        }
    }
}

impl FromStr for AuditResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(AuditResult::Pass),
            "FAIL" => Ok(AuditResult::Fail),
            _ => Err(format!("unknown audit result: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_status_transitions() {
        use IntentStatus::*;
        assert!(Pending.can_transition_to(Auditing));
        assert!(Auditing.can_transition_to(Approved));
        assert!(Auditing.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Executing));
        assert!(Executing.can_transition_to(Completed));
        assert!(Executing.can_transition_to(Failed));

        // 非法迁移
        assert!(!Pending.can_transition_to(Executing));
        assert!(!Approved.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Executing));

        // 非终态均可取消，终态不可
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Executing.can_transition_to(Cancelled));
        assert!(!Rejected.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn enum_round_trip() {
        assert_eq!(
            "POSITION_LIMIT".parse::<RiskRuleType>().unwrap(),
            RiskRuleType::PositionLimit
        );
        assert_eq!(TradeSide::Buy.opposite(), TradeSide::Sell);
        assert_eq!("EXECUTING".parse::<IntentStatus>().unwrap(), IntentStatus::Executing);
        assert!("UNKNOWN".parse::<IntentStatus>().is_err());
    }
}
