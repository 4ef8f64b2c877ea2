//! 规则注册表
//!
//! 每类风控规则的参数schema与解析/校验。纯函数，无I/O。
//! 参数以JSON串挂在 RiskRule.params 上，加载时立即解析并校验。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use polyfund_domain::enums::RiskRuleType;

#[derive(Error, Debug)]
pub enum RuleParamError {
    #[error("规则参数JSON非法: {0}")]
    Json(#[from] serde_json::Error),

    #[error("规则参数越界: {0}")]
    OutOfRange(String),
}

/// 仓位限制参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLimitParams {
    /// 单个市场最大仓位
    pub max_position_size: Decimal,
    /// 总敞口上限
    pub max_total_exposure: Decimal,
    /// 单笔交易上限
    pub max_single_position: Decimal,
}

impl PositionLimitParams {
    fn validate(&self) -> Result<(), RuleParamError> {
        if self.max_single_position <= Decimal::ZERO
            || self.max_position_size <= Decimal::ZERO
            || self.max_total_exposure <= Decimal::ZERO
        {
            return Err(RuleParamError::OutOfRange(
                "position limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// 日亏损限制参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLossLimitParams {
    /// 日最大亏损（绝对金额）
    pub max_daily_loss: Decimal,
}

impl DailyLossLimitParams {
    fn validate(&self) -> Result<(), RuleParamError> {
        if self.max_daily_loss <= Decimal::ZERO {
            return Err(RuleParamError::OutOfRange(
                "max_daily_loss must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// 价格偏离参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDeviationParams {
    /// 最大偏离百分比 (0, 100]
    pub max_deviation_percent: Decimal,
}

impl PriceDeviationParams {
    fn validate(&self) -> Result<(), RuleParamError> {
        validate_percent("max_deviation_percent", self.max_deviation_percent)
    }
}

/// 集中度参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationParams {
    /// 单市场最大集中度百分比 (0, 100]
    pub max_concentration_percent: Decimal,
}

impl ConcentrationParams {
    fn validate(&self) -> Result<(), RuleParamError> {
        validate_percent("max_concentration_percent", self.max_concentration_percent)
    }
}

/// 止损参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossParams {
    /// 止损百分比 (0, 100]
    pub stop_loss_percent: Decimal,
}

impl StopLossParams {
    fn validate(&self) -> Result<(), RuleParamError> {
        validate_percent("stop_loss_percent", self.stop_loss_percent)
    }
}

fn validate_percent(name: &str, value: Decimal) -> Result<(), RuleParamError> {
    if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(RuleParamError::OutOfRange(format!(
            "{} must be in (0, 100]",
            name
        )));
    }
    Ok(())
}

/// 规则参数（闭合的标记联合，审计器按变体分派）
#[derive(Debug, Clone, PartialEq)]
pub enum RuleParams {
    PositionLimit(PositionLimitParams),
    DailyLossLimit(DailyLossLimitParams),
    PriceDeviation(PriceDeviationParams),
    Concentration(ConcentrationParams),
    StopLoss(StopLossParams),
}

impl RuleParams {
    /// 解析并立即校验规则参数
    pub fn parse(rule_type: RiskRuleType, data: &str) -> Result<Self, RuleParamError> {
        match rule_type {
            RiskRuleType::PositionLimit => {
                let params: PositionLimitParams = serde_json::from_str(data)?;
                params.validate()?;
                Ok(RuleParams::PositionLimit(params))
            }
            RiskRuleType::DailyLossLimit => {
                let params: DailyLossLimitParams = serde_json::from_str(data)?;
                params.validate()?;
                Ok(RuleParams::DailyLossLimit(params))
            }
            RiskRuleType::PriceDeviation => {
                let params: PriceDeviationParams = serde_json::from_str(data)?;
                params.validate()?;
                Ok(RuleParams::PriceDeviation(params))
            }
            RiskRuleType::Concentration => {
                let params: ConcentrationParams = serde_json::from_str(data)?;
                params.validate()?;
                Ok(RuleParams::Concentration(params))
            }
            RiskRuleType::StopLoss => {
                let params: StopLossParams = serde_json::from_str(data)?;
                params.validate()?;
                Ok(RuleParams::StopLoss(params))
            }
        }
    }

    pub fn rule_type(&self) -> RiskRuleType {
        match self {
            RuleParams::PositionLimit(_) => RiskRuleType::PositionLimit,
            RuleParams::DailyLossLimit(_) => RiskRuleType::DailyLossLimit,
            RuleParams::PriceDeviation(_) => RiskRuleType::PriceDeviation,
            RuleParams::Concentration(_) => RiskRuleType::Concentration,
            RuleParams::StopLoss(_) => RiskRuleType::StopLoss,
        }
    }
}
