//! 风控审计器
//!
//! 无状态评估器：给定意图与当前基金/持仓快照，逐条评估启用规则，
//! 产出通过/拒绝结论与按规则的得分明细。每条规则写一条审计日志；
//! 失败后仍然评估剩余规则，保证审计日志完整。

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use polyfund_domain::entities::{AuditLog, Fund, Position, TradeIntent};
use polyfund_domain::enums::{AuditResult, RiskRuleType};
use polyfund_domain::traits::{
    FundRepository, IntentRepository, MarketDataRepository, PositionRepository, Repository,
    RiskRepository,
};

use crate::rules::{
    ConcentrationParams, DailyLossLimitParams, PositionLimitParams, PriceDeviationParams,
    RuleParams, StopLossParams,
};

/// 单规则检查结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCheckOutcome {
    pub rule_type: RiskRuleType,
    pub passed: bool,
    /// 0-100，越高越危险
    pub score: i32,
    pub message: String,
}

/// 审计结论
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditVerdict {
    pub passed: bool,
    pub checks: Vec<RuleCheckOutcome>,
    pub total_risk_score: i32,
}

impl AuditVerdict {
    /// 第一条失败检查的消息作为拒绝原因
    fn reject_reason(&self) -> String {
        self.checks
            .iter()
            .find(|c| !c.passed)
            .map(|c| format!("[{}] {}", c.rule_type, c.message))
            .unwrap_or_else(|| "未知原因".to_string())
    }
}

/// 风控审计器
pub struct Auditor {
    repo: Arc<dyn Repository>,
}

impl Auditor {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// 审计交易意图
    ///
    /// 副作用：每条规则写一条 AuditLog；意图被置为 APPROVED（附结论快照）
    /// 或 REJECTED（附第一条失败检查的消息），并整行持久化。
    pub async fn audit_intent(&self, intent: &mut TradeIntent) -> Result<AuditVerdict> {
        info!(
            intent_id = %intent.id,
            fund_id = %intent.fund_id,
            market_id = %intent.market_id,
            "开始风控审计"
        );

        let rules = self
            .repo
            .get_active_risk_rules(intent.fund_id)
            .await
            .context("获取风控规则失败")?;
        let positions = self
            .repo
            .get_fund_positions(intent.fund_id)
            .await
            .context("获取持仓失败")?;
        let fund = self
            .repo
            .get_fund(intent.fund_id)
            .await
            .context("获取基金信息失败")?
            .ok_or_else(|| anyhow!("基金不存在: {}", intent.fund_id))?;
        let mark_price = self
            .repo
            .get_market_data(&intent.market_id)
            .await
            .context("获取市场数据失败")?
            .map(|m| m.mark_price())
            .ok_or_else(|| anyhow!("市场数据缺失: {}", intent.market_id))?;

        let mut verdict = AuditVerdict {
            passed: true,
            checks: Vec::with_capacity(rules.len()),
            total_risk_score: 0,
        };

        // 按插入顺序评估全部规则，失败不短路
        for rule in &rules {
            let outcome = self.check_rule(rule.rule_type, &rule.params, intent, &positions, &fund, mark_price);

            verdict.total_risk_score += outcome.score;
            if !outcome.passed {
                verdict.passed = false;
            }

            let log = AuditLog::new(
                intent.id,
                outcome.rule_type,
                AuditResult::from_passed(outcome.passed),
                outcome.message.clone(),
            );
            if let Err(e) = self.repo.create_audit_log(&log).await {
                error!("记录审计日志失败: {}", e);
            }

            verdict.checks.push(outcome);
        }

        let snapshot = serde_json::to_string(&verdict).unwrap_or_default();
        if verdict.passed {
            intent.approve(snapshot)?;
        } else {
            let reason = verdict.reject_reason();
            warn!(intent_id = %intent.id, reason = %reason, "审计拒绝");
            intent.reject(reason, snapshot)?;
        }

        self.repo
            .update_trade_intent(intent)
            .await
            .context("更新意图状态失败")?;

        info!(
            intent_id = %intent.id,
            passed = verdict.passed,
            risk_score = verdict.total_risk_score,
            "风控审计完成"
        );

        Ok(verdict)
    }

    /// 执行单条规则检查
    fn check_rule(
        &self,
        rule_type: RiskRuleType,
        raw_params: &str,
        intent: &TradeIntent,
        positions: &[Position],
        fund: &Fund,
        mark_price: Decimal,
    ) -> RuleCheckOutcome {
        let params = match RuleParams::parse(rule_type, raw_params) {
            Ok(p) => p,
            Err(e) => {
                return RuleCheckOutcome {
                    rule_type,
                    passed: false,
                    score: 100,
                    message: format!("规则参数解析失败: {}", e),
                }
            }
        };

        match params {
            RuleParams::PositionLimit(p) => check_position_limit(&p, intent, positions),
            RuleParams::DailyLossLimit(p) => check_daily_loss_limit(&p, positions),
            RuleParams::PriceDeviation(p) => check_price_deviation(&p, intent, mark_price),
            RuleParams::Concentration(p) => check_concentration(&p, intent, positions, fund),
            RuleParams::StopLoss(p) => check_stop_loss(&p, positions),
        }
    }
}

fn score_from(value: Decimal) -> i32 {
    use rust_decimal::prelude::ToPrimitive;
    value.trunc().to_i32().unwrap_or(i32::MAX)
}

/// 仓位限制：单笔上限 → 单市场上限 → 总敞口上限
fn check_position_limit(
    params: &PositionLimitParams,
    intent: &TradeIntent,
    positions: &[Position],
) -> RuleCheckOutcome {
    let rule_type = RiskRuleType::PositionLimit;

    // 单笔交易上限
    if intent.size > params.max_single_position {
        return RuleCheckOutcome {
            rule_type,
            passed: false,
            score: 80,
            message: format!(
                "交易数量 {} 超过单笔上限 {}",
                intent.size, params.max_single_position
            ),
        };
    }

    // 单个市场(outcome)仓位上限
    let current_market_size: Decimal = positions
        .iter()
        .filter(|p| p.market_id == intent.market_id && p.outcome_id == intent.outcome_id)
        .map(|p| p.size)
        .sum();
    let new_size = current_market_size + intent.size;
    if new_size > params.max_position_size {
        return RuleCheckOutcome {
            rule_type,
            passed: false,
            score: 70,
            message: format!("市场持仓 {} 将超过上限 {}", new_size, params.max_position_size),
        };
    }

    // 总敞口：Σ|size·mark| + 本笔名义金额
    let mut total_exposure: Decimal = positions.iter().map(|p| p.notional().abs()).sum();
    total_exposure += intent.size * intent.price;
    if total_exposure > params.max_total_exposure {
        return RuleCheckOutcome {
            rule_type,
            passed: false,
            score: 75,
            message: format!(
                "总敞口 {} 将超过上限 {}",
                total_exposure, params.max_total_exposure
            ),
        };
    }

    RuleCheckOutcome {
        rule_type,
        passed: true,
        score: 10,
        message: "仓位检查通过".to_string(),
    }
}

/// 日亏损限制：今日已实现亏损超过限额即拒绝
fn check_daily_loss_limit(
    params: &DailyLossLimitParams,
    positions: &[Position],
) -> RuleCheckOutcome {
    let rule_type = RiskRuleType::DailyLossLimit;

    // 今日亏损 = max(0, -Σ今日已实现盈亏)，结算任务每日清零
    let realized_today: Decimal = positions.iter().map(|p| p.realized_pnl_today).sum();
    let today_loss = (-realized_today).max(Decimal::ZERO);

    if today_loss > params.max_daily_loss {
        return RuleCheckOutcome {
            rule_type,
            passed: false,
            score: 90,
            message: format!(
                "今日亏损 {} 已超过限制 {}",
                today_loss, params.max_daily_loss
            ),
        };
    }

    let score = score_from(today_loss / params.max_daily_loss * Decimal::ONE_HUNDRED).min(100);
    RuleCheckOutcome {
        rule_type,
        passed: true,
        score,
        message: format!("今日亏损 {}，限制 {}", today_loss, params.max_daily_loss),
    }
}

/// 价格偏离：限价与标记价的偏离百分比不得超限，市价单跳过
fn check_price_deviation(
    params: &PriceDeviationParams,
    intent: &TradeIntent,
    mark_price: Decimal,
) -> RuleCheckOutcome {
    let rule_type = RiskRuleType::PriceDeviation;

    if intent.is_market_order() {
        return RuleCheckOutcome {
            rule_type,
            passed: true,
            score: 0,
            message: "市价单，跳过价格偏离检查".to_string(),
        };
    }

    if mark_price.is_zero() {
        // 标记价尚未同步，无法评估偏离
        return RuleCheckOutcome {
            rule_type,
            passed: true,
            score: 0,
            message: "标记价缺失，跳过价格偏离检查".to_string(),
        };
    }

    let deviation = (intent.price - mark_price).abs() / mark_price * Decimal::ONE_HUNDRED;
    if deviation > params.max_deviation_percent {
        return RuleCheckOutcome {
            rule_type,
            passed: false,
            score: score_from(deviation),
            message: format!(
                "价格偏离 {}% 超过限制 {}%",
                deviation.round_dp(2),
                params.max_deviation_percent.round_dp(2)
            ),
        };
    }

    RuleCheckOutcome {
        rule_type,
        passed: true,
        score: score_from(deviation),
        message: format!(
            "价格偏离 {}%，限制 {}%",
            deviation.round_dp(2),
            params.max_deviation_percent.round_dp(2)
        ),
    }
}

/// 集中度：成交后该市场名义价值占AUM的比例不得超限
fn check_concentration(
    params: &ConcentrationParams,
    intent: &TradeIntent,
    positions: &[Position],
    fund: &Fund,
) -> RuleCheckOutcome {
    let rule_type = RiskRuleType::Concentration;

    if fund.total_aum.is_zero() {
        return RuleCheckOutcome {
            rule_type,
            passed: true,
            score: 0,
            message: "AUM为零，跳过集中度检查".to_string(),
        };
    }

    let mut market_value: Decimal = positions
        .iter()
        .filter(|p| p.market_id == intent.market_id)
        .map(|p| p.notional())
        .sum();
    market_value += intent.size * intent.price;

    let concentration = market_value / fund.total_aum * Decimal::ONE_HUNDRED;
    if concentration > params.max_concentration_percent {
        return RuleCheckOutcome {
            rule_type,
            passed: false,
            score: score_from(concentration),
            message: format!(
                "市场集中度 {}% 超过限制 {}%",
                concentration.round_dp(2),
                params.max_concentration_percent.round_dp(2)
            ),
        };
    }

    RuleCheckOutcome {
        rule_type,
        passed: true,
        score: score_from(concentration),
        message: format!(
            "市场集中度 {}%，限制 {}%",
            concentration.round_dp(2),
            params.max_concentration_percent.round_dp(2)
        ),
    }
}

/// 止损线（审计上下文的事前防线，持续监控由实时风控引擎负责）
fn check_stop_loss(params: &StopLossParams, positions: &[Position]) -> RuleCheckOutcome {
    let rule_type = RiskRuleType::StopLoss;

    for pos in positions {
        if pos.size.is_zero() {
            continue;
        }
        let loss_percent = pos.loss_percent();
        if loss_percent > params.stop_loss_percent {
            return RuleCheckOutcome {
                rule_type,
                passed: false,
                score: 100,
                message: format!(
                    "持仓 {} 触发止损，亏损 {}%",
                    pos.market_id,
                    loss_percent.round_dp(2)
                ),
            };
        }
    }

    RuleCheckOutcome {
        rule_type,
        passed: true,
        score: 0,
        message: "未触发止损".to_string(),
    }
}
