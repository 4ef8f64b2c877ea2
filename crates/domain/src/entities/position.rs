//! 持仓实体

use chrono::{DateTime, Utc};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::TradeSide;

/// 持仓
///
/// 同一 (fund, market, outcome) 至多一行；size 为带符号数量，
/// 正数做多、负数做空，size == 0 表示休眠仓位。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub market_id: String,
    pub outcome_id: String,
    /// 带符号持仓数量
    pub size: Decimal,
    /// 加权平均开仓价
    pub entry_price: Decimal,
    /// 最新标记价
    pub current_price: Decimal,
    /// 未实现盈亏
    pub unrealized_pnl: Decimal,
    /// 今日已实现盈亏（结算任务每日清零，供日亏损规则使用）
    pub realized_pnl_today: Decimal,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Position {
    /// 空仓位（首笔成交前）
    pub fn empty(fund_id: Uuid, market_id: String, outcome_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            fund_id,
            market_id,
            outcome_id,
            size: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            current_price: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl_today: Decimal::ZERO,
            last_updated: now,
            created_at: now,
        }
    }

    /// 应用一笔成交
    ///
    /// - 数量按方向带符号累加；
    /// - 减仓部分按 (成交价-开仓价) 结转到今日已实现盈亏；
    /// - 平均开仓价按 |新数量| 为权重基数重算，完全平仓时保留原值；
    /// - 标记价更新为成交价。
    pub fn apply_fill(&mut self, side: TradeSide, fill_size: Decimal, fill_price: Decimal) {
        let signed_fill = match side {
            TradeSide::Buy => fill_size,
            TradeSide::Sell => -fill_size,
        };

        let size_before = self.size;
        let size_after = size_before + signed_fill;

        // 减仓数量 = 与现有仓位反向的那部分
        if !size_before.is_zero() && size_before.signum() != signed_fill.signum() {
            let closed = fill_size.min(size_before.abs());
            let pnl_per_unit = if size_before > Decimal::ZERO {
                fill_price - self.entry_price
            } else {
                self.entry_price - fill_price
            };
            self.realized_pnl_today += pnl_per_unit * closed;
        }

        if !size_after.is_zero() {
            let total_cost =
                self.entry_price * size_before.abs() + fill_price * fill_size;
            self.entry_price = total_cost / size_after.abs();
        }
        // 完全平仓时保留开仓价

        self.size = size_after;
        self.current_price = fill_price;
        self.last_updated = Utc::now();
    }

    /// 按最新标记价刷新未实现盈亏
    pub fn refresh_unrealized_pnl(&mut self, mark: Decimal) {
        self.unrealized_pnl = if self.size >= Decimal::ZERO {
            // 多头
            (mark - self.entry_price) * self.size
        } else {
            // 空头
            (self.entry_price - mark) * self.size.abs()
        };
        self.current_price = mark;
        self.last_updated = Utc::now();
    }

    /// 亏损百分比（只追踪亏损，盈利时为0）
    ///
    /// 多头: (entry - mark) / entry * 100
    /// 空头: (mark - entry) / entry * 100
    /// entry == 0 时为 0。
    pub fn loss_percent(&self) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }

        let hundred = Decimal::ONE_HUNDRED;
        let loss = if self.size > Decimal::ZERO {
            (self.entry_price - self.current_price) / self.entry_price * hundred
        } else {
            (self.current_price - self.entry_price) / self.entry_price * hundred
        };

        loss.max(Decimal::ZERO)
    }

    /// 平仓方向（多头卖出、空头买入）
    pub fn close_side(&self) -> TradeSide {
        if self.size > Decimal::ZERO {
            TradeSide::Sell
        } else {
            TradeSide::Buy
        }
    }

    /// 按标记价计的持仓名义价值（带符号）
    pub fn notional(&self) -> Decimal {
        self.size * self.current_price
    }
}
