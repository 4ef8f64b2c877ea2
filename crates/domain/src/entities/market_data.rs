//! 市场数据缓存实体

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 市场数据缓存
///
/// 聚合任务周期性地从交易场所刷新，审计器从这里读取标记价，
/// 避免在审计链路上直接调用外部API。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    pub market_id: String,
    pub question: String,
    pub active: bool,
    pub closed: bool,
    pub best_bid: Decimal,
    pub best_ask: Decimal,
    pub last_price: Decimal,
    pub volume: Decimal,
    pub liquidity: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl MarketData {
    /// 标记价：优先用最新成交价，缺失时退化为买卖中间价
    pub fn mark_price(&self) -> Decimal {
        if !self.last_price.is_zero() {
            self.last_price
        } else {
            (self.best_bid + self.best_ask) / Decimal::TWO
        }
    }
}
