//! 交易场所客户端抽象
//!
//! 核心只依赖该接口；Polymarket HTTP实现（含EIP-712签名）在 execution 层。
//! 传输层/HTTP错误通过 Err 返回（可重试）；场所业务拒绝通过
//! `OrderResponse.error` 返回（不可重试）。

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{OrderType, TradeSide};

/// 市场信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
    #[serde(default)]
    pub best_bid: Decimal,
    #[serde(default)]
    pub best_ask: Decimal,
    #[serde(default)]
    pub last_price: Decimal,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub liquidity: Decimal,
}

/// 预测结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
}

/// 下单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub market_id: String,
    pub outcome_id: String,
    pub side: TradeSide,
    pub size: Decimal,
    /// 0 表示市价单
    pub price: Decimal,
    pub order_type: OrderType,
    /// 纳秒时间戳
    pub nonce: i64,
    /// Unix秒
    pub expiration: i64,
}

/// 下单响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub filled_size: Decimal,
    pub avg_fill_price: Decimal,
    #[serde(default)]
    pub remaining_size: Decimal,
    pub transaction_id: String,
    /// 场所侧业务错误，非空表示订单被拒绝，不重试
    #[serde(default)]
    pub error: String,
}

/// 交易场所客户端接口
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// 获取市场信息（工作协程据此推导市价单执行价）
    async fn get_market(&self, market_id: &str) -> Result<Market>;

    /// 签名下单
    async fn place_order(&self, req: &OrderRequest) -> Result<OrderResponse>;

    /// 撤单
    async fn cancel_order(&self, order_id: &str) -> Result<()>;
}
