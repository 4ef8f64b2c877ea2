//! 模拟交易场所客户端
//!
//! 纸面交易模式（VENUE_MODE=simulated）与集成测试使用：
//! 订单按请求价全量成交，不触网、不签名。

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use polyfund_domain::enums::TradeSide;
use polyfund_domain::traits::{Market, OrderRequest, OrderResponse, VenueClient};

#[derive(Default)]
pub struct SimulatedVenueClient {
    markets: RwLock<HashMap<String, Market>>,
}

impl SimulatedVenueClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置市场行情
    pub async fn set_market(&self, market: Market) {
        self.markets.write().await.insert(market.id.clone(), market);
    }
}

#[async_trait]
impl VenueClient for SimulatedVenueClient {
    async fn get_market(&self, market_id: &str) -> Result<Market> {
        self.markets
            .read()
            .await
            .get(market_id)
            .cloned()
            .ok_or_else(|| anyhow!("未知市场: {}", market_id))
    }

    async fn place_order(&self, req: &OrderRequest) -> Result<OrderResponse> {
        // 市价单按对手方最优价成交，限价单按限价成交
        let fill_price = if req.price.is_zero() {
            let market = self.get_market(&req.market_id).await?;
            match req.side {
                TradeSide::Buy => market.best_ask,
                TradeSide::Sell => market.best_bid,
            }
        } else {
            req.price
        };

        let order_id = Uuid::new_v4();
        Ok(OrderResponse {
            order_id: order_id.to_string(),
            status: "FILLED".to_string(),
            filled_size: req.size,
            avg_fill_price: fill_price,
            remaining_size: rust_decimal::Decimal::ZERO,
            transaction_id: format!("sim-{}", order_id.simple()),
            error: String::new(),
        })
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }
}
