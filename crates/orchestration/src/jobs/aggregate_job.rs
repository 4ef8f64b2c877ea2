//! 数据聚合任务
//!
//! 1. 从交易场所刷新活跃市场的行情缓存（审计器的标记价来源）；
//! 2. 按最新标记价重算每个持仓的未实现盈亏。

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use polyfund_domain::traits::{
    MarketDataRepository, PositionRepository, Repository, VenueClient,
};

pub struct AggregateJob {
    repo: Arc<dyn Repository>,
    venue: Arc<dyn VenueClient>,
}

impl AggregateJob {
    pub fn new(repo: Arc<dyn Repository>, venue: Arc<dyn VenueClient>) -> Self {
        Self { repo, venue }
    }

    pub async fn run_once(&self) {
        debug!("执行数据聚合");
        self.refresh_market_prices().await;
        self.refresh_position_pnl().await;
    }

    /// 刷新活跃市场行情缓存
    async fn refresh_market_prices(&self) {
        let markets = match self.repo.get_active_markets().await {
            Ok(markets) => markets,
            Err(e) => {
                error!("获取活跃市场失败: {}", e);
                return;
            }
        };

        for mut cached in markets {
            let quote = match self.venue.get_market(&cached.market_id).await {
                Ok(quote) => quote,
                Err(e) => {
                    error!(market_id = %cached.market_id, "刷新行情失败: {}", e);
                    continue;
                }
            };

            cached.best_bid = quote.best_bid;
            cached.best_ask = quote.best_ask;
            cached.last_price = quote.last_price;
            cached.volume = quote.volume;
            cached.liquidity = quote.liquidity;
            cached.active = quote.active;
            cached.closed = quote.closed;
            cached.updated_at = Utc::now();

            if let Err(e) = self.repo.save_market_data(&cached).await {
                error!(market_id = %cached.market_id, "保存行情缓存失败: {}", e);
            }
        }
    }

    /// 重算全部持仓的未实现盈亏
    async fn refresh_position_pnl(&self) {
        let positions = match self.repo.get_all_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                error!("获取持仓失败: {}", e);
                return;
            }
        };

        for mut pos in positions {
            let mark = match self.repo.get_market_data(&pos.market_id).await {
                Ok(Some(market)) => market.mark_price(),
                // 行情缓存缺失时退化用持仓上的旧标记价
                Ok(None) => pos.current_price,
                Err(e) => {
                    error!(market_id = %pos.market_id, "查询行情缓存失败: {}", e);
                    continue;
                }
            };

            pos.refresh_unrealized_pnl(mark);
            if let Err(e) = self.repo.save_position(&pos).await {
                error!(position_id = %pos.id, "更新持仓盈亏失败: {}", e);
            }
        }
    }
}
