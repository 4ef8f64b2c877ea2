//! 领域接口 - 定义数据访问与外部协作的抽象

pub mod executor_trait;
pub mod repository_trait;
pub mod venue_trait;

pub use executor_trait::StopLossExecutor;
pub use repository_trait::{
    FundRepository, IntentRepository, MarketDataRepository, PositionRepository, Repository,
    RiskRepository,
};
pub use venue_trait::{Market, OrderRequest, OrderResponse, Outcome, VenueClient};
