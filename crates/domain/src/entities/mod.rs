//! 业务实体

pub mod audit_log;
pub mod fund;
pub mod market_data;
pub mod position;
pub mod risk_event;
pub mod risk_rule;
pub mod trade_intent;

pub use audit_log::AuditLog;
pub use fund::Fund;
pub use market_data::MarketData;
pub use position::Position;
pub use risk_event::RiskEvent;
pub use risk_rule::RiskRule;
pub use trade_intent::{IntentError, TradeIntent};
