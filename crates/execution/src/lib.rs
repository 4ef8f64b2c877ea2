//! # Polyfund Execution
//!
//! 执行层：Polymarket客户端（HMAC认证 + EIP-712订单签名）
//! 与异步执行工作池（有界队列、重试、止损快速路径）

pub mod executor;
pub mod venue;

pub use executor::{ExecError, ExecutionTask, Executor, ExecutorConfig};
pub use venue::polymarket::PolymarketClient;
pub use venue::simulated::SimulatedVenueClient;
