//! 止损执行能力

use anyhow::Result;
use async_trait::async_trait;

use crate::entities::Position;

/// 止损执行器
///
/// 实时风控引擎对该能力参数化，在组装期注入具体实现
/// （execution 层的工作池实现了快速路径平仓）。
#[async_trait]
pub trait StopLossExecutor: Send + Sync {
    /// 对触发止损的持仓执行市价平仓
    async fn close_position(&self, position: &Position) -> Result<()>;
}
