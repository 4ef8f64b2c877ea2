//! 滞留意图兜底任务
//!
//! 队列满被丢弃的任务会让意图停留在 APPROVED；
//! 超过滞留时限的重新提交到执行队列。

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use polyfund_domain::traits::{IntentRepository, Repository};
use polyfund_execution::Executor;

/// 滞留时限
const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

pub struct ExecuteJob {
    repo: Arc<dyn Repository>,
    executor: Arc<Executor>,
    batch_size: usize,
}

impl ExecuteJob {
    pub fn new(repo: Arc<dyn Repository>, executor: Arc<Executor>, batch_size: usize) -> Self {
        Self {
            repo,
            executor,
            batch_size,
        }
    }

    pub async fn run_once(&self) {
        let intents = match self
            .repo
            .get_stale_approved_intents(STALE_AFTER, self.batch_size)
            .await
        {
            Ok(intents) => intents,
            Err(e) => {
                error!("获取滞留意图失败: {}", e);
                return;
            }
        };

        for intent in intents {
            warn!(
                intent_id = %intent.id,
                approved_at = %intent.updated_at,
                "发现滞留意图，重新提交"
            );
            self.executor.submit(intent.id);
        }
    }
}
