//! 审计扫描任务
//!
//! 拉取一批 PENDING 意图，逐条CAS到 AUDITING 后交给审计器；
//! 审计通过的意图提交到执行队列。

use std::sync::Arc;

use tracing::{error, info, warn};

use polyfund_domain::enums::IntentStatus;
use polyfund_domain::traits::{IntentRepository, Repository};
use polyfund_execution::Executor;
use polyfund_risk::Auditor;

pub struct AuditJob {
    repo: Arc<dyn Repository>,
    auditor: Arc<Auditor>,
    executor: Arc<Executor>,
    batch_size: usize,
}

impl AuditJob {
    pub fn new(
        repo: Arc<dyn Repository>,
        auditor: Arc<Auditor>,
        executor: Arc<Executor>,
        batch_size: usize,
    ) -> Self {
        Self {
            repo,
            auditor,
            executor,
            batch_size,
        }
    }

    pub async fn run_once(&self) {
        let intents = match self.repo.get_pending_intents(self.batch_size).await {
            Ok(intents) => intents,
            Err(e) => {
                error!("获取待审计意图失败: {}", e);
                return;
            }
        };
        if intents.is_empty() {
            return;
        }

        info!("开始批量风控审计, count={}", intents.len());

        for mut intent in intents {
            // CAS进入审计中；竞争失败说明已被其他实例或取消流程处理
            match self
                .repo
                .transition_intent_status(intent.id, IntentStatus::Pending, IntentStatus::Auditing)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    warn!(intent_id = %intent.id, "意图已不在PENDING，跳过");
                    continue;
                }
                Err(e) => {
                    error!(intent_id = %intent.id, "更新审计状态失败: {}", e);
                    continue;
                }
            }
            intent.status = IntentStatus::Auditing;

            match self.auditor.audit_intent(&mut intent).await {
                Ok(verdict) if verdict.passed => {
                    info!(intent_id = %intent.id, "审计通过，提交执行");
                    self.executor.submit(intent.id);
                }
                Ok(_) => {
                    warn!(
                        intent_id = %intent.id,
                        reason = intent.reject_reason.as_deref().unwrap_or(""),
                        "审计拒绝"
                    );
                }
                Err(e) => {
                    error!(intent_id = %intent.id, "审计失败: {}", e);
                }
            }
        }
    }
}
