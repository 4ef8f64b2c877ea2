//! # Polyfund Orchestration
//!
//! 调度层：任务运行器（固定间隔 + Cron）与四个周期任务
//! （审计扫描、滞留兜底、数据聚合、每日结算）

pub mod jobs;
pub mod scheduler;

pub use jobs::{AggregateJob, AuditJob, ExecuteJob, SettlementJob};
pub use scheduler::{JobRunner, Scheduler};
