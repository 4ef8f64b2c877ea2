//! # Polyfund Risk
//!
//! 风控层：规则注册表（参数解析/校验）、审计器、实时风控引擎

pub mod auditor;
pub mod realtime;
pub mod rules;

pub use auditor::{AuditVerdict, Auditor, RuleCheckOutcome};
pub use realtime::RealtimeRiskEngine;
pub use rules::{RuleParamError, RuleParams};
