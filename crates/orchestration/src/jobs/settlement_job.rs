//! 每日结算任务
//!
//! 对每个活跃基金：按标记价重算NAV写回AUM、清零当日已实现盈亏
//! （日亏损规则的统计窗口随之重开）、处理赎回、输出日报。

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info};

use polyfund_domain::entities::Fund;
use polyfund_domain::traits::{FundRepository, PositionRepository, Repository};

pub struct SettlementJob {
    repo: Arc<dyn Repository>,
}

impl SettlementJob {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn run_once(&self) {
        info!("执行每日结算");

        let funds = match self.repo.get_active_funds().await {
            Ok(funds) => funds,
            Err(e) => {
                error!("获取基金列表失败: {}", e);
                return;
            }
        };

        let mut report = Vec::with_capacity(funds.len());
        for fund in funds {
            match self.settle_fund(fund).await {
                Ok(entry) => report.push(entry),
                Err(e) => error!("基金结算失败: {}", e),
            }
        }

        self.process_redemptions().await;

        info!(
            date = %Utc::now().date_naive(),
            funds = report.len(),
            report = %serde_json::json!(report),
            "每日结算报告"
        );
    }

    /// 单基金结算：NAV重算 + 当日已实现盈亏清零
    async fn settle_fund(&self, mut fund: Fund) -> anyhow::Result<serde_json::Value> {
        let positions = self.repo.get_fund_positions(fund.id).await?;

        let mut nav = Decimal::ZERO;
        for mut pos in positions {
            nav += pos.notional();

            if !pos.realized_pnl_today.is_zero() {
                pos.realized_pnl_today = Decimal::ZERO;
                self.repo.save_position(&pos).await?;
            }
        }

        fund.total_aum = nav;
        fund.updated_at = Utc::now();
        self.repo.update_fund(&fund).await?;

        Ok(serde_json::json!({
            "fund_id": fund.id,
            "name": fund.name,
            "nav": nav,
        }))
    }

    /// 赎回处理挂接点，链上赎回由外部金库流程完成
    async fn process_redemptions(&self) {
        info!("处理赎回请求");
    }
}
