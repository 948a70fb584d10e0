//! Yield accrual engine.
//!
//! One cycle walks every account enrolled in a plan, computes
//! `balance * daily_rate`, and for positive amounts appends a yield record
//! and adds the amount to the balance as one atomic unit. One account's
//! failure never blocks the rest of the cycle.
//!
//! The engine holds no notion of "already accrued this period"; the caller
//! (administrator or scheduler) enforces the period boundary.

use bigdecimal::BigDecimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::domain::Caller;
use crate::error::AppError;
use crate::gateway::PersistenceGateway;

/// Source tag written on records produced by the engine.
pub const YIELD_SOURCE: &str = "accrual";

#[derive(Debug, Default, Serialize)]
pub struct AccrualSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: Vec<Uuid>,
}

pub struct AccrualEngine {
    gateway: Arc<dyn PersistenceGateway>,
    deadline: Duration,
}

impl AccrualEngine {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, deadline: Duration) -> Self {
        Self { gateway, deadline }
    }

    /// Runs one accrual cycle over all enrolled accounts. Requires an
    /// administrator caller; rejected before any account is read. Always
    /// returns a summary once started, even under partial failure.
    pub async fn run_cycle(&self, caller: &Caller) -> Result<AccrualSummary, AppError> {
        if !caller.is_admin {
            return Err(AppError::Unauthorized(format!(
                "accrual cycle requires an administrator, got '{}'",
                caller.actor
            )));
        }

        let accounts = self
            .gateway
            .list_enrolled_accounts()
            .await
            .map_err(AppError::from)?;

        tracing::info!("Accrual cycle started over {} enrolled account(s)", accounts.len());

        let started = Instant::now();
        let zero = BigDecimal::from(0);
        let mut summary = AccrualSummary::default();

        for account in accounts {
            if started.elapsed() >= self.deadline {
                tracing::warn!(
                    "Accrual deadline reached after {} processed; remaining accounts left for the next cycle",
                    summary.processed
                );
                break;
            }

            let Some(plan_id) = account.plan_id else {
                summary.skipped += 1;
                continue;
            };

            match self.gateway.plan(plan_id).await {
                Ok(Some(plan)) => {
                    let accrued = &account.balance * &plan.daily_rate;
                    if accrued <= zero {
                        tracing::debug!(
                            "No yield for account {} (plan {}, rate {})",
                            account.id,
                            plan.name,
                            plan.daily_rate
                        );
                        summary.skipped += 1;
                        continue;
                    }

                    match self
                        .gateway
                        .apply_yield(account.id, accrued.clone(), YIELD_SOURCE)
                        .await
                    {
                        Ok(_) => {
                            tracing::debug!("Accrued {} to account {}", accrued, account.id);
                            summary.processed += 1;
                        }
                        Err(e) => {
                            tracing::error!("Failed to apply yield to account {}: {}", account.id, e);
                            summary.failed.push(account.id);
                        }
                    }
                }
                Ok(None) => {
                    tracing::error!("Plan {} missing for account {}", plan_id, account.id);
                    summary.failed.push(account.id);
                }
                Err(e) => {
                    tracing::error!("Plan lookup failed for account {}: {}", account.id, e);
                    summary.failed.push(account.id);
                }
            }
        }

        tracing::info!(
            "Accrual cycle finished: {} processed, {} skipped, {} failed",
            summary.processed,
            summary.skipped,
            summary.failed.len()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, Plan};
    use crate::gateway::InMemoryGateway;
    use std::str::FromStr;

    fn engine(gateway: Arc<InMemoryGateway>) -> AccrualEngine {
        AccrualEngine::new(gateway, Duration::from_secs(30))
    }

    fn plan(rate: &str) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: format!("plan-{}", rate),
            daily_rate: BigDecimal::from_str(rate).expect("valid rate"),
        }
    }

    fn enrolled_account(balance: &str, plan_id: Uuid) -> Account {
        let mut account = Account::new(None, Some(plan_id));
        account.balance = BigDecimal::from_str(balance).expect("valid balance");
        account
    }

    #[tokio::test]
    async fn rejects_non_admin_caller_before_any_work() {
        let gateway = Arc::new(InMemoryGateway::new());
        let result = engine(gateway.clone())
            .run_cycle(&Caller::user("someone"))
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert_eq!(gateway.yield_record_count(), 0);
    }

    #[tokio::test]
    async fn accrues_exactly_balance_times_rate() {
        let gateway = Arc::new(InMemoryGateway::new());
        let p = plan("0.01");
        let account = enrolled_account("200", p.id);
        let account_id = account.id;
        gateway.add_plan(p);
        gateway.add_account(account);

        let summary = engine(gateway.clone())
            .run_cycle(&Caller::admin("test"))
            .await
            .expect("cycle runs");

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 0);
        assert!(summary.failed.is_empty());
        assert_eq!(
            gateway.balance_of(account_id),
            Some(BigDecimal::from_str("202.0").expect("valid"))
        );
        assert_eq!(gateway.yield_record_count(), 1);

        let records = gateway.yield_records(account_id).await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, BigDecimal::from_str("2.0").expect("valid"));
        assert_eq!(records[0].source, YIELD_SOURCE);
    }

    #[tokio::test]
    async fn zero_rate_plan_is_inert() {
        let gateway = Arc::new(InMemoryGateway::new());
        let p = plan("0");
        let account = enrolled_account("100", p.id);
        let account_id = account.id;
        gateway.add_plan(p);
        gateway.add_account(account);

        let summary = engine(gateway.clone())
            .run_cycle(&Caller::admin("test"))
            .await
            .expect("cycle runs");

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(gateway.balance_of(account_id), Some(BigDecimal::from(100)));
        assert_eq!(gateway.yield_record_count(), 0);
    }

    #[tokio::test]
    async fn negative_rate_never_persists_or_mutates() {
        let gateway = Arc::new(InMemoryGateway::new());
        let p = plan("-0.02");
        let account = enrolled_account("500", p.id);
        let account_id = account.id;
        gateway.add_plan(p);
        gateway.add_account(account);

        let summary = engine(gateway.clone())
            .run_cycle(&Caller::admin("test"))
            .await
            .expect("cycle runs");

        assert_eq!(summary.skipped, 1);
        assert_eq!(gateway.balance_of(account_id), Some(BigDecimal::from(500)));
        assert_eq!(gateway.yield_record_count(), 0);
    }

    #[tokio::test]
    async fn unenrolled_accounts_are_not_visited() {
        let gateway = Arc::new(InMemoryGateway::new());
        let account = Account::new(None, None);
        let account_id = account.id;
        gateway.add_account(account);

        let summary = engine(gateway.clone())
            .run_cycle(&Caller::admin("test"))
            .await
            .expect("cycle runs");

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped, 0);
        assert_eq!(gateway.balance_of(account_id), Some(BigDecimal::from(0)));
    }

    #[tokio::test]
    async fn missing_plan_fails_one_account_without_blocking_others() {
        let gateway = Arc::new(InMemoryGateway::new());
        let p = plan("0.01");

        let healthy: Vec<Account> = (0..4).map(|_| enrolled_account("100", p.id)).collect();
        let broken = enrolled_account("100", Uuid::new_v4());
        let broken_id = broken.id;

        gateway.add_plan(p);
        for account in &healthy {
            gateway.add_account(account.clone());
        }
        gateway.add_account(broken);

        let summary = engine(gateway.clone())
            .run_cycle(&Caller::admin("test"))
            .await
            .expect("cycle runs");

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.failed, vec![broken_id]);
        for account in &healthy {
            assert_eq!(
                gateway.balance_of(account.id),
                Some(BigDecimal::from_str("101.00").expect("valid"))
            );
        }
        assert_eq!(gateway.balance_of(broken_id), Some(BigDecimal::from(100)));
    }

    #[tokio::test]
    async fn mixed_scenario_matches_expected_books() {
        let gateway = Arc::new(InMemoryGateway::new());
        let active = plan("0.01");
        let inert = plan("0");

        let a = enrolled_account("200", active.id);
        let b = enrolled_account("100", inert.id);
        let (a_id, b_id) = (a.id, b.id);

        gateway.add_plan(active);
        gateway.add_plan(inert);
        gateway.add_account(a);
        gateway.add_account(b);

        let summary = engine(gateway.clone())
            .run_cycle(&Caller::admin("test"))
            .await
            .expect("cycle runs");

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            gateway.balance_of(a_id),
            Some(BigDecimal::from_str("202.0").expect("valid"))
        );
        assert_eq!(gateway.balance_of(b_id), Some(BigDecimal::from(100)));

        let a_records = gateway.yield_records(a_id).await.expect("records");
        assert_eq!(a_records.len(), 1);
        assert_eq!(a_records[0].amount, BigDecimal::from_str("2.0").expect("valid"));
        assert!(gateway.yield_records(b_id).await.expect("records").is_empty());
    }
}
