//! Referral commission computation.
//!
//! Walks an account's referral network breadth-first down to
//! [`REFERRAL_DEPTH`] levels and prices each referred account's approved
//! commissionable volume at the level's configured percentage. The
//! computation is a pure function of persisted state: no caching, and a
//! failed sub-query fails the whole call rather than returning a partial
//! (and therefore misleading) network view.

use bigdecimal::BigDecimal;
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{Account, ReferralConfig};
use crate::error::AppError;
use crate::gateway::PersistenceGateway;

/// How many referral levels pay commission.
pub const REFERRAL_DEPTH: u32 = 2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkEntry {
    pub account_id: Uuid,
    pub volume: BigDecimal,
    pub commission: BigDecimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LevelReport {
    pub level: u32,
    pub entries: Vec<NetworkEntry>,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkReport {
    pub root: Uuid,
    pub levels: Vec<LevelReport>,
}

pub struct ReferralNetwork {
    gateway: Arc<dyn PersistenceGateway>,
    deadline: Duration,
}

impl ReferralNetwork {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, deadline: Duration) -> Self {
        Self { gateway, deadline }
    }

    /// Computes the commission report for an account's network. Fails
    /// wholesale on a missing root, any gateway error, or deadline expiry.
    pub async fn compute(&self, root_id: Uuid) -> Result<NetworkReport, AppError> {
        match tokio::time::timeout(self.deadline, self.compute_inner(root_id)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Internal(format!(
                "network computation for account {} exceeded deadline",
                root_id
            ))),
        }
    }

    async fn compute_inner(&self, root_id: Uuid) -> Result<NetworkReport, AppError> {
        self.gateway
            .account(root_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", root_id)))?;

        let config = self.gateway.referral_config().await.map_err(AppError::from)?;
        if config.is_empty() {
            tracing::debug!("Referral configuration is empty; commissions will be zero");
        }

        let mut frontier = vec![root_id];
        let mut levels = Vec::with_capacity(REFERRAL_DEPTH as usize);

        for level in 1..=REFERRAL_DEPTH {
            // Sub-queries within a level are independent pure reads; fetch
            // them concurrently and join before moving on.
            let batches = try_join_all(
                frontier
                    .iter()
                    .map(|id| self.gateway.referred_by(*id)),
            )
            .await
            .map_err(AppError::from)?;

            let mut members: Vec<Account> = batches.into_iter().flatten().collect();
            members.sort_by_key(|a| a.id);

            let entries = try_join_all(
                members
                    .iter()
                    .map(|account| self.entry_for(account, &config, level)),
            )
            .await?;

            let total = entries
                .iter()
                .fold(BigDecimal::from(0), |acc, e: &NetworkEntry| acc + &e.commission);

            frontier = members.iter().map(|a| a.id).collect();
            levels.push(LevelReport { level, entries, total });
        }

        Ok(NetworkReport { root: root_id, levels })
    }

    async fn entry_for(
        &self,
        account: &Account,
        config: &ReferralConfig,
        level: u32,
    ) -> Result<NetworkEntry, AppError> {
        let transactions = self
            .gateway
            .approved_transactions(account.id)
            .await
            .map_err(AppError::from)?;

        let volume = transactions
            .iter()
            .filter(|t| t.kind.is_commissionable())
            .fold(BigDecimal::from(0), |acc, t| acc + &t.amount);

        let commission = &volume * &config.percentage(level) / BigDecimal::from(100);

        Ok(NetworkEntry {
            account_id: account.id,
            volume,
            commission,
        })
    }
}
