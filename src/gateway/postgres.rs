//! Postgres implementation of the persistence gateway.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{
    Account, Plan, ReferralConfig, Transaction, TransactionKind, TransactionStatus, YieldRecord,
};
use crate::gateway::{GatewayError, GatewayResult, PersistenceGateway};

#[derive(Clone)]
pub struct PostgresGateway {
    pool: PgPool,
}

impl PostgresGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersistenceGateway for PostgresGateway {
    async fn list_enrolled_accounts(&self) -> GatewayResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE plan_id IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn account(&self, id: Uuid) -> GatewayResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn account_by_referral_code(&self, code: &str) -> GatewayResult<Option<Account>> {
        let row =
            sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE referral_code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(GatewayError::from)?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn plan(&self, id: Uuid) -> GatewayResult<Option<Plan>> {
        let row = sqlx::query_as::<_, PlanRow>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        Ok(row.map(|r| r.into_domain()))
    }

    async fn referred_by(&self, referrer_id: Uuid) -> GatewayResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE referrer_id = $1 ORDER BY id",
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn approved_transactions(&self, account_id: Uuid) -> GatewayResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE account_id = $1 AND status = 'approved' ORDER BY created_at",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn referral_config(&self) -> GatewayResult<ReferralConfig> {
        let rows = sqlx::query_as::<_, (i32, BigDecimal)>(
            "SELECT level, percentage FROM referral_config ORDER BY level",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        let mut levels = BTreeMap::new();
        for (level, percentage) in rows {
            if let Ok(level) = u32::try_from(level) {
                levels.insert(level, percentage);
            }
        }
        Ok(ReferralConfig::new(levels))
    }

    async fn apply_yield(
        &self,
        account_id: Uuid,
        amount: BigDecimal,
        source: &str,
    ) -> GatewayResult<YieldRecord> {
        let mut tx = self.pool.begin().await.map_err(GatewayError::from)?;

        // Lock the account row so a concurrent deposit approval cannot race
        // the balance update.
        let locked = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

        if locked.is_none() {
            return Err(GatewayError::NotFound(format!("account {}", account_id)));
        }

        let record = YieldRecord::new(account_id, amount.clone(), source);
        let row = sqlx::query_as::<_, YieldRecordRow>(
            r#"
            INSERT INTO yield_records (id, account_id, amount, source, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.account_id)
        .bind(&record.amount)
        .bind(&record.source)
        .bind(record.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(GatewayError::from)?;

        sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE id = $2")
            .bind(&amount)
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

        tx.commit().await.map_err(GatewayError::from)?;
        Ok(row.into_domain())
    }

    async fn yield_records(&self, account_id: Uuid) -> GatewayResult<Vec<YieldRecord>> {
        let rows = sqlx::query_as::<_, YieldRecordRow>(
            "SELECT * FROM yield_records WHERE account_id = $1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn all_yield_records(&self) -> GatewayResult<Vec<YieldRecord>> {
        let rows = sqlx::query_as::<_, YieldRecordRow>(
            "SELECT * FROM yield_records ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn insert_account(&self, account: Account) -> GatewayResult<Account> {
        let mut tx = self.pool.begin().await.map_err(GatewayError::from)?;

        if let Some(referrer_id) = account.referrer_id {
            let referrer =
                sqlx::query_as::<_, (Uuid,)>("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
                    .bind(referrer_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(GatewayError::from)?;

            if referrer.is_none() {
                return Err(GatewayError::NotFound(format!("referrer {}", referrer_id)));
            }
        }

        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (id, balance, plan_id, referrer_id, referral_code, referral_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(&account.balance)
        .bind(account.plan_id)
        .bind(account.referrer_id)
        .bind(&account.referral_code)
        .bind(account.referral_count)
        .bind(account.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(GatewayError::from)?;

        if let Some(referrer_id) = account.referrer_id {
            sqlx::query("UPDATE accounts SET referral_count = referral_count + 1 WHERE id = $1")
                .bind(referrer_id)
                .execute(&mut *tx)
                .await
                .map_err(GatewayError::from)?;
        }

        tx.commit().await.map_err(GatewayError::from)?;
        row.into_domain()
    }

    async fn insert_transaction(&self, transaction: Transaction) -> GatewayResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (id, account_id, kind, amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.account_id)
        .bind(transaction.kind.as_str())
        .bind(&transaction.amount)
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        row.into_domain()
    }

    async fn transaction(&self, id: Uuid) -> GatewayResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn transactions_by_status(
        &self,
        status: TransactionStatus,
    ) -> GatewayResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn settle_transaction(&self, id: Uuid, approve: bool) -> GatewayResult<Transaction> {
        let mut tx = self.pool.begin().await.map_err(GatewayError::from)?;

        let row =
            sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(GatewayError::from)?;

        let Some(row) = row else {
            return Err(GatewayError::NotFound(format!("transaction {}", id)));
        };
        let current = row.into_domain()?;

        if current.status.is_terminal() {
            return Err(GatewayError::Conflict(format!(
                "transaction {} is already {}",
                id, current.status
            )));
        }

        if approve {
            let balance = sqlx::query_as::<_, (BigDecimal,)>(
                "SELECT balance FROM accounts WHERE id = $1 FOR UPDATE",
            )
            .bind(current.account_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

            let Some((balance,)) = balance else {
                return Err(GatewayError::NotFound(format!(
                    "account {}",
                    current.account_id
                )));
            };

            if current.kind == TransactionKind::Withdraw && balance < current.amount {
                return Err(GatewayError::Conflict(format!(
                    "insufficient balance for withdrawal {}",
                    id
                )));
            }

            let delta = match current.kind {
                TransactionKind::Withdraw => "balance - $1",
                _ => "balance + $1",
            };
            let update = format!("UPDATE accounts SET balance = {} WHERE id = $2", delta);
            sqlx::query(&update)
                .bind(&current.amount)
                .bind(current.account_id)
                .execute(&mut *tx)
                .await
                .map_err(GatewayError::from)?;
        }

        let new_status = if approve {
            TransactionStatus::Approved
        } else {
            TransactionStatus::Rejected
        };

        let updated = sqlx::query_as::<_, TransactionRow>(
            "UPDATE transactions SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(new_status.as_str())
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(GatewayError::from)?;

        tx.commit().await.map_err(GatewayError::from)?;
        updated.into_domain()
    }
}

// Row types stay private to the adapter; conversion to domain types fails
// fast on shape mismatch instead of propagating malformed fields.

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    balance: BigDecimal,
    plan_id: Option<Uuid>,
    referrer_id: Option<Uuid>,
    referral_code: String,
    referral_count: i32,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl AccountRow {
    fn into_domain(self) -> GatewayResult<Account> {
        Ok(Account {
            id: self.id,
            balance: self.balance,
            plan_id: self.plan_id,
            referrer_id: self.referrer_id,
            referral_code: self.referral_code,
            referral_count: self.referral_count,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    daily_rate: BigDecimal,
}

impl PlanRow {
    fn into_domain(self) -> Plan {
        Plan {
            id: self.id,
            name: self.name,
            daily_rate: self.daily_rate,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    kind: String,
    amount: BigDecimal,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> GatewayResult<Transaction> {
        let kind = self
            .kind
            .parse::<TransactionKind>()
            .map_err(GatewayError::Backend)?;
        let status = self
            .status
            .parse::<TransactionStatus>()
            .map_err(GatewayError::Backend)?;

        Ok(Transaction {
            id: self.id,
            account_id: self.account_id,
            kind,
            amount: self.amount,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct YieldRecordRow {
    id: Uuid,
    account_id: Uuid,
    amount: BigDecimal,
    source: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl YieldRecordRow {
    fn into_domain(self) -> YieldRecord {
        YieldRecord {
            id: self.id,
            account_id: self.account_id,
            amount: self.amount,
            source: self.source,
            created_at: self.created_at,
        }
    }
}
