//! Persistence port. The services own no storage; everything they read or
//! write goes through this trait.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Account, Plan, ReferralConfig, Transaction, TransactionStatus, YieldRecord,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryGateway;
pub use postgres::PostgresGateway;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => GatewayError::NotFound("row not found".to_string()),
            other => GatewayError::Backend(other.to_string()),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Accounts enrolled in a plan, ordered by id.
    async fn list_enrolled_accounts(&self) -> GatewayResult<Vec<Account>>;

    async fn account(&self, id: Uuid) -> GatewayResult<Option<Account>>;

    async fn account_by_referral_code(&self, code: &str) -> GatewayResult<Option<Account>>;

    async fn plan(&self, id: Uuid) -> GatewayResult<Option<Plan>>;

    /// Direct referrals of an account, ordered by id.
    async fn referred_by(&self, referrer_id: Uuid) -> GatewayResult<Vec<Account>>;

    /// Approved transactions of an account, any kind.
    async fn approved_transactions(&self, account_id: Uuid) -> GatewayResult<Vec<Transaction>>;

    async fn referral_config(&self) -> GatewayResult<ReferralConfig>;

    /// Appends a yield record and adds the amount to the account balance as
    /// one atomic unit. A partial application breaks the books, so either
    /// both happen or neither does.
    async fn apply_yield(
        &self,
        account_id: Uuid,
        amount: BigDecimal,
        source: &str,
    ) -> GatewayResult<YieldRecord>;

    /// An account's yield records, newest first.
    async fn yield_records(&self, account_id: Uuid) -> GatewayResult<Vec<YieldRecord>>;

    /// All yield records, newest first.
    async fn all_yield_records(&self) -> GatewayResult<Vec<YieldRecord>>;

    /// Inserts an account; when it carries a referrer, the referrer's
    /// referral count is incremented in the same unit of work.
    async fn insert_account(&self, account: Account) -> GatewayResult<Account>;

    async fn insert_transaction(&self, tx: Transaction) -> GatewayResult<Transaction>;

    async fn transaction(&self, id: Uuid) -> GatewayResult<Option<Transaction>>;

    async fn transactions_by_status(
        &self,
        status: TransactionStatus,
    ) -> GatewayResult<Vec<Transaction>>;

    /// Moves a pending transaction to approved or rejected. Approval mutates
    /// the account balance (deposits add, withdrawals subtract) in the same
    /// unit of work; a withdrawal that would drive the balance negative is
    /// refused. Terminal rows refuse further transitions.
    async fn settle_transaction(&self, id: Uuid, approve: bool) -> GatewayResult<Transaction>;
}
