//! In-memory implementation of the persistence gateway. Backs the test
//! suite; mirrors the Postgres adapter's semantics, including atomic yield
//! application and pending-only settlement.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    Account, Plan, ReferralConfig, Transaction, TransactionKind, TransactionStatus, YieldRecord,
};
use crate::gateway::{GatewayError, GatewayResult, PersistenceGateway};

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    plans: HashMap<Uuid, Plan>,
    transactions: HashMap<Uuid, Transaction>,
    yields: Vec<YieldRecord>,
    config: ReferralConfig,
    failing_transaction_reads: HashSet<Uuid>,
}

#[derive(Default)]
pub struct InMemoryGateway {
    inner: Mutex<Inner>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plan(&self, plan: Plan) {
        self.lock().plans.insert(plan.id, plan);
    }

    pub fn add_account(&self, account: Account) {
        self.lock().accounts.insert(account.id, account);
    }

    pub fn add_transaction(&self, tx: Transaction) {
        self.lock().transactions.insert(tx.id, tx);
    }

    pub fn set_referral_config(&self, levels: BTreeMap<u32, BigDecimal>) {
        self.lock().config = ReferralConfig::new(levels);
    }

    /// Makes `approved_transactions` fail for one account, to exercise the
    /// fail-wholesale contract of the network computation.
    pub fn fail_transactions_for(&self, account_id: Uuid) {
        self.lock().failing_transaction_reads.insert(account_id);
    }

    pub fn balance_of(&self, account_id: Uuid) -> Option<BigDecimal> {
        self.lock().accounts.get(&account_id).map(|a| a.balance.clone())
    }

    pub fn yield_record_count(&self) -> usize {
        self.lock().yields.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn list_enrolled_accounts(&self) -> GatewayResult<Vec<Account>> {
        let inner = self.lock();
        let mut accounts: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| a.plan_id.is_some())
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn account(&self, id: Uuid) -> GatewayResult<Option<Account>> {
        Ok(self.lock().accounts.get(&id).cloned())
    }

    async fn account_by_referral_code(&self, code: &str) -> GatewayResult<Option<Account>> {
        Ok(self
            .lock()
            .accounts
            .values()
            .find(|a| a.referral_code == code)
            .cloned())
    }

    async fn plan(&self, id: Uuid) -> GatewayResult<Option<Plan>> {
        Ok(self.lock().plans.get(&id).cloned())
    }

    async fn referred_by(&self, referrer_id: Uuid) -> GatewayResult<Vec<Account>> {
        let inner = self.lock();
        let mut referred: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| a.referrer_id == Some(referrer_id))
            .cloned()
            .collect();
        referred.sort_by_key(|a| a.id);
        Ok(referred)
    }

    async fn approved_transactions(&self, account_id: Uuid) -> GatewayResult<Vec<Transaction>> {
        let inner = self.lock();
        if inner.failing_transaction_reads.contains(&account_id) {
            return Err(GatewayError::Backend(format!(
                "transaction read failed for account {}",
                account_id
            )));
        }
        let mut txs: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.account_id == account_id && t.status == TransactionStatus::Approved)
            .cloned()
            .collect();
        txs.sort_by_key(|t| t.created_at);
        Ok(txs)
    }

    async fn referral_config(&self) -> GatewayResult<ReferralConfig> {
        Ok(self.lock().config.clone())
    }

    async fn apply_yield(
        &self,
        account_id: Uuid,
        amount: BigDecimal,
        source: &str,
    ) -> GatewayResult<YieldRecord> {
        let mut inner = self.lock();
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| GatewayError::NotFound(format!("account {}", account_id)))?;

        account.balance = &account.balance + &amount;
        let record = YieldRecord::new(account_id, amount, source);
        inner.yields.push(record.clone());
        Ok(record)
    }

    async fn yield_records(&self, account_id: Uuid) -> GatewayResult<Vec<YieldRecord>> {
        let inner = self.lock();
        let mut records: Vec<YieldRecord> = inner
            .yields
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn all_yield_records(&self) -> GatewayResult<Vec<YieldRecord>> {
        let inner = self.lock();
        let mut records = inner.yields.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn insert_account(&self, account: Account) -> GatewayResult<Account> {
        let mut inner = self.lock();
        if let Some(referrer_id) = account.referrer_id {
            let referrer = inner
                .accounts
                .get_mut(&referrer_id)
                .ok_or_else(|| GatewayError::NotFound(format!("referrer {}", referrer_id)))?;
            referrer.referral_count += 1;
        }
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn insert_transaction(&self, tx: Transaction) -> GatewayResult<Transaction> {
        self.lock().transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn transaction(&self, id: Uuid) -> GatewayResult<Option<Transaction>> {
        Ok(self.lock().transactions.get(&id).cloned())
    }

    async fn transactions_by_status(
        &self,
        status: TransactionStatus,
    ) -> GatewayResult<Vec<Transaction>> {
        let inner = self.lock();
        let mut txs: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txs)
    }

    async fn settle_transaction(&self, id: Uuid, approve: bool) -> GatewayResult<Transaction> {
        let mut inner = self.lock();

        let current = inner
            .transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("transaction {}", id)))?;

        if current.status.is_terminal() {
            return Err(GatewayError::Conflict(format!(
                "transaction {} is already {}",
                id, current.status
            )));
        }

        if approve {
            let account = inner
                .accounts
                .get_mut(&current.account_id)
                .ok_or_else(|| GatewayError::NotFound(format!("account {}", current.account_id)))?;

            match current.kind {
                TransactionKind::Withdraw => {
                    if account.balance < current.amount {
                        return Err(GatewayError::Conflict(format!(
                            "insufficient balance for withdrawal {}",
                            id
                        )));
                    }
                    account.balance = &account.balance - &current.amount;
                }
                _ => {
                    account.balance = &account.balance + &current.amount;
                }
            }
        }

        let tx = inner
            .transactions
            .get_mut(&id)
            .ok_or_else(|| GatewayError::NotFound(format!("transaction {}", id)))?;
        tx.status = if approve {
            TransactionStatus::Approved
        } else {
            TransactionStatus::Rejected
        };
        tx.updated_at = chrono::Utc::now();
        Ok(tx.clone())
    }
}
