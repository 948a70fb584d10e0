//! Transaction desk: account holders submit deposit/withdraw requests,
//! administrators approve or reject them. Approval is the only path that
//! moves money into or out of a balance besides accrual.

use bigdecimal::BigDecimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Caller, Transaction, TransactionKind, TransactionStatus};
use crate::error::AppError;
use crate::gateway::PersistenceGateway;

pub struct ReviewService {
    gateway: Arc<dyn PersistenceGateway>,
}

impl ReviewService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// Creates a pending deposit or withdrawal request. Yield bookings are
    /// engine-only and cannot be requested here.
    pub async fn submit(
        &self,
        account_id: Uuid,
        kind: TransactionKind,
        amount: BigDecimal,
    ) -> Result<Transaction, AppError> {
        if kind == TransactionKind::Yield {
            return Err(AppError::Validation(
                "yield transactions cannot be requested".to_string(),
            ));
        }
        if amount <= BigDecimal::from(0) {
            return Err(AppError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }

        self.gateway
            .account(account_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", account_id)))?;

        let tx = Transaction::new(account_id, kind, amount);
        tracing::info!("Submitted {} request {} for account {}", kind, tx.id, account_id);
        self.gateway
            .insert_transaction(tx)
            .await
            .map_err(AppError::from)
    }

    pub async fn approve(&self, caller: &Caller, id: Uuid) -> Result<Transaction, AppError> {
        self.settle(caller, id, true).await
    }

    pub async fn reject(&self, caller: &Caller, id: Uuid) -> Result<Transaction, AppError> {
        self.settle(caller, id, false).await
    }

    pub async fn list_by_status(
        &self,
        caller: &Caller,
        status: TransactionStatus,
    ) -> Result<Vec<Transaction>, AppError> {
        self.require_admin(caller)?;
        self.gateway
            .transactions_by_status(status)
            .await
            .map_err(AppError::from)
    }

    async fn settle(
        &self,
        caller: &Caller,
        id: Uuid,
        approve: bool,
    ) -> Result<Transaction, AppError> {
        self.require_admin(caller)?;
        let settled = self
            .gateway
            .settle_transaction(id, approve)
            .await
            .map_err(AppError::from)?;
        tracing::info!(
            "Transaction {} {} by {}",
            id,
            settled.status,
            caller.actor
        );
        Ok(settled)
    }

    fn require_admin(&self, caller: &Caller) -> Result<(), AppError> {
        if caller.is_admin {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "transaction review requires an administrator, got '{}'",
                caller.actor
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Account;
    use crate::gateway::InMemoryGateway;
    use std::str::FromStr;

    fn service(gateway: Arc<InMemoryGateway>) -> ReviewService {
        ReviewService::new(gateway)
    }

    fn funded_account(balance: &str) -> Account {
        let mut account = Account::new(None, None);
        account.balance = BigDecimal::from_str(balance).expect("valid balance");
        account
    }

    #[tokio::test]
    async fn submit_rejects_non_positive_amounts() {
        let gateway = Arc::new(InMemoryGateway::new());
        let account = Account::new(None, None);
        let account_id = account.id;
        gateway.add_account(account);

        let svc = service(gateway);
        for amount in ["0", "-5"] {
            let result = svc
                .submit(
                    account_id,
                    TransactionKind::Deposit,
                    BigDecimal::from_str(amount).expect("valid"),
                )
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn submit_rejects_yield_kind() {
        let gateway = Arc::new(InMemoryGateway::new());
        let account = Account::new(None, None);
        let account_id = account.id;
        gateway.add_account(account);

        let result = service(gateway)
            .submit(account_id, TransactionKind::Yield, BigDecimal::from(10))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn approving_deposit_credits_balance() {
        let gateway = Arc::new(InMemoryGateway::new());
        let account = funded_account("50");
        let account_id = account.id;
        gateway.add_account(account);

        let svc = service(gateway.clone());
        let tx = svc
            .submit(account_id, TransactionKind::Deposit, BigDecimal::from(100))
            .await
            .expect("submits");
        let settled = svc.approve(&Caller::admin("test"), tx.id).await.expect("approves");

        assert_eq!(settled.status, TransactionStatus::Approved);
        assert_eq!(gateway.balance_of(account_id), Some(BigDecimal::from(150)));
    }

    #[tokio::test]
    async fn approving_withdrawal_debits_balance() {
        let gateway = Arc::new(InMemoryGateway::new());
        let account = funded_account("150");
        let account_id = account.id;
        gateway.add_account(account);

        let svc = service(gateway.clone());
        let tx = svc
            .submit(account_id, TransactionKind::Withdraw, BigDecimal::from(40))
            .await
            .expect("submits");
        svc.approve(&Caller::admin("test"), tx.id).await.expect("approves");

        assert_eq!(gateway.balance_of(account_id), Some(BigDecimal::from(110)));
    }

    #[tokio::test]
    async fn insufficient_balance_withdrawal_is_refused() {
        let gateway = Arc::new(InMemoryGateway::new());
        let account = funded_account("30");
        let account_id = account.id;
        gateway.add_account(account);

        let svc = service(gateway.clone());
        let tx = svc
            .submit(account_id, TransactionKind::Withdraw, BigDecimal::from(100))
            .await
            .expect("submits");
        let result = svc.approve(&Caller::admin("test"), tx.id).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(gateway.balance_of(account_id), Some(BigDecimal::from(30)));
    }

    #[tokio::test]
    async fn rejection_leaves_balance_untouched() {
        let gateway = Arc::new(InMemoryGateway::new());
        let account = funded_account("80");
        let account_id = account.id;
        gateway.add_account(account);

        let svc = service(gateway.clone());
        let tx = svc
            .submit(account_id, TransactionKind::Deposit, BigDecimal::from(20))
            .await
            .expect("submits");
        let settled = svc.reject(&Caller::admin("test"), tx.id).await.expect("rejects");

        assert_eq!(settled.status, TransactionStatus::Rejected);
        assert_eq!(gateway.balance_of(account_id), Some(BigDecimal::from(80)));
    }

    #[tokio::test]
    async fn settled_transactions_are_terminal() {
        let gateway = Arc::new(InMemoryGateway::new());
        let account = funded_account("100");
        let account_id = account.id;
        gateway.add_account(account);

        let svc = service(gateway.clone());
        let tx = svc
            .submit(account_id, TransactionKind::Deposit, BigDecimal::from(10))
            .await
            .expect("submits");
        svc.approve(&Caller::admin("test"), tx.id).await.expect("approves");

        let again = svc.reject(&Caller::admin("test"), tx.id).await;
        assert!(matches!(again, Err(AppError::Validation(_))));
        assert_eq!(gateway.balance_of(account_id), Some(BigDecimal::from(110)));
    }

    #[tokio::test]
    async fn review_requires_admin() {
        let gateway = Arc::new(InMemoryGateway::new());
        let svc = service(gateway);
        let result = svc.approve(&Caller::user("visitor"), Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
