//! Account registration.
//!
//! The referrer is resolved from an input referral code at creation time
//! only and never changed afterward, which keeps the referral forest
//! acyclic: a referrer must already exist, so no account can end up its own
//! ancestor.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::Account;
use crate::error::AppError;
use crate::gateway::PersistenceGateway;

#[derive(Debug, Default)]
pub struct RegisterInput {
    pub referral_code: Option<String>,
    pub plan_id: Option<Uuid>,
}

pub struct RegistrationService {
    gateway: Arc<dyn PersistenceGateway>,
}

impl RegistrationService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<Account, AppError> {
        let referrer_id = match input.referral_code {
            Some(code) => {
                let code = code.trim().to_uppercase();
                let referrer = self
                    .gateway
                    .account_by_referral_code(&code)
                    .await
                    .map_err(AppError::from)?
                    .ok_or_else(|| {
                        AppError::Validation(format!("unknown referral code '{}'", code))
                    })?;
                Some(referrer.id)
            }
            None => None,
        };

        if let Some(plan_id) = input.plan_id {
            self.gateway
                .plan(plan_id)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::Validation(format!("unknown plan {}", plan_id)))?;
        }

        let account = Account::new(referrer_id, input.plan_id);
        tracing::info!(
            "Registering account {} (referrer: {:?})",
            account.id,
            referrer_id
        );
        self.gateway
            .insert_account(account)
            .await
            .map_err(AppError::from)
    }
}
