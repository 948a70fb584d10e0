//! Account domain entity.
//! A registered platform user with a balance, an optional investment plan,
//! and an optional referrer fixed at registration time.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of the referral code in hex characters.
pub const REFERRAL_CODE_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub balance: BigDecimal,
    pub plan_id: Option<Uuid>,
    /// Referrer resolved from an input code at registration; never changed
    /// afterward. Must reference an existing account.
    pub referrer_id: Option<Uuid>,
    pub referral_code: String,
    pub referral_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(referrer_id: Option<Uuid>, plan_id: Option<Uuid>) -> Self {
        let id = Uuid::new_v4();
        Self {
            referral_code: referral_code_for(&id),
            id,
            balance: BigDecimal::from(0),
            plan_id,
            referrer_id,
            referral_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// Derives the account's referral code from its id, so codes are unique
/// without coordinating extra state.
pub fn referral_code_for(id: &Uuid) -> String {
    let digest = Sha256::digest(id.as_bytes());
    hex::encode(&digest[..REFERRAL_CODE_LEN / 2]).to_uppercase()
}
