//! Yield record entity. Append-only; written exclusively by the accrual
//! engine, one record per account per cycle in which a positive amount
//! accrued.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: BigDecimal,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl YieldRecord {
    pub fn new(account_id: Uuid, amount: BigDecimal, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount,
            source: source.into(),
            created_at: Utc::now(),
        }
    }
}
