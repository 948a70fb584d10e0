//! Investment plan entity.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    /// Signed rate multiplied directly against the account balance each
    /// accrual cycle. Zero or negative rates make the plan inert.
    pub daily_rate: BigDecimal,
}
