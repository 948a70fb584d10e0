pub mod account;
pub mod caller;
pub mod plan;
pub mod referral;
pub mod transaction;
pub mod yield_record;

pub use account::Account;
pub use caller::Caller;
pub use plan::Plan;
pub use referral::ReferralConfig;
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
pub use yield_record::YieldRecord;
