pub mod accrual;
pub mod network;
pub mod registration;
pub mod review;
pub mod scheduler;

pub use accrual::{AccrualEngine, AccrualSummary};
pub use network::{NetworkEntry, NetworkReport, ReferralNetwork, REFERRAL_DEPTH};
pub use registration::RegistrationService;
pub use review::ReviewService;
