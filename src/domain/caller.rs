//! Authenticated caller context, passed explicitly to every operation that
//! needs it instead of being read from ambient session state.

#[derive(Debug, Clone)]
pub struct Caller {
    pub actor: String,
    pub is_admin: bool,
}

impl Caller {
    pub fn admin(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            is_admin: true,
        }
    }

    pub fn user(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            is_admin: false,
        }
    }

    /// Internal caller used by the accrual scheduler.
    pub fn system() -> Self {
        Self::admin("scheduler")
    }
}
