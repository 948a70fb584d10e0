//! Referral commission configuration: level -> percentage.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferralConfig {
    levels: BTreeMap<u32, BigDecimal>,
}

impl ReferralConfig {
    pub fn new(levels: BTreeMap<u32, BigDecimal>) -> Self {
        Self { levels }
    }

    /// Commission percentage for a level. A level absent from the
    /// configuration pays zero commission; this is a policy choice that keeps
    /// the computation total under incomplete configuration, not an error.
    pub fn percentage(&self, level: u32) -> BigDecimal {
        self.levels
            .get(&level)
            .cloned()
            .unwrap_or_else(|| BigDecimal::from(0))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_returns_percentage() {
        let mut levels = BTreeMap::new();
        levels.insert(1, BigDecimal::from(5));
        levels.insert(2, BigDecimal::from(2));
        let config = ReferralConfig::new(levels);

        assert_eq!(config.percentage(1), BigDecimal::from(5));
        assert_eq!(config.percentage(2), BigDecimal::from(2));
    }

    #[test]
    fn missing_level_pays_zero() {
        let config = ReferralConfig::default();
        assert_eq!(config.percentage(1), BigDecimal::from(0));
        assert_eq!(config.percentage(7), BigDecimal::from(0));
    }
}
