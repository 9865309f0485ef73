use crate::config::builtin_layouts::LayoutRegistry;
use crate::config::toml_config::CreditsSection;
use crate::domain::model::{CreditStatus, Credits, UserId};
use crate::domain::ports::{CreditGate, ReadingStore};
use crate::utils::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// credit key → 點數。只認得已註冊牌陣的 key，未知 key 視為設定錯誤。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditTiers {
    costs: BTreeMap<String, Credits>,
}

impl CreditTiers {
    pub fn from_config(section: &CreditsSection, registry: &LayoutRegistry) -> Result<Self> {
        let mut costs = BTreeMap::new();
        for layout in registry.iter() {
            let keys = &layout.credit_tier_keys;
            costs.insert(keys.detailed.clone(), section.default_detailed);
            costs.insert(keys.written.clone(), section.default_written);
        }

        for (key, cost) in &section.tiers {
            if !costs.contains_key(key) {
                return Err(EngineError::InvalidConfigValueError {
                    field: "credits.tiers".to_string(),
                    value: key.clone(),
                    reason: "no layout uses this credit key".to_string(),
                });
            }
            costs.insert(key.clone(), *cost);
        }

        Ok(Self { costs })
    }

    pub fn cost_for(&self, credit_key: &str) -> Result<Credits> {
        self.costs
            .get(credit_key)
            .copied()
            .ok_or_else(|| EngineError::config(format!("unknown credit key '{}'", credit_key)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Credits)> {
        self.costs.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// 直接讀本地帳本的 credit gate，只查詢不扣點
pub struct LedgerCreditGate {
    store: Arc<dyn ReadingStore>,
    tiers: CreditTiers,
}

impl LedgerCreditGate {
    pub fn new(store: Arc<dyn ReadingStore>, tiers: CreditTiers) -> Self {
        Self { store, tiers }
    }
}

#[async_trait]
impl CreditGate for LedgerCreditGate {
    async fn get_status(&self, user_id: &UserId, reading_type_key: &str) -> Result<CreditStatus> {
        let required = self.tiers.cost_for(reading_type_key)?;
        let current = self.store.balance(user_id).await?;
        debug!(
            "Credit check for {} / {}: {} of {}",
            user_id, reading_type_key, current, required
        );

        Ok(CreditStatus {
            has_enough_credits: current >= required,
            required_credits: required,
            current_credits: current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryReadingStore;

    fn tiers() -> CreditTiers {
        let mut section = CreditsSection::default();
        section.tiers.insert("MARRIAGE_DETAILED".to_string(), 90);
        CreditTiers::from_config(&section, &LayoutRegistry::with_builtin()).unwrap()
    }

    #[test]
    fn test_tier_costs() {
        let tiers = tiers();
        assert_eq!(tiers.cost_for("LOVE_SPREAD_DETAILED").unwrap(), 60);
        assert_eq!(tiers.cost_for("LOVE_SPREAD_WRITTEN").unwrap(), 50);
        assert_eq!(tiers.cost_for("MARRIAGE_DETAILED").unwrap(), 90);
        assert!(tiers.cost_for("UNKNOWN_DETAILED").is_err());
    }

    #[test]
    fn test_override_for_unknown_key_is_rejected() {
        let mut section = CreditsSection::default();
        section.tiers.insert("TYPO_DETAILED".to_string(), 10);
        assert!(CreditTiers::from_config(&section, &LayoutRegistry::with_builtin()).is_err());
    }

    #[tokio::test]
    async fn test_status_reflects_balance_without_debit() {
        let store = Arc::new(InMemoryReadingStore::new());
        let user = UserId::new("u1");
        store.grant_credits(&user, 55, "welcome").await.unwrap();
        let gate = LedgerCreditGate::new(store.clone(), tiers());

        let written = gate.get_status(&user, "LOVE_SPREAD_WRITTEN").await.unwrap();
        assert!(written.has_enough_credits);
        assert_eq!(written.required_credits, 50);
        assert_eq!(written.current_credits, 55);

        let detailed = gate.get_status(&user, "LOVE_SPREAD_DETAILED").await.unwrap();
        assert!(!detailed.has_enough_credits);

        assert_eq!(store.balance(&user).await.unwrap(), 55);
    }
}
