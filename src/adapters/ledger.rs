use crate::domain::model::{
    CreateReadingRequest, Credits, IdempotencyKey, LedgerEntry, LedgerRefType, ReadingRecord,
    UserId,
};
use crate::utils::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// 帳本快照：餘額、紀錄、交易明細與 idempotency 索引。
/// 由 store 加鎖後整體操作，本身不做同步。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    #[serde(default)]
    balances: BTreeMap<UserId, Credits>,
    #[serde(default)]
    readings: Vec<ReadingRecord>,
    #[serde(default)]
    entries: Vec<LedgerEntry>,
    #[serde(default)]
    idempotency: BTreeMap<IdempotencyKey, String>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, user_id: &UserId) -> Credits {
        self.balances.get(user_id).copied().unwrap_or(0)
    }

    pub fn entries_for(&self, user_id: &UserId) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn readings_for(&self, user_id: &UserId) -> Vec<ReadingRecord> {
        self.readings
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    pub fn find_by_key(&self, key: &IdempotencyKey) -> Option<&ReadingRecord> {
        let id = self.idempotency.get(key)?;
        self.readings.iter().find(|r| &r.id == id)
    }

    /// 重放檢查 → 請求檢查 → 餘額檢查 → 寫入紀錄 → 扣點記帳。
    /// 任何一步失敗都不會改動狀態。
    pub fn apply_create(
        &mut self,
        request: CreateReadingRequest,
        now: DateTime<Utc>,
    ) -> Result<ReadingRecord> {
        if let Some(existing) = self.find_by_key(&request.idempotency_key) {
            return Err(EngineError::DuplicateSubmissionError {
                key: request.idempotency_key.to_string(),
                record: Box::new(existing.clone()),
            });
        }
        if self.idempotency.contains_key(&request.idempotency_key) {
            return Err(EngineError::persistence(format!(
                "idempotency key {} points to a missing reading",
                request.idempotency_key
            )));
        }

        check_request(&request)?;

        let available = self.balance(&request.user_id);
        if available < request.cost_credits {
            return Err(EngineError::InsufficientCreditsError {
                required: request.cost_credits,
                available,
            });
        }

        let record = ReadingRecord {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id,
            layout_id: request.layout_id,
            title: request.title,
            slots: request.slots,
            interpretation_text: request.interpretation_text,
            personal_info: request.personal_info,
            questions: request.questions,
            communication_method: request.communication_method,
            cost_credits: request.cost_credits,
            metadata: request.metadata,
            idempotency_key: request.idempotency_key,
            created_at: now,
        };

        if record.cost_credits > 0 {
            self.balances
                .insert(record.user_id.clone(), available - record.cost_credits);
            self.entries.push(LedgerEntry {
                id: Uuid::new_v4().to_string(),
                user_id: record.user_id.clone(),
                delta_credits: -i64::from(record.cost_credits),
                reason: format!(
                    "{} reading ({})",
                    record.metadata.reading_format, record.layout_id
                ),
                ref_type: LedgerRefType::ReadingUsage,
                ref_id: Some(record.id.clone()),
                created_at: now,
            });
        }

        self.idempotency
            .insert(record.idempotency_key.clone(), record.id.clone());
        self.readings.push(record.clone());

        debug!(
            "Stored reading {} for {} (cost {}, balance {})",
            record.id,
            record.user_id,
            record.cost_credits,
            self.balance(&record.user_id)
        );

        Ok(record)
    }

    pub fn grant(
        &mut self,
        user_id: &UserId,
        amount: Credits,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Credits> {
        if amount == 0 {
            return Err(EngineError::InvalidConfigValueError {
                field: "amount".to_string(),
                value: amount.to_string(),
                reason: "grant amount must be positive".to_string(),
            });
        }

        let balance = self
            .balance(user_id)
            .checked_add(amount)
            .ok_or_else(|| EngineError::persistence(format!("balance overflow for {}", user_id)))?;

        self.balances.insert(user_id.clone(), balance);
        self.entries.push(LedgerEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            delta_credits: i64::from(amount),
            reason: reason.to_string(),
            ref_type: LedgerRefType::Grant,
            ref_id: None,
            created_at: now,
        });

        Ok(balance)
    }
}

fn reject(message: &str) -> Result<()> {
    Err(EngineError::persistence(format!("rejected request: {}", message)))
}

fn check_request(request: &CreateReadingRequest) -> Result<()> {
    if request.user_id.as_str().trim().is_empty() {
        return reject("user id is empty");
    }
    if request.layout_id.trim().is_empty() {
        return reject("layout id is empty");
    }
    if request.idempotency_key.as_str().is_empty() {
        return reject("idempotency key is empty");
    }
    if request.slots.is_empty() {
        return reject("no cards in reading");
    }

    let mut seen = HashSet::new();
    for slot in &request.slots {
        if !seen.insert(slot.card_id) {
            return reject(&format!("card {} appears twice", slot.card_id));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::model::*;
    use chrono::{TimeZone, Utc};

    pub fn request(user: &str, cost: Credits, started_minute: u32) -> CreateReadingRequest {
        let user_id = UserId::new(user);
        let started = Utc
            .with_ymd_and_hms(2024, 5, 1, 10, started_minute, 0)
            .unwrap();
        CreateReadingRequest {
            idempotency_key: IdempotencyKey::derive(&user_id, started),
            user_id,
            layout_id: "love".to_string(),
            title: "love.data.detailedTitle".to_string(),
            interpretation_text: "Position 1: The Fool".to_string(),
            slots: vec![
                MaterializedSlot {
                    position_id: 1,
                    position_title: "You".to_string(),
                    card_id: 0,
                    card_name: "The Fool".to_string(),
                    is_reversed: false,
                },
                MaterializedSlot {
                    position_id: 2,
                    position_title: "Partner".to_string(),
                    card_id: 13,
                    card_name: "Death".to_string(),
                    is_reversed: true,
                },
            ],
            personal_info: PersonalInfo::default(),
            questions: Questions::default(),
            communication_method: CommunicationMethod::Email,
            cost_credits: cost,
            metadata: ReadingMetadata {
                duration_ms: 1_000,
                reading_format: ReadingType::Detailed,
                platform: "test".to_string(),
            },
        }
    }
}
