use crate::adapters::ledger::LedgerState;
use crate::domain::model::{CreateReadingRequest, Credits, LedgerEntry, ReadingRecord, UserId};
use crate::domain::ports::ReadingStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 行程內帳本，整個 check-insert-debit 期間持有同一把鎖
#[derive(Debug, Clone, Default)]
pub struct InMemoryReadingStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn snapshot(&self) -> LedgerState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn create_reading_with_debit(
        &self,
        request: CreateReadingRequest,
    ) -> Result<ReadingRecord> {
        let mut state = self.state.lock().await;
        state.apply_create(request, Utc::now())
    }

    async fn balance(&self, user_id: &UserId) -> Result<Credits> {
        Ok(self.state.lock().await.balance(user_id))
    }

    async fn grant_credits(
        &self,
        user_id: &UserId,
        amount: Credits,
        reason: &str,
    ) -> Result<Credits> {
        let mut state = self.state.lock().await;
        state.grant(user_id, amount, reason, Utc::now())
    }

    async fn ledger_entries(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>> {
        Ok(self.state.lock().await.entries_for(user_id))
    }

    async fn readings_for(&self, user_id: &UserId) -> Result<Vec<ReadingRecord>> {
        Ok(self.state.lock().await.readings_for(user_id))
    }
}
