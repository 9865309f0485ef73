use crate::adapters::ledger::LedgerState;
use crate::domain::model::{CreateReadingRequest, Credits, LedgerEntry, ReadingRecord, UserId};
use crate::domain::ports::{ReadingStore, Storage};
use crate::utils::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const LEDGER_FILE: &str = "ledger/state.json";

/// 以 JSON 文件保存帳本。每次寫入都先改副本、寫檔成功才換上，
/// 寫檔失敗時記憶體中的帳本維持原狀。
pub struct StorageReadingStore<S: Storage> {
    storage: S,
    path: String,
    state: Mutex<LedgerState>,
}

impl<S: Storage> StorageReadingStore<S> {
    pub async fn open(storage: S) -> Result<Self> {
        Self::open_at(storage, LEDGER_FILE).await
    }

    pub async fn open_at(storage: S, path: &str) -> Result<Self> {
        let state = if storage.exists(path).await {
            let data = storage.read_file(path).await?;
            let state: LedgerState = serde_json::from_slice(&data)?;
            info!("Loaded ledger from {} ({} readings)", path, state.reading_count());
            state
        } else {
            debug!("No ledger at {}, starting empty", path);
            LedgerState::new()
        };

        Ok(Self {
            storage,
            path: path.to_string(),
            state: Mutex::new(state),
        })
    }

    async fn commit<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerState) -> Result<T> + Send,
        T: Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let value = mutate(&mut next)?;

        let bytes = serde_json::to_vec_pretty(&next)?;
        self.storage
            .write_file(&self.path, &bytes)
            .await
            .map_err(|e| {
                EngineError::persistence(format!("failed to write {}: {}", self.path, e))
            })?;

        *state = next;
        Ok(value)
    }
}

#[async_trait]
impl<S: Storage + 'static> ReadingStore for StorageReadingStore<S> {
    async fn create_reading_with_debit(
        &self,
        request: CreateReadingRequest,
    ) -> Result<ReadingRecord> {
        let now = Utc::now();
        self.commit(move |state| state.apply_create(request, now)).await
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
        let now = Utc::now();
        self.commit(|state| state.grant(user_id, amount, reason, now)).await
    }

    async fn ledger_entries(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>> {
        Ok(self.state.lock().await.entries_for(user_id))
    }

    async fn readings_for(&self, user_id: &UserId) -> Result<Vec<ReadingRecord>> {
        Ok(self.state.lock().await.readings_for(user_id))
    }
}
