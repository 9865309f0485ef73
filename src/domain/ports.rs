use crate::domain::model::{
    Card, CardMeaning, CreateReadingRequest, CreditStatus, Credits, LedgerEntry, PositionId,
    ReadingRecord, UserId,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Advisory credit check. A positive answer only lets the UI move on to the form.
#[async_trait]
pub trait CreditGate: Send + Sync {
    async fn get_status(&self, user_id: &UserId, reading_type_key: &str) -> Result<CreditStatus>;
}

/// Server-side reading store. `create_reading_with_debit` is the only place credits are charged.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// 單一原子操作：檢查餘額、建立紀錄、扣點。
    /// 已見過的 idempotency key 會回傳 `DuplicateSubmissionError`，內含原始紀錄。
    async fn create_reading_with_debit(&self, request: CreateReadingRequest)
        -> Result<ReadingRecord>;

    async fn balance(&self, user_id: &UserId) -> Result<Credits>;

    async fn grant_credits(&self, user_id: &UserId, amount: Credits, reason: &str)
        -> Result<Credits>;

    async fn ledger_entries(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>>;

    async fn readings_for(&self, user_id: &UserId) -> Result<Vec<ReadingRecord>>;
}

pub trait CardMeaningLookup: Send + Sync {
    fn lookup(
        &self,
        layout_id: &str,
        card: &Card,
        position_id: PositionId,
        is_reversed: bool,
    ) -> CardMeaning;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn reading_created(&self, reading_id: &str) -> Result<()>;
}
