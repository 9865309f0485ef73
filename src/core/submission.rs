use crate::core::session::SessionSnapshot;
use crate::domain::model::SubmitOutcome;
use crate::domain::ports::{Notifier, ReadingStore};
use crate::utils::error::{EngineError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub struct SubmissionService {
    store: Arc<dyn ReadingStore>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    platform: String,
    notifications: Mutex<JoinSet<()>>,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        notifier: Arc<dyn Notifier>,
        timeout: Duration,
        platform: &str,
    ) -> Self {
        Self {
            store,
            notifier,
            timeout,
            platform: platform.to_string(),
            notifications: Mutex::new(JoinSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ReadingStore> {
        &self.store
    }

    /// 訪客直接回傳 GuestNotPersisted；重放的 key 視為成功並帶回原始紀錄。
    /// 逾時與其他失敗不自動重試，交給呼叫端用同一個 snapshot 再送一次。
    /// 寫入在獨立 task 中執行，逾時只停止等待，寫入本身仍會完成。
    pub async fn submit(&self, snapshot: &SessionSnapshot) -> Result<SubmitOutcome> {
        let Some(user_id) = snapshot.user_id.as_ref() else {
            info!("Guest {} reading finished, nothing stored", snapshot.layout_id);
            return Ok(SubmitOutcome::GuestNotPersisted);
        };

        let request = snapshot.to_request(user_id, &self.platform);
        debug!("Submitting reading {}", request.idempotency_key);

        let store = Arc::clone(&self.store);
        let write = tokio::spawn(async move { store.create_reading_with_debit(request).await });

        let created = tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| {
                EngineError::persistence(format!(
                    "submission timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| EngineError::persistence(format!("submission task failed: {}", e)))?;

        match created {
            Ok(record) => {
                info!(
                    "Reading {} stored for {} ({} credits)",
                    record.id, record.user_id, record.cost_credits
                );
                self.notify(record.id.clone()).await;
                Ok(SubmitOutcome::Persisted {
                    record,
                    replayed: false,
                })
            }
            Err(EngineError::DuplicateSubmissionError { key, record }) => {
                info!("Submission {} already stored as {}", key, record.id);
                Ok(SubmitOutcome::Persisted {
                    record: *record,
                    replayed: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn notify(&self, reading_id: String) {
        let notifier = Arc::clone(&self.notifier);
        let mut tasks = self.notifications.lock().await;
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                warn!("Notification task aborted: {}", e);
            }
        }
        tasks.spawn(async move {
            if let Err(e) = notifier.reading_created(&reading_id).await {
                warn!("Notification for reading {} failed: {}", reading_id, e);
            }
        });
    }

    /// 結束前等所有通知送完
    pub async fn flush_notifications(&self) {
        let mut tasks = self.notifications.lock().await;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Notification task aborted: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalogue::Catalogue;
    use crate::adapters::http_notifier::LogNotifier;
    use crate::adapters::memory_store::InMemoryReadingStore;
    use crate::config::builtin_layouts;
    use crate::core::session::{Identity, ReadingSession, SessionOptions};
    use crate::domain::model::{ReadingType, UserId};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn ready_snapshot(minute: i64) -> SessionSnapshot {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
            + ChronoDuration::minutes(minute);
        let mut session = ReadingSession::start_at(
            Arc::new(builtin_layouts::love()),
            Arc::new(Catalogue::standard()),
            Identity::User(UserId::new("user-1")),
            SessionOptions {
                reversal_probability: 0.3,
                seed: Some(minute as u64),
            },
            started,
        );
        session.select_reading_type(ReadingType::Simple, None).unwrap();
        while session.draw_next().unwrap().is_placed() {}
        session.begin_submission("text").unwrap()
    }

    #[tokio::test]
    async fn test_finished_notifications_are_reaped_before_spawning() {
        let service = SubmissionService::new(
            Arc::new(InMemoryReadingStore::new()),
            Arc::new(LogNotifier),
            Duration::from_secs(5),
            "test",
        );

        for minute in 0..20 {
            let outcome = service.submit(&ready_snapshot(minute)).await.unwrap();
            assert!(outcome.record().is_some());
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }

        assert!(service.notifications.lock().await.len() <= 1);
        service.flush_notifications().await;
        assert!(service.notifications.lock().await.is_empty());
    }
}
