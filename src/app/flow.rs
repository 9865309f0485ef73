use crate::adapters::catalogue::Catalogue;
use crate::adapters::http_credit_gate::HttpCreditGate;
use crate::adapters::http_notifier::{HttpNotifier, LogNotifier};
use crate::adapters::local_storage::LocalStorage;
use crate::adapters::meanings::CatalogueMeaningLookup;
use crate::adapters::memory_store::InMemoryReadingStore;
use crate::adapters::storage_store::StorageReadingStore;
use crate::config::builtin_layouts::LayoutRegistry;
use crate::config::toml_config::{EngineConfig, PersistenceBackend};
use crate::core::credit_gate::{CreditTiers, LedgerCreditGate};
use crate::core::interpretation::Interpretation;
use crate::core::render::ContentRenderer;
use crate::core::session::{Identity, ReadingSession, SessionOptions};
use crate::core::submission::SubmissionService;
use crate::domain::model::{Phase, ReadingType, SubmitOutcome};
use crate::domain::ports::{CardMeaningLookup, CreditGate, Notifier, ReadingStore};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::sync::Arc;
use tracing::{debug, info};

/// 把 session、credit gate、送出服務串起來
pub struct ReadingFlow {
    registry: LayoutRegistry,
    catalogue: Arc<Catalogue>,
    gate: Arc<dyn CreditGate>,
    lookup: Arc<dyn CardMeaningLookup>,
    submissions: SubmissionService,
    options: SessionOptions,
}

impl ReadingFlow {
    pub fn new(
        registry: LayoutRegistry,
        catalogue: Arc<Catalogue>,
        gate: Arc<dyn CreditGate>,
        lookup: Arc<dyn CardMeaningLookup>,
        submissions: SubmissionService,
        options: SessionOptions,
    ) -> Self {
        Self {
            registry,
            catalogue,
            gate,
            lookup,
            submissions,
            options,
        }
    }

    /// 依設定組出 store、credit gate 與 notifier
    pub async fn from_config(config: &EngineConfig, catalogue: Arc<Catalogue>) -> Result<Self> {
        config.validate()?;
        let registry = config.layout_registry()?;

        let store: Arc<dyn ReadingStore> = match config.persistence.backend {
            PersistenceBackend::Memory => Arc::new(InMemoryReadingStore::new()),
            PersistenceBackend::File => {
                let storage = LocalStorage::new(config.persistence.data_dir.clone());
                Arc::new(StorageReadingStore::open(storage).await?)
            }
        };

        let gate: Arc<dyn CreditGate> = match &config.credits.endpoint {
            Some(endpoint) => Arc::new(HttpCreditGate::new(
                endpoint,
                config.credit_gate_timeout(),
            )?),
            None => Arc::new(LedgerCreditGate::new(
                Arc::clone(&store),
                CreditTiers::from_config(&config.credits, &registry)?,
            )),
        };

        let notifier: Arc<dyn Notifier> = match &config.notification {
            Some(n) => Arc::new(HttpNotifier::new(&n.endpoint, config.notification_timeout())?),
            None => Arc::new(LogNotifier),
        };

        debug!(
            "Flow ready: {} layouts, {:?} persistence",
            registry.len(),
            config.persistence.backend
        );

        Ok(Self::new(
            registry,
            catalogue,
            gate,
            Arc::new(CatalogueMeaningLookup),
            SubmissionService::new(
                store,
                notifier,
                config.submission_timeout(),
                &config.engine.platform,
            ),
            SessionOptions {
                reversal_probability: config.engine.reversal_probability,
                seed: config.engine.seed,
            },
        ))
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn CardMeaningLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ReadingStore> {
        self.submissions.store()
    }

    pub fn start(&self, layout_id: &str, identity: Identity) -> Result<ReadingSession> {
        let layout = self.registry.require(layout_id)?.clone();
        Ok(ReadingSession::start(
            Arc::new(layout),
            Arc::clone(&self.catalogue),
            identity,
            self.options,
        ))
    }

    /// 付費類型先查詢 credit gate（僅參考用），再交給 session 判斷
    pub async fn choose_reading_type(
        &self,
        session: &mut ReadingSession,
        reading_type: ReadingType,
    ) -> Result<Phase> {
        let credit_key = session.layout().credit_key_for(reading_type);
        let status = match (session.identity().user_id(), credit_key) {
            (Some(user_id), Some(credit_key)) => {
                Some(self.gate.get_status(user_id, credit_key).await?)
            }
            _ => None,
        };
        session.select_reading_type(reading_type, status)
    }

    pub fn interpret(&self, session: &ReadingSession) -> Result<Interpretation> {
        session.interpretation(self.lookup.as_ref())
    }

    /// 失敗時 session 回到 ReadyToInterpret，可以直接再呼叫一次
    pub async fn submit(
        &self,
        session: &mut ReadingSession,
        renderer: &dyn ContentRenderer,
    ) -> Result<SubmitOutcome> {
        let interpretation = self.interpret(session)?;
        let snapshot = session.begin_submission(renderer.render(&interpretation))?;

        let result = self.submissions.submit(&snapshot).await;
        session.complete_submission(&result)?;

        if let Ok(outcome) = &result {
            match outcome {
                SubmitOutcome::Persisted { record, replayed } => {
                    info!(
                        "Session {} submitted as {} (replayed: {})",
                        snapshot.idempotency_key, record.id, replayed
                    )
                }
                SubmitOutcome::GuestNotPersisted => info!("Guest session completed"),
            }
        }
        result
    }

    pub async fn shutdown(&self) {
        self.submissions.flush_notifications().await;
    }
}

impl std::fmt::Debug for ReadingFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingFlow")
            .field("layouts", &self.registry.len())
            .field("options", &self.options)
            .finish()
    }
}
