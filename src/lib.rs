pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{
    catalogue::Catalogue, local_storage::LocalStorage, memory_store::InMemoryReadingStore,
    storage_store::StorageReadingStore,
};
pub use app::ReadingFlow;
pub use config::{EngineConfig, LayoutRegistry};
pub use crate::core::{ReadingSession, SessionOptions, SubmissionService};
pub use utils::error::{EngineError, Result};
