//! DocQA engine: remote API access and the async controllers built on it.
mod api;
mod ask;
mod handle;
mod health;
mod ingest;
mod persist;
mod registry;
mod settings;
mod types;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use api::{ApiSettings, DocumentApi, HealthReport, LocalFile, ReqwestApi};
pub use ask::QuestionAnsweringController;
pub use handle::OpHandle;
pub use health::HealthMonitor;
pub use ingest::IngestionController;
pub use persist::{
    ensure_output_dir, AtomicFileWriter, FileHistoryStore, HistoryStore, MemoryHistoryStore,
    PersistError, HISTORY_KEY,
};
pub use registry::DocumentRegistryClient;
pub use settings::ControllerSettings;
pub use types::{ApiError, AskOutcome, DeleteOutcome, FailureKind, SubmitOutcome};

/// State mutations never panic midway, so a poisoned lock still holds consistent state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
