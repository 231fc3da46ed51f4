use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use docqa_core::{RegistryState, RemoteDocument};
use docqa_logging::{docqa_info, docqa_trace, docqa_warn};

use crate::{lock, DeleteOutcome, DocumentApi};

/// Cached view of the remote registry and the user's document filter.
///
/// Fetches once on [`activate`](Self::activate); afterwards only on
/// [`refetch`](Self::refetch).
#[derive(Clone)]
pub struct DocumentRegistryClient {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn DocumentApi>,
    state: Mutex<RegistryState>,
    activated: AtomicBool,
}

impl DocumentRegistryClient {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(RegistryState::new()),
                activated: AtomicBool::new(false),
            }),
        }
    }

    /// First activation fetches; later calls are no-ops returning false.
    pub async fn activate(&self) -> bool {
        if self.inner.activated.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.fetch_documents().await;
        true
    }

    /// Returns true when the cache was replaced.
    pub async fn fetch_documents(&self) -> bool {
        lock(&self.inner.state).begin_fetch();
        let result = self.inner.api.list_documents().await;

        let mut state = lock(&self.inner.state);
        match result {
            Ok(documents) => {
                docqa_info!("Registry lists {} document(s)", documents.len());
                state.finish_fetch(Ok(documents));
                true
            }
            Err(err) => {
                docqa_warn!("Error fetching documents ({}): {}", err.kind, err.message);
                state.finish_fetch(Err(err.message));
                false
            }
        }
    }

    pub async fn refetch(&self) -> bool {
        self.fetch_documents().await
    }

    pub fn documents(&self) -> Vec<RemoteDocument> {
        lock(&self.inner.state).documents().to_vec()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.inner.state).is_loading()
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.inner.state).error().map(ToOwned::to_owned)
    }

    pub fn selected(&self) -> Vec<String> {
        lock(&self.inner.state).selected().to_vec()
    }

    pub fn toggle_selected(&self, filename: &str) -> bool {
        lock(&self.inner.state).toggle_selected(filename)
    }

    pub fn deselect(&self, filename: &str) {
        lock(&self.inner.state).deselect(filename);
    }

    /// Deletes a registry document, drops it from the selection and refreshes.
    pub async fn delete_document(&self, filename: &str) -> DeleteOutcome {
        if !lock(&self.inner.state).begin_delete(filename) {
            docqa_trace!("Delete of {} already in flight", filename);
            return DeleteOutcome::Skipped;
        }

        let result = self.inner.api.delete_document(filename).await;
        lock(&self.inner.state).finish_delete(filename, result.is_ok());

        match result {
            Ok(()) => {
                docqa_info!("Deleted registry document {}", filename);
                self.refetch().await;
                DeleteOutcome::Deleted {
                    filename: filename.to_string(),
                }
            }
            Err(err) => {
                docqa_warn!("Failed to delete document {}: {}", filename, err.message);
                DeleteOutcome::Failed {
                    filename: filename.to_string(),
                    message: err.message,
                }
            }
        }
    }
}
