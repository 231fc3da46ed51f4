use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use docqa_core::{prepare_request, AskResponse, AskState, History, QaItem};
use docqa_logging::{docqa_debug, docqa_error, docqa_warn};

use crate::{lock, AskOutcome, DocumentApi, HistoryStore, OpHandle};

/// Submits questions and keeps the current answer plus a persisted history.
///
/// Concurrent asks are not sequenced: whichever response arrives last owns
/// the answer slot.
#[derive(Clone)]
pub struct QuestionAnsweringController {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn DocumentApi>,
    store: Arc<dyn HistoryStore>,
    state: Mutex<AskState>,
    revision: AtomicU64,
    saved_revision: Mutex<u64>,
}

impl QuestionAnsweringController {
    /// Reads the stored history once.
    pub fn new(api: Arc<dyn DocumentApi>, store: Arc<dyn HistoryStore>) -> Self {
        let history = History::from_items(store.load());
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                state: Mutex::new(AskState::new(history)),
                revision: AtomicU64::new(0),
                saved_revision: Mutex::new(0),
            }),
        }
    }

    pub fn answer(&self) -> Option<AskResponse> {
        lock(&self.inner.state).answer().cloned()
    }

    pub fn is_asking(&self) -> bool {
        lock(&self.inner.state).is_asking()
    }

    /// Newest first.
    pub fn history(&self) -> Vec<QaItem> {
        lock(&self.inner.state).history().items().to_vec()
    }

    pub async fn ask(&self, question: &str, top_k: u32, selected: &[String]) -> AskOutcome {
        let Some(request) = prepare_request(question, top_k, selected) else {
            return AskOutcome::Skipped;
        };

        lock(&self.inner.state).begin();
        let result = self.inner.api.ask(&request).await;

        let outcome = match &result {
            Ok(_) => AskOutcome::Answered,
            Err(err) => {
                docqa_warn!("Ask failed ({}): {}", err.kind, err.message);
                AskOutcome::Failed {
                    message: err.message.clone(),
                }
            }
        };

        let snapshot = {
            let mut state = lock(&self.inner.state);
            let changed = state.complete(&request, result.map_err(|err| err.message), Utc::now());
            // Numbered under the state lock so saves apply in completion order.
            changed.then(|| {
                let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
                (revision, state.history().items().to_vec())
            })
        };
        if let Some((revision, items)) = snapshot {
            self.persist(revision, items).await;
        }
        outcome
    }

    /// Writes on the blocking pool; a save older than the last written one is dropped.
    async fn persist(&self, revision: u64, items: Vec<QaItem>) {
        let inner = self.inner.clone();
        let write = tokio::task::spawn_blocking(move || {
            let mut saved = lock(&inner.saved_revision);
            if *saved >= revision {
                docqa_debug!("Skipping stale history save {}", revision);
                return;
            }
            match inner.store.save(&items) {
                Ok(()) => docqa_debug!("Persisted {} history item(s)", items.len()),
                Err(err) => docqa_error!("Failed to persist history: {}", err),
            }
            *saved = revision;
        });
        if let Err(err) = write.await {
            docqa_error!("History save task failed: {}", err);
        }
    }

    pub fn spawn_ask(
        &self,
        question: String,
        top_k: u32,
        selected: Vec<String>,
    ) -> OpHandle<AskOutcome> {
        let controller = self.clone();
        OpHandle::spawn(async move { controller.ask(&question, top_k, &selected).await })
    }
}
