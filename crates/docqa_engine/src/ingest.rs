use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use docqa_core::{
    update, BatchId, DeleteResult, DocId, DocItem, Effect, IngestState, IngestViewModel, LogEntry,
    Msg,
};
use docqa_logging::{docqa_debug, docqa_info, docqa_trace, docqa_warn};
use tokio::task::JoinHandle;

use crate::{lock, ControllerSettings, DeleteOutcome, DocumentApi, LocalFile, OpHandle, SubmitOutcome};

/// Tracks uploaded files from selection through the optimistic `Embedded` status.
#[derive(Clone)]
pub struct IngestionController {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn DocumentApi>,
    state: Mutex<IngestState>,
    embed_delay: Duration,
    timers: Mutex<HashMap<BatchId, JoinHandle<()>>>,
}

impl IngestionController {
    pub fn new(api: Arc<dyn DocumentApi>, settings: &ControllerSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(IngestState::new()),
                embed_delay: settings.embed_delay,
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn view(&self) -> IngestViewModel {
        lock(&self.inner.state).view()
    }

    pub fn docs(&self) -> Vec<DocItem> {
        lock(&self.inner.state).docs().to_vec()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        lock(&self.inner.state).logs().to_vec()
    }

    pub fn is_uploading(&self) -> bool {
        lock(&self.inner.state).is_uploading()
    }

    /// Number of batches whose `Embedded` promotion is still pending.
    pub fn pending_timers(&self) -> usize {
        lock(&self.inner.timers).len()
    }

    /// Queues `files` as one batch and uploads them in a single request.
    pub async fn submit_files(&self, files: Vec<LocalFile>) -> SubmitOutcome {
        let metas = files.iter().map(LocalFile::meta).collect();
        let mut outcome = SubmitOutcome::Skipped;
        for effect in self.dispatch(Msg::FilesSelected(metas)) {
            match effect {
                Effect::Upload { batch, doc_ids } => {
                    docqa_debug!("Batch {} queued with items {:?}", batch, doc_ids);
                    outcome = self.upload(batch, &files).await;
                }
                other => self.apply(other),
            }
        }
        outcome
    }

    pub fn spawn_submit(&self, files: Vec<LocalFile>) -> OpHandle<SubmitOutcome> {
        let controller = self.clone();
        OpHandle::spawn(async move { controller.submit_files(files).await })
    }

    /// Deletes the item remotely, keyed by its file name, then locally.
    pub async fn delete_document(&self, id: DocId) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::Skipped;
        for effect in self.dispatch(Msg::DeleteRequested { id }) {
            match effect {
                Effect::DeleteRemote { id, filename } => {
                    outcome = self.delete_remote(id, filename).await;
                }
                other => self.apply(other),
            }
        }
        if outcome == DeleteOutcome::Skipped {
            docqa_trace!("Delete of item {} skipped", id);
        }
        outcome
    }

    pub fn spawn_delete(&self, id: DocId) -> OpHandle<DeleteOutcome> {
        let controller = self.clone();
        OpHandle::spawn(async move { controller.delete_document(id).await })
    }

    fn dispatch(&self, msg: Msg) -> Vec<Effect> {
        let mut state = lock(&self.inner.state);
        let (next, effects) = update(std::mem::take(&mut *state), msg);
        *state = next;
        effects
    }

    async fn upload(&self, batch: BatchId, files: &[LocalFile]) -> SubmitOutcome {
        self.dispatch(Msg::UploadStarted { batch });
        let result = self.inner.api.ingest(files).await;

        let outcome = match &result {
            Ok(()) => {
                docqa_info!("Batch {} accepted ({} file(s))", batch, files.len());
                SubmitOutcome::Ingested {
                    batch,
                    files: files.len(),
                }
            }
            Err(err) => {
                docqa_warn!("Batch {} failed ({}): {}", batch, err.kind, err.message);
                SubmitOutcome::Failed {
                    batch,
                    message: err.message.clone(),
                }
            }
        };

        let effects = self.dispatch(Msg::UploadFinished {
            batch,
            result: result.map_err(|err| err.message),
            at: Utc::now(),
        });
        effects.into_iter().for_each(|effect| self.apply(effect));
        outcome
    }

    async fn delete_remote(&self, id: DocId, filename: String) -> DeleteOutcome {
        let (result, outcome) = match self.inner.api.delete_document(&filename).await {
            Ok(()) => {
                docqa_info!("Deleted {} (item {})", filename, id);
                (DeleteResult::Deleted, DeleteOutcome::Deleted { filename })
            }
            Err(err) => {
                docqa_warn!("Delete of {} failed ({}): {}", filename, err.kind, err.message);
                let result = if err.is_transport() {
                    DeleteResult::TransportFailed
                } else {
                    DeleteResult::Rejected
                };
                (
                    result,
                    DeleteOutcome::Failed {
                        filename,
                        message: err.message,
                    },
                )
            }
        };

        let effects = self.dispatch(Msg::DeleteFinished {
            id,
            result,
            at: Utc::now(),
        });
        effects.into_iter().for_each(|effect| self.apply(effect));
        outcome
    }

    /// Runs the timer effects; request effects are handled by their callers.
    fn apply(&self, effect: Effect) {
        match effect {
            Effect::ScheduleEmbed { batch } => self.schedule_embed(batch),
            Effect::CancelEmbed { batch } => {
                if let Some(timer) = lock(&self.inner.timers).remove(&batch) {
                    docqa_debug!("Cancelled embed timer for batch {}", batch);
                    timer.abort();
                }
            }
            Effect::Upload { batch, .. } => {
                docqa_warn!("Upload effect for batch {} outside of submit", batch);
            }
            Effect::DeleteRemote { id, .. } => {
                docqa_warn!("Delete effect for item {} outside of delete", id);
            }
        }
    }

    fn schedule_embed(&self, batch: BatchId) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.embed_delay;

        // Held across the spawn so the timer cannot remove its entry before it exists.
        let mut timers = lock(&self.inner.timers);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            lock(&inner.timers).remove(&batch);
            let controller = IngestionController { inner };
            controller.dispatch(Msg::EmbedDelayElapsed { batch });
            docqa_debug!("Batch {} marked embedded", batch);
        });
        timers.insert(batch, timer);
    }
}
