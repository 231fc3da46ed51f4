use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::view_model::IngestViewModel;
use crate::{BatchId, DeleteResult, DocId, DocItem, DocStatus, FileMeta, LogEntry};

/// Maximum number of activity log lines kept, newest first.
pub const LOG_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchPhase {
    Uploading,
    Embedding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Batch {
    doc_ids: Vec<DocId>,
    file_count: usize,
    phase: BatchPhase,
}

/// Upload tracking for the ingestion controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestState {
    docs: Vec<DocItem>,
    logs: Vec<LogEntry>,
    batches: BTreeMap<BatchId, Batch>,
    deleting: BTreeSet<DocId>,
    uploads_in_flight: usize,
    next_doc_id: DocId,
    next_batch_id: BatchId,
}

impl IngestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> IngestViewModel {
        IngestViewModel {
            docs: self.docs.clone(),
            logs: self.logs.clone(),
            uploading: self.is_uploading(),
            deleting: self.deleting.iter().copied().collect(),
        }
    }

    /// Items newest first.
    pub fn docs(&self) -> &[DocItem] {
        &self.docs
    }

    pub fn doc(&self, id: DocId) -> Option<&DocItem> {
        self.docs.iter().find(|doc| doc.id == id)
    }

    /// Activity log, newest first.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn is_uploading(&self) -> bool {
        self.uploads_in_flight > 0
    }

    pub fn is_deleting(&self, id: DocId) -> bool {
        self.deleting.contains(&id)
    }

    /// Item ids still belonging to `batch`, in selection order.
    pub fn batch_doc_ids(&self, batch: BatchId) -> Vec<DocId> {
        self.batches
            .get(&batch)
            .map(|b| b.doc_ids.clone())
            .unwrap_or_default()
    }

    pub(crate) fn queue_batch(&mut self, files: Vec<FileMeta>) -> (BatchId, Vec<DocId>) {
        self.next_batch_id += 1;
        let batch = self.next_batch_id;
        let file_count = files.len();

        let mut items = Vec::with_capacity(file_count);
        for file in files {
            self.next_doc_id += 1;
            items.push(DocItem {
                id: self.next_doc_id,
                name: file.name,
                size: file.size,
                status: DocStatus::Queued,
                error: None,
            });
        }
        let doc_ids: Vec<DocId> = items.iter().map(|item| item.id).collect();

        items.append(&mut self.docs);
        self.docs = items;
        self.batches.insert(
            batch,
            Batch {
                doc_ids: doc_ids.clone(),
                file_count,
                phase: BatchPhase::Uploading,
            },
        );
        (batch, doc_ids)
    }

    pub(crate) fn begin_upload(&mut self, batch: BatchId) {
        let ids = self.batch_doc_ids(batch);
        self.uploads_in_flight += 1;
        self.transition(&ids, DocStatus::Queued, DocStatus::Parsing);
    }

    /// Returns true when the batch still has items waiting on the embed timer.
    pub(crate) fn upload_succeeded(&mut self, batch: BatchId, at: DateTime<Utc>) -> bool {
        self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
        let Some(entry) = self.batches.get_mut(&batch) else {
            return false;
        };
        let file_count = entry.file_count;
        let ids = entry.doc_ids.clone();
        let awaiting = !ids.is_empty();
        if awaiting {
            entry.phase = BatchPhase::Embedding;
        } else {
            self.batches.remove(&batch);
        }

        self.transition(&ids, DocStatus::Parsing, DocStatus::Chunked);
        self.push_log(at, format!("Ingested {file_count} file(s)."));
        awaiting
    }

    pub(crate) fn upload_failed(&mut self, batch: BatchId, message: &str, at: DateTime<Utc>) {
        self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
        if let Some(entry) = self.batches.remove(&batch) {
            for doc in self
                .docs
                .iter_mut()
                .filter(|doc| entry.doc_ids.contains(&doc.id) && !doc.status.is_terminal())
            {
                doc.status = DocStatus::Error;
                doc.error = Some(message.to_string());
            }
        }
        self.push_log(at, format!("Ingest error: {message}"));
    }

    pub(crate) fn embed_elapsed(&mut self, batch: BatchId) {
        match self.batches.get(&batch) {
            Some(entry) if entry.phase == BatchPhase::Embedding => {}
            _ => return,
        }
        if let Some(entry) = self.batches.remove(&batch) {
            self.transition(&entry.doc_ids, DocStatus::Chunked, DocStatus::Embedded);
        }
    }

    /// Marks `id` as being deleted. Returns the remote filename, or `None` when
    /// the item is unknown or a delete for it is already outstanding.
    pub(crate) fn begin_delete(&mut self, id: DocId) -> Option<String> {
        if self.deleting.contains(&id) {
            return None;
        }
        let name = self.doc(id)?.name.clone();
        self.deleting.insert(id);
        Some(name)
    }

    /// Applies a delete outcome. Returns a batch whose embed timer no longer
    /// has anything to promote.
    pub(crate) fn finish_delete(
        &mut self,
        id: DocId,
        result: DeleteResult,
        at: DateTime<Utc>,
    ) -> Option<BatchId> {
        self.deleting.remove(&id);
        let name = self.doc(id)?.name.clone();
        let text = match result {
            DeleteResult::Deleted => format!("Deleted document: {name}"),
            DeleteResult::Rejected => format!("Failed to delete document: {name}"),
            DeleteResult::TransportFailed => format!("Error deleting document: {name}"),
        };
        self.push_log(at, text);
        if result != DeleteResult::Deleted {
            return None;
        }

        self.docs.retain(|doc| doc.id != id);
        let batch = self
            .batches
            .iter_mut()
            .find(|(_, entry)| entry.doc_ids.contains(&id))
            .map(|(batch, entry)| {
                entry.doc_ids.retain(|doc_id| *doc_id != id);
                (*batch, entry.doc_ids.is_empty() && entry.phase == BatchPhase::Embedding)
            });
        match batch {
            Some((batch, true)) => {
                self.batches.remove(&batch);
                Some(batch)
            }
            _ => None,
        }
    }

    fn transition(&mut self, ids: &[DocId], from: DocStatus, to: DocStatus) {
        for doc in self
            .docs
            .iter_mut()
            .filter(|doc| doc.status == from && ids.contains(&doc.id))
        {
            doc.status = to;
        }
    }

    fn push_log(&mut self, time: DateTime<Utc>, text: String) {
        self.logs.insert(0, LogEntry { time, text });
        self.logs.truncate(LOG_LIMIT);
    }
}
