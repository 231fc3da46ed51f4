use crate::{BatchId, DocId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send one multipart request covering every file of the batch.
    Upload { batch: BatchId, doc_ids: Vec<DocId> },
    /// Start the deferred `Chunked → Embedded` timer for the batch.
    ScheduleEmbed { batch: BatchId },
    /// Every item of the batch is gone; its pending timer can be dropped.
    CancelEmbed { batch: BatchId },
    DeleteRemote { id: DocId, filename: String },
}
