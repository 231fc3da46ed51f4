use chrono::{DateTime, Utc};

use crate::{BatchId, DocId, FileMeta};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked one or more local files for ingestion.
    FilesSelected(Vec<FileMeta>),
    /// The multipart request for a batch is about to be sent.
    UploadStarted { batch: BatchId },
    /// The ingest endpoint answered for a batch. `Err` carries the display message.
    UploadFinished {
        batch: BatchId,
        result: Result<(), String>,
        at: DateTime<Utc>,
    },
    /// The optimistic indexing delay for a batch ran out.
    EmbedDelayElapsed { batch: BatchId },
    /// User asked to delete a tracked item.
    DeleteRequested { id: DocId },
    /// The remote delete for an item completed.
    DeleteFinished {
        id: DocId,
        result: DeleteResult,
        at: DateTime<Utc>,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    Deleted,
    /// The service answered with a non-2xx status.
    Rejected,
    /// The request never completed.
    TransportFailed,
}
