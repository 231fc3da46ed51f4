use crate::{DocId, DocItem, LogEntry};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestViewModel {
    pub docs: Vec<DocItem>,
    pub logs: Vec<LogEntry>,
    pub uploading: bool,
    pub deleting: Vec<DocId>,
}
