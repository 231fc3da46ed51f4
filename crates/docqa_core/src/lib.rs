//! DocQA core: pure state machines and view-model helpers.
mod ask;
mod effect;
mod history;
mod msg;
mod registry;
mod state;
mod types;
mod update;
mod view_model;

pub use ask::{error_answer, prepare_request, AskState, DEFAULT_TOP_K, TOP_K_RANGE};
pub use effect::Effect;
pub use history::{History, HISTORY_LIMIT};
pub use msg::{DeleteResult, Msg};
pub use registry::RegistryState;
pub use state::{IngestState, LOG_LIMIT};
pub use types::{
    AskRequest, AskResponse, BatchId, Citation, Confidence, DocId, DocItem, DocStatus, FileMeta,
    Health, LogEntry, QaItem, RemoteDocument,
};
pub use update::update;
pub use view_model::IngestViewModel;
