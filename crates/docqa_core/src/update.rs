use crate::{Effect, IngestState, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: IngestState, msg: Msg) -> (IngestState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesSelected(files) => {
            if files.is_empty() {
                return (state, Vec::new());
            }
            let (batch, doc_ids) = state.queue_batch(files);
            vec![Effect::Upload { batch, doc_ids }]
        }
        Msg::UploadStarted { batch } => {
            state.begin_upload(batch);
            Vec::new()
        }
        Msg::UploadFinished { batch, result, at } => match result {
            Ok(()) => {
                if state.upload_succeeded(batch, at) {
                    vec![Effect::ScheduleEmbed { batch }]
                } else {
                    Vec::new()
                }
            }
            Err(message) => {
                state.upload_failed(batch, &message, at);
                Vec::new()
            }
        },
        Msg::EmbedDelayElapsed { batch } => {
            state.embed_elapsed(batch);
            Vec::new()
        }
        Msg::DeleteRequested { id } => match state.begin_delete(id) {
            Some(filename) => vec![Effect::DeleteRemote { id, filename }],
            None => Vec::new(),
        },
        Msg::DeleteFinished { id, result, at } => match state.finish_delete(id, result, at) {
            Some(batch) => vec![Effect::CancelEmbed { batch }],
            None => Vec::new(),
        },
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
