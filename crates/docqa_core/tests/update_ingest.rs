use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use docqa_core::{update, DocStatus, Effect, FileMeta, IngestState, LogEntry, Msg, LOG_LIMIT};
use pretty_assertions::assert_eq;

fn stamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(docqa_logging::initialize_for_tests);
}

fn select(state: IngestState, names: &[&str]) -> (IngestState, Vec<Effect>) {
    let files = names
        .iter()
        .map(|name| FileMeta::new(*name, 100))
        .collect();
    update(state, Msg::FilesSelected(files))
}

fn statuses(state: &IngestState) -> Vec<(String, DocStatus)> {
    state
        .docs()
        .iter()
        .map(|doc| (doc.name.clone(), doc.status))
        .collect()
}

#[test]
fn two_file_batch_walks_the_success_path() {
    init_logging();
    let (state, effects) = select(IngestState::new(), &["a.pdf", "b.pdf"]);
    assert_eq!(
        effects,
        vec![Effect::Upload {
            batch: 1,
            doc_ids: vec![1, 2],
        }]
    );
    assert_eq!(
        statuses(&state),
        vec![
            ("a.pdf".to_string(), DocStatus::Queued),
            ("b.pdf".to_string(), DocStatus::Queued),
        ]
    );

    let (state, effects) = update(state, Msg::UploadStarted { batch: 1 });
    assert!(effects.is_empty());
    assert!(state.is_uploading());
    assert!(state.docs().iter().all(|doc| doc.status == DocStatus::Parsing));

    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            batch: 1,
            result: Ok(()),
            at: stamp(),
        },
    );
    assert_eq!(effects, vec![Effect::ScheduleEmbed { batch: 1 }]);
    assert!(!state.is_uploading());
    assert!(state.docs().iter().all(|doc| doc.status == DocStatus::Chunked));
    assert_eq!(
        state.logs(),
        [LogEntry {
            time: stamp(),
            text: "Ingested 2 file(s).".to_string(),
        }]
    );

    let (state, effects) = update(state, Msg::EmbedDelayElapsed { batch: 1 });
    assert!(effects.is_empty());
    assert!(state.docs().iter().all(|doc| doc.status == DocStatus::Embedded));
    assert_eq!(state.logs().len(), 1);
}

#[test]
fn new_batches_are_prepended() {
    init_logging();
    let (state, _) = select(IngestState::new(), &["old.pdf"]);
    let (state, effects) = select(state, &["new1.pdf", "new2.pdf"]);

    assert_eq!(
        effects,
        vec![Effect::Upload {
            batch: 2,
            doc_ids: vec![2, 3],
        }]
    );
    let names: Vec<_> = state.docs().iter().map(|doc| doc.name.as_str()).collect();
    assert_eq!(names, vec!["new1.pdf", "new2.pdf", "old.pdf"]);
}

#[test]
fn failure_marks_whole_batch_with_message() {
    init_logging();
    let (state, _) = select(IngestState::new(), &["a.pdf", "b.pdf"]);
    let (state, _) = update(state, Msg::UploadStarted { batch: 1 });
    let (state, effects) = update(
        state,
        Msg::UploadFinished {
            batch: 1,
            result: Err("disk full".to_string()),
            at: stamp(),
        },
    );

    assert!(effects.is_empty());
    for doc in state.docs() {
        assert_eq!(doc.status, DocStatus::Error);
        assert_eq!(doc.error.as_deref(), Some("disk full"));
    }
    assert_eq!(state.logs().len(), 1);
    assert_eq!(state.logs()[0].text, "Ingest error: disk full");
    assert!(state.batch_doc_ids(1).is_empty());
}

#[test]
fn overlapping_batches_only_touch_their_own_items() {
    init_logging();
    let (state, _) = select(IngestState::new(), &["first.pdf"]);
    let (state, _) = update(state, Msg::UploadStarted { batch: 1 });
    let (state, _) = select(state, &["second.pdf"]);
    let (state, _) = update(state, Msg::UploadStarted { batch: 2 });

    let (state, _) = update(
        state,
        Msg::UploadFinished {
            batch: 2,
            result: Err("Ingest failed".to_string()),
            at: stamp(),
        },
    );
    assert!(state.is_uploading());
    let (state, _) = update(
        state,
        Msg::UploadFinished {
            batch: 1,
            result: Ok(()),
            at: stamp(),
        },
    );
    let (state, _) = update(state, Msg::EmbedDelayElapsed { batch: 1 });

    assert_eq!(
        statuses(&state),
        vec![
            ("second.pdf".to_string(), DocStatus::Error),
            ("first.pdf".to_string(), DocStatus::Embedded),
        ]
    );
    assert_eq!(state.doc(1).unwrap().error, None);
}

#[test]
fn late_embed_timer_does_not_resurrect_errors() {
    init_logging();
    let (state, _) = select(IngestState::new(), &["a.pdf"]);
    let (state, _) = update(state, Msg::UploadStarted { batch: 1 });
    let (state, _) = update(
        state,
        Msg::UploadFinished {
            batch: 1,
            result: Err("boom".to_string()),
            at: stamp(),
        },
    );
    let (state, _) = update(state, Msg::EmbedDelayElapsed { batch: 1 });

    assert_eq!(state.doc(1).unwrap().status, DocStatus::Error);
}

#[test]
fn embed_timer_before_upload_finishes_is_ignored() {
    init_logging();
    let (state, _) = select(IngestState::new(), &["a.pdf"]);
    let (state, _) = update(state, Msg::UploadStarted { batch: 1 });
    let (state, _) = update(state, Msg::EmbedDelayElapsed { batch: 1 });

    assert_eq!(state.doc(1).unwrap().status, DocStatus::Parsing);
    assert_eq!(state.batch_doc_ids(1), vec![1]);
}

#[test]
fn activity_log_is_capped_newest_first() {
    init_logging();
    let mut state = IngestState::new();
    for round in 1..=(LOG_LIMIT as u64 + 3) {
        let (next, _) = select(state, &["doc.pdf"]);
        let (next, _) = update(next, Msg::UploadStarted { batch: round });
        let (next, _) = update(
            next,
            Msg::UploadFinished {
                batch: round,
                result: Err(format!("error {round}")),
                at: stamp(),
            },
        );
        state = next;
    }

    assert_eq!(state.logs().len(), LOG_LIMIT);
    assert_eq!(state.logs()[0].text, format!("Ingest error: error {}", LOG_LIMIT + 3));
}
