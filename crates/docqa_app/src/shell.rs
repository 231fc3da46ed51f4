use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use docqa_core::{DocId, Health, TOP_K_RANGE};
use docqa_engine::{AskOutcome, DeleteOutcome, LocalFile, OpHandle, SubmitOutcome};
use docqa_logging::docqa_warn;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::{
    health_label, print_answer, print_documents, print_history, print_logs, print_uploads,
};
use crate::session::Session;

const HELP: &str = "\
commands:
  upload <path>...     upload files as one batch (runs in the background)
  uploads              show upload status
  remove <id>          delete an uploaded item
  docs                 show registry documents (* = selected)
  refresh              refetch the registry
  select <filename>    toggle a document in the question filter
  delete <filename>    delete a registry document
  topk <1-20>          set how many chunks to retrieve
  ask <question>       ask against the selected documents
  history              show recent questions
  health               show service health
  logs                 show upload activity
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Upload(Vec<PathBuf>),
    Uploads,
    Remove(DocId),
    Docs,
    Refresh,
    Select(String),
    Delete(String),
    TopK(u32),
    Ask(String),
    History,
    Health,
    Logs,
    Help,
    Quit,
}

/// Parses one input line; blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "upload" => {
            let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err("upload needs at least one path".to_string());
            }
            ShellCommand::Upload(paths)
        }
        "uploads" => ShellCommand::Uploads,
        "remove" => {
            let id = rest
                .parse()
                .map_err(|_| format!("not an upload id: {rest:?}"))?;
            ShellCommand::Remove(id)
        }
        "docs" => ShellCommand::Docs,
        "refresh" => ShellCommand::Refresh,
        "select" => ShellCommand::Select(required(rest, "select")?),
        "delete" => ShellCommand::Delete(required(rest, "delete")?),
        "topk" => match rest.parse::<u32>() {
            Ok(top_k) if TOP_K_RANGE.contains(&top_k) => ShellCommand::TopK(top_k),
            _ => return Err("topk must be between 1 and 20".to_string()),
        },
        "ask" => ShellCommand::Ask(rest.to_string()),
        "history" => ShellCommand::History,
        "health" => ShellCommand::Health,
        "logs" => ShellCommand::Logs,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command {other:?}, try help")),
    };
    Ok(Some(command))
}

/// Asking is only offered once the service has reported itself up.
pub fn ask_blocked_reason(status: Health) -> Option<&'static str> {
    match status {
        Health::Up => None,
        Health::Down => Some("service is down; try again later"),
        Health::Unknown => Some("service health not known yet; try again shortly"),
    }
}

fn required(rest: &str, command: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("{command} needs a filename"))
    } else {
        Ok(rest.to_string())
    }
}

pub async fn run(session: &Session) -> Result<()> {
    session.health.activate();
    session.registry.activate().await;
    println!("{HELP}");

    let mut top_k = session.top_k;
    let mut uploads = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("docqa> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(command)) => execute(session, command, &mut top_k, &mut uploads).await,
            Err(message) => println!("{message}"),
        }
        report_finished(&mut uploads).await;
    }

    if !uploads.is_empty() {
        println!("leaving {} upload(s) running", uploads.len());
    }
    uploads.into_iter().for_each(OpHandle::abandon);
    session.health.deactivate();
    Ok(())
}

/// Prints the outcome of background uploads that have completed.
async fn report_finished(uploads: &mut Vec<OpHandle<SubmitOutcome>>) {
    let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(uploads)
        .into_iter()
        .partition(OpHandle::is_finished);
    *uploads = running;
    for handle in finished {
        match handle.outcome().await {
            Some(SubmitOutcome::Ingested { batch, files }) => {
                println!("batch {batch}: {files} file(s) ingested")
            }
            Some(SubmitOutcome::Failed { batch, message }) => {
                println!("batch {batch} failed: {message}")
            }
            Some(SubmitOutcome::Skipped) => {}
            None => docqa_warn!("Upload task ended without an outcome"),
        }
    }
}

async fn execute(
    session: &Session,
    command: ShellCommand,
    top_k: &mut u32,
    uploads: &mut Vec<OpHandle<SubmitOutcome>>,
) {
    match command {
        ShellCommand::Upload(paths) => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                match LocalFile::read(path).await {
                    Ok(file) => files.push(file),
                    Err(err) => {
                        println!("cannot read {}: {err}", path.display());
                        return;
                    }
                }
            }
            println!("uploading {} file(s)", files.len());
            uploads.push(session.ingest.spawn_submit(files));
        }
        ShellCommand::Uploads => print_uploads(&session.ingest.docs()),
        ShellCommand::Remove(id) => match session.delete_upload(id).await {
            DeleteOutcome::Deleted { filename } => println!("deleted {filename}"),
            DeleteOutcome::Failed { filename, message } => {
                println!("failed to delete {filename}: {message}")
            }
            DeleteOutcome::Skipped => println!("no upload #{id}, or already being deleted"),
        },
        ShellCommand::Docs => {
            if let Some(error) = session.registry.error() {
                println!("(stale) {error}");
            }
            print_documents(&session.registry.documents(), &session.registry.selected());
        }
        ShellCommand::Refresh => {
            session.registry.refetch().await;
            print_documents(&session.registry.documents(), &session.registry.selected());
        }
        ShellCommand::Select(filename) => {
            let selected = session.registry.toggle_selected(&filename);
            let verb = if selected { "selected" } else { "deselected" };
            println!("{verb} {filename}");
        }
        ShellCommand::Delete(filename) => match session.registry.delete_document(&filename).await {
            DeleteOutcome::Deleted { filename } => println!("deleted {filename}"),
            DeleteOutcome::Failed { filename, message } => {
                println!("failed to delete {filename}: {message}")
            }
            DeleteOutcome::Skipped => println!("{filename} is already being deleted"),
        },
        ShellCommand::TopK(value) => {
            *top_k = value;
            println!("top_k = {value}");
        }
        ShellCommand::Ask(question) => {
            if let Some(reason) = ask_blocked_reason(session.health.status()) {
                println!("{reason}");
                return;
            }
            match session.ask(&question, *top_k).await {
                AskOutcome::Skipped => println!("ask what?"),
                AskOutcome::Answered | AskOutcome::Failed { .. } => {
                    if let Some(answer) = session.qa.answer() {
                        print_answer(&answer);
                    } else {
                        docqa_warn!("Answer slot empty after ask completed");
                    }
                }
            }
        }
        ShellCommand::History => print_history(&session.qa.history()),
        ShellCommand::Health => println!("service is {}", health_label(session.health.status())),
        ShellCommand::Logs => print_logs(&session.ingest.logs()),
        ShellCommand::Help | ShellCommand::Quit => println!("{HELP}"),
    }
}
